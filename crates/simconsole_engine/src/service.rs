use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use console_logging::{console_debug, console_info};
use simconsole_core::{Catalog, Named, SchemaShort, Simulation};

use crate::upload::{read_schema_file, read_template_file};
use crate::{ApiError, Backend, RefreshListener, RefreshSignal};

/// Schema listing, its filter cache and the schema operations.
pub struct SchemaService {
    backend: Arc<dyn Backend>,
    refresh: RefreshSignal,
    catalog: RwLock<Catalog<SchemaShort>>,
}

impl SchemaService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            refresh: RefreshSignal::new(),
            catalog: RwLock::new(Catalog::new()),
        }
    }

    pub fn refresh(&self) -> &RefreshSignal {
        &self.refresh
    }

    pub fn subscribe(&self) -> RefreshListener {
        self.refresh.subscribe()
    }

    /// Fetches the listing on the next refresh signal and updates the cache.
    ///
    /// `None` once the refresh signal is gone.
    pub async fn next_schemas(
        &self,
        listener: &mut RefreshListener,
    ) -> Option<Result<Vec<SchemaShort>, ApiError>> {
        let result = listener.next_with(|| self.backend.list_schemas()).await?;
        Some(result.map(|schemas| {
            console_debug!("Fetched {} schemas", schemas.len());
            self.catalog
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(schemas)
        }))
    }

    /// Cached schemas whose name contains `query`.
    pub fn filter(&self, query: &str) -> Vec<SchemaShort> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .filter(query)
    }

    pub async fn create_schema(&self, file: &Path) -> Result<(), ApiError> {
        let body = read_schema_file(file)?;
        self.backend.create_schema(&body).await?;
        console_info!("Schema created from {:?}", file);
        self.refresh.notify();
        Ok(())
    }

    /// Uploads a text template for a schema. The listing is not refreshed.
    pub async fn upload_template(&self, schema_id: &str, file: &Path) -> Result<(), ApiError> {
        let template = read_template_file(file)?;
        self.backend.upload_template(schema_id, template).await?;
        console_info!("Template uploaded schema_id={} file={:?}", schema_id, file);
        Ok(())
    }

    /// Launches a simulation from the schema.
    pub async fn start_schema(&self, schema_id: &str) -> Result<(), ApiError> {
        self.backend.start_simulation(schema_id).await?;
        console_info!("Simulation started from schema_id={}", schema_id);
        self.refresh.notify();
        Ok(())
    }

    pub async fn delete_schema(&self, schema_id: &str) -> Result<(), ApiError> {
        self.backend.delete_schema(schema_id).await?;
        console_info!("Schema deleted schema_id={}", schema_id);
        self.refresh.notify();
        Ok(())
    }
}

/// Simulation listing and lookups, their filter cache and the lifecycle
/// operations.
pub struct SimulationService {
    backend: Arc<dyn Backend>,
    refresh_list: RefreshSignal,
    refresh_one: RefreshSignal,
    catalog: RwLock<Catalog<Simulation>>,
}

impl SimulationService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            refresh_list: RefreshSignal::new(),
            refresh_one: RefreshSignal::new(),
            catalog: RwLock::new(Catalog::new()),
        }
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.backend)
    }

    pub fn subscribe_list(&self) -> RefreshListener {
        self.refresh_list.subscribe()
    }

    pub fn subscribe_simulation(&self) -> RefreshListener {
        self.refresh_one.subscribe()
    }

    /// Asks every single-simulation listener to look the state up again.
    pub fn refresh_simulation(&self) {
        self.refresh_one.notify();
    }

    pub async fn next_simulations(
        &self,
        listener: &mut RefreshListener,
    ) -> Option<Result<Vec<Simulation>, ApiError>> {
        let result = listener
            .next_with(|| self.backend.list_simulations())
            .await?;
        Some(result.map(|simulations| {
            console_debug!("Fetched {} simulations", simulations.len());
            self.catalog
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(simulations)
        }))
    }

    /// Looks up one simulation on the next single-simulation signal.
    ///
    /// `Some(Ok(None))` means the backend has no such simulation.
    pub async fn next_simulation(
        &self,
        id: &str,
        listener: &mut RefreshListener,
    ) -> Option<Result<Option<Simulation>, ApiError>> {
        let result = listener
            .next_with(|| self.backend.get_simulation(id))
            .await?;
        Some(result.map(|found| found.map(Named::lowercase_name)))
    }

    pub fn filter(&self, query: &str) -> Vec<Simulation> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .filter(query)
    }

    pub async fn start(&self, id: &str) -> Result<(), ApiError> {
        self.backend.start_simulation(id).await?;
        console_info!("Simulation started id={}", id);
        self.notify_all();
        Ok(())
    }

    pub async fn stop(&self, id: &str) -> Result<(), ApiError> {
        self.backend.stop_simulation(id).await?;
        console_info!("Simulation stopped id={}", id);
        self.notify_all();
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.backend.delete_simulation(id).await?;
        console_info!("Simulation deleted id={}", id);
        self.refresh_list.notify();
        Ok(())
    }

    fn notify_all(&self) {
        self.refresh_list.notify();
        self.refresh_one.notify();
    }
}
