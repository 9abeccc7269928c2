use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use console_logging::console_debug;
use simconsole_core::{CloseReason, Simulation, StreamStatus};
use simconsole_engine::{
    Backend, ClientSettings, DetailSession, ReqwestBackend, SchemaService, SimulationService,
};
use tokio_util::sync::CancellationToken;

use crate::cli::{Command, SchemaCommand, SimulationCommand};
use crate::watch::TerminalSink;

/// Success notification; failures are reported by `main`.
fn notify_ok(message: impl AsRef<str>) {
    eprintln!("ok: {}", message.as_ref());
}

pub struct Console {
    settings: ClientSettings,
    schemas: SchemaService,
    simulations: Arc<SimulationService>,
}

impl Console {
    pub fn new(settings: ClientSettings) -> anyhow::Result<Self> {
        let backend: Arc<dyn Backend> = Arc::new(
            ReqwestBackend::new(settings.clone())
                .with_context(|| format!("cannot use backend {:?}", settings.base_url))?,
        );
        Ok(Self {
            schemas: SchemaService::new(Arc::clone(&backend)),
            simulations: Arc::new(SimulationService::new(backend)),
            settings,
        })
    }

    pub async fn run(&self, command: Command) -> anyhow::Result<()> {
        console_debug!("Running {:?}", command);
        match command {
            Command::Schemas(command) => self.run_schema(command).await,
            Command::Simulations(command) => self.run_simulation(command).await,
        }
    }

    async fn run_schema(&self, command: SchemaCommand) -> anyhow::Result<()> {
        match command {
            SchemaCommand::List { filter } => self.list_schemas(&filter).await,
            SchemaCommand::Create { file } => {
                self.schemas.create_schema(&file).await?;
                notify_ok(format!("schema created from {}", display(&file)));
                Ok(())
            }
            SchemaCommand::Delete { id } => {
                self.schemas.delete_schema(&id).await?;
                notify_ok(format!("schema {id} deleted"));
                Ok(())
            }
            SchemaCommand::Template { id, file } => {
                self.schemas.upload_template(&id, &file).await?;
                notify_ok(format!("template {} uploaded for schema {id}", display(&file)));
                Ok(())
            }
            SchemaCommand::Start { id } => {
                self.schemas.start_schema(&id).await?;
                notify_ok(format!("simulation started from schema {id}"));
                Ok(())
            }
        }
    }

    async fn run_simulation(&self, command: SimulationCommand) -> anyhow::Result<()> {
        match command {
            SimulationCommand::List { filter } => self.list_simulations(&filter).await,
            SimulationCommand::Show { id } => {
                let mut listener = self.simulations.subscribe_simulation();
                let found = self
                    .simulations
                    .next_simulation(&id, &mut listener)
                    .await
                    .context("simulation lookup was cancelled")??;
                match found {
                    Some(simulation) => {
                        println!("{}", simulation_row(&simulation));
                        Ok(())
                    }
                    None => bail!("simulation {id} not found"),
                }
            }
            SimulationCommand::Stop { id } => {
                self.simulations.stop(&id).await?;
                notify_ok(format!("simulation {id} stopped"));
                Ok(())
            }
            SimulationCommand::Start { id } => {
                self.simulations.start(&id).await?;
                notify_ok(format!("simulation {id} started"));
                Ok(())
            }
            SimulationCommand::Delete { id } => {
                self.simulations.delete(&id).await?;
                notify_ok(format!("simulation {id} deleted"));
                Ok(())
            }
            SimulationCommand::Watch { id } => self.watch(&id).await,
        }
    }

    async fn list_schemas(&self, filter: &str) -> anyhow::Result<()> {
        let mut listener = self.schemas.subscribe();
        self.schemas
            .next_schemas(&mut listener)
            .await
            .context("schema refresh was cancelled")??;
        for schema in self.schemas.filter(filter) {
            println!("{}\t{}", schema.id, schema.name);
        }
        Ok(())
    }

    async fn list_simulations(&self, filter: &str) -> anyhow::Result<()> {
        let mut listener = self.simulations.subscribe_list();
        self.simulations
            .next_simulations(&mut listener)
            .await
            .context("simulation refresh was cancelled")??;
        for simulation in self.simulations.filter(filter) {
            println!("{}", simulation_row(&simulation));
        }
        Ok(())
    }

    /// Detail view: follows the live log until the simulation stops, the
    /// stream ends or Ctrl-C.
    async fn watch(&self, id: &str) -> anyhow::Result<()> {
        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });

        let sink = TerminalSink::new();
        let session = DetailSession::new(Arc::clone(&self.simulations), &self.settings);
        let state = session.run(id, &sink, cancel).await;
        ctrl_c.abort();

        if sink.navigated() {
            self.list_simulations("").await?;
            bail!("simulation {id} not found");
        }
        if let StreamStatus::Closed(CloseReason::Failed(message)) = state.stream() {
            bail!("log stream failed: {message}");
        }
        Ok(())
    }
}

fn simulation_row(simulation: &Simulation) -> String {
    format!("{}\t{}\t{}", simulation.id, simulation.name, simulation.state)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn console(server: &MockServer) -> Console {
        Console::new(ClientSettings {
            base_url: server.uri(),
            stream_retry: None,
            state_poll_interval: None,
            ..ClientSettings::default()
        })
        .expect("valid base url")
    }

    #[tokio::test]
    async fn watching_a_missing_simulation_lists_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simulation/state/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/simulation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "s1", "name": "Harbor", "state": "RUNNING"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let command = Command::Simulations(SimulationCommand::Watch {
            id: "gone".to_string(),
        });
        let err = console(&server).run(command).await.unwrap_err();
        assert_eq!(err.to_string(), "simulation gone not found");
    }

    #[tokio::test]
    async fn showing_a_missing_simulation_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simulation/state/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let command = Command::Simulations(SimulationCommand::Show {
            id: "gone".to_string(),
        });
        assert!(console(&server).run(command).await.is_err());
    }
}
