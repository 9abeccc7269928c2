use bytes::Bytes;
use console_logging::{console_debug, console_info};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use simconsole_core::{SchemaShort, Simulation};
use url::Url;

use crate::{ApiError, ClientSettings, DeleteRoute, FailureKind};

/// Raw body chunks of the live log channel.
pub type ByteStream = BoxStream<'static, Result<Bytes, ApiError>>;

const LAST_EVENT_ID: HeaderName = HeaderName::from_static("last-event-id");

/// HTTP contract of the simulation backend.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn list_schemas(&self) -> Result<Vec<SchemaShort>, ApiError>;

    /// Body is the schema file converted from YAML.
    async fn create_schema(&self, schema: &Value) -> Result<(), ApiError>;

    async fn delete_schema(&self, id: &str) -> Result<(), ApiError>;

    async fn upload_template(&self, schema_id: &str, template: String) -> Result<(), ApiError>;

    /// Launches a simulation from a schema.
    async fn start_simulation(&self, id: &str) -> Result<(), ApiError>;

    async fn list_simulations(&self) -> Result<Vec<Simulation>, ApiError>;

    /// `Ok(None)` when the backend has no record of `id`.
    async fn get_simulation(&self, id: &str) -> Result<Option<Simulation>, ApiError>;

    async fn stop_simulation(&self, id: &str) -> Result<(), ApiError>;

    async fn delete_simulation(&self, id: &str) -> Result<(), ApiError>;

    /// Opens the server-push log channel for one simulation.
    async fn open_log_channel(
        &self,
        id: &str,
        last_event_id: Option<&str>,
    ) -> Result<ByteStream, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    settings: ClientSettings,
    base_url: Url,
    client: reqwest::Client,
    stream_client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("not an http base url: {base_url}"),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        // The log channel stays open indefinitely, so no whole-request timeout.
        let stream_client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            base_url,
            client,
            stream_client,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// `base_url` plus percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::new(FailureKind::InvalidUrl, "base url cannot take a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn log_channel_url(&self, id: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint(&["simulation", "logs", id])?;
        url.query_pairs_mut()
            .append_pair("interval", &self.settings.log_interval.to_string());
        Ok(url)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        ensure_success(response).await
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }

    async fn execute_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        let response = self.execute(request).await?;
        // Drain so the connection can be reused. The status already decided
        // the outcome.
        if let Err(err) = response.bytes().await {
            console_debug!("Discarding unreadable response body: {}", err);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Backend for ReqwestBackend {
    async fn list_schemas(&self) -> Result<Vec<SchemaShort>, ApiError> {
        let url = self.endpoint(&["schema", "short"])?;
        self.execute_json(self.client.get(url)).await
    }

    async fn create_schema(&self, schema: &Value) -> Result<(), ApiError> {
        let url = self.endpoint(&["schema"])?;
        let body = serde_json::to_vec(schema)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        self.execute_empty(request).await
    }

    async fn delete_schema(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["schema", id])?;
        self.execute_empty(self.client.delete(url)).await
    }

    async fn upload_template(&self, schema_id: &str, template: String) -> Result<(), ApiError> {
        let url = self.endpoint(&["schema", "template", schema_id])?;
        let request = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(template);
        self.execute_empty(request).await
    }

    async fn start_simulation(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["simulation", "start", id])?;
        self.execute_empty(self.client.get(url)).await
    }

    async fn list_simulations(&self) -> Result<Vec<Simulation>, ApiError> {
        let url = self.endpoint(&["simulation"])?;
        self.execute_json(self.client.get(url)).await
    }

    async fn get_simulation(&self, id: &str) -> Result<Option<Simulation>, ApiError> {
        let url = self.endpoint(&["simulation", "state", id])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&body).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
    }

    async fn stop_simulation(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["simulation", "stop", id])?;
        self.execute_empty(self.client.get(url)).await
    }

    async fn delete_simulation(&self, id: &str) -> Result<(), ApiError> {
        let request = match self.settings.delete_route {
            DeleteRoute::Kill => self
                .client
                .get(self.endpoint(&["simulation", "kill", id])?),
            DeleteRoute::Resource => self.client.delete(self.endpoint(&["simulation", id])?),
        };
        self.execute_empty(request).await
    }

    async fn open_log_channel(
        &self,
        id: &str,
        last_event_id: Option<&str>,
    ) -> Result<ByteStream, ApiError> {
        let url = self.log_channel_url(id)?;
        console_info!("Opening log channel url={}", url);

        let mut request = self
            .stream_client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(last_id) = last_event_id {
            match HeaderValue::from_str(last_id) {
                Ok(value) => request = request.header(LAST_EVENT_ID, value),
                Err(_) => console_debug!("Skipping non-header-safe last event id {:?}", last_id),
            }
        }

        let response = self.execute(request).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error))
            .boxed())
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    let message = backend_message(&body).unwrap_or_else(|| status.to_string());
    Err(ApiError::new(FailureKind::HttpStatus(status.as_u16()), message))
}

/// The backend reports errors as `{"message": "..."}`.
fn backend_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value.get("message")?.as_str().map(ToOwned::to_owned)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ApiError::new(FailureKind::InvalidUrl, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
