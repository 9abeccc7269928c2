//! Simconsole engine: backend client, refresh-driven services and the live
//! log stream.
mod client;
mod refresh;
mod service;
mod session;
mod settings;
mod sse;
mod stream;
mod types;
mod upload;

pub use client::{Backend, ByteStream, ReqwestBackend};
pub use refresh::{RefreshListener, RefreshSignal};
pub use service::{SchemaService, SimulationService};
pub use session::{DetailEvent, DetailSession, DetailSink};
pub use settings::{ClientSettings, DeleteRoute, DEFAULT_BASE_URL};
pub use sse::{SseEvent, SseParser};
pub use stream::{open_log_stream, LogStreamHandle, StreamError};
pub use types::{ApiError, FailureKind};
pub use upload::{convert_schema, read_schema_file, read_template_file, UploadError};
