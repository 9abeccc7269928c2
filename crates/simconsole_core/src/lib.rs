//! Simconsole core: domain types, log normalization and the pure
//! simulation-detail state machine.
mod catalog;
mod effect;
mod model;
mod msg;
mod normalize;
mod state;
mod update;
mod upload;
mod view_model;

pub use catalog::Catalog;
pub use effect::Effect;
pub use model::{Named, SchemaShort, Simulation, SimulationState};
pub use msg::Msg;
pub use normalize::{decode_lenient, decode_strict, normalize, LogField, LogRecord, NormalizeError};
pub use state::{CloseReason, DetailPhase, DetailState, StreamStatus};
pub use update::update;
pub use upload::{validate_extension, UploadKind, ValidationError};
pub use view_model::DetailViewModel;
