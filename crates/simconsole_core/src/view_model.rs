use crate::{DetailPhase, Simulation, StreamStatus};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetailViewModel {
    pub simulation_id: String,
    pub phase: DetailPhase,
    pub simulation: Option<Simulation>,
    pub stream: StreamStatus,
    pub record_count: usize,
    /// Spinner: still resolving, or streaming with nothing received yet.
    pub loading: bool,
    pub dirty: bool,
}
