use crate::view_model::DetailViewModel;
use crate::{LogRecord, Simulation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailPhase {
    /// Waiting for the first state lookup.
    #[default]
    Loading,
    /// The simulation exists; see [`StreamStatus`] for the log stream.
    Active,
    /// The backend has no such simulation (terminal).
    NotFound,
    /// The view was discarded (terminal).
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamStatus {
    /// No stream was opened for this view.
    #[default]
    Idle,
    Open,
    Closed(CloseReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// A `STOPPED` state was observed.
    Stopped,
    /// The owning view went away.
    ViewClosed,
    /// The simulation disappeared while streaming.
    NotFound,
    /// Transport or decode failure.
    Failed(String),
    /// The transport finished without error.
    Ended,
}

/// State of one simulation detail view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetailState {
    simulation_id: String,
    phase: DetailPhase,
    simulation: Option<Simulation>,
    stream: StreamStatus,
    records: Vec<LogRecord>,
    dirty: bool,
}

impl DetailState {
    pub fn new(simulation_id: impl Into<String>) -> Self {
        Self {
            simulation_id: simulation_id.into(),
            ..Self::default()
        }
    }

    pub fn view(&self) -> DetailViewModel {
        DetailViewModel {
            simulation_id: self.simulation_id.clone(),
            phase: self.phase,
            simulation: self.simulation.clone(),
            stream: self.stream.clone(),
            record_count: self.records.len(),
            loading: self.is_loading(),
            dirty: self.dirty,
        }
    }

    pub fn simulation_id(&self) -> &str {
        &self.simulation_id
    }

    pub fn phase(&self) -> DetailPhase {
        self.phase
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    pub fn stream(&self) -> &StreamStatus {
        &self.stream
    }

    /// Records in arrival order.
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn is_stream_open(&self) -> bool {
        self.stream == StreamStatus::Open
    }

    /// Last known state is `STOPPED`.
    pub fn is_stopped(&self) -> bool {
        self.simulation
            .as_ref()
            .is_some_and(|simulation| simulation.state.is_stopped())
    }

    /// True for `NotFound` and `Closed`; nothing changes the view afterwards.
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, DetailPhase::NotFound | DetailPhase::Closed)
    }

    /// Returns whether the view changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn is_loading(&self) -> bool {
        match self.phase {
            DetailPhase::Loading => true,
            DetailPhase::Active => self.is_stream_open() && self.records.is_empty(),
            DetailPhase::NotFound | DetailPhase::Closed => false,
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_phase(&mut self, phase: DetailPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_simulation(&mut self, simulation: Simulation) {
        if self.simulation.as_ref() != Some(&simulation) {
            self.simulation = Some(simulation);
            self.mark_dirty();
        }
    }

    pub(crate) fn open_stream(&mut self) {
        self.stream = StreamStatus::Open;
        self.mark_dirty();
    }

    /// Marks an open stream closed; returns false if it was not open.
    pub(crate) fn close_stream(&mut self, reason: CloseReason) -> bool {
        if !self.is_stream_open() {
            return false;
        }
        self.stream = StreamStatus::Closed(reason);
        self.mark_dirty();
        true
    }

    pub(crate) fn push_record(&mut self, record: LogRecord) {
        self.records.push(record);
        self.mark_dirty();
    }
}
