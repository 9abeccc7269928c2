use crate::{LogRecord, Simulation};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// State lookup answered; `None` when the backend has no such simulation.
    SimulationResolved(Option<Simulation>),
    /// State lookup failed at the transport level.
    SimulationLookupFailed(String),
    /// The live log stream delivered one record.
    LogRecordReceived(LogRecord),
    /// The live log stream failed; terminal for the stream.
    LogStreamFailed(String),
    /// The live log stream finished without error.
    LogStreamEnded,
    /// The owning view is being discarded.
    ViewClosed,
}
