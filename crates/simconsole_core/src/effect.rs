/// Side effects requested by [`crate::update`]; executed by the session runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the live log stream for the simulation.
    OpenLogStream { simulation_id: String },
    /// Close the live log stream; the runner must release the channel.
    CloseLogStream,
    /// The simulation is gone; leave the detail view for the listing.
    NavigateToList,
}
