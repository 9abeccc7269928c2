use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8090/api/v1";

/// Which endpoint deletes a simulation.
///
/// Backend revisions disagree, so both are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteRoute {
    /// `GET /simulation/kill/{id}`
    Kill,
    /// `DELETE /simulation/{id}`
    #[default]
    Resource,
}

impl FromStr for DeleteRoute {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "kill" => Ok(DeleteRoute::Kill),
            "resource" | "delete" => Ok(DeleteRoute::Resource),
            other => Err(format!(
                "unknown delete route {other:?} (expected \"kill\" or \"resource\")"
            )),
        }
    }
}

impl fmt::Display for DeleteRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteRoute::Kill => write!(f, "kill"),
            DeleteRoute::Resource => write!(f, "resource"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Whole-request timeout for plain calls; not applied to the log stream.
    pub request_timeout: Duration,
    /// `interval` query parameter sent when opening the log stream.
    pub log_interval: u32,
    pub delete_route: DeleteRoute,
    /// Reconnect delay after the server ends the log stream cleanly.
    /// `None` disables reconnection.
    pub stream_retry: Option<Duration>,
    /// How often a detail session re-checks the simulation state.
    /// `None` disables polling.
    pub state_poll_interval: Option<Duration>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            log_interval: 2,
            delete_route: DeleteRoute::default(),
            stream_retry: Some(Duration::from_secs(3)),
            state_poll_interval: Some(Duration::from_secs(2)),
        }
    }
}
