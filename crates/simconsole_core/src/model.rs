use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lifecycle state reported by the backend for a simulation.
///
/// Only `Stopped` is terminal; every other value counts as running.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SimulationState {
    #[default]
    Running,
    Stopped,
    /// Any other state string, kept verbatim.
    Other(String),
}

impl SimulationState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, SimulationState::Stopped)
    }

    pub fn as_str(&self) -> &str {
        match self {
            SimulationState::Running => "RUNNING",
            SimulationState::Stopped => "STOPPED",
            SimulationState::Other(raw) => raw,
        }
    }
}

impl From<&str> for SimulationState {
    fn from(raw: &str) -> Self {
        match raw {
            "RUNNING" => SimulationState::Running,
            "STOPPED" => SimulationState::Stopped,
            other => SimulationState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SimulationState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SimulationState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SimulationState::from(raw.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Simulation {
    pub id: String,
    pub name: String,
    pub state: SimulationState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaShort {
    pub id: String,
    pub name: String,
}

/// Entities listed by the console; names are lower-cased on receipt so
/// filtering is case-consistent.
pub trait Named {
    fn name(&self) -> &str;
    fn lowercase_name(self) -> Self;
}

impl Named for Simulation {
    fn name(&self) -> &str {
        &self.name
    }

    fn lowercase_name(self) -> Self {
        Self {
            name: self.name.to_lowercase(),
            ..self
        }
    }
}

impl Named for SchemaShort {
    fn name(&self) -> &str {
        &self.name
    }

    fn lowercase_name(self) -> Self {
        Self {
            name: self.name.to_lowercase(),
            ..self
        }
    }
}
