use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::Local;
use simconsole_core::{CloseReason, DetailPhase, DetailViewModel, StreamStatus};
use simconsole_engine::{DetailEvent, DetailSink};

/// Prints a detail session: records on stdout, status changes on stderr.
#[derive(Default)]
pub struct TerminalSink {
    last_status: Mutex<Option<String>>,
    navigated: AtomicBool,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session asked to go back to the simulation listing.
    pub fn navigated(&self) -> bool {
        self.navigated.load(Ordering::Acquire)
    }
}

impl DetailSink for TerminalSink {
    fn emit(&self, event: DetailEvent) {
        match event {
            DetailEvent::Record(record) => {
                println!("{} {}", Local::now().format("%H:%M:%S%.3f"), record);
            }
            DetailEvent::View(view) => {
                let Some(status) = describe(&view) else {
                    return;
                };
                let mut last = self
                    .last_status
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if last.as_deref() != Some(status.as_str()) {
                    eprintln!("{status}");
                    *last = Some(status);
                }
            }
            DetailEvent::NavigateToList => self.navigated.store(true, Ordering::Release),
        }
    }
}

/// One-line status for the view, or `None` when there is nothing to say.
fn describe(view: &DetailViewModel) -> Option<String> {
    let simulation = view.simulation.as_ref();
    let label = simulation
        .map(|s| format!("{} ({})", s.name, s.state))
        .unwrap_or_else(|| view.simulation_id.clone());

    match (view.phase, &view.stream) {
        (DetailPhase::Loading, _) => Some(format!("loading {}", view.simulation_id)),
        (DetailPhase::Active, StreamStatus::Idle) => Some(format!("{label}: no live logs")),
        (DetailPhase::Active, StreamStatus::Open) => Some(format!("{label}: streaming logs")),
        (_, StreamStatus::Closed(reason)) => Some(format!(
            "{label}: log stream closed, {}",
            close_reason(reason)
        )),
        (DetailPhase::NotFound, _) => Some(format!("{}: not found", view.simulation_id)),
        (DetailPhase::Closed, _) => None,
    }
}

fn close_reason(reason: &CloseReason) -> String {
    match reason {
        CloseReason::Stopped => "simulation stopped".to_string(),
        CloseReason::ViewClosed => "interrupted".to_string(),
        CloseReason::NotFound => "simulation disappeared".to_string(),
        CloseReason::Failed(message) => message.clone(),
        CloseReason::Ended => "server ended the stream".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simconsole_core::{Simulation, SimulationState};

    fn view(phase: DetailPhase, stream: StreamStatus) -> DetailViewModel {
        DetailViewModel {
            simulation_id: "s1".to_string(),
            phase,
            simulation: Some(Simulation {
                id: "s1".to_string(),
                name: "harbor".to_string(),
                state: SimulationState::Running,
            }),
            stream,
            ..DetailViewModel::default()
        }
    }

    #[test]
    fn status_lines() {
        assert_eq!(
            describe(&view(DetailPhase::Active, StreamStatus::Open)).as_deref(),
            Some("harbor (RUNNING): streaming logs")
        );
        assert_eq!(
            describe(&view(
                DetailPhase::Active,
                StreamStatus::Closed(CloseReason::Stopped)
            ))
            .as_deref(),
            Some("harbor (RUNNING): log stream closed, simulation stopped")
        );
        assert_eq!(describe(&view(DetailPhase::Closed, StreamStatus::Idle)), None);
    }

    #[test]
    fn navigation_is_remembered() {
        let sink = TerminalSink::new();
        assert!(!sink.navigated());
        sink.emit(DetailEvent::NavigateToList);
        assert!(sink.navigated());
    }
}
