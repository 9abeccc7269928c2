use std::sync::Arc;
use std::time::Duration;

use console_logging::{console_info, console_warn};
use simconsole_core::{
    update, DetailState, DetailViewModel, Effect, LogRecord, Msg, Simulation, SimulationState,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::stream::{open_log_stream, LogStreamHandle, StreamError};
use crate::{ApiError, ClientSettings, SimulationService};

/// Notifications from a running detail session.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailEvent {
    /// The view changed.
    View(DetailViewModel),
    /// A record was appended to the log buffer.
    Record(LogRecord),
    /// The simulation does not exist; the listing should be shown instead.
    NavigateToList,
}

pub trait DetailSink: Send + Sync {
    fn emit(&self, event: DetailEvent);
}

/// Drives one simulation detail view: state lookups, polling and the live
/// log stream, fed through [`simconsole_core::update`].
pub struct DetailSession {
    service: Arc<SimulationService>,
    stream_retry: Option<Duration>,
    poll_interval: Option<Duration>,
}

impl DetailSession {
    pub fn new(service: Arc<SimulationService>, settings: &ClientSettings) -> Self {
        Self {
            service,
            stream_retry: settings.stream_retry,
            poll_interval: settings.state_poll_interval,
        }
    }

    /// Runs the view until nothing more can arrive: the simulation is
    /// missing, its stream is closed, or `cancel` fires. The log stream is
    /// released on every exit path.
    pub async fn run(
        &self,
        simulation_id: &str,
        sink: &dyn DetailSink,
        cancel: CancellationToken,
    ) -> DetailState {
        let mut state = DetailState::new(simulation_id);
        let (state_tx, _state_rx) = watch::channel(SimulationState::default());
        let mut stream: Option<LogStreamHandle> = None;
        let mut delivered = 0;

        // Lookups run on their own task so log traffic never restarts one.
        let (lookup_tx, mut lookups) = mpsc::unbounded_channel();
        let lookup_stop = CancellationToken::new();
        let _lookup_guard = lookup_stop.clone().drop_guard();
        tokio::spawn(
            StateLookup {
                service: Arc::clone(&self.service),
                simulation_id: simulation_id.to_string(),
                poll_interval: self.poll_interval,
                tx: lookup_tx,
            }
            .run(lookup_stop),
        );

        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => Msg::ViewClosed,
                resolved = lookups.recv() => match resolved {
                    Some(Ok(found)) => {
                        if let Some(simulation) = &found {
                            state_tx.send_replace(simulation.state.clone());
                        }
                        Msg::SimulationResolved(found)
                    }
                    Some(Err(err)) => {
                        console_warn!("Simulation lookup failed id={}: {}", simulation_id, err);
                        Msg::SimulationLookupFailed(err.to_string())
                    }
                    None => Msg::ViewClosed,
                },
                item = next_item(&mut stream) => match item {
                    Some(Ok(record)) => Msg::LogRecordReceived(record),
                    Some(Err(err)) => stream_failure(err),
                    None => Msg::LogStreamEnded,
                },
            };

            let (next, effects) = update(state, msg);
            state = next;

            for record in &state.records()[delivered..] {
                sink.emit(DetailEvent::Record(record.clone()));
            }
            delivered = state.records().len();

            for effect in effects {
                match effect {
                    Effect::OpenLogStream { simulation_id } => {
                        console_info!("Opening log stream simulation_id={}", simulation_id);
                        stream = Some(open_log_stream(
                            self.service.backend(),
                            simulation_id,
                            state_tx.subscribe(),
                            self.stream_retry,
                        ));
                    }
                    Effect::CloseLogStream => {
                        if let Some(mut handle) = stream.take() {
                            handle.shutdown().await;
                        }
                    }
                    Effect::NavigateToList => sink.emit(DetailEvent::NavigateToList),
                }
            }

            // A stream that ended on its own has nothing left to deliver.
            if !state.is_stream_open() {
                if let Some(mut handle) = stream.take() {
                    handle.shutdown().await;
                }
            }

            if state.consume_dirty() {
                sink.emit(DetailEvent::View(state.view()));
            }

            if state.is_terminal() || (state.simulation().is_some() && !state.is_stream_open()) {
                break;
            }
        }

        state
    }
}

type LookupResult = Result<Option<Simulation>, ApiError>;

/// Looks the simulation up on every single-simulation signal and, when
/// polling is on, fires that signal again a poll interval after each
/// answer.
struct StateLookup {
    service: Arc<SimulationService>,
    simulation_id: String,
    poll_interval: Option<Duration>,
    tx: mpsc::UnboundedSender<LookupResult>,
}

impl StateLookup {
    async fn run(self, stop: CancellationToken) {
        tokio::select! {
            _ = stop.cancelled() => {}
            _ = self.lookup_loop() => {}
        }
    }

    async fn lookup_loop(&self) {
        let mut listener = self.service.subscribe_simulation();
        loop {
            let Some(result) = self
                .service
                .next_simulation(&self.simulation_id, &mut listener)
                .await
            else {
                return;
            };
            if self.tx.send(result).is_err() {
                return;
            }
            if let Some(period) = self.poll_interval {
                tokio::time::sleep(period).await;
                self.service.refresh_simulation();
            }
        }
    }
}

fn stream_failure(err: StreamError) -> Msg {
    Msg::LogStreamFailed(err.to_string())
}

async fn next_item(
    stream: &mut Option<LogStreamHandle>,
) -> Option<Result<LogRecord, StreamError>> {
    match stream {
        Some(handle) => handle.recv().await,
        None => std::future::pending().await,
    }
}
