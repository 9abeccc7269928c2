use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use console_logging::{console_debug, console_info, console_trace, console_warn};
use futures_util::StreamExt;
use simconsole_core::{normalize, LogRecord, NormalizeError, SimulationState};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::sse::SseParser;
use crate::{ApiError, Backend};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("log channel failed: {0}")]
    Transport(ApiError),
    #[error(transparent)]
    Decode(#[from] NormalizeError),
}

type StreamItem = Result<LogRecord, StreamError>;

/// Consumer side of one simulation's live log stream.
///
/// Yields records in arrival order. The sequence ends when the simulation
/// is seen `STOPPED`, when the transport fails (the error is the last item),
/// or when the handle is closed. Dropping the handle closes it.
pub struct LogStreamHandle {
    simulation_id: String,
    rx: mpsc::UnboundedReceiver<StreamItem>,
    state: watch::Receiver<SimulationState>,
    cancel: CancellationToken,
    released: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    closed: bool,
}

/// Opens the live log stream for `simulation_id`.
///
/// `state` carries the last known lifecycle state of the simulation; the
/// stream tears itself down as soon as it reads `STOPPED` there. `retry` is
/// the default reconnect delay after a clean end of the server response
/// (`None` ends the sequence instead). Must be called inside a tokio runtime.
pub fn open_log_stream(
    backend: Arc<dyn Backend>,
    simulation_id: impl Into<String>,
    state: watch::Receiver<SimulationState>,
    retry: Option<Duration>,
) -> LogStreamHandle {
    let simulation_id = simulation_id.into();
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let released = Arc::new(AtomicBool::new(false));

    let pump = LogPump {
        backend,
        simulation_id: simulation_id.clone(),
        state: state.clone(),
        retry,
        tx,
        cancel: cancel.clone(),
        _guard: ReleaseGuard {
            simulation_id: simulation_id.clone(),
            released: Arc::clone(&released),
        },
    };
    let task = tokio::spawn(pump.run());

    LogStreamHandle {
        simulation_id,
        rx,
        state,
        cancel,
        released,
        task: Some(task),
        closed: false,
    }
}

impl LogStreamHandle {
    pub fn simulation_id(&self) -> &str {
        &self.simulation_id
    }

    /// Next item, or `None` once the sequence has ended.
    pub async fn recv(&mut self) -> Option<StreamItem> {
        if self.closed {
            return None;
        }
        if self.state.borrow().is_stopped() {
            self.close();
            return None;
        }
        let item = self.rx.recv().await;
        // The stop may have been observed while waiting.
        if self.state.borrow().is_stopped() {
            self.close();
            return None;
        }
        item
    }

    /// Closes the stream; later calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.cancel.cancel();
        self.rx.close();
        console_info!("Log stream closed simulation_id={}", self.simulation_id);
    }

    /// Closes the stream and waits until the channel is released.
    pub async fn shutdown(&mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True once the underlying connection has been dropped.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// The flag behind [`is_released`](Self::is_released); it outlives the
    /// handle, so a caller can observe the release that follows a drop.
    pub fn release_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl Drop for LogStreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Marks the channel released when the pump finishes, on every exit path.
struct ReleaseGuard {
    simulation_id: String,
    released: Arc<AtomicBool>,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            console_debug!("Log channel released simulation_id={}", self.simulation_id);
        }
    }
}

struct LogPump {
    backend: Arc<dyn Backend>,
    simulation_id: String,
    state: watch::Receiver<SimulationState>,
    retry: Option<Duration>,
    tx: mpsc::UnboundedSender<StreamItem>,
    cancel: CancellationToken,
    _guard: ReleaseGuard,
}

/// Why one connection of the pump ended.
enum Exit {
    /// Stop, cancel, failure or consumer gone: no reconnect.
    Done,
    /// The server ended the response cleanly.
    Eof,
}

impl LogPump {
    async fn run(mut self) {
        let mut parser = SseParser::new();
        loop {
            match self.connect_and_pump(&mut parser).await {
                Exit::Done => return,
                Exit::Eof => {}
            }

            let Some(default_retry) = self.retry else {
                console_info!("Log stream ended simulation_id={}", self.simulation_id);
                return;
            };
            let delay = parser.retry().unwrap_or(default_retry);
            console_info!(
                "Log stream ended by server, reconnecting in {:?} simulation_id={}",
                delay,
                self.simulation_id
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = wait_stopped(&mut self.state) => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn connect_and_pump(&mut self, parser: &mut SseParser) -> Exit {
        let connect = self
            .backend
            .open_log_channel(&self.simulation_id, parser.last_event_id());
        let mut channel = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Exit::Done,
            _ = wait_stopped(&mut self.state) => {
                console_info!("Simulation stopped before log channel opened simulation_id={}", self.simulation_id);
                return Exit::Done;
            }
            result = connect => match result {
                Ok(channel) => channel,
                Err(err) => {
                    console_warn!("Log channel failed to open simulation_id={}: {}", self.simulation_id, err);
                    let _ = self.tx.send(Err(StreamError::Transport(err)));
                    return Exit::Done;
                }
            },
        };

        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Exit::Done,
                _ = wait_stopped(&mut self.state) => {
                    console_info!("Simulation stopped, closing log channel simulation_id={}", self.simulation_id);
                    return Exit::Done;
                }
                chunk = channel.next() => chunk,
            };

            let bytes = match chunk {
                Some(Ok(bytes)) => bytes,
                Some(Err(err)) => {
                    console_warn!("Log channel error simulation_id={}: {}", self.simulation_id, err);
                    let _ = self.tx.send(Err(StreamError::Transport(err)));
                    return Exit::Done;
                }
                None => return Exit::Eof,
            };

            for event in parser.feed(&bytes) {
                // Checked against the state known before this message.
                if self.state.borrow().is_stopped() {
                    return Exit::Done;
                }
                if !event.is_message() {
                    console_debug!("Ignoring {:?} event on log channel", event.event);
                    continue;
                }
                console_trace!("Log line simulation_id={} data={}", self.simulation_id, event.data);
                let item = normalize(&event.data).map_err(StreamError::from);
                let failed = item.is_err();
                if let Err(err) = &item {
                    console_warn!("Dropping log stream simulation_id={}: {}", self.simulation_id, err);
                }
                if self.tx.send(item).is_err() || failed {
                    return Exit::Done;
                }
            }
        }
    }
}

/// Resolves once the state reads `STOPPED`; never resolves if the state
/// source is gone.
async fn wait_stopped(state: &mut watch::Receiver<SimulationState>) {
    let closed = state.wait_for(SimulationState::is_stopped).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
