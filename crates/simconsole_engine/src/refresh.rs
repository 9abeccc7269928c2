use std::future::Future;

use tokio::sync::watch;

/// Payload-free "something changed, fetch again" notification.
///
/// Single slot, latest value: a listener that subscribes after signals were
/// fired sees exactly one pending signal, however many were fired. Signals
/// are never queued.
#[derive(Debug)]
pub struct RefreshSignal {
    tx: watch::Sender<u64>,
}

impl Default for RefreshSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    pub fn notify(&self) {
        self.tx.send_modify(|generation| *generation += 1);
    }

    /// Number of signals fired so far.
    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }

    /// New listener with the latest signal already pending, so the first
    /// fetch happens right away.
    pub fn subscribe(&self) -> RefreshListener {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        RefreshListener { rx, pending: false }
    }
}

#[derive(Debug)]
pub struct RefreshListener {
    rx: watch::Receiver<u64>,
    /// A signal was consumed but its fetch has not completed yet.
    pending: bool,
}

impl RefreshListener {
    /// Waits for the next signal, then runs `fetch`.
    ///
    /// A newer signal arriving while `fetch` is in flight abandons that fetch
    /// and starts a fresh one. Dropping the returned future mid-fetch keeps
    /// the signal pending for the next call. Returns `None` once the signal
    /// is gone.
    pub async fn next_with<F, Fut, T>(&mut self, mut fetch: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
    {
        loop {
            if !self.pending {
                self.rx.changed().await.ok()?;
                self.pending = true;
            }
            tokio::select! {
                output = fetch() => {
                    self.pending = false;
                    return Some(output);
                }
                changed = self.rx.changed() => {
                    changed.ok()?;
                }
            }
        }
    }

    /// True when a signal is waiting to be handled.
    pub fn has_pending(&self) -> bool {
        self.pending || self.rx.has_changed().unwrap_or(false)
    }
}
