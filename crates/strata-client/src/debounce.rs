//! Trailing-edge debounce timer
//!
//! A `Debounced` instance owns at most one pending task. Scheduling again
//! before the window elapses aborts the pending task and starts a new window
//! with the new effect, so only the last effect of a burst runs. Dropping the
//! instance aborts whatever is still pending.
//!
//! On a multi-threaded runtime a task may already be past its sleep when it
//! is aborted. Each scheduled effect therefore carries a [`Ticket`] and only
//! runs if it can claim the ticket, which any later `schedule`, `cancel` or
//! drop invalidates.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Right to run one scheduled effect.
struct Ticket {
    generation: Arc<AtomicU64>,
    id: u64,
}

impl Ticket {
    fn issue(generation: &Arc<AtomicU64>) -> Self {
        let id = generation.fetch_add(1, Ordering::AcqRel) + 1;
        Self {
            generation: generation.clone(),
            id,
        }
    }

    /// Claim the ticket. Succeeds at most once, and only while no newer
    /// ticket was issued.
    fn claim(&self) -> bool {
        self.generation
            .compare_exchange(self.id, self.id + 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Scoped, cancellable debounce timer.
pub struct Debounced {
    label: String,
    delay: Duration,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debounced {
    pub fn new(label: &str, delay: Duration) -> Self {
        Self {
            label: label.to_string(),
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `effect` once the window elapses without another call.
    ///
    /// Outside a tokio runtime there is no timer to defer to and the effect
    /// runs immediately.
    pub fn schedule<F>(&self, effect: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.pending.lock();
        let ticket = Ticket::issue(&self.generation);
        if let Some(previous) = pending.take() {
            previous.abort();
            debug!("Debounce rescheduled: {}", self.label);
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No tokio runtime for debounce, applying now: {}", self.label);
                drop(pending);
                if ticket.claim() {
                    effect();
                }
                return;
            }
        };

        let delay = self.delay;
        let label = self.label.clone();
        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if ticket.claim() {
                effect();
            } else {
                debug!("Debounce superseded after wake: {}", label);
            }
        }));
    }

    /// Abort the pending effect. Returns `true` if one was still waiting.
    pub fn cancel(&self) -> bool {
        let mut pending = self.pending.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        match pending.take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                if waiting {
                    debug!("Debounce cancelled: {}", self.label);
                }
                waiting
            }
            None => false,
        }
    }

    /// Whether an effect is waiting for its window to elapse.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debounced {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}
