//! Shared Idle / Loading / Error signal.
//!
//! One [`ViewStateBus`] is created by the host and cloned into every component
//! that fetches. Writes are last-write-wins; there is no queue of errors.

use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast;

use crate::error::WeatherError;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Idle,
    Loading,
    Error(String),
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Error(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Current {
    value: ViewState,
    /// Bumped on every transition; a pending settle only fires if unchanged.
    generation: u64,
}

#[derive(Debug)]
struct BusInner {
    current: Mutex<Current>,
    tx: broadcast::Sender<ViewState>,
    settle_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct ViewStateBus {
    inner: Arc<BusInner>,
}

impl Default for ViewStateBus {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY)
    }
}

impl ViewStateBus {
    pub fn new(settle_delay: Duration) -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(BusInner {
                current: Mutex::new(Current {
                    value: ViewState::Idle,
                    generation: 0,
                }),
                tx,
                settle_delay,
            }),
        }
    }

    pub fn current(&self) -> ViewState {
        self.inner.current.lock().value.clone()
    }

    /// Publish `state` to every subscriber immediately. Cancels any pending settle.
    pub fn set(&self, state: ViewState) {
        let mut current = self.inner.current.lock();
        Self::transition(&self.inner.tx, &mut current, state);
    }

    pub fn set_loading(&self) {
        self.set(ViewState::Loading);
    }

    pub fn set_error(&self, err: &WeatherError) {
        tracing::debug!(error = %err, "view state error");
        self.set(ViewState::Error(err.to_string()));
    }

    /// User dismissal: back to `Idle` regardless of what raised the error.
    pub fn dismiss(&self) {
        self.set(ViewState::Idle);
    }

    /// Settle `Loading` back to `Idle` after the settle delay.
    ///
    /// The delayed transition is a no-op if any `set` happened after this call,
    /// or if the state is no longer `Loading` (an `Error` stays until dismissed).
    pub fn dismiss_after_success(&self) -> tokio::task::JoinHandle<()> {
        let scheduled_at = self.inner.current.lock().generation;
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            tokio::time::sleep(inner.settle_delay).await;

            let mut current = inner.current.lock();
            if current.generation == scheduled_at && current.value.is_loading() {
                Self::transition(&inner.tx, &mut current, ViewState::Idle);
            }
        })
    }

    /// Stream of the current value followed by every later transition.
    pub fn subscribe(&self) -> ViewStateStream {
        let current = self.inner.current.lock();
        ViewStateStream {
            pending: Some(current.value.clone()),
            rx: self.inner.tx.subscribe(),
        }
    }

    fn transition(tx: &broadcast::Sender<ViewState>, current: &mut Current, state: ViewState) {
        current.generation += 1;
        current.value = state.clone();
        // No subscribers is fine.
        let _ = tx.send(state);
    }
}

#[derive(Debug)]
pub struct ViewStateStream {
    pending: Option<ViewState>,
    rx: broadcast::Receiver<ViewState>,
}

impl ViewStateStream {
    /// Next state, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<ViewState> {
        if let Some(state) = self.pending.take() {
            return Some(state);
        }

        loop {
            match self.rx.recv().await {
                Ok(state) => return Some(state),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "view state subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
