use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};

use crate::deleter_error;
use crate::error::{DeleterResult, ErrorKind};
use crate::store::DeletionStore;
use crate::types::{Batch, DeletionRequest};

#[derive(Debug, Default)]
struct State {
    batches: Vec<Batch>,
    in_flight: usize,
    max_in_flight: usize,
    fail_next: usize,
    failures: usize,
    delay: Option<Duration>,
    waiters: Vec<(usize, Arc<Notify>)>,
}

/// A [`DeletionStore`] wrapper that records every call made to it.
///
/// Tracks completed batches, the peak number of concurrent store calls, and
/// can inject failures or latency. Used by pipeline tests to observe
/// behavior that is otherwise invisible from the fire-and-forget API.
#[derive(Debug, Clone)]
pub struct ObservableStore<S> {
    wrapped: S,
    state: Arc<Mutex<State>>,
}

impl<S> ObservableStore<S> {
    /// Wraps the given store.
    pub fn wrap(wrapped: S) -> Self {
        Self {
            wrapped,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// All batches whose store call has completed, in completion order.
    pub async fn batches(&self) -> Vec<Batch> {
        self.state.lock().await.batches.clone()
    }

    /// Peak number of store calls that were in flight at the same time.
    pub async fn max_in_flight(&self) -> usize {
        self.state.lock().await.max_in_flight
    }

    /// Number of store calls that failed, injected or otherwise.
    pub async fn failures(&self) -> usize {
        self.state.lock().await.failures
    }

    /// Makes the next `calls` store calls fail without reaching the wrapped
    /// store.
    pub async fn fail_next(&self, calls: usize) {
        self.state.lock().await.fail_next = calls;
    }

    /// Adds an artificial delay to every store call.
    pub async fn set_delay(&self, delay: Duration) {
        self.state.lock().await.delay = Some(delay);
    }

    /// Returns a [`Notify`] that fires once `batches` store calls have
    /// completed.
    pub async fn notify_on_batches(&self, batches: usize) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());

        let mut state = self.state.lock().await;
        if state.batches.len() >= batches {
            notify.notify_one();
        } else {
            state.waiters.push((batches, Arc::clone(&notify)));
        }

        notify
    }
}

impl<S> DeletionStore for ObservableStore<S>
where
    S: DeletionStore + Send + Sync,
{
    fn name() -> &'static str {
        "observable"
    }

    async fn delete_ownership(&self, batch: &[DeletionRequest]) -> DeleterResult<u64> {
        let (fail, delay) = {
            let mut state = self.state.lock().await;
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);

            let fail = if state.fail_next > 0 {
                state.fail_next -= 1;
                true
            } else {
                false
            };

            (fail, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = if fail {
            Err(deleter_error!(
                ErrorKind::StoreQueryFailed,
                "Injected store failure"
            ))
        } else {
            self.wrapped.delete_ownership(batch).await
        };

        let mut state = self.state.lock().await;
        state.in_flight -= 1;
        if result.is_err() {
            state.failures += 1;
        }
        state.batches.push(batch.to_vec());

        let completed = state.batches.len();
        state.waiters.retain(|(target, notify)| {
            if completed >= *target {
                notify.notify_one();
                false
            } else {
                true
            }
        });

        result
    }
}
