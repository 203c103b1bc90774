use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{Instrument, debug};

use crate::concurrency::shutdown::ShutdownRx;
use crate::deleter_error;
use crate::error::{DeleterResult, ErrorKind};
use crate::store::DeletionStore;
use crate::types::{Batch, DeletionResult};

/// Owns the delete worker tasks spawned for a pipeline.
///
/// The pool applies the configured concurrency to batch delivery: each
/// worker pulls whole batches off the shared channel, so a single batch is
/// never processed by more than one worker, and at most `max_workers` store
/// calls are in flight at any instant.
#[derive(Debug)]
pub(crate) struct DeleteWorkerPool {
    join_set: JoinSet<()>,
}

impl DeleteWorkerPool {
    /// Spawns `max_workers` workers competing for batches on the shared
    /// channel and returns the pool plus one result stream per worker.
    pub(crate) fn spawn<S>(
        store: S,
        batches: mpsc::Receiver<Batch>,
        max_workers: u16,
        shutdown_rx: ShutdownRx,
    ) -> (Self, Vec<mpsc::Receiver<DeletionResult>>)
    where
        S: DeletionStore + Clone + Send + Sync + 'static,
    {
        let batches = Arc::new(Mutex::new(batches));
        let mut join_set = JoinSet::new();
        let mut result_rxs = Vec::with_capacity(usize::from(max_workers));

        for worker_id in 0..max_workers {
            let (results_tx, results_rx) = mpsc::channel(1);
            result_rxs.push(results_rx);

            let worker = DeleteWorker {
                store: store.clone(),
                batches: Arc::clone(&batches),
                results: results_tx,
                shutdown_rx: shutdown_rx.clone(),
            };

            let span = tracing::info_span!("delete_worker", worker_id, store = S::name());
            join_set.spawn(worker.run().instrument(span));
        }

        (Self { join_set }, result_rxs)
    }

    /// Waits for all delete workers to finish.
    ///
    /// Worker tasks carry no return value (store failures travel inside
    /// [`DeletionResult`]); only panics surface here, aggregated into one
    /// error.
    pub(crate) async fn wait_all(mut self) -> DeleterResult<()> {
        let mut errors = Vec::new();

        while let Some(result) = self.join_set.join_next().await {
            if let Err(join_err) = result {
                if join_err.is_cancelled() {
                    debug!("delete worker task was cancelled");
                } else {
                    errors.push(deleter_error!(
                        ErrorKind::DeleteWorkerPanic,
                        "Delete worker panicked",
                        source: join_err
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}

/// A single delete worker: pulls batches, calls the store, reports results.
struct DeleteWorker<S> {
    store: S,
    batches: Arc<Mutex<mpsc::Receiver<Batch>>>,
    results: mpsc::Sender<DeletionResult>,
    shutdown_rx: ShutdownRx,
}

impl<S> DeleteWorker<S>
where
    S: DeletionStore + Send + Sync + 'static,
{
    async fn run(mut self) {
        loop {
            // The receiver lock is held only across `recv`, which is what
            // guarantees each batch is delivered to exactly one worker while
            // store calls from different workers proceed concurrently.
            let batch = {
                let mut batches = self.batches.lock().await;
                batches.recv().await
            };
            let Some(batch) = batch else {
                debug!("batch channel drained and closed, stopping worker");
                break;
            };

            // A batch in hand is processed to completion even if shutdown
            // fires mid-call; only the result hand-off below races shutdown.
            let result = match self.store.delete_ownership(&batch).await {
                Ok(affected) => DeletionResult::ok(affected),
                Err(err) => DeletionResult::failed(err),
            };

            tokio::select! {
                _ = self.shutdown_rx.changed() => {
                    debug!("result dropped at hand-off, shutdown fired");
                    break;
                }
                sent = self.results.send(result) => {
                    if sent.is_err() {
                        debug!("result channel closed, stopping worker");
                        break;
                    }
                }
            }
        }
    }
}
