use deleter_config::shared::BatchConfig;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};
use crate::concurrency::stream::BatchStream;
use crate::types::{Batch, DeletionRequest};

/// Runs the single-threaded batching stage.
///
/// Accumulates incoming requests into bounded batches via [`BatchStream`]
/// and hands each batch to one free worker over the bounded batch channel.
/// Both the accumulation and the hand-off race the shutdown signal: a batch
/// that is ready at the exact moment shutdown fires is dropped, and a
/// partially filled batch is never force-flushed at shutdown. When the
/// request channel closes instead (sender dropped), the final partial batch
/// is flushed before the stage stops.
pub(crate) async fn run_batcher(
    mut requests: mpsc::Receiver<DeletionRequest>,
    batches: mpsc::Sender<Batch>,
    batch_config: BatchConfig,
    mut shutdown_rx: ShutdownRx,
) {
    let request_stream = futures::stream::poll_fn(move |cx| requests.poll_recv(cx));
    let mut batch_stream = Box::pin(BatchStream::wrap(
        request_stream,
        batch_config,
        shutdown_rx.clone(),
    ));

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                debug!("batcher received shutdown signal");
                break;
            }
            next = batch_stream.next() => match next {
                Some(ShutdownResult::Ok(batch)) => {
                    let batch_len = batch.len();
                    // Blocking hand-off to a worker, gated by shutdown.
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            debug!(
                                discarded = batch_len,
                                "batch dropped at hand-off, shutdown fired"
                            );
                            break;
                        }
                        sent = batches.send(batch) => {
                            if sent.is_err() {
                                debug!("batch channel closed, stopping batcher");
                                break;
                            }
                        }
                    }
                }
                Some(ShutdownResult::Shutdown(pending)) => {
                    if !pending.is_empty() {
                        debug!(
                            discarded = pending.len(),
                            "discarding partially filled batch at shutdown"
                        );
                    }
                    break;
                }
                None => {
                    debug!("request stream ended, stopping batcher");
                    break;
                }
            },
        }
    }
}
