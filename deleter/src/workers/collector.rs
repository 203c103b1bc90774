use tokio::sync::mpsc;
use tracing::{Instrument, debug, error};

use crate::concurrency::shutdown::ShutdownRx;
use crate::types::DeletionResult;

/// Merges the per-worker result streams into a single stream.
///
/// One forwarding task per worker copies results into the shared sender,
/// racing each forward against shutdown (a result ready at the exact moment
/// shutdown fires may be dropped). Every forwarder owns a clone of the
/// merged sender, so the merged stream closes exactly when the last
/// forwarder finishes; no result can ever be sent after close.
///
/// There is no ordering guarantee across workers; within one worker,
/// results arrive in the order its batches were processed.
pub(crate) fn fan_in(
    result_rxs: Vec<mpsc::Receiver<DeletionResult>>,
    shutdown_rx: ShutdownRx,
) -> mpsc::Receiver<DeletionResult> {
    let (merged_tx, merged_rx) = mpsc::channel(1);

    for (worker_id, mut results) in result_rxs.into_iter().enumerate() {
        let merged_tx = merged_tx.clone();
        let mut shutdown_rx = shutdown_rx.clone();

        let span = tracing::debug_span!("result_forwarder", worker_id);
        tokio::spawn(
            async move {
                while let Some(result) = results.recv().await {
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            debug!("result dropped at forward, shutdown fired");
                            return;
                        }
                        sent = merged_tx.send(result) => {
                            if sent.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
            .instrument(span),
        );
    }

    merged_rx
}

/// Consumes the merged result stream, logging each outcome.
///
/// Store failures are observability events only: they are logged and the
/// pipeline keeps accepting and processing batches.
pub(crate) async fn log_results(mut results: mpsc::Receiver<DeletionResult>) {
    while let Some(result) = results.recv().await {
        match &result.error {
            Some(err) => error!(error = %err, "failed to process deletions"),
            None => debug!(count = result.affected, "deletions saved"),
        }
    }

    debug!("result stream closed");
}
