use std::sync::Arc;

use deleter_config::shared::PipelineConfig;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info};

use crate::bail;
use crate::concurrency::shutdown::{ShutdownRx, ShutdownTx, create_shutdown_channel};
use crate::deleter_error;
use crate::error::{DeleterResult, ErrorKind};
use crate::store::DeletionStore;
use crate::types::{Batch, DeletionRequest, PipelineId, ShortCode, UserId};
use crate::workers::batcher::run_batcher;
use crate::workers::collector::{fan_in, log_results};
use crate::workers::deleter::DeleteWorkerPool;

/// Tracks which tasks the pipeline currently owns.
#[derive(Debug)]
enum PipelineState {
    NotStarted,
    Started {
        batcher: JoinHandle<()>,
        pool: DeleteWorkerPool,
        consumer: JoinHandle<()>,
    },
}

/// The asynchronous deletion pipeline.
///
/// Accepts ownership-link deletion requests from HTTP handlers, accumulates
/// them into bounded batches, fans the batches out to a fixed pool of delete
/// workers backed by a [`DeletionStore`], and consumes the merged results.
/// Requests are fire-and-forget from the caller's point of view: once
/// accepted, the caller learns nothing about the outcome.
///
/// The pipeline is constructed, started once, and torn down once via
/// [`DeletionPipeline::shutdown_and_wait`] (or [`DeletionPipeline::wait`],
/// which drains pending requests instead of discarding them).
#[derive(Debug)]
pub struct DeletionPipeline<S> {
    id: PipelineId,
    config: Arc<PipelineConfig>,
    store: S,
    requests_tx: mpsc::Sender<DeletionRequest>,
    requests_rx: Option<mpsc::Receiver<DeletionRequest>>,
    state: PipelineState,
    shutdown_tx: ShutdownTx,
    // Pristine receiver kept for `has_changed` checks; it is never consumed
    // via `changed`, so it always reflects whether shutdown ever fired.
    shutdown_rx: ShutdownRx,
}

impl<S> DeletionPipeline<S>
where
    S: DeletionStore + Clone + Send + Sync + 'static,
{
    /// Creates a new pipeline with the given configuration and store.
    ///
    /// Nothing runs until [`DeletionPipeline::start`] is called. Requests
    /// enqueued before the start are parked in the bounded request channel
    /// and picked up by the batcher once it spawns.
    pub fn new(id: PipelineId, config: Arc<PipelineConfig>, store: S) -> Self {
        let (requests_tx, requests_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

        Self {
            id,
            config,
            store,
            requests_tx,
            requests_rx: Some(requests_rx),
            state: PipelineState::NotStarted,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Starts the pipeline by spawning the batcher, the delete worker pool
    /// and the result consumer.
    ///
    /// Returns an error if the configuration is invalid, if the pipeline was
    /// already started, or if it was already shut down.
    pub fn start(&mut self) -> DeleterResult<()> {
        info!(
            pipeline_id = self.id,
            max_workers = self.config.max_workers,
            max_batch_size = self.config.batch.max_size,
            max_batch_fill_ms = self.config.batch.max_fill_ms,
            "starting deletion pipeline"
        );

        if let Err(err) = self.config.validate() {
            bail!(
                ErrorKind::ConfigError,
                "Invalid pipeline configuration",
                source: err
            );
        }

        if self.shutdown_rx.has_changed().unwrap_or(true) {
            bail!(
                ErrorKind::InvalidState,
                "The pipeline was already shut down"
            );
        }

        let Some(requests_rx) = self.requests_rx.take() else {
            bail!(ErrorKind::InvalidState, "The pipeline was already started");
        };

        let (batches_tx, batches_rx) = mpsc::channel::<Batch>(1);

        let batcher = tokio::spawn(
            run_batcher(
                requests_rx,
                batches_tx,
                self.config.batch.clone(),
                self.shutdown_tx.subscribe(),
            )
            .instrument(tracing::info_span!("batcher", pipeline_id = self.id)),
        );

        let (pool, result_rxs) = DeleteWorkerPool::spawn(
            self.store.clone(),
            batches_rx,
            self.config.max_workers,
            self.shutdown_tx.subscribe(),
        );

        let merged_results = fan_in(result_rxs, self.shutdown_tx.subscribe());
        let consumer = tokio::spawn(
            log_results(merged_results)
                .instrument(tracing::info_span!("deletion_results", pipeline_id = self.id)),
        );

        self.state = PipelineState::Started {
            batcher,
            pool,
            consumer,
        };

        Ok(())
    }

    /// Enqueues a single ownership-link deletion request.
    ///
    /// Returns `true` if the request was accepted into the pipeline and
    /// `false` if it was discarded because shutdown already fired. Blocks
    /// until the batcher accepts the request or shutdown fires.
    pub async fn enqueue(&self, user_id: UserId, short_code: impl Into<ShortCode>) -> bool {
        self.send_request(DeletionRequest::new(user_id, short_code))
            .await
    }

    /// Enqueues one deletion request per short code for the given user.
    ///
    /// Returns the number of requests accepted; stops early as soon as one
    /// request is discarded due to shutdown.
    pub async fn enqueue_many<I>(&self, user_id: UserId, short_codes: I) -> usize
    where
        I: IntoIterator,
        I::Item: Into<ShortCode>,
    {
        let mut accepted = 0;

        for short_code in short_codes {
            if !self.enqueue(user_id, short_code).await {
                break;
            }
            accepted += 1;
        }

        accepted
    }

    async fn send_request(&self, request: DeletionRequest) -> bool {
        // Fast path before blocking on a full channel.
        if self.shutdown_rx.has_changed().unwrap_or(true) {
            debug!("deletion request discarded, pipeline is shutting down");
            return false;
        }

        let mut shutdown_rx = self.shutdown_rx.clone();
        tokio::select! {
            _ = shutdown_rx.changed() => {
                debug!("deletion request discarded, shutdown fired while enqueueing");
                false
            }
            sent = self.requests_tx.send(request) => sent.is_ok(),
        }
    }

    /// Broadcasts the shutdown signal to all pipeline stages.
    ///
    /// Returns immediately; use [`DeletionPipeline::wait`] to await task
    /// completion. Idempotent.
    pub fn shutdown(&self) {
        info!(pipeline_id = self.id, "shutting down deletion pipeline");

        if self.shutdown_tx.shutdown().is_err() {
            error!("failed to send shutdown signal, no pipeline stage is listening");
        }
    }

    /// Waits for all pipeline tasks to complete.
    ///
    /// When called without a prior [`DeletionPipeline::shutdown`], dropping
    /// the request sender closes the request channel, the batcher flushes
    /// its final partial batch and stops, the workers drain the batch
    /// channel, and the result consumer finishes when the last worker does.
    /// After a shutdown the stages stop at their next signal check instead.
    pub async fn wait(self) -> DeleterResult<()> {
        // The signal sender must outlive the stages: dropping it would make
        // their `changed` calls resolve with an error, which reads as
        // shutdown and would discard pending work.
        let Self {
            id,
            state,
            requests_tx,
            shutdown_tx: _shutdown_tx,
            ..
        } = self;

        let PipelineState::Started {
            batcher,
            pool,
            consumer,
        } = state
        else {
            bail!(ErrorKind::InvalidState, "The pipeline was never started");
        };

        drop(requests_tx);

        let mut errors = Vec::new();

        if let Err(join_err) = batcher.await {
            if join_err.is_cancelled() {
                debug!("batcher task was cancelled");
            } else {
                errors.push(deleter_error!(
                    ErrorKind::BatcherPanic,
                    "Batcher panicked",
                    source: join_err
                ));
            }
        }

        if let Err(err) = pool.wait_all().await {
            error!(
                pipeline_id = id,
                failures = err.kinds().len(),
                "delete workers finished with failures"
            );
            errors.push(err);
        }

        if let Err(join_err) = consumer.await {
            if join_err.is_cancelled() {
                debug!("result consumer task was cancelled");
            } else {
                errors.push(deleter_error!(
                    ErrorKind::ResultConsumerPanic,
                    "Result consumer panicked",
                    source: join_err
                ));
            }
        }

        info!(pipeline_id = id, "deletion pipeline stopped");

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }

    /// Fires the shutdown signal and waits for all tasks to complete.
    pub async fn shutdown_and_wait(self) -> DeleterResult<()> {
        self.shutdown();
        self.wait().await
    }

    /// Identifier of this pipeline instance.
    pub fn id(&self) -> PipelineId {
        self.id
    }

    /// Handle to the pipeline's shutdown signal, for wiring into process
    /// signal handling.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }
}
