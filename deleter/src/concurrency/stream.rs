use core::pin::Pin;
use core::task::{Context, Poll};
use std::mem;
use std::time::Duration;

use deleter_config::shared::BatchConfig;
use futures::{Stream, ready};
use pin_project_lite::pin_project;

use crate::concurrency::shutdown::{ShutdownResult, ShutdownRx};

pin_project! {
    /// A stream adapter that groups incoming items into bounded batches.
    ///
    /// A batch is emitted when either:
    /// - it reaches its maximum size, or
    /// - the flush deadline elapses while the batch is non-empty.
    ///
    /// The deadline is armed when the first item of a batch arrives and
    /// cleared on every emission, so a size-triggered flush also restarts
    /// the idle clock. Empty batches are never emitted.
    ///
    /// The shutdown signal is checked on every poll and wins over every
    /// other condition: the stream stops permanently and hands back the
    /// partially filled batch as [`ShutdownResult::Shutdown`] for the caller
    /// to drop. Because the check does not register a waker, drivers must
    /// also select on [`ShutdownRx::changed`] to guarantee a wake-up when
    /// shutdown fires while no item or deadline is pending.
    #[must_use = "streams do nothing unless polled"]
    #[derive(Debug)]
    pub struct BatchStream<B, S: Stream<Item = B>> {
        #[pin]
        stream: S,
        #[pin]
        deadline: Option<tokio::time::Sleep>,
        shutdown_rx: ShutdownRx,
        items: Vec<S::Item>,
        batch_config: BatchConfig,
        inner_stream_ended: bool,
        stream_stopped: bool,
    }
}

impl<B, S: Stream<Item = B>> BatchStream<B, S> {
    /// Creates a new [`BatchStream`] wrapping `stream`.
    pub fn wrap(stream: S, batch_config: BatchConfig, shutdown_rx: ShutdownRx) -> Self {
        BatchStream {
            stream,
            deadline: None,
            shutdown_rx,
            items: Vec::with_capacity(batch_config.max_size),
            batch_config,
            inner_stream_ended: false,
            stream_stopped: false,
        }
    }
}

impl<B, S: Stream<Item = B>> Stream for BatchStream<B, S> {
    type Item = ShutdownResult<Vec<S::Item>, Vec<S::Item>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.as_mut().project();

        if *this.inner_stream_ended {
            return Poll::Ready(None);
        }

        loop {
            if *this.stream_stopped {
                return Poll::Ready(None);
            }

            // Shutdown takes priority over all other conditions. The partial
            // batch is surfaced, not flushed downstream; the caller decides
            // its fate.
            if this.shutdown_rx.has_changed().unwrap_or(false) {
                *this.stream_stopped = true;
                this.shutdown_rx.mark_unchanged();

                return Poll::Ready(Some(ShutdownResult::Shutdown(mem::take(this.items))));
            }

            match this.stream.as_mut().poll_next(cx) {
                Poll::Pending => {
                    // No more items available right now; fall through to the
                    // deadline check below.
                    break;
                }
                Poll::Ready(Some(item)) => {
                    if this.items.is_empty() {
                        this.items.reserve_exact(this.batch_config.max_size);
                    }

                    this.items.push(item);

                    if this.items.len() >= this.batch_config.max_size {
                        // Size-triggered flush. Clearing the deadline also
                        // restarts the idle clock for the next batch, so a
                        // nearly-empty batch is not flushed right after a
                        // full one.
                        this.deadline.set(None);

                        return Poll::Ready(Some(ShutdownResult::Ok(mem::take(this.items))));
                    }

                    // The first item of a batch arms the flush deadline.
                    if this.items.len() == 1 {
                        this.deadline.set(Some(tokio::time::sleep(Duration::from_millis(
                            this.batch_config.max_fill_ms,
                        ))));
                    }
                }
                Poll::Ready(None) => {
                    // The request stream ended; flush whatever is left.
                    *this.inner_stream_ended = true;

                    let last = if this.items.is_empty() {
                        None
                    } else {
                        this.deadline.set(None);

                        Some(ShutdownResult::Ok(mem::take(this.items)))
                    };

                    return Poll::Ready(last);
                }
            }
        }

        // Deadline-triggered flush. The deadline is only armed while a batch
        // is open, so no empty batch can ever flush from here.
        if !this.items.is_empty()
            && let Some(deadline) = this.deadline.as_mut().as_pin_mut()
        {
            ready!(deadline.poll(cx));

            this.deadline.set(None);

            return Poll::Ready(Some(ShutdownResult::Ok(mem::take(this.items))));
        }

        Poll::Pending
    }
}
