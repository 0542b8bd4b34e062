// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batching publisher that feeds input lines to an [`EventSink`].
//!
//! Lines are buffered in arrival order and handed to the sink in one call when either:
//!
//! - the buffer reaches `max_batch_size` (flushed before the next line is read), or
//! - `flush_interval` elapses since the first line landed in an empty buffer, or
//! - input ends or the run is cancelled (one final flush of whatever is left).
//!
//! ```text
//!   input ──lines──> ┌──────────────┐   full / timer / end   ┌──────────┐
//!                    │ Mutex<State> │ ─────────────────────> │ EventSink│
//!   timer task ────> └──────────────┘   (lock held for call) └──────────┘
//! ```
//!
//! The buffer and every sink call share one async mutex, so the timer task and the input
//! loop never flush concurrently. Any flush failure ends the run without a final flush.
//! A failed read still flushes what was accepted before reporting the read error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{oneshot, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, trace};

use crate::config::PublisherConfig;
use crate::error::PublisherError;
use crate::sink::EventSink;

#[derive(Debug, Default)]
struct State {
    buffer: Vec<String>,
}

pub struct Publisher {
    config: PublisherConfig,
    sink: Arc<dyn EventSink>,
    state: Arc<Mutex<State>>,
    running: AtomicBool,
}

/// Clears the running flag when a run ends, including when its future is dropped.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Publisher {
    pub fn new(config: PublisherConfig, sink: Arc<dyn EventSink>) -> Self {
        Publisher {
            config,
            sink,
            state: Arc::new(Mutex::new(State::default())),
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Publishes every non-blank line of `input`, returning once input is exhausted (or
    /// `cancel` fires) and the final flush has succeeded.
    ///
    /// Only one run may be active per publisher; a concurrent call fails with
    /// [`PublisherError::AlreadyRunning`] without touching the active run. Dropping the
    /// returned future ends the run and stops its flush timer. Lines it had buffered are
    /// kept for the next run.
    pub async fn run<R>(&self, input: R, cancel: CancellationToken) -> Result<(), PublisherError>
    where
        R: AsyncBufRead + Unpin,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PublisherError::AlreadyRunning);
        }
        let _running = RunningGuard(&self.running);
        debug!(
            "Publisher started: max_batch_size={} flush_interval={:?}",
            self.config.max_batch_size, self.config.flush_interval
        );

        self.run_until_done(input, cancel).await
    }

    async fn run_until_done<R>(&self, input: R, cancel: CancellationToken) -> Result<(), PublisherError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut timer = self.start_timer();
        let consumed = self.consume(input, &cancel, &mut timer).await;
        let timer_failure = match timer {
            Some(timer) => timer.stop().await,
            None => None,
        };
        let read_error = match consumed {
            Ok(()) => None,
            Err(PublisherError::InputRead(e)) => Some(e),
            Err(err) => return Err(err),
        };
        if let Some(err) = timer_failure {
            return Err(err);
        }
        self.flush().await?;
        match read_error {
            Some(e) => Err(PublisherError::InputRead(e)),
            None => Ok(()),
        }
    }

    async fn consume<R>(
        &self,
        input: R,
        cancel: &CancellationToken,
        timer: &mut Option<FlushTimer>,
    ) -> Result<(), PublisherError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Publisher cancelled, flushing remaining events");
                    return Ok(());
                }
                err = timer_failure(timer) => {
                    debug!("Interval flush failed, stopping: {err}");
                    return Err(err);
                }
                line = lines.next_line() => line?,
            };
            let Some(line) = next else {
                trace!("End of input");
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }
            self.add_event(line, timer.as_ref()).await?;
        }
    }

    async fn add_event(&self, line: String, timer: Option<&FlushTimer>) -> Result<(), PublisherError> {
        let mut state = self.state.lock().await;
        state.buffer.push(line);
        if state.buffer.len() == 1 {
            if let Some(timer) = timer {
                timer.rearm.notify_one();
            }
        }
        if state.buffer.len() < self.config.max_batch_size {
            return Ok(());
        }
        flush_locked(self.sink.as_ref(), &mut state).await
    }

    /// Hands everything buffered to the sink. Does nothing when the buffer is empty.
    pub async fn flush(&self) -> Result<(), PublisherError> {
        let mut state = self.state.lock().await;
        flush_locked(self.sink.as_ref(), &mut state).await
    }

    fn start_timer(&self) -> Option<FlushTimer> {
        let period = self.config.flush_interval;
        if period.is_zero() {
            return None;
        }

        let rearm = Arc::new(Notify::new());
        let stop = CancellationToken::new();
        let (failed_tx, failed) = oneshot::channel();

        let sink = Arc::clone(&self.sink);
        let state = Arc::clone(&self.state);
        let task_rearm = Arc::clone(&rearm);
        let task_stop = stop.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = task_stop.cancelled() => return,
                    () = task_rearm.notified() => ticker.reset(),
                    _ = ticker.tick() => {
                        let mut state = state.lock().await;
                        if let Err(err) = flush_locked(sink.as_ref(), &mut state).await {
                            let _ = failed_tx.send(err);
                            return;
                        }
                    }
                }
            }
        });

        Some(FlushTimer {
            rearm,
            _stop_on_drop: stop.clone().drop_guard(),
            stop,
            failed,
            handle,
        })
    }
}

/// Background task flushing partial batches every `flush_interval`.
struct FlushTimer {
    rearm: Arc<Notify>,
    stop: CancellationToken,
    _stop_on_drop: DropGuard,
    failed: oneshot::Receiver<PublisherError>,
    handle: JoinHandle<()>,
}

impl FlushTimer {
    /// Stops the task and returns the failure it reported, if any.
    async fn stop(mut self) -> Option<PublisherError> {
        self.stop.cancel();
        if let Err(e) = self.handle.await {
            error!("Flush timer task failed: {e}");
        }
        self.failed.try_recv().ok()
    }
}

// Resolves once the timer reports a failed flush, never otherwise.
async fn timer_failure(timer: &mut Option<FlushTimer>) -> PublisherError {
    if let Some(timer) = timer {
        if let Ok(err) = (&mut timer.failed).await {
            return err;
        }
    }
    std::future::pending().await
}

async fn flush_locked(sink: &dyn EventSink, state: &mut State) -> Result<(), PublisherError> {
    if state.buffer.is_empty() {
        trace!("Nothing to flush");
        return Ok(());
    }
    let lines = state.buffer.len();
    debug!("Flushing {lines} events");
    sink.flush_events(&state.buffer)
        .await
        .map_err(|source| PublisherError::Sink { lines, source })?;
    state.buffer.clear();
    Ok(())
}
