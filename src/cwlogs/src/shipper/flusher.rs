use super::delivery::{DeliveryClient, DeliveryOutcome, TokenMismatch};
use super::event::{DeliveryState, LogEvent};
use super::normalizer::normalize;
use super::queue::EventQueue;
use crate::cloud_providers::logs::LogsApi;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Counters for one flush invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Slices drained from the queue
    pub batches: usize,
    /// Events the service holds after this flush
    pub delivered: usize,
    /// Events given up on
    pub dropped: usize,
    /// Token corrections adopted from the service
    pub recovered_tokens: usize,
    /// Events refused by a full queue since the previous flush
    pub queue_overflow: u64,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.batches == 0 && self.queue_overflow == 0
    }

    pub fn log(&self) {
        if self.is_empty() {
            return;
        }
        info!(
            "Flushed {} batches: {} events delivered, {} dropped, {} token recoveries",
            self.batches, self.delivered, self.dropped, self.recovered_tokens
        );
        if self.queue_overflow > 0 {
            warn!(
                "Queue was full, {} log events were discarded",
                self.queue_overflow
            );
        }
    }
}

/// Drains the queue into the service, one bounded slice at a time.
///
/// Only one flush runs at a time; the sequence token and the last accepted
/// timestamp live behind the same lock.
pub struct LogFlusher<A> {
    queue: Arc<EventQueue>,
    delivery: DeliveryClient<A>,
    state: Mutex<DeliveryState>,
    drain_limit: usize,
}

impl<A: LogsApi> LogFlusher<A> {
    pub fn new(
        queue: Arc<EventQueue>,
        delivery: DeliveryClient<A>,
        initial_token: Option<String>,
        drain_limit: usize,
    ) -> Self {
        Self {
            queue,
            delivery,
            state: Mutex::new(DeliveryState {
                sequence_token: initial_token,
                last_accepted_timestamp: None,
            }),
            drain_limit: drain_limit.max(1),
        }
    }

    /// Flushes, waiting for a running flush to finish first.
    pub async fn flush(&self) -> FlushReport {
        let mut state = self.state.lock().await;
        self.flush_locked(&mut state).await
    }

    /// Flushes unless another flush is already running, in which case this is a no-op.
    pub async fn try_flush(&self) -> Option<FlushReport> {
        let Ok(mut state) = self.state.try_lock() else {
            debug!("Flush already in progress, skipping");
            return None;
        };
        Some(self.flush_locked(&mut state).await)
    }

    pub async fn delivery_state(&self) -> DeliveryState {
        self.state.lock().await.clone()
    }

    async fn flush_locked(&self, state: &mut DeliveryState) -> FlushReport {
        let mut report = FlushReport {
            queue_overflow: self.queue.take_dropped(),
            ..FlushReport::default()
        };

        loop {
            let mut batch = self.queue.drain(self.drain_limit).await;
            let drained = batch.len();
            if drained == 0 {
                break;
            }
            report.batches += 1;

            let newest = normalize(&mut batch, state.last_accepted_timestamp);
            self.deliver_batch(&batch, newest, state, &mut report).await;

            if drained < self.drain_limit {
                break;
            }
        }

        report
    }

    // An invalid token gets exactly one resend with the corrected token.
    async fn deliver_batch(
        &self,
        batch: &[LogEvent],
        newest: Option<i64>,
        state: &mut DeliveryState,
        report: &mut FlushReport,
    ) {
        let mut resent = false;

        loop {
            let outcome = self
                .delivery
                .deliver(batch, state.sequence_token.as_deref())
                .await;

            match outcome {
                DeliveryOutcome::Accepted { next_token } => {
                    state.sequence_token = next_token;
                    state.last_accepted_timestamp = newest;
                    report.delivered += batch.len();
                    return;
                }
                DeliveryOutcome::TokenMismatch {
                    kind: TokenMismatch::AlreadyAccepted,
                    expected_token,
                } => {
                    warn!(
                        "Batch was already accepted, resetting sequence token to {:?}",
                        expected_token
                    );
                    state.sequence_token = expected_token;
                    state.last_accepted_timestamp = newest;
                    report.recovered_tokens += 1;
                    report.delivered += batch.len();
                    return;
                }
                DeliveryOutcome::TokenMismatch {
                    kind: TokenMismatch::InvalidToken,
                    expected_token,
                } => {
                    warn!(
                        "Invalid sequence token {:?}, resetting to the expected {:?}",
                        state.sequence_token, expected_token
                    );
                    state.sequence_token = expected_token;
                    report.recovered_tokens += 1;

                    if resent {
                        error!(
                            "Sequence token rejected again, dropping {} log events",
                            batch.len()
                        );
                        report.dropped += batch.len();
                        return;
                    }
                    resent = true;
                }
                DeliveryOutcome::Failed(err) => {
                    error!("Error writing {} log events: {}", batch.len(), err);
                    report.dropped += batch.len();
                    return;
                }
            }
        }
    }
}
