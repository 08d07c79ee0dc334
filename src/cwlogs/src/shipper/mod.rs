//! The batching and delivery engine.
//!
//! Producers push [`LogEvent`]s through a [`ShipperHandle`] without ever
//! blocking. A ticker task flushes the queue every period; [`LogShipper::shutdown`]
//! stops the ticker and runs one last flush.
//!
//! ```rust,no_run
//! # use cwlogs::cloud_providers::logs::CloudWatchLogs;
//! # use cwlogs::{ConfigLoader, ConfigParams, LogShipper, ShipperOptions};
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = ConfigLoader::load(&ConfigParams::default())?;
//! let api = CloudWatchLogs::from_config(&config).await?;
//! let shipper = LogShipper::start(api, config.destination().await, ShipperOptions::from(&config)).await?;
//!
//! shipper.handle().submit_now("hello");
//! shipper.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod delivery;
mod event;
mod flusher;
mod normalizer;
mod provisioner;
mod queue;

pub use delivery::{DeliveryClient, DeliveryOutcome, TokenMismatch};
pub use event::{DeliveryState, Destination, LogEvent};
pub use flusher::{FlushReport, LogFlusher};
pub use normalizer::normalize;
pub use provisioner::{ensure_ready, ProvisionError};
pub use queue::EventQueue;

use crate::cloud_providers::logs::LogsApi;
use crate::config::ShipperConfig;
use crate::constants::{DRAIN_LIMIT, FLUSH_PERIOD_SECS, QUEUE_CAPACITY, SHUTDOWN_TIMEOUT_SECS};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipperOptions {
    pub flush_period: Duration,
    pub drain_limit: usize,
    pub queue_capacity: usize,
    pub shutdown_timeout: Duration,
}

impl Default for ShipperOptions {
    fn default() -> Self {
        Self {
            flush_period: Duration::from_secs(FLUSH_PERIOD_SECS),
            drain_limit: DRAIN_LIMIT,
            queue_capacity: QUEUE_CAPACITY,
            shutdown_timeout: Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        }
    }
}

impl From<&ShipperConfig> for ShipperOptions {
    fn from(config: &ShipperConfig) -> Self {
        Self {
            flush_period: Duration::from_secs(config.flush_period_secs),
            drain_limit: config.drain_limit,
            queue_capacity: config.queue_capacity,
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        }
    }
}

/// Cheap, cloneable producer side of a shipper.
#[derive(Clone)]
pub struct ShipperHandle {
    queue: Arc<EventQueue>,
}

impl ShipperHandle {
    pub(crate) fn new(queue: Arc<EventQueue>) -> Self {
        Self { queue }
    }

    /// Queues a record. Silently dropped when the queue is full.
    pub fn submit(&self, timestamp_millis: i64, message: impl Into<String>) {
        self.queue.try_push(LogEvent::new(timestamp_millis, message));
    }

    pub fn submit_now(&self, message: impl Into<String>) {
        self.queue.try_push(LogEvent::now(message));
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// A running shipper: provisioned destination, flush ticker and producer queue.
pub struct LogShipper<A: LogsApi> {
    flusher: Arc<LogFlusher<A>>,
    handle: ShipperHandle,
    destination: Destination,
    cancellation_token: CancellationToken,
    ticker: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl<A: LogsApi> LogShipper<A> {
    /// Provisions the destination, then starts the periodic flush.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(
        api: A,
        destination: Destination,
        options: ShipperOptions,
    ) -> Result<Self, ProvisionError> {
        let initial_token =
            ensure_ready(&api, &destination.group_name, &destination.stream_name).await?;

        info!(
            "Shipping logs to {}/{} every {:?}",
            destination.group_name, destination.stream_name, options.flush_period
        );

        let queue = Arc::new(EventQueue::new(options.queue_capacity));
        let delivery = DeliveryClient::new(Arc::new(api), destination.clone());
        let flusher = Arc::new(LogFlusher::new(
            Arc::clone(&queue),
            delivery,
            initial_token,
            options.drain_limit,
        ));

        let cancellation_token = CancellationToken::new();
        let ticker = spawn_ticker(
            Arc::clone(&flusher),
            options.flush_period,
            cancellation_token.clone(),
        );

        Ok(Self {
            flusher,
            handle: ShipperHandle::new(queue),
            destination,
            cancellation_token,
            ticker: Some(ticker),
            shutdown_timeout: options.shutdown_timeout,
        })
    }

    pub fn handle(&self) -> ShipperHandle {
        self.handle.clone()
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn flusher(&self) -> &Arc<LogFlusher<A>> {
        &self.flusher
    }

    /// Flushes right away, waiting for a scheduled flush that is already running.
    pub async fn flush_now(&self) -> FlushReport {
        let report = self.flusher.flush().await;
        report.log();
        report
    }

    /// Stops the ticker, then drains whatever is left in one final flush.
    ///
    /// Waiting for a scheduled flush that is still delivering and the final
    /// flush share `shutdown_timeout`; on expiry the ticker task is aborted.
    pub async fn shutdown(mut self) -> anyhow::Result<FlushReport> {
        self.cancellation_token.cancel();

        let mut ticker = self.ticker.take();
        let flusher = Arc::clone(&self.flusher);
        let drain = async {
            if let Some(ticker) = ticker.as_mut() {
                if let Err(err) = ticker.await {
                    warn!("Flush ticker ended abnormally: {}", err);
                }
            }
            flusher.flush().await
        };

        let result = tokio::time::timeout(self.shutdown_timeout, drain).await;
        if let Some(ticker) = &ticker {
            ticker.abort();
        }

        let report = result.with_context(|| {
            format!(
                "Final flush did not finish within {:?}",
                self.shutdown_timeout
            )
        })?;

        report.log();
        info!(
            "Log shipper for {}/{} stopped",
            self.destination.group_name, self.destination.stream_name
        );
        Ok(report)
    }
}

impl<A: LogsApi> Drop for LogShipper<A> {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

fn spawn_ticker<A: LogsApi>(
    flusher: Arc<LogFlusher<A>>,
    period: Duration,
    cancellation_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = cancellation_token.cancelled() => {
                    debug!("Flush ticker cancelled");
                    break;
                }

                _ = interval.tick() => {
                    if let Some(report) = flusher.try_flush().await {
                        report.log();
                    }
                }
            }
        }
    })
}
