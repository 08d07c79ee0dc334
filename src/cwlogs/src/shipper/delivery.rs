use super::event::{Destination, LogEvent};
use crate::cloud_providers::logs::{LogsApi, LogsError};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenMismatch {
    /// The service already stored this batch; only our token is behind
    AlreadyAccepted,
    /// Our token drifted from the one the stream expects
    InvalidToken,
}

/// What happened to one write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Accepted {
        next_token: Option<String>,
    },
    TokenMismatch {
        kind: TokenMismatch,
        expected_token: Option<String>,
    },
    Failed(LogsError),
}

impl From<Result<Option<String>, LogsError>> for DeliveryOutcome {
    fn from(result: Result<Option<String>, LogsError>) -> Self {
        match result {
            Ok(next_token) => DeliveryOutcome::Accepted { next_token },
            Err(LogsError::DataAlreadyAccepted { expected_token }) => {
                DeliveryOutcome::TokenMismatch {
                    kind: TokenMismatch::AlreadyAccepted,
                    expected_token,
                }
            }
            Err(LogsError::InvalidSequenceToken { expected_token }) => {
                DeliveryOutcome::TokenMismatch {
                    kind: TokenMismatch::InvalidToken,
                    expected_token,
                }
            }
            Err(err) => DeliveryOutcome::Failed(err),
        }
    }
}

/// Sends batches to one destination.
pub struct DeliveryClient<A> {
    api: Arc<A>,
    destination: Destination,
}

impl<A: LogsApi> DeliveryClient<A> {
    pub fn new(api: Arc<A>, destination: Destination) -> Self {
        Self { api, destination }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub async fn deliver(&self, batch: &[LogEvent], token: Option<&str>) -> DeliveryOutcome {
        let start_time = Instant::now();

        let result = self
            .api
            .put_log_events(
                &self.destination.group_name,
                &self.destination.stream_name,
                batch,
                token,
            )
            .await;

        debug!(
            "PutLogEvents with {} events to {}/{} finished in {:?}",
            batch.len(),
            self.destination.group_name,
            self.destination.stream_name,
            start_time.elapsed()
        );

        result.into()
    }
}
