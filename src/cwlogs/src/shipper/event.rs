use chrono::Utc;
use cwlogs_aws::AwsRegion;

/// One log record waiting to be shipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub message: String,
}

impl LogEvent {
    pub fn new(timestamp: i64, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }

    pub fn now(message: impl Into<String>) -> Self {
        Self::new(Utc::now().timestamp_millis(), message)
    }
}

/// Where the events end up. Fixed for the lifetime of a shipper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub group_name: String,
    pub stream_name: String,
    pub region: Option<AwsRegion>,
}

impl Destination {
    pub fn new(group_name: impl Into<String>, stream_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            stream_name: stream_name.into(),
            region: None,
        }
    }

    pub fn with_region(mut self, region: Option<AwsRegion>) -> Self {
        self.region = region;
        self
    }
}

/// Per-destination delivery bookkeeping, only touched while holding the flush lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryState {
    pub sequence_token: Option<String>,
    pub last_accepted_timestamp: Option<i64>,
}
