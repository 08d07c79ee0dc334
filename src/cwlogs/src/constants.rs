pub const DEFAULT_LOG_GROUP_NAME: &str = "default";
pub const FLUSH_PERIOD_SECS: u64 = 10;
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// 1MB of 4K messages, estimated
pub const DRAIN_LIMIT: usize = 256;
pub const QUEUE_CAPACITY: usize = 10_000;
pub const MAX_QUEUE_CAPACITY: usize = 1_000_000;

/// Hard cap on events per PutLogEvents call.
pub const MAX_EVENTS_PER_PUT: usize = 10_000;

pub const ENV_LOG_GROUP_NAME: &str = "LOG_GROUP_NAME";
pub const ENV_LOG_STREAM_NAME: &str = "LOG_STREAM_NAME";
pub const ENV_LOG_REGION: &str = "LOG_REGION";
pub const ENV_LOG_FLUSH_PERIOD: &str = "LOG_FLUSH_PERIOD";

pub const LOG_FILE_NAME: &str = "cwlogs.log";
