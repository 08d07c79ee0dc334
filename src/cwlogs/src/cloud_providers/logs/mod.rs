//! Access to the remote log service.
//!
//! The engine only talks to [`LogsApi`]; [`CloudWatchLogs`] is the production
//! implementation on top of `aws-sdk-cloudwatchlogs`.

mod api;
mod cloudwatch;
mod error;

pub use api::{LogStreamInfo, LogsApi};
pub use cloudwatch::CloudWatchLogs;
pub use error::{LogsError, LogsResult};
