use super::error::LogsResult;
use crate::shipper::LogEvent;
use std::future::Future;

/// A log stream as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStreamInfo {
    pub name: String,
    pub upload_sequence_token: Option<String>,
}

/// The subset of the log service the shipper needs.
///
/// Lookups by prefix return every match across all pages; callers do the
/// exact-name comparison themselves.
pub trait LogsApi: Send + Sync + 'static {
    fn describe_log_groups(
        &self,
        name_prefix: &str,
    ) -> impl Future<Output = LogsResult<Vec<String>>> + Send;

    fn create_log_group(&self, group_name: &str) -> impl Future<Output = LogsResult<()>> + Send;

    fn describe_log_streams(
        &self,
        group_name: &str,
        name_prefix: &str,
    ) -> impl Future<Output = LogsResult<Vec<LogStreamInfo>>> + Send;

    fn create_log_stream(
        &self,
        group_name: &str,
        stream_name: &str,
    ) -> impl Future<Output = LogsResult<()>> + Send;

    /// Writes one batch and returns the token for the next write.
    fn put_log_events(
        &self,
        group_name: &str,
        stream_name: &str,
        events: &[LogEvent],
        sequence_token: Option<&str>,
    ) -> impl Future<Output = LogsResult<Option<String>>> + Send;
}
