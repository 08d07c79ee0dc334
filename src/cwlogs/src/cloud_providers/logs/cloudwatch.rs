// Sequence tokens are deprecated in newer service models but still honoured.
#![allow(deprecated)]

use super::api::{LogStreamInfo, LogsApi};
use super::error::{LogsError, LogsResult};
use crate::config::ShipperConfig;
use crate::shipper::LogEvent;
use anyhow::Context;
use aws_config::SdkConfig;
use aws_sdk_cloudwatchlogs::error::{DisplayErrorContext, SdkError};
use aws_sdk_cloudwatchlogs::operation::put_log_events::PutLogEventsError;
use aws_sdk_cloudwatchlogs::types::InputLogEvent;
use aws_sdk_cloudwatchlogs::Client;
use cwlogs_aws::resolve_available_aws_config;
use tracing::debug;

pub struct CloudWatchLogs {
    client: Client,
}

impl CloudWatchLogs {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Resolves credentials the way the configuration asks for and builds a client.
    pub async fn from_config(config: &ShipperConfig) -> anyhow::Result<Self> {
        let sdk_config = resolve_available_aws_config(config.aws_init_type.clone(), config.region)
            .await
            .with_context(|| {
                format!(
                    "Could not resolve AWS credentials using {}",
                    config.aws_init_type
                )
            })?;

        debug!(
            "Created CloudWatch Logs client for region {:?}",
            sdk_config.region()
        );

        Ok(Self::new(&sdk_config))
    }
}

fn to_input_events(events: &[LogEvent]) -> LogsResult<Vec<InputLogEvent>> {
    events
        .iter()
        .map(|event| {
            InputLogEvent::builder()
                .timestamp(event.timestamp)
                .message(event.message.clone())
                .build()
                .map_err(|err| LogsError::service("PutLogEvents", err))
        })
        .collect()
}

fn classify_put_error(err: SdkError<PutLogEventsError>) -> LogsError {
    match err.as_service_error() {
        Some(PutLogEventsError::DataAlreadyAcceptedException(exception)) => {
            LogsError::DataAlreadyAccepted {
                expected_token: exception.expected_sequence_token().map(str::to_string),
            }
        }
        Some(PutLogEventsError::InvalidSequenceTokenException(exception)) => {
            LogsError::InvalidSequenceToken {
                expected_token: exception.expected_sequence_token().map(str::to_string),
            }
        }
        _ => LogsError::service("PutLogEvents", DisplayErrorContext(&err)),
    }
}

impl LogsApi for CloudWatchLogs {
    async fn describe_log_groups(&self, name_prefix: &str) -> LogsResult<Vec<String>> {
        let mut names = Vec::new();
        let mut pages = self
            .client
            .describe_log_groups()
            .log_group_name_prefix(name_prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page
                .map_err(|err| LogsError::service("DescribeLogGroups", DisplayErrorContext(&err)))?;
            names.extend(
                page.log_groups()
                    .iter()
                    .filter_map(|group| group.log_group_name().map(str::to_string)),
            );
        }

        Ok(names)
    }

    async fn create_log_group(&self, group_name: &str) -> LogsResult<()> {
        match self
            .client
            .create_log_group()
            .log_group_name(group_name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                if let Some(service_error) = err.as_service_error() {
                    if service_error.is_resource_already_exists_exception() {
                        return Err(LogsError::ResourceAlreadyExists(group_name.to_string()));
                    }
                }
                Err(LogsError::service(
                    "CreateLogGroup",
                    DisplayErrorContext(&err),
                ))
            }
        }
    }

    async fn describe_log_streams(
        &self,
        group_name: &str,
        name_prefix: &str,
    ) -> LogsResult<Vec<LogStreamInfo>> {
        let mut streams = Vec::new();
        let mut pages = self
            .client
            .describe_log_streams()
            .log_group_name(group_name)
            .log_stream_name_prefix(name_prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|err| {
                LogsError::service("DescribeLogStreams", DisplayErrorContext(&err))
            })?;
            streams.extend(page.log_streams().iter().filter_map(|stream| {
                Some(LogStreamInfo {
                    name: stream.log_stream_name()?.to_string(),
                    upload_sequence_token: stream.upload_sequence_token().map(str::to_string),
                })
            }));
        }

        Ok(streams)
    }

    async fn create_log_stream(&self, group_name: &str, stream_name: &str) -> LogsResult<()> {
        match self
            .client
            .create_log_stream()
            .log_group_name(group_name)
            .log_stream_name(stream_name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                if let Some(service_error) = err.as_service_error() {
                    if service_error.is_resource_already_exists_exception() {
                        return Err(LogsError::ResourceAlreadyExists(format!(
                            "{}/{}",
                            group_name, stream_name
                        )));
                    }
                }
                Err(LogsError::service(
                    "CreateLogStream",
                    DisplayErrorContext(&err),
                ))
            }
        }
    }

    async fn put_log_events(
        &self,
        group_name: &str,
        stream_name: &str,
        events: &[LogEvent],
        sequence_token: Option<&str>,
    ) -> LogsResult<Option<String>> {
        let input_events = to_input_events(events)?;

        // 1 MB or 10000 events per call, enforced by the service
        let output = self
            .client
            .put_log_events()
            .log_group_name(group_name)
            .log_stream_name(stream_name)
            .set_log_events(Some(input_events))
            .set_sequence_token(sequence_token.map(str::to_string))
            .send()
            .await
            .map_err(classify_put_error)?;

        if let Some(rejected) = output.rejected_log_events_info() {
            tracing::warn!(
                "CloudWatch rejected part of a batch: too_old_end={:?} too_new_start={:?} expired_end={:?}",
                rejected.too_old_log_event_end_index(),
                rejected.too_new_log_event_start_index(),
                rejected.expired_log_event_end_index()
            );
        }

        Ok(output.next_sequence_token().map(str::to_string))
    }
}
