use crate::cloud_providers::logs::{LogsApi, LogsError};
use std::fmt;
use tracing::{debug, info};

/// Provisioning failed; the shipper cannot start without a verified stream.
#[derive(Debug)]
pub enum ProvisionError {
    LookupGroup {
        group: String,
        source: LogsError,
    },
    CreateGroup {
        group: String,
        source: LogsError,
    },
    LookupStream {
        group: String,
        stream: String,
        source: LogsError,
    },
    CreateStream {
        group: String,
        stream: String,
        source: LogsError,
    },
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionError::LookupGroup { group, source } => {
                write!(f, "Failed to look up log group '{}': {}", group, source)
            }
            ProvisionError::CreateGroup { group, source } => {
                write!(f, "Failed to create log group '{}': {}", group, source)
            }
            ProvisionError::LookupStream {
                group,
                stream,
                source,
            } => write!(
                f,
                "Failed to look up log stream '{}' in '{}': {}",
                stream, group, source
            ),
            ProvisionError::CreateStream {
                group,
                stream,
                source,
            } => write!(
                f,
                "Failed to create log stream '{}' in '{}': {}",
                stream, group, source
            ),
        }
    }
}

impl std::error::Error for ProvisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProvisionError::LookupGroup { source, .. }
            | ProvisionError::CreateGroup { source, .. }
            | ProvisionError::LookupStream { source, .. }
            | ProvisionError::CreateStream { source, .. } => Some(source),
        }
    }
}

/// Makes sure `group/stream` exists and returns the stream's current upload
/// token, so the first write against a pre-existing stream is not rejected.
///
/// Returns `None` for a freshly created stream; its first write goes without a token.
pub async fn ensure_ready<A: LogsApi>(
    api: &A,
    group: &str,
    stream: &str,
) -> Result<Option<String>, ProvisionError> {
    let groups = api
        .describe_log_groups(group)
        .await
        .map_err(|source| ProvisionError::LookupGroup {
            group: group.to_string(),
            source,
        })?;

    if groups.iter().any(|name| name == group) {
        debug!("Log group '{}' already exists", group);
    } else {
        info!("Creating log group: {}", group);
        match api.create_log_group(group).await {
            Ok(()) | Err(LogsError::ResourceAlreadyExists(_)) => {}
            Err(source) => {
                return Err(ProvisionError::CreateGroup {
                    group: group.to_string(),
                    source,
                })
            }
        }
    }

    let streams = api
        .describe_log_streams(group, stream)
        .await
        .map_err(|source| ProvisionError::LookupStream {
            group: group.to_string(),
            stream: stream.to_string(),
            source,
        })?;

    if let Some(existing) = streams.into_iter().find(|info| info.name == stream) {
        debug!(
            "Log stream '{}' already exists, resuming with token {:?}",
            stream, existing.upload_sequence_token
        );
        return Ok(existing.upload_sequence_token);
    }

    info!("Creating log stream: {}", stream);
    match api.create_log_stream(group, stream).await {
        Ok(()) | Err(LogsError::ResourceAlreadyExists(_)) => Ok(None),
        Err(source) => Err(ProvisionError::CreateStream {
            group: group.to_string(),
            stream: stream.to_string(),
            source,
        }),
    }
}
