use std::fmt;

/// Errors returned by the log service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogsError {
    /// The batch was already stored under the supplied token
    DataAlreadyAccepted { expected_token: Option<String> },

    /// The supplied token is not the one the stream expects next
    InvalidSequenceToken { expected_token: Option<String> },

    /// Group or stream creation raced with another writer
    ResourceAlreadyExists(String),

    /// Anything else: transport, auth, throttling, validation
    Service {
        operation: &'static str,
        message: String,
    },
}

impl fmt::Display for LogsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogsError::DataAlreadyAccepted { expected_token } => write!(
                f,
                "data already accepted, expected sequence token {:?}",
                expected_token
            ),
            LogsError::InvalidSequenceToken { expected_token } => write!(
                f,
                "invalid sequence token, expected {:?}",
                expected_token
            ),
            LogsError::ResourceAlreadyExists(message) => {
                write!(f, "resource already exists: {}", message)
            }
            LogsError::Service { operation, message } => {
                write!(f, "{} failed: {}", operation, message)
            }
        }
    }
}

impl std::error::Error for LogsError {}

impl LogsError {
    pub fn service(operation: &'static str, message: impl fmt::Display) -> Self {
        LogsError::Service {
            operation,
            message: message.to_string(),
        }
    }
}

pub type LogsResult<T> = Result<T, LogsError>;
