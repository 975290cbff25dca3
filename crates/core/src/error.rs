//! Error taxonomy.

use thiserror::Error;

use crate::ids::ExecutionId;
use crate::model::CommandExecutionStatus;

/// Failure talking to the Cloud Manager API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Non-success HTTP response. `message` is taken from the error body.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message reported by the API.
        message: String,
    },
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),
    /// A success response whose body did not parse.
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Everything a command run can fail with.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or blank program/environment id.
    #[error("{0}")]
    Argument(String),

    /// No credentials for the selected IMS context.
    #[error("unable to find IMS context {context}")]
    AuthContext {
        /// Context name that was looked up.
        context: String,
    },

    /// Submission or poll failure, surfaced exactly as the API reported it.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The execution reached a terminal status other than COMPLETE.
    #[error("command execution failed ({status}): {message}")]
    CommandExecutionFailed {
        /// Terminal status as reported.
        status: CommandExecutionStatus,
        /// Message that came with it.
        message: String,
    },

    /// A bounded poll policy ran out before a terminal status.
    #[error("command execution {execution_id} still running after {attempts} polls")]
    PollLimitExceeded {
        /// Execution that was abandoned.
        execution_id: ExecutionId,
        /// Polls issued.
        attempts: u32,
    },

    /// Unreadable config file or invalid setting.
    #[error("config error: {0}")]
    Config(String),
}
