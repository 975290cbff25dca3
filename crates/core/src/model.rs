//! Request, response and status types for command executions.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;
use crate::ids::{EnvironmentId, ExecutionId, ProgramId};

/// Command type for every Magento CLI command run through Cloud Manager.
pub const BIN_MAGENTO: &str = "bin/magento";

/// Supported `bin/magento` commands.
///
/// Every variant runs through the same submit-then-poll routine; only the
/// remote command string and the progress text differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MagentoCommand {
    /// `maintenance:enable`
    MaintenanceEnable,
    /// `maintenance:disable`
    MaintenanceDisable,
    /// `maintenance:status`
    MaintenanceStatus,
    /// `cache:clean`
    CacheClean,
    /// `cache:flush`
    CacheFlush,
    /// `indexer:reindex`
    IndexerReindex,
    /// `indexer:info`
    IndexerInfo,
    /// `app:config:status`
    AppConfigStatus,
}

impl MagentoCommand {
    /// Remote command string, e.g. `maintenance:enable`.
    pub fn command(self) -> &'static str {
        match self {
            Self::MaintenanceEnable => "maintenance:enable",
            Self::MaintenanceDisable => "maintenance:disable",
            Self::MaintenanceStatus => "maintenance:status",
            Self::CacheClean => "cache:clean",
            Self::CacheFlush => "cache:flush",
            Self::IndexerReindex => "indexer:reindex",
            Self::IndexerInfo => "indexer:info",
            Self::AppConfigStatus => "app:config:status",
        }
    }

    /// Progress text shown while the execution is in flight.
    pub fn progress(self) -> &'static str {
        match self {
            Self::MaintenanceEnable => "Enabling maintenance mode",
            Self::MaintenanceDisable => "Disabling maintenance mode",
            Self::MaintenanceStatus => "Checking maintenance status",
            Self::CacheClean => "Cleaning cache",
            Self::CacheFlush => "Flushing cache",
            Self::IndexerReindex => "Reindexing",
            Self::IndexerInfo => "Fetching indexer info",
            Self::AppConfigStatus => "Checking config status",
        }
    }
}

impl fmt::Display for MagentoCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// One command submission against a program/environment pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Target program.
    pub program_id: ProgramId,
    /// Target environment within the program.
    pub environment_id: EnvironmentId,
    /// Always [`BIN_MAGENTO`] for now.
    pub command_type: String,
    /// Remote command string, e.g. `maintenance:enable`.
    pub command_name: String,
}

impl CommandRequest {
    /// Builds a `bin/magento` request, rejecting blank identifiers.
    pub fn new(
        program_id: impl Into<ProgramId>,
        environment_id: impl Into<EnvironmentId>,
        command: MagentoCommand,
    ) -> Result<Self, Error> {
        let program_id = program_id.into();
        let environment_id = environment_id.into();
        if program_id.is_blank() {
            return Err(Error::Argument("missing required flag programId".into()));
        }
        if environment_id.is_blank() {
            return Err(Error::Argument("missing required arg environmentId".into()));
        }
        Ok(Self {
            program_id,
            environment_id,
            command_type: BIN_MAGENTO.to_string(),
            command_name: command.command().to_string(),
        })
    }

    /// Wire body for the submission call.
    pub fn body(&self) -> CommandExecutionBody {
        CommandExecutionBody {
            command_type: self.command_type.clone(),
            command: self.command_name.clone(),
        }
    }
}

/// JSON body of `POST .../runtime/commerce/cli`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandExecutionBody {
    /// Sent as `type`.
    #[serde(rename = "type")]
    pub command_type: String,
    /// Command to run.
    pub command: String,
}

/// Returned by submission; only used to poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionHandle {
    /// Id to poll with.
    #[serde(deserialize_with = "string_or_number")]
    pub id: ExecutionId,
}

/// Remote execution status.
///
/// `COMPLETED` is read as [`CommandExecutionStatus::Complete`]. Anything not
/// recognised is kept verbatim in `Other` and treated as a terminal failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommandExecutionStatus {
    /// Queued, not started.
    Pending,
    /// In progress.
    Running,
    /// Finished successfully.
    Complete,
    /// Finished with an error.
    Failed,
    /// Any other status text, as received.
    Other(String),
}

impl CommandExecutionStatus {
    /// PENDING and RUNNING keep the poll loop going; everything else ends it.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Wire spelling of the status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for CommandExecutionStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "COMPLETE" | "COMPLETED" => Self::Complete,
            "FAILED" => Self::Failed,
            _ => Self::Other(s),
        }
    }
}

impl From<CommandExecutionStatus> for String {
    fn from(s: CommandExecutionStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for CommandExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot returned by each poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    /// Current status.
    pub status: CommandExecutionStatus,
    /// Human-readable message; empty when the API sends none.
    #[serde(default)]
    pub message: String,
}

/// Successful end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    /// Id assigned at submission.
    pub execution_id: ExecutionId,
    /// Terminal status, always `COMPLETE` on success.
    pub status: CommandExecutionStatus,
    /// Final message from the API.
    pub message: String,
    /// Number of status polls issued.
    pub polls: u32,
}

// Cloud Manager has returned execution ids both as strings and as numbers.
fn string_or_number<'de, D>(de: D) -> Result<ExecutionId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(u64),
    }

    Ok(match Raw::deserialize(de)? {
        Raw::Str(s) => ExecutionId(s),
        Raw::Num(n) => ExecutionId(n.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_known_and_unknown_values() {
        let s: CommandExecutionStatus = serde_json::from_str(r#""RUNNING""#).unwrap();
        assert_eq!(s, CommandExecutionStatus::Running);
        let s: CommandExecutionStatus = serde_json::from_str(r#""COMPLETED""#).unwrap();
        assert_eq!(s, CommandExecutionStatus::Complete);
        let s: CommandExecutionStatus = serde_json::from_str(r#""CANCELLED""#).unwrap();
        assert_eq!(s, CommandExecutionStatus::Other("CANCELLED".into()));
        assert!(s.is_terminal());
        assert_eq!(serde_json::to_string(&s).unwrap(), r#""CANCELLED""#);
    }

    #[test]
    fn only_pending_and_running_are_non_terminal() {
        assert!(!CommandExecutionStatus::Pending.is_terminal());
        assert!(!CommandExecutionStatus::Running.is_terminal());
        assert!(CommandExecutionStatus::Complete.is_terminal());
        assert!(CommandExecutionStatus::Failed.is_terminal());
    }

    #[test]
    fn body_uses_type_key() {
        let req = CommandRequest::new("5", "10", MagentoCommand::MaintenanceEnable).unwrap();
        let json = serde_json::to_value(req.body()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "bin/magento", "command": "maintenance:enable"})
        );
    }

    #[test]
    fn blank_identifiers_are_argument_errors() {
        let err = CommandRequest::new("", "10", MagentoCommand::CacheClean).unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
        let err = CommandRequest::new("5", " ", MagentoCommand::CacheClean).unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn handle_accepts_numeric_id() {
        let h: ExecutionHandle = serde_json::from_str(r#"{"id": 5000}"#).unwrap();
        assert_eq!(h.id.as_str(), "5000");
        let h: ExecutionHandle = serde_json::from_str(r#"{"id": "5000", "type": "bin/magento"}"#).unwrap();
        assert_eq!(h.id.as_str(), "5000");
    }
}
