//! Seams between the runner and the Cloud Manager transport.

use async_trait::async_trait;

use crate::error::{ApiError, Error};
use crate::identity::ApiBinding;
use crate::ids::{EnvironmentId, ExecutionId, ProgramId};
use crate::model::{CommandExecutionBody, ExecutionHandle, ExecutionStatus};

/// Commerce command-execution endpoints.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    /// Starts a command execution.
    async fn post_command_execution(
        &self,
        program_id: &ProgramId,
        environment_id: &EnvironmentId,
        body: &CommandExecutionBody,
    ) -> Result<ExecutionHandle, ApiError>;

    /// Fetches the current status of an execution.
    async fn get_command_execution(
        &self,
        program_id: &ProgramId,
        environment_id: &EnvironmentId,
        execution_id: &ExecutionId,
    ) -> Result<ExecutionStatus, ApiError>;
}

/// Builds a [`CommerceApi`] for a resolved identity.
pub trait Connector {
    /// Client type produced.
    type Api: CommerceApi;

    /// Binds a client to org, credentials and endpoint.
    fn connect(&self, binding: ApiBinding) -> Result<Self::Api, Error>;
}
