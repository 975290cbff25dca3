//! Submit a command execution once, then poll it to a terminal status.
//!
//! ```text
//! SUBMITTING --ok--> POLLING --PENDING/RUNNING--> POLLING
//! SUBMITTING --err-> FAILED
//! POLLING --COMPLETE--> SUCCEEDED
//! POLLING --other status / poll error / poll limit--> FAILED
//! ```

use tracing::{debug, info, warn};

use crate::api::{CommerceApi, Connector};
use crate::error::Error;
use crate::identity::{ApiBinding, IdentityProvider, DEFAULT_BASE_URL};
use crate::model::{CommandRequest, ExecutionOutcome, MagentoCommand};
use crate::poll::{Delay, PollDecision, PollPolicy, TokioDelay};

/// Runs `request` against `api`: one submission, then sequential polls with
/// the same program, environment and execution id until a terminal status.
///
/// Submission and poll errors are returned as-is and never retried. An
/// invalid `policy` fails before submission.
pub async fn await_execution<A, D>(
    api: &A,
    delay: &D,
    policy: &PollPolicy,
    request: &CommandRequest,
) -> Result<ExecutionOutcome, Error>
where
    A: CommerceApi + ?Sized,
    D: Delay + ?Sized,
{
    policy.validate()?;

    let handle = api
        .post_command_execution(&request.program_id, &request.environment_id, &request.body())
        .await?;

    info!(
        program_id = %request.program_id,
        environment_id = %request.environment_id,
        execution_id = %handle.id,
        command = %request.command_name,
        "command execution submitted"
    );

    let mut polls: u32 = 0;
    loop {
        let snapshot = api
            .get_command_execution(&request.program_id, &request.environment_id, &handle.id)
            .await?;
        polls += 1;

        debug!(
            execution_id = %handle.id,
            status = %snapshot.status,
            poll = polls,
            "command execution status"
        );

        match PollDecision::for_status(&snapshot) {
            PollDecision::Continue => {
                if policy.exhausted(polls) {
                    warn!(execution_id = %handle.id, polls, "giving up on command execution");
                    return Err(Error::PollLimitExceeded {
                        execution_id: handle.id,
                        attempts: polls,
                    });
                }
                delay.wait(policy.interval).await;
            }
            PollDecision::Succeeded => {
                info!(execution_id = %handle.id, polls, "command execution complete");
                return Ok(ExecutionOutcome {
                    execution_id: handle.id,
                    status: snapshot.status,
                    message: snapshot.message,
                    polls,
                });
            }
            PollDecision::Failed => {
                warn!(
                    execution_id = %handle.id,
                    status = %snapshot.status,
                    "command execution failed"
                );
                return Err(Error::CommandExecutionFailed {
                    status: snapshot.status,
                    message: snapshot.message,
                });
            }
        }
    }
}

/// Resolves identity, binds a client and drives [`await_execution`].
pub struct CommandExecutionRunner<I, C, D = TokioDelay> {
    identity: I,
    connector: C,
    delay: D,
    policy: PollPolicy,
    base_url: String,
}

impl<I, C> CommandExecutionRunner<I, C, TokioDelay>
where
    I: IdentityProvider,
    C: Connector,
{
    /// Runner with the default endpoint, policy and real delay.
    pub fn new(identity: I, connector: C) -> Self {
        Self {
            identity,
            connector,
            delay: TokioDelay,
            policy: PollPolicy::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl<I, C, D> CommandExecutionRunner<I, C, D>
where
    I: IdentityProvider,
    C: Connector,
    D: Delay,
{
    /// Swaps the delay used between polls.
    pub fn with_delay<D2: Delay>(self, delay: D2) -> CommandExecutionRunner<I, C, D2> {
        CommandExecutionRunner {
            identity: self.identity,
            connector: self.connector,
            delay,
            policy: self.policy,
            base_url: self.base_url,
        }
    }

    /// Sets the poll policy.
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the Cloud Manager endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Identity in use, for swapping credentials between runs.
    pub fn identity_mut(&mut self) -> &mut I {
        &mut self.identity
    }

    /// Runs `command` on the given environment.
    ///
    /// Blank identifiers fail before identity lookup; a missing identity
    /// fails before any network call.
    pub async fn run(
        &self,
        program_id: &str,
        environment_id: &str,
        command: MagentoCommand,
    ) -> Result<ExecutionOutcome, Error> {
        let request = CommandRequest::new(program_id, environment_id, command)?;
        let context = self.identity.current_context()?;
        let api = self
            .connector
            .connect(ApiBinding::new(context, self.base_url.clone()))?;

        info!(
            program_id = %request.program_id,
            environment_id = %request.environment_id,
            "{}",
            command.progress()
        );
        await_execution(&api, &self.delay, &self.policy, &request).await
    }
}
