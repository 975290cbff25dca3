#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared model, identity and polling logic for Cloud Manager Commerce commands.

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod ids;
pub mod model;
pub mod poll;
pub mod runner;

pub use api::{CommerceApi, Connector};
pub use config::Config;
pub use error::{ApiError, Error};
pub use identity::{ApiBinding, IdentityProvider, ImsContext, StaticIdentity};
pub use ids::{EnvironmentId, ExecutionId, ProgramId};
pub use model::*;
pub use poll::{Delay, PollDecision, PollPolicy, TokioDelay};
pub use runner::{await_execution, CommandExecutionRunner};
