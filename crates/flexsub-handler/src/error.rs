use flexsub_core::CoreError;
use flexsub_provider::{PollError, ProviderError, ReporterError};
use thiserror::Error;

/// Failures inside an invocation.
///
/// The `Display` text of everything except [`HandlerError::Reporter`] ends up
/// as the `Reason` of a FAILED response, so messages are written for the
/// person looking at the stack events.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Reporter(#[from] ReporterError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unable to read secret {name}: {reason}")]
    Secret { name: String, reason: String },

    #[error("Unable to read stack outputs: {0}")]
    Outputs(String),

    #[error("Unable to start subscription status checks: {0}")]
    Orchestration(String),

    /// Description the provider attached to a rejected request
    #[error("{0}")]
    Rejected(String),

    #[error("Provider response carries no {0}")]
    MissingLink(&'static str),

    #[error("Stack {stack} has no recorded subscription outputs")]
    MissingOutputs { stack: String },

    #[error("Subscription {id} is {status}; it can only be updated while active")]
    UnexpectedStatus { id: String, status: String },

    /// Fixed-text precondition failure
    #[error("{0}")]
    Precondition(String),

    #[error("Unable to delete subscription {id}: {reason}")]
    DeleteFailed { id: String, reason: String },

    #[error("Invalid status check input: {0}")]
    InvalidEnvelope(String),

    #[error("Invalid invocation context: {0}")]
    InvalidContext(String),
}

impl HandlerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn secret(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Secret {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, HandlerError>;
