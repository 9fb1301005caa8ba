//! Hand-off to the Step Functions state machine that waits for a new
//! subscription to become active.

use async_trait::async_trait;
use aws_sdk_sfn::error::DisplayErrorContext;
use tracing::info;

use crate::error::{HandlerError, Result};

/// Execution names are limited to 80 characters
const MAX_EXECUTION_NAME: usize = 80;

#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Start an execution; returns its ARN.
    async fn start_execution(&self, state_machine_arn: &str, name: &str, input: &str) -> Result<String>;
}

pub struct StepFunctionsOrchestrator {
    client: aws_sdk_sfn::Client,
}

impl StepFunctionsOrchestrator {
    pub fn new(client: aws_sdk_sfn::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Orchestrator for StepFunctionsOrchestrator {
    async fn start_execution(&self, state_machine_arn: &str, name: &str, input: &str) -> Result<String> {
        let output = self
            .client
            .start_execution()
            .state_machine_arn(state_machine_arn)
            .name(name)
            .input(input)
            .send()
            .await
            .map_err(|e| HandlerError::Orchestration(DisplayErrorContext(&e).to_string()))?;

        info!(execution_arn = output.execution_arn(), "Started status checks");
        Ok(output.execution_arn().to_string())
    }
}

/// Account id, the fifth `:` field of the invoked function's ARN.
pub fn account_id(function_arn: &str) -> Result<&str> {
    function_arn
        .split(':')
        .nth(4)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| HandlerError::InvalidContext(format!("no account id in {function_arn}")))
}

pub fn state_machine_arn(region: &str, account_id: &str, prefix: &str, stack_name: &str) -> String {
    format!("arn:aws:states:{region}:{account_id}:stateMachine:{prefix}-{region}-{stack_name}")
}

/// Unique per request, so a retried Create never collides with an old execution.
pub fn execution_name(request_id: &str) -> String {
    request_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .take(MAX_EXECUTION_NAME)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id() {
        let arn = "arn:aws:lambda:eu-west-1:123456789012:function:flexsub-handler";
        assert_eq!(account_id(arn).unwrap(), "123456789012");
        assert!(account_id("not-an-arn").is_err());
    }

    #[test]
    fn test_state_machine_arn() {
        assert_eq!(
            state_machine_arn("eu-west-1", "123456789012", "FlexibleSubscription-StateMachine", "redis"),
            "arn:aws:states:eu-west-1:123456789012:stateMachine:FlexibleSubscription-StateMachine-eu-west-1-redis"
        );
    }

    #[test]
    fn test_execution_name() {
        assert_eq!(
            execution_name("5f0b7c3e-1a2b-4c5d-8e9f-0a1b2c3d4e5f"),
            "5f0b7c3e-1a2b-4c5d-8e9f-0a1b2c3d4e5f"
        );
        assert_eq!(execution_name("a/b c"), "a-b-c");
        assert_eq!(execution_name(&"x".repeat(200)).len(), 80);
    }
}
