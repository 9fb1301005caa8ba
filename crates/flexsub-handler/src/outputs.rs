use async_trait::async_trait;
use aws_sdk_cloudformation::error::DisplayErrorContext;
use flexsub_core::PriorOutputs;
use tracing::debug;

use crate::error::{HandlerError, Result};

/// Outputs recorded on the stack by an earlier Create or Update.
#[async_trait]
pub trait OutputStore: Send + Sync {
    /// `Ok(None)` when the stack carries no subscription outputs.
    async fn prior_outputs(&self, stack_name: &str) -> Result<Option<PriorOutputs>>;
}

pub struct CloudFormationOutputs {
    client: aws_sdk_cloudformation::Client,
}

impl CloudFormationOutputs {
    pub fn new(client: aws_sdk_cloudformation::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OutputStore for CloudFormationOutputs {
    async fn prior_outputs(&self, stack_name: &str) -> Result<Option<PriorOutputs>> {
        let response = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| HandlerError::Outputs(DisplayErrorContext(&e).to_string()))?;

        let Some(stack) = response.stacks().first() else {
            return Ok(None);
        };
        let pairs = stack
            .outputs()
            .iter()
            .filter_map(|o| Some((o.output_key()?, o.output_value()?)));

        let outputs = PriorOutputs::from_pairs(pairs);
        debug!(stack_name, found = outputs.is_some(), "Read stack outputs");
        Ok(outputs)
    }
}
