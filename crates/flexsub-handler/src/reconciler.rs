//! Create, Update and Delete of the flexible subscription.
//!
//! Every path produces exactly one [`Disposition`]. Failures are turned into
//! a FAILED response carrying the error text as its reason; nothing here
//! sends anything to CloudFormation.

use flexsub_core::{
    CallbackResponse, CfnRequest, DesiredState, Envelope, OutputData, PriorOutputs, RequestType,
    SubscriptionStatus, contains_processing_error, processing_link,
    api::error_description,
};
use flexsub_provider::{DATABASE_PAGE_LIMIT, Poller, ProviderClient, ProviderError};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{HandlerError, Result};
use crate::outputs::OutputStore;

/// What the handler has to do with the outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Deliver now.
    Report(CallbackResponse),
    /// Subscription is provisioning; the state machine delivers once it is active.
    Deferred(Envelope),
}

impl Disposition {
    pub fn response(&self) -> &CallbackResponse {
        match self {
            Self::Report(response) => response,
            Self::Deferred(envelope) => &envelope.response_body,
        }
    }
}

/// Physical id echoed back to CloudFormation.
///
/// CloudFormation treats a changed id on Update as a replacement, so an
/// existing id is kept; Create uses the invocation's log stream.
pub fn physical_resource_id(request: &CfnRequest, log_stream: &str) -> String {
    match (&request.request_type, &request.physical_resource_id) {
        (RequestType::Update | RequestType::Delete, Some(id)) => id.clone(),
        _ => log_stream.to_string(),
    }
}

/// Outputs a Delete acts on. Missing or unreadable outputs mean the
/// resource never got that far and there is nothing to delete.
pub async fn recorded_outputs(outputs: &dyn OutputStore, request: &CfnRequest) -> Option<PriorOutputs> {
    let stack = match request.stack_name() {
        Ok(stack) => stack,
        Err(e) => {
            warn!(error = %e, "Cannot derive stack name");
            return None;
        }
    };
    let prior = match outputs.prior_outputs(stack).await {
        Ok(prior) => prior,
        Err(e) => {
            warn!(stack, error = %e, "Cannot read stack outputs");
            None
        }
    };
    if prior.is_none() {
        info!(request_id = %request.request_id, "No recorded subscription, nothing to delete");
    }
    prior
}

fn settle(request: &CfnRequest, base: CallbackResponse, result: Result<Disposition>) -> Disposition {
    match result {
        Ok(disposition) => disposition,
        Err(e) => {
            warn!(
                request_type = %request.request_type,
                request_id = %request.request_id,
                error = %e,
                "Request failed"
            );
            Disposition::Report(base.failed(e.to_string()))
        }
    }
}

pub struct Reconciler<'a> {
    client: &'a ProviderClient,
    poller: Poller<'a>,
    outputs: &'a dyn OutputStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(client: &'a ProviderClient, poller: Poller<'a>, outputs: &'a dyn OutputStore) -> Self {
        Self {
            client,
            poller,
            outputs,
        }
    }

    pub async fn reconcile(&self, request: &CfnRequest, base: CallbackResponse) -> Disposition {
        let result = match request.request_type {
            RequestType::Create => self.create(request, base.clone()).await,
            RequestType::Update => self.update(request, base.clone()).await,
            RequestType::Delete => match recorded_outputs(self.outputs, request).await {
                Some(prior) => self.delete(&prior, base.clone()).await,
                None => Ok(Disposition::Report(base.clone())),
            },
        };
        settle(request, base, result)
    }

    /// Delete once the recorded outputs are already in hand.
    pub async fn delete_recorded(
        &self,
        request: &CfnRequest,
        prior: &PriorOutputs,
        base: CallbackResponse,
    ) -> Disposition {
        let result = self.delete(prior, base.clone()).await;
        settle(request, base, result)
    }

    async fn create(&self, request: &CfnRequest, base: CallbackResponse) -> Result<Disposition> {
        let desired = DesiredState::from_properties(&request.resource_properties)?;
        let body = desired.create_request();
        let post_call = serde_json::to_string(&body)?;

        let accepted = match self.client.create_subscription(&body).await {
            Ok(accepted) => accepted,
            Err(e) => return Err(self.explain_rejection(e).await),
        };
        if contains_processing_error(&accepted) {
            return Err(self.explain_failure(&accepted).await);
        }

        let link = processing_link(&accepted).ok_or(HandlerError::MissingLink("processing link"))?;
        let task = self.poller.wait_for_resource(link).await?;
        let subscription_id = task
            .resource_id()
            .map(|id| id.to_string())
            .ok_or(HandlerError::MissingLink("resource id"))?;
        let description = task.description.clone().unwrap_or_default();
        info!(subscription_id = %subscription_id, "Subscription accepted");

        let databases = self
            .client
            .list_databases(&subscription_id, 0, DATABASE_PAGE_LIMIT)
            .await?;
        let default_database = databases.default_database().ok_or_else(|| {
            HandlerError::precondition(format!(
                "Subscription {subscription_id} has no databases assigned."
            ))
        })?;

        let data = OutputData {
            subscription_id,
            default_database_id: default_database.database_id.to_string(),
            subscription_description: description,
            post_call,
        };
        Ok(Disposition::Deferred(Envelope::new(
            base.with_data(data),
            &request.response_url,
            self.client.base_url(),
        )))
    }

    async fn update(&self, request: &CfnRequest, base: CallbackResponse) -> Result<Disposition> {
        let stack = request.stack_name()?;
        let prior = self
            .outputs
            .prior_outputs(stack)
            .await?
            .ok_or_else(|| HandlerError::MissingOutputs {
                stack: stack.to_string(),
            })?;
        let desired = DesiredState::from_properties(&request.resource_properties)?;
        let update = desired.update_request();
        let id = prior.subscription_id.as_str();

        let status = self.client.subscription_status(id).await?;
        match status {
            SubscriptionStatus::Active if update.is_empty() => {
                info!(subscription_id = id, "No mutable properties set, nothing to update");
                Ok(Disposition::Report(base.with_data(prior.to_data(None))))
            }
            SubscriptionStatus::Active => {
                let response = match self.client.update_subscription(id, &update).await {
                    Ok(response) => response,
                    Err(e) => return Err(self.explain_rejection(e).await),
                };
                if contains_processing_error(&response) {
                    return Err(self.explain_failure(&response).await);
                }
                let post_call = prior.merged_post_call(&update)?;
                info!(subscription_id = id, "Subscription updated");
                Ok(Disposition::Report(base.with_data(prior.to_data(Some(post_call)))))
            }
            // The provider refuses changes while these last; surface its own reason
            SubscriptionStatus::Pending | SubscriptionStatus::Deleting => {
                let response = match self.client.update_subscription(id, &update).await {
                    Ok(response) => response,
                    Err(e) => return Err(self.explain_rejection(e).await),
                };
                match self.provider_reason(&response).await? {
                    Some(reason) => Err(HandlerError::Rejected(reason)),
                    None => Err(HandlerError::UnexpectedStatus {
                        id: id.to_string(),
                        status: status.to_string(),
                    }),
                }
            }
            other => Err(HandlerError::UnexpectedStatus {
                id: id.to_string(),
                status: other.to_string(),
            }),
        }
    }

    async fn delete(&self, prior: &PriorOutputs, base: CallbackResponse) -> Result<Disposition> {
        let id = prior.subscription_id.as_str();

        if !self.client.list_subscriptions().await?.contains(id) {
            info!(subscription_id = id, "Subscription already gone");
            return Ok(Disposition::Report(base));
        }

        let databases = self.client.list_databases(id, 0, DATABASE_PAGE_LIMIT).await?;
        match databases.databases() {
            [only] if only.database_id.as_str() == prior.default_database_id => {
                self.delete_subscription(id, &prior.default_database_id)
                    .await
                    .map_err(|e| HandlerError::DeleteFailed {
                        id: id.to_string(),
                        reason: e.to_string(),
                    })?;
                info!(subscription_id = id, "Subscription deleted");
                Ok(Disposition::Report(base.with_data(prior.to_data(None))))
            }
            [_] => Err(HandlerError::precondition(format!(
                "The only database assigned to subscription {id} is not the default one."
            ))),
            [] => Err(HandlerError::precondition(format!(
                "Subscription {id} has no databases assigned."
            ))),
            _ => Err(HandlerError::precondition(format!(
                "Subscription {id} has more than one database assigned. Please delete the other databases."
            ))),
        }
    }

    /// Default database first; the provider refuses to drop a subscription
    /// that still has one.
    async fn delete_subscription(&self, id: &str, database_id: &str) -> Result<()> {
        let task = self.client.delete_database(id, database_id).await?;
        self.wait_for(&task).await?;

        let task = self.client.delete_subscription(id).await?;
        self.wait_for(&task).await?;
        Ok(())
    }

    async fn wait_for(&self, task: &Value) -> Result<()> {
        if let Some(link) = processing_link(task) {
            self.poller.wait_for_task(link).await?;
        }
        Ok(())
    }

    async fn explain_rejection(&self, err: ProviderError) -> HandlerError {
        match err.rejection_body() {
            Some(body) if processing_link(body).is_some() => self.explain_failure(body).await,
            _ => err.into(),
        }
    }

    async fn explain_failure(&self, body: &Value) -> HandlerError {
        match self.provider_reason(body).await {
            Ok(Some(reason)) => HandlerError::Rejected(reason),
            Ok(None) => HandlerError::Rejected(format!("Provider rejected the request: {body}")),
            Err(e) => e,
        }
    }

    /// Follow the task link of a request until the provider says why it
    /// failed. `None` when its task finished without an error.
    async fn provider_reason(&self, body: &Value) -> Result<Option<String>> {
        let Some(link) = processing_link(body) else {
            return Ok(error_description(body).map(str::to_string));
        };
        Ok(self.poller.wait_for_error_description(link).await?)
    }
}
