use flexsub_core::{Envelope, SubscriptionStatus};
use flexsub_provider::ProviderClient;
use tracing::{info, warn};

use crate::error::{HandlerError, Result};

/// One status check of the subscription carried by the envelope.
///
/// Records the observed status and marks the envelope terminal once the
/// subscription is `active` or `error`; on `error` the outcome turns FAILED.
pub async fn check_state(client: &ProviderClient, mut envelope: Envelope) -> Result<Envelope> {
    let id = envelope
        .subscription_id()
        .ok_or_else(|| HandlerError::InvalidEnvelope("responseBody.Data.SubscriptionId is missing".into()))?
        .to_string();

    let status = client.subscription_status(&id).await?;
    info!(subscription_id = %id, %status, "Checked subscription status");

    envelope.sub_status = Some(status.to_string());
    envelope.terminal = status.is_terminal();

    if status == SubscriptionStatus::Error {
        warn!(subscription_id = %id, "Subscription failed to provision");
        envelope.response_body = envelope
            .response_body
            .failed(format!("Subscription {id} entered the error state while provisioning."));
    }

    Ok(envelope)
}
