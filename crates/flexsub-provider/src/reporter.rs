use flexsub_core::CallbackResponse;
use reqwest::Client;
use tracing::{error, info};

use crate::error::ReporterError;

/// Delivers the final outcome of a custom resource request.
///
/// The callback URL is a pre-signed S3 URL; the signature does not cover a
/// content type, so none is sent.
pub struct ResponseReporter {
    http_client: Client,
}

impl ResponseReporter {
    pub fn new() -> Self {
        Self::with_http(Client::new())
    }

    pub fn with_http(http_client: Client) -> Self {
        Self { http_client }
    }

    pub async fn report(&self, response_url: &str, response: &CallbackResponse) -> Result<(), ReporterError> {
        let body = serde_json::to_string(response)?;

        info!(
            status = ?response.status,
            request_id = %response.request_id,
            logical_resource_id = %response.logical_resource_id,
            reason = response.reason.as_deref().unwrap_or(""),
            "Reporting outcome to CloudFormation"
        );

        let resp = self
            .http_client
            .put(response_url)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Callback URL rejected the response");
            return Err(ReporterError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

impl Default for ResponseReporter {
    fn default() -> Self {
        Self::new()
    }
}
