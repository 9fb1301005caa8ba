//! Outcome reported back to CloudFormation, and the values that travel with it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::event::CfnRequest;
use crate::request::UpdateSubscriptionRequest;

/// Output keys recorded on the stack
pub const SUBSCRIPTION_ID_OUTPUT: &str = "SubscriptionId";
pub const DEFAULT_DATABASE_ID_OUTPUT: &str = "DefaultDatabaseId";
pub const SUBSCRIPTION_DESCRIPTION_OUTPUT: &str = "SubscriptionDescription";
pub const POST_CALL_OUTPUT: &str = "PostCall";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Custom resource response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackResponse {
    pub status: ResponseStatus,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<OutputData>,
}

impl CallbackResponse {
    /// Fresh SUCCESS response for a request, without data.
    pub fn for_request(request: &CfnRequest, physical_resource_id: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            physical_resource_id: physical_resource_id.into(),
            stack_id: request.stack_id.clone(),
            request_id: request.request_id.clone(),
            logical_resource_id: request.logical_resource_id.clone(),
            reason: None,
            data: None,
        }
    }

    pub fn with_data(mut self, data: OutputData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn failed(mut self, reason: impl Into<String>) -> Self {
        self.status = ResponseStatus::Failed;
        self.reason = Some(reason.into());
        self
    }
}

/// `Data` attributes, readable with `Fn::GetAtt` and recorded as stack outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputData {
    pub subscription_id: String,
    pub default_database_id: String,
    pub subscription_description: String,
    /// JSON echo of the request body the subscription was created with
    pub post_call: String,
}

/// Outputs read back from the stack on Update and Delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorOutputs {
    pub subscription_id: String,
    pub post_call: String,
    pub default_database_id: String,
    pub subscription_description: String,
}

impl PriorOutputs {
    /// Collect outputs by key. Keys are matched by substring so that
    /// prefixed output names in the template still resolve.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Option<Self> {
        let mut subscription_id = None;
        let mut post_call = None;
        let mut default_database_id = None;
        let mut subscription_description = None;

        for (key, value) in pairs {
            let value = Some(value.to_string());
            if key.contains(SUBSCRIPTION_ID_OUTPUT) {
                subscription_id = value;
            } else if key.contains(POST_CALL_OUTPUT) {
                post_call = value;
            } else if key.contains(DEFAULT_DATABASE_ID_OUTPUT) {
                default_database_id = value;
            } else if key.contains(SUBSCRIPTION_DESCRIPTION_OUTPUT) {
                subscription_description = value;
            }
        }

        Some(Self {
            subscription_id: subscription_id?,
            post_call: post_call?,
            default_database_id: default_database_id?,
            subscription_description: subscription_description.unwrap_or_default(),
        })
    }

    /// Recorded request body with the in-place update applied.
    pub fn merged_post_call(&self, update: &UpdateSubscriptionRequest) -> Result<String> {
        let mut echo: Value = serde_json::from_str(&self.post_call)
            .map_err(|e| CoreError::invalid_output(POST_CALL_OUTPUT, e.to_string()))?;
        let Value::Object(echo_fields) = &mut echo else {
            return Err(CoreError::invalid_output(POST_CALL_OUTPUT, "expected a JSON object"));
        };

        if let Value::Object(changes) = serde_json::to_value(update)? {
            echo_fields.extend(changes);
        }

        Ok(serde_json::to_string(&echo)?)
    }

    /// Data block that re-reports these outputs, optionally with a new echo.
    pub fn to_data(&self, post_call: Option<String>) -> OutputData {
        OutputData {
            subscription_id: self.subscription_id.clone(),
            default_database_id: self.default_database_id.clone(),
            subscription_description: self.subscription_description.clone(),
            post_call: post_call.unwrap_or_else(|| self.post_call.clone()),
        }
    }
}

/// Hand-off payload for the status-check state machine.
///
/// Field names are part of the state machine contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "responseBody")]
    pub response_body: CallbackResponse,

    #[serde(rename = "responseURL")]
    pub response_url: String,

    pub base_url: String,

    /// Last observed subscription status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_status: Option<String>,

    /// Set once polling should stop and the outcome be delivered
    #[serde(default)]
    pub terminal: bool,

    /// Caught by the state machine when the status check kept failing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StateError>,
}

/// Error output of a failed state machine task, as placed by `Catch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateError {
    pub error: String,
    #[serde(default)]
    pub cause: Option<String>,
}

impl StateError {
    /// Human readable part of the error. Lambda failures carry their own
    /// error document in `Cause`.
    pub fn message(&self) -> String {
        let Some(cause) = self.cause.as_deref().filter(|c| !c.is_empty()) else {
            return self.error.clone();
        };
        match serde_json::from_str::<Value>(cause) {
            Ok(doc) => match doc.get("errorMessage").and_then(Value::as_str) {
                Some(message) => message.to_string(),
                None => cause.to_string(),
            },
            Err(_) => cause.to_string(),
        }
    }
}

impl Envelope {
    pub fn new(
        response_body: CallbackResponse,
        response_url: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            response_body,
            response_url: response_url.into(),
            base_url: base_url.into(),
            sub_status: None,
            terminal: false,
            error: None,
        }
    }

    /// Response to deliver; a caught status check failure turns it FAILED.
    pub fn into_outcome(self) -> CallbackResponse {
        match self.error {
            Some(err) => {
                let reason = match self.response_body.data.as_ref() {
                    Some(data) => format!(
                        "Status check of subscription {} failed: {}",
                        data.subscription_id,
                        err.message()
                    ),
                    None => format!("Status check failed: {}", err.message()),
                };
                self.response_body.failed(reason)
            }
            None => self.response_body,
        }
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.response_body
            .data
            .as_ref()
            .map(|d| d.subscription_id.as_str())
    }
}
