use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// CloudFormation lifecycle request type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestType::Create => write!(f, "Create"),
            RequestType::Update => write!(f, "Update"),
            RequestType::Delete => write!(f, "Delete"),
        }
    }
}

/// Custom resource request sent by CloudFormation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnRequest {
    pub request_type: RequestType,

    /// Pre-signed URL the outcome must be PUT to
    #[serde(rename = "ResponseURL")]
    pub response_url: String,

    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,

    /// Absent on Create
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default)]
    pub resource_properties: Map<String, Value>,

    /// Present on Update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_resource_properties: Option<Map<String, Value>>,
}

impl CfnRequest {
    /// Stack name, i.e. the second `/` segment of the stack ARN
    /// (`arn:aws:cloudformation:<region>:<account>:stack/<name>/<guid>`).
    pub fn stack_name(&self) -> Result<&str> {
        self.stack_id
            .split('/')
            .nth(1)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| CoreError::InvalidStackId(self.stack_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_create_event() {
        let event = json!({
            "RequestType": "Create",
            "ServiceToken": "arn:aws:lambda:us-east-1:123456789012:function:handler",
            "ResponseURL": "https://cloudformation-custom-resource-response.s3.amazonaws.com/x",
            "StackId": "arn:aws:cloudformation:us-east-1:123456789012:stack/flex-stack/0c1e",
            "RequestId": "5d478078-13e9-baf0-464a-7ef285ecc786",
            "LogicalResourceId": "FlexibleSubscription",
            "ResourceType": "Custom::FlexibleSubscription",
            "ResourceProperties": {"region": "us-east-1"}
        });

        let req: CfnRequest = serde_json::from_value(event).unwrap();
        assert_eq!(req.request_type, RequestType::Create);
        assert!(req.physical_resource_id.is_none());
        assert_eq!(req.stack_name().unwrap(), "flex-stack");
        assert_eq!(req.resource_properties["region"], "us-east-1");
    }

    #[test]
    fn test_invalid_stack_id() {
        let req: CfnRequest = serde_json::from_value(json!({
            "RequestType": "Delete",
            "ResponseURL": "https://example.com",
            "StackId": "no-slashes",
            "RequestId": "r",
            "LogicalResourceId": "l"
        }))
        .unwrap();
        assert!(req.stack_name().is_err());
    }
}
