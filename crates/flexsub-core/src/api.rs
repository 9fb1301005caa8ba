//! Documents returned by the subscriptions API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Status marker of a task the provider gave up on
pub const PROCESSING_ERROR: &str = "processing-error";

/// Provider resource id. The API returns numbers, stack outputs hold strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for ResourceId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(serde_json::Number),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => ResourceId(n.to_string()),
            Raw::Text(s) => ResourceId(s),
        })
    }
}

/// Lifecycle status of a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Deleting,
    Error,
    Other(String),
}

impl SubscriptionStatus {
    /// Polling stops on these
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Active | Self::Error)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Deleting => "deleting",
            Self::Error => "error",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for SubscriptionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Self::Pending,
            "active" => Self::Active,
            "deleting" => Self::Deleting,
            "error" => Self::Error,
            _ => Self::Other(s),
        }
    }
}

impl From<SubscriptionStatus> for String {
    fn from(s: SubscriptionStatus) -> Self {
        s.as_str().to_string()
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `GET /v1/subscriptions/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: ResourceId,

    #[serde(default)]
    pub name: Option<String>,

    pub status: SubscriptionStatus,
}

/// `GET /v1/subscriptions/`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionList {
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionSummary {
    pub id: ResourceId,

    #[serde(default)]
    pub status: Option<SubscriptionStatus>,
}

impl SubscriptionList {
    pub fn contains(&self, id: &str) -> bool {
        self.subscriptions.iter().any(|s| s.id == *id)
    }
}

/// `GET /v1/subscriptions/{id}/databases`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseList {
    #[serde(default)]
    pub subscription: Vec<SubscriptionDatabases>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDatabases {
    #[serde(default)]
    pub subscription_id: Option<ResourceId>,

    #[serde(default)]
    pub databases: Vec<DatabaseSummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSummary {
    pub database_id: ResourceId,

    #[serde(default)]
    pub name: Option<String>,
}

impl DatabaseList {
    pub fn databases(&self) -> &[DatabaseSummary] {
        self.subscription
            .first()
            .map(|s| s.databases.as_slice())
            .unwrap_or_default()
    }

    /// The database created together with the subscription.
    pub fn default_database(&self) -> Option<&DatabaseSummary> {
        self.databases().first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,

    #[serde(default)]
    pub rel: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Asynchronous task reached through a processing link
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskState {
    #[serde(default)]
    pub task_id: Option<String>,

    #[serde(default)]
    pub command_type: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub response: Option<TaskResponse>,

    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    #[serde(default)]
    pub resource_id: Option<ResourceId>,

    #[serde(default)]
    pub error: Option<TaskError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskError {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl TaskState {
    pub fn resource_id(&self) -> Option<&ResourceId> {
        self.response.as_ref()?.resource_id.as_ref()
    }

    pub fn error_description(&self) -> Option<&str> {
        self.response.as_ref()?.error.as_ref()?.description.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.status.as_deref() == Some(PROCESSING_ERROR)
    }

    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some("processing-completed")
    }
}

/// First link of a response body; where the task outcome can be polled.
pub fn processing_link(body: &Value) -> Option<&str> {
    body.get("links")?.get(0)?.get("href")?.as_str()
}

/// True when any string in the document is the `processing-error` marker.
pub fn contains_processing_error(body: &Value) -> bool {
    match body {
        Value::String(s) => s == PROCESSING_ERROR,
        Value::Array(items) => items.iter().any(contains_processing_error),
        Value::Object(fields) => fields.values().any(contains_processing_error),
        _ => false,
    }
}

/// Error description of a failed task, if the task document carries one.
pub fn error_description(body: &Value) -> Option<&str> {
    body.get("response")?
        .get("error")?
        .get("description")?
        .as_str()
}

/// Resource id of a completed task, if present.
pub fn resource_id(body: &Value) -> Option<&Value> {
    body.get("response")?
        .get("resourceId")
        .filter(|v| !v.is_null())
}
