//! Request bodies sent to the subscriptions API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Only single-region subscriptions are provisioned.
pub const DEPLOYMENT_TYPE: &str = "single-region";

/// `POST /v1/subscriptions/` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,

    pub deployment_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_storage: Option<String>,

    pub cloud_providers: Vec<CloudProvider>,

    pub databases: Vec<DatabaseSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudProvider {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_account_id: Option<i64>,

    pub regions: Vec<RegionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSpec {
    pub region: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_availability_zones: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_availability_zones: Option<Vec<String>>,

    pub networking: Networking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    #[serde(rename = "deploymentCIDR")]
    pub deployment_cidr: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    pub memory_limit_in_gb: i64,

    #[serde(rename = "supportOSSClusterApi", skip_serializing_if = "Option::is_none")]
    pub support_oss_cluster_api: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_persistence: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_measurement: Option<ThroughputMeasurement>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<Module>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_item_size_in_bytes: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputMeasurement {
    pub by: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
}

/// `PUT /v1/subscriptions/{id}` body. Only these fields can change in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<i64>,
}

impl UpdateSubscriptionRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.payment_method_id.is_none()
    }
}
