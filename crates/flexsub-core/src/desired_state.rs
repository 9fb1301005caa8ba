//! Desired state of the custom resource, parsed once from `ResourceProperties`.

use serde_json::{Map, Value};
use url::Url;

use crate::error::{CoreError, Result};
use crate::properties::{Properties, split_list};
use crate::request::{
    CloudProvider, CreateSubscriptionRequest, DEPLOYMENT_TYPE, DatabaseSpec, Module, Networking,
    RegionSpec, ThroughputMeasurement, UpdateSubscriptionRequest,
};

/// Property holding the provider API base URL.
pub const BASE_URL_PROPERTY: &str = "baseURL";

/// Typed desired state of a flexible subscription and its default database.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    /// Provider API base URL without a trailing slash
    pub base_url: String,

    pub subscription_name: Option<String>,
    pub dry_run: Option<bool>,
    pub payment_method: Option<String>,
    pub payment_method_id: Option<i64>,
    pub memory_storage: Option<String>,
    pub redis_version: Option<String>,

    // Cloud provider / region
    pub provider: Option<String>,
    pub cloud_account_id: Option<i64>,
    pub region: String,
    pub multiple_availability_zones: Option<bool>,
    pub preferred_availability_zones: Option<Vec<String>>,
    pub deployment_cidr: String,
    pub vpc_id: Option<String>,

    // Default database
    pub database_name: String,
    pub protocol: Option<String>,
    pub memory_limit_in_gb: i64,
    pub support_oss_cluster_api: Option<bool>,
    pub data_persistence: Option<String>,
    pub replication: Option<bool>,
    pub throughput_by: Option<String>,
    pub throughput_value: Option<i64>,
    pub modules: Option<Vec<String>>,
    pub parameters: Option<Value>,
    pub quantity: Option<i64>,
    pub average_item_size_in_bytes: Option<i64>,
    pub resp_version: Option<String>,
}

impl DesiredState {
    pub fn from_properties(raw: &Map<String, Value>) -> Result<Self> {
        let p = Properties::new(raw);

        Ok(Self {
            base_url: base_url(raw)?,
            subscription_name: p.string("subName")?,
            dry_run: p.bool("dryRun")?,
            payment_method: p.string("paymentMethod")?,
            payment_method_id: p.int("paymentMethodId")?,
            memory_storage: p.string("memoryStorage")?,
            redis_version: p.string("redisVersion")?,
            provider: p.string("provider")?,
            cloud_account_id: p.int("cloudAccountId")?,
            region: p.required_string("region")?,
            multiple_availability_zones: p.bool("multipleAvailabilityZones")?,
            preferred_availability_zones: p.list("preferredAvailabilityZones")?,
            deployment_cidr: p.required_string("deploymentCIDR")?,
            vpc_id: p.string("vpcId")?,
            database_name: p.required_string("dbname")?,
            protocol: p.string("protocol")?,
            memory_limit_in_gb: p.required_int("memoryLimitInGb")?,
            support_oss_cluster_api: p.bool("supportOSSClusterApi")?,
            data_persistence: p.string("dataPersistence")?,
            replication: p.bool("replication")?,
            throughput_by: p.string("by")?,
            throughput_value: p.int("value")?,
            modules: p
                .string("moduleName")?
                .map(|names| split_list(&names))
                .filter(|names| !names.is_empty()),
            parameters: p.json("parameters"),
            quantity: p.int("quantity")?,
            average_item_size_in_bytes: p.int("averageItemSizeInBytes")?,
            resp_version: p.string("respVersion")?,
        })
    }

    /// Body of the create call.
    pub fn create_request(&self) -> CreateSubscriptionRequest {
        let region = RegionSpec {
            region: self.region.clone(),
            multiple_availability_zones: self.multiple_availability_zones,
            preferred_availability_zones: self.preferred_availability_zones.clone(),
            networking: Networking {
                deployment_cidr: self.deployment_cidr.clone(),
                vpc_id: self.vpc_id.clone(),
            },
        };

        let database = DatabaseSpec {
            name: self.database_name.clone(),
            protocol: self.protocol.clone(),
            memory_limit_in_gb: self.memory_limit_in_gb,
            support_oss_cluster_api: self.support_oss_cluster_api,
            data_persistence: self.data_persistence.clone(),
            replication: self.replication,
            // "value" alone means nothing to the API
            throughput_measurement: self.throughput_by.as_ref().map(|by| ThroughputMeasurement {
                by: by.clone(),
                value: self.throughput_value,
            }),
            modules: self.modules.as_ref().map(|names| {
                names
                    .iter()
                    .map(|name| Module { name: name.clone() })
                    .collect()
            }),
            parameters: self.parameters.clone(),
            quantity: self.quantity,
            average_item_size_in_bytes: self.average_item_size_in_bytes,
            resp_version: self.resp_version.clone(),
        };

        CreateSubscriptionRequest {
            name: self.subscription_name.clone(),
            dry_run: self.dry_run,
            deployment_type: DEPLOYMENT_TYPE.to_string(),
            payment_method: self.payment_method.clone(),
            payment_method_id: self.payment_method_id,
            memory_storage: self.memory_storage.clone(),
            cloud_providers: vec![CloudProvider {
                provider: self.provider.clone(),
                cloud_account_id: self.cloud_account_id,
                regions: vec![region],
            }],
            databases: vec![database],
            redis_version: self.redis_version.clone(),
        }
    }

    /// Body of the update call, restricted to the fields that can change in place.
    pub fn update_request(&self) -> UpdateSubscriptionRequest {
        UpdateSubscriptionRequest {
            name: self.subscription_name.clone(),
            payment_method_id: self.payment_method_id,
        }
    }
}

/// Read and validate only the provider base URL.
///
/// Delete needs nothing else, so a template whose other properties have
/// drifted can still be torn down.
pub fn base_url(raw: &Map<String, Value>) -> Result<String> {
    let value = Properties::new(raw).required_string(BASE_URL_PROPERTY)?;
    let parsed = Url::parse(&value)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CoreError::invalid_property(
            BASE_URL_PROPERTY,
            format!("unsupported scheme {}", parsed.scheme()),
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}
