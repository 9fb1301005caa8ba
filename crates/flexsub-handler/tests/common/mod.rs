#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flexsub_core::{CfnRequest, PriorOutputs};
use flexsub_handler::{Handler, HandlerConfig, HandlerError, Invocation, Orchestrator, OutputStore, SecretSource};
use flexsub_provider::PollPolicy;
use serde_json::{Map, Value, json};
use wiremock::MockServer;

pub const STACK_ID: &str = "arn:aws:cloudformation:us-east-1:123456789012:stack/redis-stack/6a1b2c3d";
pub const FUNCTION_ARN: &str = "arn:aws:lambda:us-east-1:123456789012:function:flexsub-handler";
pub const LOG_STREAM: &str = "2026/10/19/[$LATEST]0123456789abcdef";

pub struct StaticSecrets;

#[async_trait]
impl SecretSource for StaticSecrets {
    async fn get_secret(&self, name: &str) -> Result<Map<String, Value>, HandlerError> {
        let value = match name {
            "redis/x_api_key" => json!({"x_api_key": "test-key"}),
            "redis/x_api_secret_key" => json!({"x_api_secret_key": "test-secret"}),
            _ => return Err(HandlerError::secret(name, "not found")),
        };
        Ok(value.as_object().cloned().unwrap_or_default())
    }
}

/// Secrets Manager without the provider credentials.
pub struct MissingSecrets;

#[async_trait]
impl SecretSource for MissingSecrets {
    async fn get_secret(&self, name: &str) -> Result<Map<String, Value>, HandlerError> {
        Err(HandlerError::secret(name, "Secrets Manager can't find the specified secret."))
    }
}

#[derive(Default)]
pub struct MemoryOutputs {
    outputs: Mutex<Option<PriorOutputs>>,
    fail: bool,
}

impl MemoryOutputs {
    pub fn with(outputs: PriorOutputs) -> Self {
        Self {
            outputs: Mutex::new(Some(outputs)),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            outputs: Mutex::new(None),
            fail: true,
        }
    }

    pub fn clear(&self) {
        *self.outputs.lock().unwrap() = None;
    }
}

#[async_trait]
impl OutputStore for MemoryOutputs {
    async fn prior_outputs(&self, _stack_name: &str) -> Result<Option<PriorOutputs>, HandlerError> {
        if self.fail {
            return Err(HandlerError::Outputs("Stack with id redis-stack does not exist".into()));
        }
        Ok(self.outputs.lock().unwrap().clone())
    }
}

#[derive(Debug, Clone)]
pub struct Execution {
    pub state_machine_arn: String,
    pub name: String,
    pub input: Value,
}

#[derive(Default)]
pub struct RecordingOrchestrator {
    pub executions: Mutex<Vec<Execution>>,
    pub fail: bool,
}

#[async_trait]
impl Orchestrator for RecordingOrchestrator {
    async fn start_execution(&self, state_machine_arn: &str, name: &str, input: &str) -> Result<String, HandlerError> {
        if self.fail {
            return Err(HandlerError::Orchestration("State Machine Does Not Exist".into()));
        }
        self.executions.lock().unwrap().push(Execution {
            state_machine_arn: state_machine_arn.to_string(),
            name: name.to_string(),
            input: serde_json::from_str(input).unwrap(),
        });
        Ok(format!("{state_machine_arn}:{name}"))
    }
}

pub fn test_config() -> HandlerConfig {
    HandlerConfig {
        poll: PollPolicy {
            initial_delay_ms: 1,
            max_delay_ms: 5,
            multiplier: 2.0,
            max_attempts: 20,
            jitter: false,
        },
        ..Default::default()
    }
}

pub fn handler(outputs: Arc<MemoryOutputs>, orchestrator: Arc<RecordingOrchestrator>) -> Handler {
    handler_with_secrets(Arc::new(StaticSecrets), outputs, orchestrator)
}

pub fn handler_with_secrets(
    secrets: Arc<dyn SecretSource>,
    outputs: Arc<MemoryOutputs>,
    orchestrator: Arc<RecordingOrchestrator>,
) -> Handler {
    Handler::new(
        test_config(),
        reqwest::Client::new(),
        secrets,
        outputs,
        orchestrator,
        "us-east-1",
    )
}

pub fn invocation() -> Invocation {
    Invocation {
        log_stream: LOG_STREAM.into(),
        function_arn: FUNCTION_ARN.into(),
        deadline: None,
    }
}

pub fn properties(server: &MockServer) -> Value {
    json!({
        "ServiceToken": "arn:aws:lambda:us-east-1:123456789012:function:flexsub-handler",
        "baseURL": server.uri(),
        "subName": "cache",
        "dryRun": "false",
        "paymentMethodId": "8840",
        "provider": "AWS",
        "region": "us-east-1",
        "deploymentCIDR": "10.0.0.0/24",
        "dbname": "db1",
        "memoryLimitInGb": "1",
        "moduleName": "RedisJSON, RediSearch"
    })
}

pub fn event(server: &MockServer, request_type: &str, properties: Value, physical_id: Option<&str>) -> CfnRequest {
    let mut raw = json!({
        "RequestType": request_type,
        "ResponseURL": format!("{}/callback", server.uri()),
        "StackId": STACK_ID,
        "RequestId": "5f0b7c3e-1a2b-4c5d-8e9f-0a1b2c3d4e5f",
        "LogicalResourceId": "FlexSubscription",
        "ResourceType": "Custom::FlexibleSubscription",
        "ResourceProperties": properties
    });
    if let Some(id) = physical_id {
        raw["PhysicalResourceId"] = json!(id);
    }
    serde_json::from_value(raw).unwrap()
}

pub fn prior_outputs() -> PriorOutputs {
    PriorOutputs {
        subscription_id: "101".into(),
        post_call: r#"{"name":"cache","deploymentType":"single-region","paymentMethodId":8840}"#.into(),
        default_database_id: "5001".into(),
        subscription_description: "Request processing completed successfully".into(),
    }
}

pub fn task(server: &MockServer, task_id: &str, status: &str) -> Value {
    json!({
        "taskId": task_id,
        "status": status,
        "description": "Task request received and is being queued for processing.",
        "links": [{"href": format!("{}/v1/tasks/{task_id}", server.uri()), "rel": "task", "type": "GET"}]
    })
}

pub fn failed_task(task_id: &str, description: &str) -> Value {
    json!({
        "taskId": task_id,
        "status": "processing-error",
        "description": "Task request failed during processing. See error information for failure details.",
        "response": {"error": {"type": "GENERAL_ERROR", "status": "400 BAD_REQUEST", "description": description}}
    })
}

pub fn completed_task(task_id: &str, resource_id: u64) -> Value {
    json!({
        "taskId": task_id,
        "status": "processing-completed",
        "description": "Request processing completed successfully and its resources are now being provisioned / de-provisioned.",
        "response": {"resourceId": resource_id}
    })
}

pub fn databases(ids: &[u64]) -> Value {
    let dbs: Vec<Value> = ids.iter().map(|id| json!({"databaseId": id, "name": format!("db-{id}")})).collect();
    json!({"accountId": 1, "subscription": [{"subscriptionId": 101, "numberOfDatabases": ids.len(), "databases": dbs}]})
}

/// Bodies PUT to the callback URL, in order.
pub async fn callbacks(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "PUT" && r.url.path() == "/callback")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}
