use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use flexsub_core::{CallbackResponse, CfnRequest, Envelope, RequestType, base_url};
use flexsub_provider::{Poller, ProviderClient, ProviderConfig, ResponseReporter};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::check_state;
use crate::config::HandlerConfig;
use crate::error::{HandlerError, Result};
use crate::orchestrator::{self, Orchestrator, StepFunctionsOrchestrator};
use crate::outputs::{CloudFormationOutputs, OutputStore};
use crate::reconciler::{Disposition, Reconciler, physical_resource_id, recorded_outputs};
use crate::secrets::{ExtensionSecretSource, SecretSource, load_credentials};

/// Facts about the running invocation the handlers need.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub log_stream: String,
    pub function_arn: String,
    pub deadline: Option<SystemTime>,
}

impl Invocation {
    pub fn from_context(ctx: &lambda_runtime::Context) -> Self {
        Self {
            log_stream: ctx.env_config.log_stream.clone(),
            function_arn: ctx.invoked_function_arn.clone(),
            deadline: (ctx.deadline > 0).then(|| UNIX_EPOCH + Duration::from_millis(ctx.deadline)),
        }
    }

    fn remaining(&self) -> Option<Duration> {
        self.deadline?.duration_since(SystemTime::now()).ok()
    }
}

/// Shared by all three functions; built once per cold start.
pub struct Handler {
    config: HandlerConfig,
    http_client: reqwest::Client,
    secrets: Arc<dyn SecretSource>,
    outputs: Arc<dyn OutputStore>,
    orchestrator: Arc<dyn Orchestrator>,
    reporter: ResponseReporter,
    region: String,
}

impl Handler {
    pub fn new(
        config: HandlerConfig,
        http_client: reqwest::Client,
        secrets: Arc<dyn SecretSource>,
        outputs: Arc<dyn OutputStore>,
        orchestrator: Arc<dyn Orchestrator>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            reporter: ResponseReporter::with_http(http_client.clone()),
            config,
            http_client,
            secrets,
            outputs,
            orchestrator,
            region: region.into(),
        }
    }

    /// Wire the AWS-backed collaborators from the SDK configuration.
    pub fn from_aws(config: HandlerConfig, sdk: &aws_config::SdkConfig) -> Result<Self> {
        let region = sdk
            .region()
            .map(|r| r.to_string())
            .ok_or_else(|| HandlerError::config("AWS region is not set"))?;
        let http_client = reqwest::Client::new();
        let secrets = Arc::new(ExtensionSecretSource::from_env(
            http_client.clone(),
            &config.secrets.endpoint,
        ));
        let outputs = Arc::new(CloudFormationOutputs::new(aws_sdk_cloudformation::Client::new(sdk)));
        let orchestrator = Arc::new(StepFunctionsOrchestrator::new(aws_sdk_sfn::Client::new(sdk)));
        Ok(Self::new(config, http_client, secrets, outputs, orchestrator, region))
    }

    /// Custom resource entry point. The outcome is delivered exactly once,
    /// either here or by the state machine; only a failed delivery is an error.
    pub async fn handle_custom_resource(&self, request: CfnRequest, invocation: &Invocation) -> Result<()> {
        info!(
            request_type = %request.request_type,
            request_id = %request.request_id,
            stack_id = %request.stack_id,
            logical_resource_id = %request.logical_resource_id,
            "Custom resource request"
        );

        let physical_id = physical_resource_id(&request, &invocation.log_stream);
        let base = CallbackResponse::for_request(&request, physical_id);

        let cancel = self.deadline_token(invocation);
        let _stop_timer = cancel.clone().drop_guard();

        // Nothing recorded means nothing to delete; the provider is not contacted
        let prior = match request.request_type {
            RequestType::Delete => match recorded_outputs(self.outputs.as_ref(), &request).await {
                Some(prior) => Some(prior),
                None => return self.report(&request.response_url, &base).await,
            },
            _ => None,
        };

        let disposition = match self.provider_client(&request.resource_properties).await {
            Ok(client) => {
                let poller = Poller::new(&client, &self.config.poll, cancel.clone());
                let reconciler = Reconciler::new(&client, poller, self.outputs.as_ref());
                match &prior {
                    Some(prior) => reconciler.delete_recorded(&request, prior, base).await,
                    None => reconciler.reconcile(&request, base).await,
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot reach the subscriptions API");
                Disposition::Report(base.failed(e.to_string()))
            }
        };

        match disposition {
            Disposition::Report(response) => self.report(&request.response_url, &response).await,
            Disposition::Deferred(envelope) => match self.hand_off(&request, invocation, &envelope).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    error!(error = %e, "Hand-off failed, reporting directly");
                    let response = envelope.response_body.failed(e.to_string());
                    self.report(&request.response_url, &response).await
                }
            },
        }
    }

    /// One iteration of the state machine's status loop.
    pub async fn check_state(&self, envelope: Envelope) -> Result<Envelope> {
        let credentials = load_credentials(self.secrets.as_ref(), &self.config.secrets).await?;
        let client = ProviderClient::with_http(
            self.http_client.clone(),
            ProviderConfig::new(&envelope.base_url, credentials),
        );
        check_state::check_state(&client, envelope).await
    }

    /// Final step of the state machine.
    pub async fn deliver(&self, envelope: Envelope) -> Result<()> {
        if let Some(err) = &envelope.error {
            error!(error = %err.error, cause = ?err.cause, "Status checks gave up");
        } else if !envelope.terminal {
            warn!(sub_status = ?envelope.sub_status, "Delivering before the subscription settled");
        }
        let response_url = envelope.response_url.clone();
        self.report(&response_url, &envelope.into_outcome()).await
    }

    async fn report(&self, response_url: &str, response: &CallbackResponse) -> Result<()> {
        self.reporter.report(response_url, response).await?;
        Ok(())
    }

    async fn provider_client(&self, properties: &Map<String, Value>) -> Result<ProviderClient> {
        let url = base_url(properties)?;
        let credentials = load_credentials(self.secrets.as_ref(), &self.config.secrets).await?;
        Ok(ProviderClient::with_http(
            self.http_client.clone(),
            ProviderConfig::new(&url, credentials),
        ))
    }

    async fn hand_off(&self, request: &CfnRequest, invocation: &Invocation, envelope: &Envelope) -> Result<()> {
        let arn = match &self.config.orchestration.state_machine_arn {
            Some(arn) => arn.clone(),
            None => orchestrator::state_machine_arn(
                &self.region,
                orchestrator::account_id(&invocation.function_arn)?,
                &self.config.orchestration.state_machine_prefix,
                request.stack_name()?,
            ),
        };
        let name = orchestrator::execution_name(&request.request_id);
        let input = serde_json::to_string(envelope)?;

        info!(state_machine_arn = %arn, execution = %name, "Handing off status checks");
        self.orchestrator.start_execution(&arn, &name, &input).await?;
        Ok(())
    }

    /// Cancelled shortly before the invocation would be killed.
    fn deadline_token(&self, invocation: &Invocation) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(remaining) = invocation.remaining() {
            let budget = remaining.saturating_sub(Duration::from_millis(
                self.config.orchestration.deadline_margin_ms,
            ));
            let timer = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = timer.cancelled() => {}
                    _ = tokio::time::sleep(budget) => {
                        warn!("Invocation deadline approaching, stopping waits");
                        timer.cancel();
                    }
                }
            });
        }
        token
    }
}
