//! Lambda functions backing the flexible subscription custom resource.
//!
//! `flexsub-handler` reconciles CloudFormation requests,
//! `flexsub-check-state` polls a new subscription from the state machine and
//! `flexsub-cf-response` delivers the final outcome.

pub mod check_state;
pub mod config;
pub mod error;
pub mod handler;
pub mod observability;
pub mod orchestrator;
pub mod outputs;
pub mod reconciler;
pub mod secrets;

pub use config::HandlerConfig;
pub use error::{HandlerError, Result};
pub use handler::{Handler, Invocation};
pub use orchestrator::Orchestrator;
pub use outputs::OutputStore;
pub use reconciler::{Disposition, Reconciler};
pub use secrets::SecretSource;

/// Load configuration, start tracing and wire the AWS collaborators.
pub async fn bootstrap() -> anyhow::Result<Handler> {
    dotenvy::dotenv().ok();
    let config = config::loader::load_config(None).map_err(anyhow::Error::msg)?;
    observability::init_tracing(&config.logging);

    let sdk = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    Ok(Handler::from_aws(config, &sdk)?)
}
