//! API credentials from Secrets Manager.

use async_trait::async_trait;
use flexsub_provider::Credentials;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::SecretsConfig;
use crate::error::{HandlerError, Result};

/// Fetch a secret by name, decoded into its key/value pairs.
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<Map<String, Value>>;
}

/// Reads secrets through the AWS Parameters and Secrets Lambda Extension.
pub struct ExtensionSecretSource {
    http_client: reqwest::Client,
    endpoint: String,
    session_token: Option<String>,
}

#[derive(Deserialize)]
struct ExtensionResponse {
    #[serde(rename = "SecretString")]
    secret_string: Option<String>,
}

impl ExtensionSecretSource {
    pub fn new(http_client: reqwest::Client, endpoint: &str, session_token: Option<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            session_token,
        }
    }

    /// Authenticates with the function's own session token.
    pub fn from_env(http_client: reqwest::Client, endpoint: &str) -> Self {
        Self::new(http_client, endpoint, std::env::var("AWS_SESSION_TOKEN").ok())
    }
}

#[async_trait]
impl SecretSource for ExtensionSecretSource {
    async fn get_secret(&self, name: &str) -> Result<Map<String, Value>> {
        let url = format!("{}/secretsmanager/get", self.endpoint);
        let mut request = self.http_client.get(&url).query(&[("secretId", name)]);
        if let Some(token) = &self.session_token {
            request = request.header("X-Aws-Parameters-Secrets-Token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HandlerError::secret(name, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HandlerError::secret(name, format!("HTTP {status}: {body}")));
        }

        let envelope: ExtensionResponse = response
            .json()
            .await
            .map_err(|e| HandlerError::secret(name, e.to_string()))?;
        let raw = envelope
            .secret_string
            .ok_or_else(|| HandlerError::secret(name, "no SecretString"))?;

        match serde_json::from_str(&raw) {
            Ok(Value::Object(fields)) => {
                debug!(secret = name, keys = fields.len(), "Secret retrieved");
                Ok(fields)
            }
            _ => Err(HandlerError::secret(name, "SecretString is not a JSON object")),
        }
    }
}

async fn read_field(source: &dyn SecretSource, secret: &str, field: &str) -> Result<String> {
    let fields = source.get_secret(secret).await?;
    match fields.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(HandlerError::secret(secret, format!("missing key {field}"))),
    }
}

/// Resolve the API key pair named by the configuration.
pub async fn load_credentials(source: &dyn SecretSource, config: &SecretsConfig) -> Result<Credentials> {
    let api_key = read_field(source, &config.api_key_secret, &config.api_key_field).await?;
    let api_secret_key =
        read_field(source, &config.api_secret_key_secret, &config.api_secret_key_field).await?;
    Ok(Credentials::new(api_key, api_secret_key))
}
