use flexsub_provider::PollPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HandlerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub poll: PollPolicy,
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
}

impl HandlerConfig {
    pub fn validate(&self) -> Result<(), String> {
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }

        if self.secrets.endpoint.trim().is_empty() {
            return Err("secrets.endpoint must not be empty".into());
        }
        for (name, value) in [
            ("secrets.api_key_secret", &self.secrets.api_key_secret),
            ("secrets.api_key_field", &self.secrets.api_key_field),
            ("secrets.api_secret_key_secret", &self.secrets.api_secret_key_secret),
            ("secrets.api_secret_key_field", &self.secrets.api_secret_key_field),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{name} must not be empty"));
            }
        }

        self.poll.validate()?;

        if self.orchestration.state_machine_prefix.trim().is_empty()
            && self.orchestration.state_machine_arn.is_none()
        {
            return Err(
                "orchestration.state_machine_prefix or orchestration.state_machine_arn is required"
                    .into(),
            );
        }
        if self
            .orchestration
            .state_machine_arn
            .as_deref()
            .is_some_and(|arn| !arn.starts_with("arn:"))
        {
            return Err("orchestration.state_machine_arn must be an ARN".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// One JSON object per line, for CloudWatch Logs Insights
    #[serde(default)]
    pub json: bool,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Where the API key pair lives in Secrets Manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Parameters and Secrets Lambda Extension listener
    #[serde(default = "default_secrets_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_api_key_secret")]
    pub api_key_secret: String,
    #[serde(default = "default_api_key_field")]
    pub api_key_field: String,
    #[serde(default = "default_api_secret_key_secret")]
    pub api_secret_key_secret: String,
    #[serde(default = "default_api_secret_key_field")]
    pub api_secret_key_field: String,
}
fn default_secrets_endpoint() -> String {
    "http://localhost:2773".into()
}
fn default_api_key_secret() -> String {
    "redis/x_api_key".into()
}
fn default_api_key_field() -> String {
    "x_api_key".into()
}
fn default_api_secret_key_secret() -> String {
    "redis/x_api_secret_key".into()
}
fn default_api_secret_key_field() -> String {
    "x_api_secret_key".into()
}
impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_secrets_endpoint(),
            api_key_secret: default_api_key_secret(),
            api_key_field: default_api_key_field(),
            api_secret_key_secret: default_api_secret_key_secret(),
            api_secret_key_field: default_api_secret_key_field(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// State machine name is `{prefix}-{region}-{stack name}`
    #[serde(default = "default_state_machine_prefix")]
    pub state_machine_prefix: String,
    /// Fixed state machine, overrides the derived one
    #[serde(default)]
    pub state_machine_arn: Option<String>,
    /// In-process polling stops this long before the invocation deadline
    #[serde(default = "default_deadline_margin_ms")]
    pub deadline_margin_ms: u64,
}
fn default_state_machine_prefix() -> String {
    "FlexibleSubscription-StateMachine".into()
}
fn default_deadline_margin_ms() -> u64 {
    10_000
}
impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            state_machine_prefix: default_state_machine_prefix(),
            state_machine_arn: None,
            deadline_margin_ms: default_deadline_margin_ms(),
        }
    }
}

pub mod loader {
    use super::HandlerConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_FILE: &str = "flexsub.toml";

    pub fn load_config(path: Option<&str>) -> Result<HandlerConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., FLEXSUB__POLL__MAX_ATTEMPTS=120
        builder = builder.add_source(
            Environment::with_prefix("FLEXSUB")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: HandlerConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = HandlerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.secrets.api_key_secret, "redis/x_api_key");
        assert_eq!(cfg.secrets.api_secret_key_field, "x_api_secret_key");
        assert_eq!(cfg.orchestration.state_machine_prefix, "FlexibleSubscription-StateMachine");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[logging]
level = "debug"
json = true

[poll]
max_attempts = 5
initial_delay_ms = 200

[orchestration]
state_machine_arn = "arn:aws:states:us-east-1:123456789012:stateMachine:checks"
"#
        )
        .unwrap();

        let cfg = loader::load_config(file.path().to_str()).unwrap();
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
        assert_eq!(cfg.poll.max_attempts, 5);
        assert_eq!(cfg.poll.initial_delay_ms, 200);
        // untouched sections keep their defaults
        assert_eq!(cfg.poll.max_delay_ms, 10_000);
        assert_eq!(cfg.secrets.endpoint, "http://localhost:2773");
        assert!(cfg.orchestration.state_machine_arn.is_some());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[poll]\nmax_attempts = 0").unwrap();

        let err = loader::load_config(file.path().to_str()).unwrap_err();
        assert!(err.contains("max_attempts"));
    }

    #[test]
    fn test_validation() {
        let mut cfg = HandlerConfig::default();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().is_err());

        let mut cfg = HandlerConfig::default();
        cfg.secrets.api_key_field = " ".into();
        assert!(cfg.validate().unwrap_err().contains("api_key_field"));

        let mut cfg = HandlerConfig::default();
        cfg.orchestration.state_machine_arn = Some("checks".into());
        assert!(cfg.validate().is_err());
    }
}
