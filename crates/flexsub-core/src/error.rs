use thiserror::Error;

/// Core error types for custom resource payloads
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Missing required property: {0}")]
    MissingProperty(String),

    #[error("Invalid property {name}: {reason}")]
    InvalidProperty { name: String, reason: String },

    #[error("Invalid stack id: {0}")]
    InvalidStackId(String),

    #[error("Invalid recorded output {name}: {reason}")]
    InvalidOutput { name: String, reason: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl CoreError {
    /// Create a new MissingProperty error
    pub fn missing_property(name: impl Into<String>) -> Self {
        Self::MissingProperty(name.into())
    }

    /// Create a new InvalidProperty error
    pub fn invalid_property(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProperty {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidOutput error
    pub fn invalid_output(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOutput {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
