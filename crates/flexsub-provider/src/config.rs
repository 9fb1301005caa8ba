//! Connection settings for the subscriptions API.

/// API key pair sent as `x-api-key` / `x-api-secret-key` headers.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret_key: api_secret_key.into(),
        }
    }
}

// Keys never end up in logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("api_secret_key", &"***")
            .finish()
    }
}

/// Everything a [`crate::ProviderClient`] needs; passed in, never global.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API root without trailing slash, e.g. `https://api.redislabs.com`
    pub base_url: String,
    pub credentials: Credentials,
}

impl ProviderConfig {
    pub fn new(base_url: &str, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }
}
