use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}: {body}")]
    Status {
        url: String,
        status: u16,
        /// Parsed body, or the raw text as a JSON string
        body: Value,
    },

    #[error("Unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl ProviderError {
    /// Body of a rejected request, if the provider sent one.
    pub fn rejection_body(&self) -> Option<&Value> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("Timed out waiting for {what} after {attempts} attempts")]
    Exhausted { what: &'static str, attempts: u32 },

    #[error("Stopped waiting for {what}: invocation is about to time out")]
    Cancelled { what: &'static str },

    /// The task ended in `processing-error`; the message is the provider's description.
    #[error("{0}")]
    TaskFailed(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("Failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to deliver response: {0}")]
    Delivery(#[from] reqwest::Error),

    #[error("Response URL rejected the response (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}
