use flexsub_core::{
    CreateSubscriptionRequest, DatabaseList, Subscription, SubscriptionList, SubscriptionStatus,
    UpdateSubscriptionRequest,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

/// Page size used when listing a subscription's databases
pub const DATABASE_PAGE_LIMIT: u32 = 100;

pub struct ProviderClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_http(reqwest::Client::new(), config)
    }

    /// Share one connection pool across invocations.
    pub fn with_http(http: reqwest::Client, config: ProviderConfig) -> Self {
        Self { http, config }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn subscriptions_url(&self, path: &str) -> String {
        format!("{}/v1/subscriptions/{}", self.config.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("accept", "application/json")
            .header("x-api-key", &self.config.credentials.api_key)
            .header("x-api-secret-key", &self.config.credentials.api_secret_key)
    }

    async fn send(&self, method: Method, url: &str, body: Option<&impl Serialize>) -> Result<Value, ProviderError> {
        debug!(%method, url, "Calling subscriptions API");
        let mut req = self.request(method, url);
        if let Some(body) = body {
            req = req.header("Content-Type", "application/json").json(body);
        }
        let resp = req.send().await.map_err(|source| ProviderError::Request {
            url: url.to_string(),
            source,
        })?;
        handle_response(url, resp).await
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let body = self.send(Method::GET, url, None::<&()>).await?;
        decode(url, body)
    }

    /// `POST /v1/subscriptions/`; returns the task document.
    pub async fn create_subscription(&self, body: &CreateSubscriptionRequest) -> Result<Value, ProviderError> {
        let url = self.subscriptions_url("");
        self.send(Method::POST, &url, Some(body)).await
    }

    pub async fn list_subscriptions(&self) -> Result<SubscriptionList, ProviderError> {
        self.get(&self.subscriptions_url("")).await
    }

    pub async fn get_subscription(&self, id: &str) -> Result<Subscription, ProviderError> {
        self.get(&self.subscriptions_url(id)).await
    }

    pub async fn subscription_status(&self, id: &str) -> Result<SubscriptionStatus, ProviderError> {
        let status = self.get_subscription(id).await?.status;
        debug!(subscription_id = id, %status, "Subscription status");
        Ok(status)
    }

    /// `PUT /v1/subscriptions/{id}`; returns the task document.
    pub async fn update_subscription(&self, id: &str, body: &UpdateSubscriptionRequest) -> Result<Value, ProviderError> {
        let url = self.subscriptions_url(id);
        self.send(Method::PUT, &url, Some(body)).await
    }

    /// `DELETE /v1/subscriptions/{id}`; returns the task document.
    pub async fn delete_subscription(&self, id: &str) -> Result<Value, ProviderError> {
        let url = self.subscriptions_url(id);
        self.send(Method::DELETE, &url, None::<&()>).await
    }

    pub async fn list_databases(&self, subscription_id: &str, offset: u32, limit: u32) -> Result<DatabaseList, ProviderError> {
        let url = format!(
            "{}?offset={offset}&limit={limit}",
            self.subscriptions_url(&format!("{subscription_id}/databases"))
        );
        self.get(&url).await
    }

    /// `DELETE /v1/subscriptions/{id}/databases/{db}`; returns the task document.
    pub async fn delete_database(&self, subscription_id: &str, database_id: &str) -> Result<Value, ProviderError> {
        let url = self.subscriptions_url(&format!("{subscription_id}/databases/{database_id}"));
        self.send(Method::DELETE, &url, None::<&()>).await
    }

    /// GET an absolute link handed out by the API (task status, self links).
    pub async fn follow(&self, href: &str) -> Result<Value, ProviderError> {
        self.send(Method::GET, href, None::<&()>).await
    }
}

async fn handle_response(url: &str, resp: reqwest::Response) -> Result<Value, ProviderError> {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };

    if !status.is_success() {
        return Err(ProviderError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    if let Value::String(raw) = &body {
        return Err(ProviderError::Decode {
            url: url.to_string(),
            reason: format!("body is not JSON: {raw}"),
        });
    }

    Ok(body)
}

fn decode<T: DeserializeOwned>(url: &str, body: Value) -> Result<T, ProviderError> {
    serde_json::from_value(body).map_err(|e| ProviderError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
