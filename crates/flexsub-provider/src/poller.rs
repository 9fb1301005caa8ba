//! Bounded polling of task links handed out by the subscriptions API.
//!
//! Every wait is capped by [`PollPolicy::max_attempts`] and by the
//! invocation's [`CancellationToken`], which is cancelled shortly before
//! the function's deadline.

use std::time::Duration;

use flexsub_core::api::{contains_processing_error, error_description, resource_id};
use flexsub_core::TaskState;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::ProviderClient;
use crate::error::{PollError, ProviderError};

/// Backoff schedule for a single wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollPolicy {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Randomise each delay to 0.5x..1.5x
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_multiplier() -> f64 {
    1.5
}
fn default_max_attempts() -> u32 {
    90
}
fn default_jitter() -> bool {
    true
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            max_attempts: default_max_attempts(),
            jitter: default_jitter(),
        }
    }
}

impl PollPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("poll.max_attempts must be > 0".into());
        }
        if self.initial_delay_ms == 0 {
            return Err("poll.initial_delay_ms must be > 0".into());
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err("poll.max_delay_ms must be >= poll.initial_delay_ms".into());
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err("poll.multiplier must be >= 1.0".into());
        }
        Ok(())
    }

    /// Un-jittered delay after the given (1-based) attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let millis = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(millis.min(self.max_delay_ms as f64) as u64)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }
        let factor = rand::thread_rng().gen_range(0.5..1.5);
        Duration::from_secs_f64(delay.as_secs_f64() * factor)
    }
}

/// Transport failures and 5xx answers are retried within the attempt budget.
fn is_transient(err: &ProviderError) -> bool {
    match err {
        ProviderError::Request { .. } => true,
        _ => err.status().is_some_and(|status| status >= 500),
    }
}

fn is_finished(body: &Value) -> bool {
    let status = body.get("status").and_then(Value::as_str);
    matches!(status, Some("processing-completed" | "processing-error"))
}

pub struct Poller<'a> {
    client: &'a ProviderClient,
    policy: &'a PollPolicy,
    cancel: CancellationToken,
}

impl<'a> Poller<'a> {
    pub fn new(client: &'a ProviderClient, policy: &'a PollPolicy, cancel: CancellationToken) -> Self {
        Self {
            client,
            policy,
            cancel,
        }
    }

    /// GET `href` until `matches` accepts the body, returning that body.
    pub async fn poll_until<F>(&self, href: &str, what: &'static str, mut matches: F) -> Result<Value, PollError>
    where
        F: FnMut(&Value) -> bool,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(PollError::Cancelled { what }),
                fetched = self.client.follow(href) => fetched,
            };

            match fetched {
                Ok(body) if matches(&body) => {
                    debug!(what, attempt, "Poll condition met");
                    return Ok(body);
                }
                Ok(_) => {}
                Err(e) if is_transient(&e) => {
                    warn!(what, attempt, error = %e, "Transient error while polling");
                }
                Err(e) => return Err(e.into()),
            }

            if attempt >= self.policy.max_attempts {
                warn!(what, attempt, href, "Giving up polling");
                return Err(PollError::Exhausted {
                    what,
                    attempts: attempt,
                });
            }

            let delay = self.policy.jittered(self.policy.delay_for(attempt));
            debug!(what, attempt, delay_ms = delay.as_millis() as u64, "Condition not met yet");

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(PollError::Cancelled { what }),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Wait for a create task to yield its resource id.
    ///
    /// A task that ends in `processing-error` instead fails with the
    /// provider's error description.
    pub async fn wait_for_resource(&self, href: &str) -> Result<TaskState, PollError> {
        let body = self
            .poll_until(href, "resource id", |b| {
                resource_id(b).is_some() || contains_processing_error(b)
            })
            .await?;
        let task = decode_task(href, body)?;
        if task.resource_id().is_none() {
            return Err(task_failure(&task));
        }
        Ok(task)
    }

    /// Wait for a rejected request's task to carry its error description.
    ///
    /// Returns `None` when the task completed without reporting an error.
    pub async fn wait_for_error_description(&self, href: &str) -> Result<Option<String>, PollError> {
        let body = self
            .poll_until(href, "error description", |b| {
                error_description(b).is_some() || is_finished(b)
            })
            .await?;
        if let Some(description) = error_description(&body) {
            return Ok(Some(description.to_string()));
        }
        let task = decode_task(href, body)?;
        if task.is_completed() {
            debug!(href, "Task completed without an error description");
            return Ok(None);
        }
        Ok(Some(failure_description(&task)))
    }

    /// Wait for a task to finish; a failed task becomes [`PollError::TaskFailed`].
    pub async fn wait_for_task(&self, href: &str) -> Result<TaskState, PollError> {
        let body = self
            .poll_until(href, "task completion", is_finished)
            .await?;
        let task = decode_task(href, body)?;
        if task.is_failed() {
            return Err(task_failure(&task));
        }
        Ok(task)
    }
}

fn decode_task(href: &str, body: Value) -> Result<TaskState, PollError> {
    serde_json::from_value(body).map_err(|e| {
        PollError::Provider(ProviderError::Decode {
            url: href.to_string(),
            reason: e.to_string(),
        })
    })
}

fn failure_description(task: &TaskState) -> String {
    task.error_description()
        .or(task.description.as_deref())
        .unwrap_or("Task failed without an error description")
        .to_string()
}

fn task_failure(task: &TaskState) -> PollError {
    PollError::TaskFailed(failure_description(task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = PollPolicy {
            initial_delay_ms: 1_000,
            max_delay_ms: 5_000,
            multiplier: 2.0,
            max_attempts: 10,
            jitter: false,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4_000));
        assert_eq!(policy.delay_for(4), Duration::from_millis(5_000));
        assert_eq!(policy.delay_for(60), Duration::from_millis(5_000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = PollPolicy::default();
        for _ in 0..100 {
            let d = policy.jittered(Duration::from_millis(1_000));
            assert!(d >= Duration::from_millis(500));
            assert!(d <= Duration::from_millis(1_500));
        }
    }

    #[test]
    fn test_policy_validation() {
        assert!(PollPolicy::default().validate().is_ok());

        let policy = PollPolicy {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(policy.validate().is_err());

        let policy = PollPolicy {
            multiplier: 0.5,
            ..Default::default()
        };
        assert!(policy.validate().is_err());

        let policy = PollPolicy {
            initial_delay_ms: 20_000,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_transient_classification() {
        let server_error = ProviderError::Status {
            url: "u".into(),
            status: 503,
            body: Value::Null,
        };
        let client_error = ProviderError::Status {
            url: "u".into(),
            status: 404,
            body: Value::Null,
        };
        assert!(is_transient(&server_error));
        assert!(!is_transient(&client_error));
    }
}
