//! Azure Resource Manager REST client
//!
//! Handles authentication, retry of throttled and transient responses,
//! decoding of ARM error bodies, and waiting on long-running operations.

use crate::auth::ClientSecretCredential;
use crate::config::AzureConfig;
use crate::error::{AzureError, Result};
use infraflow_cloud::{PollConfig, RetryConfig, WaitUntil};
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

const ASYNC_OPERATION: &str = "azure-asyncoperation";

pub struct ArmClient {
    http: reqwest::Client,
    endpoint: String,
    credential: ClientSecretCredential,
    retry: RetryConfig,
    poll: PollConfig,
}

impl ArmClient {
    pub fn new(config: &AzureConfig, retry: RetryConfig, poll: PollConfig) -> Self {
        let http = reqwest::Client::new();
        Self {
            credential: ClientSecretCredential::new(http.clone(), config),
            endpoint: config.resource_manager.trim_end_matches('/').to_string(),
            http,
            retry,
            poll,
        }
    }

    fn url(&self, path: &str, api_version: &str) -> String {
        format!("{}{}?api-version={}", self.endpoint, path, api_version)
    }

    /// GET a resource. 404 means it does not exist.
    pub async fn get(
        &self,
        path: &str,
        api_version: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>> {
        let url = self.url(path, api_version);
        let response = self.send(Method::GET, &url, None, cancel).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => Ok(Some(cancellable(cancel, response.json()).await??)),
            _ => Err(decode_error(response).await),
        }
    }

    /// PUT a resource definition, then wait per `wait`
    ///
    /// With [`WaitUntil::Completed`] the returned body is the resource as
    /// re-read after the operation reached a terminal state.
    pub async fn put(
        &self,
        path: &str,
        api_version: &str,
        body: &Value,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let url = self.url(path, api_version);
        let response = self.send(Method::PUT, &url, Some(body), cancel).await?;
        if !response.status().is_success() {
            return Err(decode_error(response).await);
        }

        let monitor = operation_url(response.headers());
        let retry_after = retry_after(response.headers());
        let accepted = read_body(response, cancel).await?;
        if wait == WaitUntil::Started {
            return Ok(accepted);
        }

        let resource = match monitor {
            Some(monitor) => {
                self.wait_for_operation(&monitor, retry_after, cancel).await?;
                self.get(path, api_version, cancel)
                    .await?
                    .ok_or_else(|| AzureError::Api {
                        status: 404,
                        code: Some("ResourceNotFound".to_string()),
                        message: format!("{path} disappeared after provisioning"),
                    })?
            }
            None if !accepted.is_null() && is_terminal(provisioning_state(&accepted)) => accepted,
            None => self.wait_for_resource(path, api_version, cancel).await?,
        };

        if let Some(state @ ("Failed" | "Canceled")) = provisioning_state(&resource) {
            return Err(AzureError::OperationFailed {
                status: state.to_string(),
                message: format!("{path} provisioning ended in state {state}"),
            });
        }
        Ok(resource)
    }

    /// DELETE a resource, then wait per `wait`
    pub async fn delete(
        &self,
        path: &str,
        api_version: &str,
        wait: WaitUntil,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let url = self.url(path, api_version);
        let response = self.send(Method::DELETE, &url, None, cancel).await?;
        if !response.status().is_success() {
            return Err(decode_error(response).await);
        }

        if wait == WaitUntil::Completed && response.status() == StatusCode::ACCEPTED {
            if let Some(monitor) = operation_url(response.headers()) {
                let retry_after = retry_after(response.headers());
                self.wait_for_operation(&monitor, retry_after, cancel).await?;
            }
        }
        Ok(())
    }

    /// Poll an operation monitor URL until it reports a terminal status
    async fn wait_for_operation(
        &self,
        monitor: &str,
        first_delay: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let deadline = Instant::now() + self.poll.timeout;
        let mut delay = first_delay.unwrap_or(self.poll.interval);

        loop {
            self.pause(delay, deadline, cancel).await?;

            let response = self.send(Method::GET, monitor, None, cancel).await?;
            let status = response.status();
            delay = retry_after(response.headers()).unwrap_or(self.poll.interval);

            if !status.is_success() {
                return Err(decode_error(response).await);
            }
            if status == StatusCode::ACCEPTED {
                tracing::debug!(monitor, "Operation still running");
                continue;
            }

            let text = cancellable(cancel, response.text()).await??;
            let Ok(operation) = serde_json::from_str::<OperationStatus>(&text) else {
                // Location monitors answer 200/204 with the resource (or nothing) once done.
                return Ok(());
            };
            if operation.status == "Succeeded" {
                return Ok(());
            }
            if matches!(operation.status.as_str(), "Failed" | "Canceled") {
                let message = match operation.error {
                    Some(error) => error.message,
                    None => format!("operation ended in state {}", operation.status),
                };
                return Err(AzureError::OperationFailed {
                    status: operation.status,
                    message,
                });
            }
            tracing::debug!(monitor, status = %operation.status, "Operation still running");
        }
    }

    /// Re-read a resource until its provisioning state is terminal
    async fn wait_for_resource(
        &self,
        path: &str,
        api_version: &str,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let deadline = Instant::now() + self.poll.timeout;
        loop {
            self.pause(self.poll.interval, deadline, cancel).await?;
            let Some(resource) = self.get(path, api_version, cancel).await? else {
                continue;
            };
            if is_terminal(provisioning_state(&resource)) {
                return Ok(resource);
            }
            tracing::debug!(path, state = ?provisioning_state(&resource), "Resource still provisioning");
        }
    }

    async fn pause(
        &self,
        delay: Duration,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let Some(delay) = sleep_budget(Instant::now(), delay, deadline) else {
            return Err(AzureError::Timeout(self.poll.timeout));
        };
        cancellable(cancel, sleep(delay)).await
    }

    /// Send one request, retrying 429 and 5xx responses per [`RetryConfig`]
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        let mut attempt = 0;
        loop {
            let token = self.credential.token(cancel).await?;
            let mut request = self.http.request(method.clone(), url).bearer_auth(token);
            if let Some(body) = body {
                request = request.json(body);
            }

            tracing::debug!(%method, url, attempt, "Calling Resource Manager");
            let response = cancellable(cancel, request.send()).await??;
            let status = response.status();

            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if !retryable || attempt + 1 >= self.retry.max_attempts {
                return Ok(response);
            }

            let delay = retry_after(response.headers())
                .unwrap_or_else(|| self.retry.delay_for_attempt(attempt))
                .min(self.retry.max_delay);
            tracing::warn!(%method, url, %status, ?delay, "Resource Manager asked us to back off");
            cancellable(cancel, sleep(delay)).await?;
            attempt += 1;
        }
    }
}

/// Run `fut` unless `cancel` fires first
async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output> {
    tokio::select! {
        _ = cancel.cancelled() => Err(AzureError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Response body as JSON; an empty body reads as `null`
async fn read_body(response: Response, cancel: &CancellationToken) -> Result<Value> {
    let text = cancellable(cancel, response.text()).await??;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

fn operation_url(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ASYNC_OPERATION)
        .or_else(|| headers.get(LOCATION))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

pub(crate) fn provisioning_state(resource: &Value) -> Option<&str> {
    resource
        .pointer("/properties/provisioningState")
        .and_then(Value::as_str)
}

/// Sleep before the next poll, cut short so one last poll lands on the deadline
///
/// `None` once the deadline has passed.
fn sleep_budget(now: Instant, delay: Duration, deadline: Instant) -> Option<Duration> {
    if now >= deadline {
        return None;
    }
    Some(delay.min(deadline - now))
}

fn is_terminal(state: Option<&str>) -> bool {
    matches!(state, None | Some("Succeeded" | "Failed" | "Canceled"))
}

async fn decode_error(response: Response) -> AzureError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => AzureError::Api {
            status: status.as_u16(),
            code: Some(body.error.code),
            message: body.error.message,
        },
        Err(_) => AzureError::Api {
            status: status.as_u16(),
            code: None,
            message: if text.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                text
            },
        },
    }
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<ErrorDetail>,
}
