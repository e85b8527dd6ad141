//! OAuth2 client-credentials flow against the Microsoft identity platform

use crate::config::AzureConfig;
use crate::error::{AzureError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Tokens are refreshed this long before they expire
const EXPIRY_MARGIN_SECS: i64 = 120;

#[derive(Debug, Clone)]
struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now
    }
}

/// Service principal credential with an in-memory token cache
pub struct ClientSecretCredential {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cached: Mutex<Option<AccessToken>>,
}

impl ClientSecretCredential {
    pub fn new(http: reqwest::Client, config: &AzureConfig) -> Self {
        Self {
            http,
            token_url: config.token_url(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope(),
            cached: Mutex::new(None),
        }
    }

    /// Bearer token for Resource Manager, fetching a new one when needed
    pub async fn token(&self, cancel: &CancellationToken) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.secret.clone());
        }

        let token = tokio::select! {
            _ = cancel.cancelled() => return Err(AzureError::Cancelled),
            token = self.request_token() => token?,
        };
        let secret = token.secret.clone();
        *cached = Some(token);
        Ok(secret)
    }

    async fn request_token(&self) -> Result<AccessToken> {
        tracing::debug!(url = %self.token_url, "Requesting access token");

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        let response = self.http.post(&self.token_url).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let failure: Option<TokenError> = serde_json::from_str(&body).ok();
            // Any rejection of our credentials is an authorization failure,
            // whichever 4xx the identity provider chose.
            let status = if status.is_client_error() {
                401
            } else {
                status.as_u16()
            };
            return Err(match failure {
                Some(f) => AzureError::Api {
                    status,
                    code: Some(f.error),
                    message: f.error_description.unwrap_or_else(|| "token request rejected".to_string()),
                },
                None => AzureError::Api {
                    status,
                    code: None,
                    message: format!("token request failed: {body}"),
                },
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(AccessToken {
            secret: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenError {
    error: String,
    error_description: Option<String>,
}
