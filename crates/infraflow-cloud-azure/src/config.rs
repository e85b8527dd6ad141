//! Credentials and endpoints, resolved from the environment at startup

use crate::error::{AzureError, Result};
use std::fmt;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_RESOURCE_MANAGER: &str = "https://management.azure.com";

/// Service principal credentials and the subscription to provision into
#[derive(Clone)]
pub struct AzureConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub subscription_id: String,
    pub authority_host: String,
    pub resource_manager: String,
}

impl AzureConfig {
    /// Create AzureConfig from environment variables
    ///
    /// Requires `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET` and
    /// `AZURE_SUBSCRIPTION_ID`. `AZURE_AUTHORITY_HOST` and
    /// `AZURE_RESOURCE_MANAGER_ENDPOINT` override the public cloud endpoints.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            tenant_id: required("AZURE_TENANT_ID")?,
            client_id: required("AZURE_CLIENT_ID")?,
            client_secret: required("AZURE_CLIENT_SECRET")?,
            subscription_id: required("AZURE_SUBSCRIPTION_ID")?,
            authority_host: optional("AZURE_AUTHORITY_HOST")
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
            resource_manager: optional("AZURE_RESOURCE_MANAGER_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_RESOURCE_MANAGER.to_string()),
        })
    }

    /// OAuth scope granting access to Resource Manager
    pub fn scope(&self) -> String {
        format!("{}/.default", self.resource_manager.trim_end_matches('/'))
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

impl fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("subscription_id", &self.subscription_id)
            .field("authority_host", &self.authority_host)
            .field("resource_manager", &self.resource_manager)
            .finish()
    }
}

fn required(var: &str) -> Result<String> {
    optional(var).ok_or_else(|| AzureError::MissingEnvVar(var.to_string()))
}

fn optional(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [(&str, Option<&str>); 6] = [
        ("AZURE_TENANT_ID", Some("tenant")),
        ("AZURE_CLIENT_ID", Some("client")),
        ("AZURE_CLIENT_SECRET", Some("secret")),
        ("AZURE_SUBSCRIPTION_ID", Some("sub")),
        ("AZURE_AUTHORITY_HOST", None),
        ("AZURE_RESOURCE_MANAGER_ENDPOINT", None),
    ];

    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars(VARS, || {
            let config = AzureConfig::from_env().unwrap();
            assert_eq!(config.subscription_id, "sub");
            assert_eq!(
                config.token_url(),
                "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"
            );
            assert_eq!(config.scope(), "https://management.azure.com/.default");
        });
    }

    #[test]
    fn test_from_env_missing_secret() {
        let mut vars = VARS;
        vars[2].1 = None;
        temp_env::with_vars(vars, || {
            let err = AzureConfig::from_env().unwrap_err();
            assert!(matches!(err, AzureError::MissingEnvVar(ref v) if v == "AZURE_CLIENT_SECRET"));
        });
    }

    #[test]
    fn test_debug_redacts_secret() {
        temp_env::with_vars(VARS, || {
            let config = AzureConfig::from_env().unwrap();
            let debug = format!("{config:?}");
            assert!(!debug.contains("secret\""));
            assert!(debug.contains("<redacted>"));
        });
    }
}
