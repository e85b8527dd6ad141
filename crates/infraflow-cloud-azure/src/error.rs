//! Azure control plane error types

use infraflow_cloud::{CloudError, ResourceKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// Resource Manager or the identity provider answered with a failure
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Long-running operation ended in state {status}: {message}")]
    OperationFailed { status: String, message: String },

    #[error("Gave up waiting after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl AzureError {
    /// Convert into the provider-neutral error, naming the resource involved
    pub fn into_cloud(self, kind: ResourceKind, name: &str) -> CloudError {
        match self {
            AzureError::OperationFailed { status, message } => {
                tracing::debug!(%kind, name, %message, "Long-running operation failed");
                CloudError::OperationFailed {
                    kind,
                    name: name.to_string(),
                    status,
                }
            }
            other => other.into(),
        }
    }
}

impl From<AzureError> for CloudError {
    fn from(err: AzureError) -> Self {
        match err {
            AzureError::MissingEnvVar(var) => {
                CloudError::InvalidConfig(format!("missing environment variable {var}"))
            }
            AzureError::Api {
                status,
                code,
                message,
            } => CloudError::Remote {
                status,
                code,
                message,
            },
            AzureError::OperationFailed { status, message } => CloudError::Remote {
                status: 500,
                code: Some(status),
                message,
            },
            AzureError::Timeout(after) => CloudError::Timeout(format!("gave up after {after:?}")),
            AzureError::Cancelled => CloudError::Cancelled,
            AzureError::Http(e) => CloudError::Transport(e.to_string()),
            AzureError::JsonError(e) => CloudError::Json(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, AzureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_status_passes_through() {
        let err: CloudError = AzureError::Api {
            status: 409,
            code: Some("Conflict".to_string()),
            message: "Operation is not allowed".to_string(),
        }
        .into();
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.to_string(), "Operation is not allowed");
    }

    #[test]
    fn test_operation_failure_names_resource() {
        let err = AzureError::OperationFailed {
            status: "Failed".to_string(),
            message: "quota exceeded".to_string(),
        }
        .into_cloud(ResourceKind::VirtualMachine, "vm1");
        assert_eq!(err.to_string(), "virtual machine vm1 finished in state Failed");
        assert_eq!(err.status(), None);
    }
}
