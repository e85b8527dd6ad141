//! Control-plane error types

use crate::model::ResourceKind;
use thiserror::Error;

/// Errors raised while talking to the remote control plane
#[derive(Error, Debug)]
pub enum CloudError {
    /// The control plane answered with a failure status. `message` is the
    /// provider's text, untouched.
    #[error("{message}")]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{kind} {name} finished in state {status}")]
    OperationFailed {
        kind: ResourceKind,
        name: String,
        status: String,
    },

    #[error("Virtual network {0} has no subnet to attach a network interface to")]
    MissingSubnet(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Status code reported by the control plane, if the failure came from it
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_message_is_verbatim() {
        let err = CloudError::remote(409, "Another operation is in progress.");
        assert_eq!(err.to_string(), "Another operation is in progress.");
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_non_remote_errors_have_no_status() {
        assert_eq!(CloudError::Cancelled.status(), None);
        assert_eq!(CloudError::Transport("reset".into()).status(), None);
    }
}
