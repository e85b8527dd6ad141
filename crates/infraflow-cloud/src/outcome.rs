//! Translation of workflow results into the API result taxonomy

use crate::error::{CloudError, Result};

/// Every workflow ends in exactly one of these
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Created(T),
    Found(T),
    Deleted,
    /// The resource, or a resource it depends on, does not exist
    NotFound,
    /// The control plane rejected our credentials
    Unauthorized,
    /// The control plane refused a create; carries its message verbatim
    Conflict(String),
    /// Everything not classified above: invalid input and unexpected failures
    BadRequest(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Create,
    Lookup,
    Delete,
}

impl<T> Outcome<T> {
    pub fn from_create(result: Result<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => Outcome::Created(value),
            Ok(None) => Outcome::NotFound,
            Err(e) => Self::from_error(e, Phase::Create),
        }
    }

    pub fn from_lookup(result: Result<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => Outcome::Found(value),
            Ok(None) => Outcome::NotFound,
            Err(e) => Self::from_error(e, Phase::Lookup),
        }
    }

    /// Caller-side validation failure, reported before any workflow runs
    pub fn invalid(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        tracing::warn!(detail = %detail, "Rejected invalid request");
        Outcome::BadRequest(detail)
    }

    fn from_error(err: CloudError, phase: Phase) -> Self {
        match err.status() {
            Some(401) => {
                tracing::error!(error = ?err, "Unauthorized");
                Outcome::Unauthorized
            }
            Some(409) if phase == Phase::Create => {
                tracing::error!(error = ?err, "The requested update encountered a conflict");
                Outcome::Conflict(err.to_string())
            }
            _ => {
                tracing::error!(error = ?err, ?phase, "Unexpected error");
                Outcome::BadRequest(err.to_string())
            }
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Created(value) => Outcome::Created(f(value)),
            Outcome::Found(value) => Outcome::Found(f(value)),
            Outcome::Deleted => Outcome::Deleted,
            Outcome::NotFound => Outcome::NotFound,
            Outcome::Unauthorized => Outcome::Unauthorized,
            Outcome::Conflict(detail) => Outcome::Conflict(detail),
            Outcome::BadRequest(detail) => Outcome::BadRequest(detail),
        }
    }

    /// HTTP status this outcome is rendered as
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Created(_) => 201,
            Outcome::Found(_) => 200,
            Outcome::Deleted => 204,
            Outcome::NotFound => 404,
            Outcome::Unauthorized => 401,
            Outcome::Conflict(_) => 409,
            Outcome::BadRequest(_) => 400,
        }
    }
}

impl Outcome<()> {
    pub fn from_delete(result: Result<Option<()>>) -> Self {
        match result {
            Ok(Some(())) => Outcome::Deleted,
            Ok(None) => Outcome::NotFound,
            Err(e) => Self::from_error(e, Phase::Delete),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_mapping() {
        assert_eq!(Outcome::from_create(Ok(Some(1))), Outcome::Created(1));
        assert_eq!(Outcome::from_lookup(Ok(Some(1))), Outcome::Found(1));
        assert_eq!(Outcome::from_delete(Ok(Some(()))), Outcome::Deleted);
    }

    #[test]
    fn test_absent_is_not_found() {
        assert_eq!(Outcome::<i32>::from_create(Ok(None)), Outcome::NotFound);
        assert_eq!(Outcome::<i32>::from_lookup(Ok(None)), Outcome::NotFound);
        assert_eq!(Outcome::from_delete(Ok(None)), Outcome::NotFound);
    }

    #[test]
    fn test_unauthorized_in_every_phase() {
        fn err<T>() -> Result<Option<T>> {
            Err(CloudError::remote(401, "Unauthorized"))
        }
        assert_eq!(Outcome::<i32>::from_create(err()), Outcome::Unauthorized);
        assert_eq!(Outcome::<i32>::from_lookup(err()), Outcome::Unauthorized);
        assert_eq!(Outcome::from_delete(err()), Outcome::Unauthorized);
    }

    #[test]
    fn test_conflict_only_on_create() {
        let message = "The resource group is in deprovisioning state.";
        let create = Outcome::<i32>::from_create(Err(CloudError::remote(409, message)));
        assert_eq!(create, Outcome::Conflict(message.to_string()));

        let lookup = Outcome::<i32>::from_lookup(Err(CloudError::remote(409, message)));
        assert_eq!(lookup, Outcome::BadRequest(message.to_string()));
    }

    #[test]
    fn test_other_failures_are_bad_request() {
        let outcome = Outcome::<i32>::from_create(Err(CloudError::Transport(
            "connection reset".to_string(),
        )));
        assert_eq!(
            outcome,
            Outcome::BadRequest("Transport error: connection reset".to_string())
        );

        let outcome = Outcome::<i32>::from_lookup(Err(CloudError::remote(500, "boom")));
        assert_eq!(outcome, Outcome::BadRequest("boom".to_string()));
    }

    #[test]
    fn test_map_and_status() {
        let outcome = Outcome::Created(2).map(|v| v * 10);
        assert_eq!(outcome, Outcome::Created(20));
        assert_eq!(outcome.status_code(), 201);
        assert_eq!(Outcome::<()>::Deleted.status_code(), 204);
        assert_eq!(Outcome::<()>::Conflict(String::new()).status_code(), 409);
        assert_eq!(Outcome::<()>::invalid("name is required").status_code(), 400);
    }
}
