use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Field-keyed validation messages, as returned in 422 bodies.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("The given data was invalid.")]
    Validation(FieldErrors),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0} not found.")]
    NotFound(&'static str),

    /// Business-rule violation surfaced as a field-scoped 422, not a 500.
    #[error("{message}")]
    Domain {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Self::Validation(errors)
    }

    pub fn domain(field: &'static str, message: impl Into<String>) -> Self {
        Self::Domain {
            field,
            message: message.into(),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::Authentication("Unauthenticated.".into())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "The given data was invalid.".to_string(),
                Some(errors),
            ),
            ApiError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Authorization(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::NotFound(what) => {
                (StatusCode::NOT_FOUND, format!("{what} not found."), None)
            }
            ApiError::Domain { field, message } => {
                let mut errors = FieldErrors::new();
                errors.insert(field.to_string(), vec![message.clone()]);
                (StatusCode::UNPROCESSABLE_ENTITY, message, Some(errors))
            }
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "unhandled internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error.".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            success: false,
            message,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

/// Accumulates field errors across checks so a request can report
/// every failing field at once.
#[derive(Debug, Default)]
pub struct ValidationBag {
    errors: FieldErrors,
}

impl ValidationBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_422() {
        let err = ApiError::validation("email", "Invalid email.");
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn authentication_maps_to_401() {
        let err = ApiError::unauthenticated();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn authorization_maps_to_403() {
        let err = ApiError::Authorization("You do not own this family.".into());
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::NotFound("Invitation");
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn domain_maps_to_422() {
        let err = ApiError::domain("family", "Cannot remove the owner from the family.");
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn internal_maps_to_500() {
        let err = ApiError::Internal(anyhow::anyhow!("boom"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn bag_collects_multiple_fields() {
        let mut bag = ValidationBag::new();
        bag.add("email", "Invalid email.");
        bag.add("password", "Password too short.");
        bag.add("password", "Password needs a digit.");
        let err = bag.finish().unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors["password"].len(), 2);
            }
            _ => panic!("expected validation error"),
        }
    }

    #[test]
    fn empty_bag_is_ok() {
        assert!(ValidationBag::new().finish().is_ok());
    }
}
