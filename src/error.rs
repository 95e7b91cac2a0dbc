use std::collections::BTreeMap;
use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

/// Field-level validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Take over the fields of `other` that have no messages here yet.
    pub fn merge_new_fields(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_insert(messages);
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed, {0}")]
    Validation(FieldErrors),

    #[error("malformed request body: {detail}")]
    MalformedBody { status: StatusCode, detail: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedBody {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => {
                debug!(fields = errors.len(), %errors, "Rejected invalid input");
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            AppError::MalformedBody { status, detail } => {
                debug!(%detail, "Rejected malformed body");
                (status, Json(json!({ "detail": detail }))).into_response()
            }
            AppError::NotFound(what) => {
                debug!(%what, "Not found");
                StatusCode::NOT_FOUND.into_response()
            }
            AppError::StoreUnavailable(e) => {
                error!(error = %e, "Store error");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "detail": "Store unavailable" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_collect_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("price", "first");
        errors.add("price", "second");
        errors.add("name", "bad");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("price").unwrap(), ["first", "second"]);
        assert_eq!(errors.to_string(), "invalid fields: name, price");
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({ "name": ["bad"], "price": ["first", "second"] })
        );
    }

    #[test]
    fn merge_keeps_existing_messages() {
        let mut errors = FieldErrors::new();
        errors.add("price", "A valid number is required.");

        let mut more = FieldErrors::new();
        more.add("price", "This field is required.");
        more.add("name", "too long");
        errors.merge_new_fields(more);

        assert_eq!(errors.get("price").unwrap(), ["A valid number is required."]);
        assert_eq!(errors.get("name").unwrap(), ["too long"]);
    }

    #[test]
    fn status_codes() {
        let mut errors = FieldErrors::new();
        errors.add("price", "This field is required.");
        assert_eq!(
            AppError::Validation(errors).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("Product 1".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::StoreUnavailable(sqlx::Error::PoolClosed)
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
