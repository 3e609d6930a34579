// src/error.rs
use std::collections::BTreeMap;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::ai::AiError;

/// Field name -> messages, rendered under `error.details.fieldErrors`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{feature} limit of {limit} reached for the {tier} plan")]
    LimitReached {
        feature: &'static str,
        tier: String,
        limit: i64,
    },

    #[error("rate limit exceeded")]
    RateLimited { limit: u32, retry_after: u64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        Error::Validation(errors)
    }

    fn parts(&self) -> (StatusCode, &'static str, String, Value) {
        match self {
            Error::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Validation failed".into(),
                json!({ "fieldErrors": fields }),
            ),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), Value::Null),
            Error::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".into(),
                Value::Null,
            ),
            Error::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone(), Value::Null),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string(), Value::Null),
            Error::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone(), Value::Null),
            Error::LimitReached { feature, tier, limit } => (
                StatusCode::FORBIDDEN,
                "FEATURE_LIMIT",
                self.to_string(),
                json!({ "feature": feature, "tier": tier, "limit": limit }),
            ),
            Error::RateLimited { limit, retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Too many requests".into(),
                json!({ "limit": limit, "retryAfter": retry_after }),
            ),
            Error::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "NOT_CONFIGURED",
                msg.clone(),
                Value::Null,
            ),
            Error::Ai(AiError::NotConfigured) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AI_NOT_CONFIGURED",
                "AI service is not configured".into(),
                Value::Null,
            ),
            Error::Database(sqlx::Error::RowNotFound) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Record not found".into(),
                Value::Null,
            ),
            Error::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => (
                StatusCode::CONFLICT,
                "CONFLICT",
                "A record with this value already exists".into(),
                Value::Null,
            ),
            // never leak internals
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An unexpected error occurred".into(),
                Value::Null,
            ),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), code, "request rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": message,
                "details": details,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        let mut response = (status, body).into_response();
        if let Error::RateLimited { retry_after, .. } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Collects field errors so one response reports every invalid field.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors
                .entry(field.to_string())
                .or_default()
                .push(message.to_string());
        }
        self
    }

    pub fn finish(&mut self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(std::mem::take(&mut self.errors)))
        }
    }
}
