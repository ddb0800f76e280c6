/// Unified error types for the Mediahouse API
use crate::security::captcha::CaptchaChallenge;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid session
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Wrong username or password
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Account exists but has not been approved yet
    #[error("Account is awaiting approval")]
    AccountPending,

    /// Registration disabled in site settings
    #[error("Registration is currently closed")]
    RegistrationClosed,

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Approval token unknown or already used
    #[error("Invalid or already used approval token")]
    InvalidToken,

    /// Approval token past its expiry
    #[error("Approval token has expired")]
    TokenExpired,

    /// Conflict errors (e.g., duplicate username)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Too many failed logins for a username
    #[error("Account temporarily locked")]
    AccountLocked { retry_after: Duration },

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: Duration },

    /// Pending account hit the registration attempt ceiling
    #[error("Too many registration attempts")]
    RegistrationBlocked { retry_after: Duration },

    /// Suspicious client must solve a challenge first
    #[error("CAPTCHA verification required")]
    CaptchaRequired { challenge: CaptchaChallenge },

    /// Wrong, expired or unknown challenge answer
    #[error("Invalid CAPTCHA answer")]
    InvalidCaptcha { challenge: CaptchaChallenge },

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Machine-readable tag carried in the `type` field of error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Authentication(_) | ApiError::Jwt(_) => "UNAUTHORIZED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::Authorization(_) => "FORBIDDEN",
            ApiError::AccountPending => "ACCOUNT_PENDING",
            ApiError::RegistrationClosed => "REGISTRATION_CLOSED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::TokenExpired => "TOKEN_EXPIRED",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::AccountLocked { .. } => "ACCOUNT_LOCKED",
            ApiError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            ApiError::RegistrationBlocked { .. } => "REGISTRATION_BLOCKED",
            ApiError::CaptchaRequired { .. } => "CAPTCHA_REQUIRED",
            ApiError::InvalidCaptcha { .. } => "INVALID_CAPTCHA",
            ApiError::Database(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::TokenExpired
            | ApiError::CaptchaRequired { .. }
            | ApiError::InvalidCaptcha { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) | ApiError::Jwt(_) | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Authorization(_)
            | ApiError::AccountPending
            | ApiError::RegistrationClosed => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::InvalidToken => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::AccountLocked { .. } => StatusCode::LOCKED,
            ApiError::RateLimitExceeded { .. } | ApiError::RegistrationBlocked { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Database(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::AccountLocked { retry_after }
            | ApiError::RateLimitExceeded { retry_after }
            | ApiError::RegistrationBlocked { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captcha: Option<CaptchaChallenge>,
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        crate::metrics::record_error(self.kind());

        let message = match &self {
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal server error".to_string()
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                "Internal server error".to_string()
            }
            ApiError::Jwt(_) => "Invalid or expired session".to_string(),
            ApiError::AccountLocked { retry_after } => format!(
                "Too many failed login attempts. Try again in {} minutes",
                retry_after.as_secs().div_ceil(60)
            ),
            _ => self.to_string(),
        };

        let retry_after = self.retry_after().map(|d| d.as_secs().max(1));
        let captcha = match &self {
            ApiError::CaptchaRequired { challenge } | ApiError::InvalidCaptcha { challenge } => {
                Some(challenge.clone())
            }
            _ => None,
        };

        let body = Json(ErrorBody {
            success: false,
            message,
            kind: self.kind(),
            retry_after,
            captcha,
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Flatten `validator` failures into one message, field order stable
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        let messages: Vec<String> = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid value for {}", field),
                })
            })
            .collect();

        ApiError::Validation(messages.join("; "))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Map MongoDB duplicate-key write failures to a conflict
pub fn map_duplicate_key(err: mongodb::error::Error, what: &str) -> ApiError {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000 => {
            ApiError::Conflict(format!("{} already exists", what))
        }
        _ => ApiError::Database(err),
    }
}
