/// Account management system
///
/// Handles admin registration, the approval workflow, login and the
/// superadmin-only account operations.

mod manager;
pub mod password;

pub use manager::{AccountManager, RegistrationOutcome};

use crate::admin::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 30, message = "Username must be 3-30 characters"))]
    pub username: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    pub password: String,
}

/// CAPTCHA answers arrive as numbers or strings depending on the client
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CaptchaAnswer {
    Number(i64),
    Text(String),
}

impl CaptchaAnswer {
    pub fn as_text(&self) -> String {
        match self {
            CaptchaAnswer::Number(n) => n.to_string(),
            CaptchaAnswer::Text(s) => s.clone(),
        }
    }
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    pub captcha_id: Option<String>,
    pub captcha_answer: Option<CaptchaAnswer>,
}

/// Password change request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    pub new_password: String,
}

/// Role update request
#[derive(Debug, Clone, Deserialize)]
pub struct RoleUpdateRequest {
    pub role: Role,
}

/// Where a registration stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationState {
    Pending,
    Approved,
}

/// Public registration status lookup
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatus {
    pub username: String,
    pub status: RegistrationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_until: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
}

/// Normalize and check a username: lowercase `[a-z0-9_]`
pub fn normalize_username(raw: &str) -> crate::error::ApiResult<String> {
    let username = raw.trim().to_lowercase();
    if username.len() < 3 || username.len() > 30 {
        return Err(crate::error::ApiError::Validation(
            "Username must be 3-30 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(crate::error::ApiError::Validation(
            "Username may only contain letters, digits and underscores".to_string(),
        ));
    }
    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  Editor_01 ").unwrap(), "editor_01");
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username("has space").is_err());
        assert!(normalize_username("dash-name").is_err());
    }

    #[test]
    fn test_captcha_answer_accepts_number_or_string() {
        let req: LoginRequest = serde_json::from_str(
            r#"{"username":"a","password":"b","captchaId":"x","captchaAnswer":12}"#,
        )
        .unwrap();
        assert_eq!(req.captcha_answer.unwrap().as_text(), "12");

        let req: LoginRequest = serde_json::from_str(
            r#"{"username":"a","password":"b","captchaId":"x","captchaAnswer":" 7 "}"#,
        )
        .unwrap();
        assert_eq!(req.captcha_answer.unwrap().as_text(), " 7 ");
    }

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            username: "editor".into(),
            email: "not-an-email".into(),
            password: "Secret123".into(),
        };
        assert!(req.validate().is_err());
    }
}
