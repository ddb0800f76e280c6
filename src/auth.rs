/// Session tokens, cookies and authentication extractors
use crate::{
    admin::Role,
    config::AuthConfig,
    context::AppContext,
    error::{ApiError, ApiResult},
    models::AdminAccount,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Session JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Admin id
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Issue a signed session token for an approved account
pub fn issue_session_token(account: &AdminAccount, config: &AuthConfig) -> ApiResult<String> {
    let now = Utc::now().timestamp();
    let claims = SessionClaims {
        sub: account.id.clone(),
        username: account.username.clone(),
        role: account.role,
        iat: now,
        exp: now + config.session_ttl_secs,
        jti: uuid::Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Jwt(format!("Failed to generate token: {}", e)))
}

/// Verify a session token's signature and expiry
pub fn verify_session_token(token: &str, jwt_secret: &str) -> ApiResult<SessionClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Session token rejected: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ApiError::Authentication("Session has expired".to_string())
            }
            _ => ApiError::Jwt(e.to_string()),
        }
    })
}

/// HTTP-only session cookie carrying `token`
pub fn session_cookie(token: String, config: &AuthConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), token))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(config.session_ttl_secs))
        .build()
}

/// Expired cookie that clears the session
pub fn clear_session_cookie(config: &AuthConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), ""))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Session token from the cookie, falling back to a bearer header
fn session_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| extract_bearer_token(&parts.headers))
}

/// Authenticated admin, reloaded from the store on every request
#[derive(Debug, Clone)]
pub struct AdminAuth {
    pub account: AdminAccount,
}

impl AdminAuth {
    pub fn id(&self) -> &str {
        &self.account.id
    }

    pub fn role(&self) -> Role {
        self.account.role
    }
}

async fn authenticate(parts: &Parts, state: &AppContext) -> ApiResult<AdminAuth> {
    let auth_config = &state.config.authentication;
    let token = session_token(parts, &auth_config.cookie_name)
        .ok_or_else(|| ApiError::Authentication("Not authenticated".to_string()))?;

    let claims = verify_session_token(&token, &auth_config.jwt_secret)?;

    let account = state
        .store
        .admins
        .find_admin(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::Authentication("Account no longer exists".to_string()))?;

    if !account.role.is_active() {
        return Err(ApiError::AccountPending);
    }

    Ok(AdminAuth { account })
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await
    }
}

/// Optional authenticated context - does not fail if no valid session
#[derive(Debug, Clone)]
pub struct OptionalAdminAuth(pub Option<AdminAuth>);

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        match authenticate(parts, state).await {
            Ok(auth) => Ok(OptionalAdminAuth(Some(auth))),
            Err(ApiError::Database(e)) => Err(ApiError::Database(e)),
            Err(_) => Ok(OptionalAdminAuth(None)),
        }
    }
}

/// Macro to require a specific admin role
/// Usage: require_role!(auth, Role::SuperAdmin);
#[macro_export]
macro_rules! require_role {
    ($auth:expr, $required:expr) => {
        if !$auth.role().can_act_as($required) {
            return Err($crate::error::ApiError::Authorization(format!(
                "Requires {} role",
                $required.as_str()
            )));
        }
    };
}
