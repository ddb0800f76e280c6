/// Configuration management for the Mediahouse API
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub authentication: AuthConfig,
    pub email: Option<EmailConfig>,
    pub approval: ApprovalConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub bootstrap: Option<BootstrapAdmin>,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Externally reachable base URL, used in approval links
    pub public_url: String,
    /// Allowed CORS origins; empty means any
    pub cors_origins: Vec<String>,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongo,
    Memory,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub uri: String,
    pub name: String,
    pub max_pool_size: u32,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Session lifetime in seconds
    pub session_ttl_secs: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Registration approval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Where approval requests are mailed
    pub superadmin_email: Option<String>,
    pub token_ttl_hours: i64,
    pub max_registration_attempts: i32,
    pub registration_block_minutes: i64,
}

/// Login defense configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub login_window_secs: u64,
    pub login_max_requests: u32,
    pub register_window_secs: u64,
    pub register_max_requests: u32,
    pub slow_down_after: u32,
    pub slow_down_step_ms: u64,
    pub slow_down_max_ms: u64,
    pub lockout_max_failures: u32,
    pub lockout_minutes: i64,
    pub anomaly_window_secs: i64,
    pub anomaly_max_attempts: usize,
    pub captcha_ttl_secs: i64,
    /// Take the client address from `X-Forwarded-For`; only behind a trusted proxy
    pub trust_proxy: bool,
}

/// Global rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

/// Superadmin created at startup when none exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            login_window_secs: 15 * 60,
            login_max_requests: 10,
            register_window_secs: 60 * 60,
            register_max_requests: 5,
            slow_down_after: 3,
            slow_down_step_ms: 500,
            slow_down_max_ms: 5_000,
            lockout_max_failures: 5,
            lockout_minutes: 30,
            anomaly_window_secs: 30,
            anomaly_max_attempts: 3,
            captcha_ttl_secs: 5 * 60,
            trust_proxy: false,
        }
    }
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            superadmin_email: None,
            token_ttl_hours: 24,
            max_registration_attempts: 3,
            registration_block_minutes: 10,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 100,
            burst_size: 200,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("MEDIAHOUSE_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("MEDIAHOUSE_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("MEDIAHOUSE_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));
        let cors_origins = env_list("MEDIAHOUSE_CORS_ORIGINS");

        let backend = match env::var("MEDIAHOUSE_STORAGE")
            .unwrap_or_else(|_| "mongo".to_string())
            .to_lowercase()
            .as_str()
        {
            "mongo" | "mongodb" => StorageBackend::Mongo,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ApiError::Validation(format!(
                    "Unknown storage backend: {}",
                    other
                )))
            }
        };
        let database = DatabaseConfig {
            backend,
            uri: env::var("MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            name: env::var("MONGODB_DATABASE").unwrap_or_else(|_| "mediahouse".to_string()),
            max_pool_size: env_or("MONGODB_MAX_POOL_SIZE", 10),
        };

        let jwt_secret = env::var("MEDIAHOUSE_JWT_SECRET")
            .map_err(|_| ApiError::Validation("JWT secret required".to_string()))?;
        let authentication = AuthConfig {
            jwt_secret,
            session_ttl_secs: env_or("MEDIAHOUSE_SESSION_TTL_SECS", 15 * 60),
            cookie_name: env::var("MEDIAHOUSE_COOKIE_NAME")
                .unwrap_or_else(|_| "admin_token".to_string()),
            cookie_secure: env_or("MEDIAHOUSE_COOKIE_SECURE", false),
        };

        let email = if let Ok(smtp_url) = env::var("MEDIAHOUSE_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("MEDIAHOUSE_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| "noreply@localhost".to_string()),
            })
        } else {
            None
        };

        let approval_defaults = ApprovalConfig::default();
        let approval = ApprovalConfig {
            superadmin_email: env::var("MEDIAHOUSE_SUPERADMIN_EMAIL").ok(),
            token_ttl_hours: env_or(
                "MEDIAHOUSE_APPROVAL_TOKEN_TTL_HOURS",
                approval_defaults.token_ttl_hours,
            ),
            max_registration_attempts: env_or(
                "MEDIAHOUSE_MAX_REGISTRATION_ATTEMPTS",
                approval_defaults.max_registration_attempts,
            ),
            registration_block_minutes: env_or(
                "MEDIAHOUSE_REGISTRATION_BLOCK_MINUTES",
                approval_defaults.registration_block_minutes,
            ),
        };

        let d = SecurityConfig::default();
        let security = SecurityConfig {
            login_window_secs: env_or("MEDIAHOUSE_LOGIN_WINDOW_SECS", d.login_window_secs),
            login_max_requests: env_or("MEDIAHOUSE_LOGIN_MAX_REQUESTS", d.login_max_requests),
            register_window_secs: env_or("MEDIAHOUSE_REGISTER_WINDOW_SECS", d.register_window_secs),
            register_max_requests: env_or(
                "MEDIAHOUSE_REGISTER_MAX_REQUESTS",
                d.register_max_requests,
            ),
            slow_down_after: env_or("MEDIAHOUSE_SLOW_DOWN_AFTER", d.slow_down_after),
            slow_down_step_ms: env_or("MEDIAHOUSE_SLOW_DOWN_STEP_MS", d.slow_down_step_ms),
            slow_down_max_ms: env_or("MEDIAHOUSE_SLOW_DOWN_MAX_MS", d.slow_down_max_ms),
            lockout_max_failures: env_or("MEDIAHOUSE_LOCKOUT_MAX_FAILURES", d.lockout_max_failures),
            lockout_minutes: env_or("MEDIAHOUSE_LOCKOUT_MINUTES", d.lockout_minutes),
            anomaly_window_secs: env_or("MEDIAHOUSE_ANOMALY_WINDOW_SECS", d.anomaly_window_secs),
            anomaly_max_attempts: env_or("MEDIAHOUSE_ANOMALY_MAX_ATTEMPTS", d.anomaly_max_attempts),
            captcha_ttl_secs: env_or("MEDIAHOUSE_CAPTCHA_TTL_SECS", d.captcha_ttl_secs),
            trust_proxy: env_or("MEDIAHOUSE_TRUST_PROXY", d.trust_proxy),
        };

        let rate_limit = RateLimitConfig {
            enabled: env_or("MEDIAHOUSE_RATE_LIMITS_ENABLED", true),
            requests_per_second: env_or("MEDIAHOUSE_RATE_LIMIT_RPS", 100),
            burst_size: env_or("MEDIAHOUSE_RATE_LIMIT_BURST", 200),
        };

        let logging = LoggingConfig {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json: env::var("MEDIAHOUSE_LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        };

        let bootstrap = match (
            env::var("MEDIAHOUSE_SUPERADMIN_USERNAME"),
            env::var("MEDIAHOUSE_SUPERADMIN_PASSWORD"),
        ) {
            (Ok(username), Ok(password)) => Some(BootstrapAdmin {
                email: approval
                    .superadmin_email
                    .clone()
                    .unwrap_or_else(|| format!("{}@localhost", username)),
                username,
                password,
            }),
            _ => None,
        };

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                cors_origins,
            },
            database,
            authentication,
            email,
            approval,
            security,
            rate_limit,
            logging,
            bootstrap,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ApiError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.session_ttl_secs <= 0 {
            return Err(ApiError::Validation(
                "Session lifetime must be positive".to_string(),
            ));
        }

        if self.approval.max_registration_attempts < 1 {
            return Err(ApiError::Validation(
                "Registration attempt ceiling must be at least 1".to_string(),
            ));
        }

        if self.security.lockout_max_failures == 0 {
            return Err(ApiError::Validation(
                "Lockout threshold must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration suitable for tests: in-memory store, no mail, no delays
    pub fn for_tests() -> Self {
        Self {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 0,
                public_url: "http://localhost:5000".to_string(),
                cors_origins: Vec::new(),
            },
            database: DatabaseConfig {
                backend: StorageBackend::Memory,
                uri: String::new(),
                name: "mediahouse_test".to_string(),
                max_pool_size: 1,
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-that-is-at-least-32-characters".to_string(),
                session_ttl_secs: 15 * 60,
                cookie_name: "admin_token".to_string(),
                cookie_secure: false,
            },
            email: None,
            approval: ApprovalConfig {
                superadmin_email: Some("owner@example.com".to_string()),
                ..ApprovalConfig::default()
            },
            security: SecurityConfig {
                slow_down_step_ms: 0,
                ..SecurityConfig::default()
            },
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig {
                level: "debug".to_string(),
                json: false,
            },
            bootstrap: None,
        }
    }
}
