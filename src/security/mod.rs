/// Login defenses and request hardening
///
/// All state here lives in process memory; it is not shared between
/// instances and resets on restart.
pub mod anomaly;
pub mod captcha;
pub mod headers;
pub mod lockout;
pub mod rate_limit;
pub mod slow_down;

pub use anomaly::AnomalyDetector;
pub use captcha::{CaptchaChallenge, CaptchaStore};
pub use headers::security_headers_middleware;
pub use lockout::LoginLockout;
pub use rate_limit::{
    login_rate_limit, rate_limit_middleware, register_rate_limit, FixedWindowLimiter, RateLimiter,
};
pub use slow_down::{slow_down_middleware, SlowDown};

use crate::{config::ServerConfig, context::AppContext};
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, Extensions, HeaderMap},
};
use chrono::Utc;
use std::{
    convert::Infallible,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Instant,
};

/// Shared security state
pub struct SecurityState {
    pub global: RateLimiter,
    pub login_limiter: FixedWindowLimiter,
    pub register_limiter: FixedWindowLimiter,
    pub slow_down: SlowDown,
    pub lockout: LoginLockout,
    pub anomaly: AnomalyDetector,
    pub captcha: CaptchaStore,
    trust_proxy: bool,
}

impl SecurityState {
    pub fn new(config: &ServerConfig) -> Self {
        let s = &config.security;
        Self {
            global: RateLimiter::new(&config.rate_limit),
            login_limiter: FixedWindowLimiter::new(
                "login",
                s.login_max_requests,
                s.login_window_secs,
            ),
            register_limiter: FixedWindowLimiter::new(
                "register",
                s.register_max_requests,
                s.register_window_secs,
            ),
            slow_down: SlowDown::new(s),
            lockout: LoginLockout::new(s.lockout_max_failures, s.lockout_minutes),
            anomaly: AnomalyDetector::new(s.anomaly_window_secs, s.anomaly_max_attempts),
            captcha: CaptchaStore::new(s.captcha_ttl_secs),
            trust_proxy: s.trust_proxy,
        }
    }

    /// Client address under the configured proxy policy
    pub fn client_ip(&self, headers: &HeaderMap, extensions: &Extensions) -> IpAddr {
        client_ip(headers, extensions, self.trust_proxy)
    }

    /// Drop expired entries from every map; returns the number removed
    pub fn prune(&self) -> usize {
        let now = Utc::now();
        let instant = Instant::now();

        self.global.prune();
        self.login_limiter.prune(instant)
            + self.register_limiter.prune(instant)
            + self.slow_down.prune(instant)
            + self.lockout.prune(now)
            + self.anomaly.prune(now)
            + self.captcha.prune(now)
    }
}

/// Resolve the client address: first `X-Forwarded-For` hop when the proxy is
/// trusted, then the socket peer
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions, trust_proxy: bool) -> IpAddr {
    let forwarded = if trust_proxy {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse().ok())
    } else {
        None
    };

    forwarded
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Caller address and user agent
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip: IpAddr,
    pub user_agent: String,
}

#[async_trait]
impl FromRequestParts<AppContext> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Ok(ClientInfo {
            ip: state.security.client_ip(&parts.headers, &parts.extensions),
            user_agent,
        })
    }
}
