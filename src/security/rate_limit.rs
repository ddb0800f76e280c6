/// Rate Limiting System
///
/// Two layers: a token-bucket limiter keyed by client IP over the whole API,
/// and fixed-window counters guarding the login and registration routes.
use crate::{
    config::RateLimitConfig,
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter as GovernorLimiter,
};
use std::{
    net::IpAddr,
    num::NonZeroU32,
    time::{Duration, Instant},
};

/// Global per-IP limiter
pub struct RateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    clock: DefaultClock,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(per_second);
        let quota = Quota::per_second(per_second).allow_burst(burst);

        Self {
            limiter: GovernorLimiter::keyed(quota),
            clock: DefaultClock::default(),
        }
    }

    /// Check rate limit for a client
    pub fn check(&self, ip: IpAddr) -> ApiResult<()> {
        self.limiter.check_key(&ip).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            ApiError::RateLimitExceeded {
                retry_after: wait.max(Duration::from_secs(1)),
            }
        })
    }

    /// Forget clients whose buckets have refilled
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }
}

/// Global rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if ctx.config.rate_limit.enabled {
        let ip = ctx.security.client_ip(request.headers(), request.extensions());
        if let Err(e) = ctx.security.global.check(ip) {
            crate::metrics::record_security_event("global_rate_limit");
            return Err(e);
        }
    }
    Ok(next.run(request).await)
}

/// Request count for one client inside the current window
#[derive(Debug, Clone, Copy)]
pub(crate) struct Window {
    pub started: Instant,
    pub hits: u32,
}

impl Window {
    /// Count a hit, opening a fresh window if the old one has passed
    pub fn hit(&mut self, now: Instant, length: Duration) -> u32 {
        if now.duration_since(self.started) >= length {
            self.started = now;
            self.hits = 0;
        }
        self.hits += 1;
        self.hits
    }
}

/// Snapshot returned for an allowed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub limit: u32,
    pub remaining: u32,
}

/// Fixed-window request counter keyed by client IP
pub struct FixedWindowLimiter {
    name: &'static str,
    windows: DashMap<IpAddr, Window>,
    limit: u32,
    length: Duration,
}

impl FixedWindowLimiter {
    pub fn new(name: &'static str, limit: u32, window_secs: u64) -> Self {
        Self {
            name,
            windows: DashMap::new(),
            limit,
            length: Duration::from_secs(window_secs),
        }
    }

    pub fn hit(&self, ip: IpAddr, now: Instant) -> ApiResult<WindowState> {
        let mut window = self.windows.entry(ip).or_insert(Window {
            started: now,
            hits: 0,
        });
        let hits = window.hit(now, self.length);

        if hits > self.limit {
            let reset_at = window.started + self.length;
            tracing::warn!("{} limit exceeded for {}", self.name, ip);
            return Err(ApiError::RateLimitExceeded {
                retry_after: reset_at.saturating_duration_since(now).max(Duration::from_secs(1)),
            });
        }

        Ok(WindowState {
            limit: self.limit,
            remaining: self.limit - hits,
        })
    }

    pub fn prune(&self, now: Instant) -> usize {
        let before = self.windows.len();
        let length = self.length;
        self.windows
            .retain(|_, w| now.duration_since(w.started) < length);
        before - self.windows.len()
    }
}

async fn enforce_window(
    ctx: &AppContext,
    limiter: &FixedWindowLimiter,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = ctx.security.client_ip(request.headers(), request.extensions());
    let state = limiter.hit(ip, Instant::now()).inspect_err(|_| {
        crate::metrics::record_security_event(limiter.name);
    })?;

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(state.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(state.remaining));
    Ok(response)
}

/// Login route limiter
pub async fn login_rate_limit(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    enforce_window(&ctx, &ctx.security.login_limiter, request, next).await
}

/// Registration route limiter
pub async fn register_rate_limit(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    enforce_window(&ctx, &ctx.security.register_limiter, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn test_global_burst_limit() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: true,
            requests_per_second: 1,
            burst_size: 5,
        });

        for _ in 0..5 {
            assert!(limiter.check(ip(1)).is_ok());
        }
        assert!(matches!(
            limiter.check(ip(1)),
            Err(ApiError::RateLimitExceeded { .. })
        ));

        // Buckets are per client
        assert!(limiter.check(ip(2)).is_ok());
    }

    #[test]
    fn test_fixed_window_counts_down() {
        let limiter = FixedWindowLimiter::new("login", 3, 900);
        let now = Instant::now();

        assert_eq!(limiter.hit(ip(1), now).unwrap().remaining, 2);
        assert_eq!(limiter.hit(ip(1), now).unwrap().remaining, 1);
        assert_eq!(limiter.hit(ip(1), now).unwrap().remaining, 0);

        match limiter.hit(ip(1), now + Duration::from_secs(100)) {
            Err(ApiError::RateLimitExceeded { retry_after }) => {
                assert_eq!(retry_after.as_secs(), 800)
            }
            other => panic!("expected rate limit, got {:?}", other),
        }
    }

    #[test]
    fn test_fixed_window_resets() {
        let limiter = FixedWindowLimiter::new("register", 1, 60);
        let now = Instant::now();

        assert!(limiter.hit(ip(1), now).is_ok());
        assert!(limiter.hit(ip(1), now).is_err());
        assert!(limiter.hit(ip(1), now + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn test_prune_expired_windows() {
        let limiter = FixedWindowLimiter::new("login", 5, 60);
        let now = Instant::now();
        limiter.hit(ip(1), now).unwrap();
        limiter.hit(ip(2), now + Duration::from_secs(30)).unwrap();

        assert_eq!(limiter.prune(now + Duration::from_secs(70)), 1);
    }
}
