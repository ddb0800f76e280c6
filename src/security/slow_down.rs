/// Progressive response delay for repeated login requests
use crate::{config::SecurityConfig, context::AppContext};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::{
    net::IpAddr,
    time::{Duration, Instant},
};

use super::rate_limit::Window;

pub struct SlowDown {
    windows: DashMap<IpAddr, Window>,
    length: Duration,
    delay_after: u32,
    step: Duration,
    max_delay: Duration,
}

impl SlowDown {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            windows: DashMap::new(),
            length: Duration::from_secs(config.login_window_secs),
            delay_after: config.slow_down_after,
            step: Duration::from_millis(config.slow_down_step_ms),
            max_delay: Duration::from_millis(config.slow_down_max_ms),
        }
    }

    /// Count a request and return how long it should be held back
    pub fn delay_for(&self, ip: IpAddr, now: Instant) -> Duration {
        let hits = self
            .windows
            .entry(ip)
            .or_insert(Window {
                started: now,
                hits: 0,
            })
            .hit(now, self.length);

        let over = hits.saturating_sub(self.delay_after);
        (self.step * over).min(self.max_delay)
    }

    pub fn prune(&self, now: Instant) -> usize {
        let before = self.windows.len();
        let length = self.length;
        self.windows
            .retain(|_, w| now.duration_since(w.started) < length);
        before - self.windows.len()
    }
}

/// Delay middleware for the login route
pub async fn slow_down_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Response {
    let ip = ctx.security.client_ip(request.headers(), request.extensions());
    let delay = ctx.security.slow_down.delay_for(ip, Instant::now());
    if !delay.is_zero() {
        tracing::debug!("Delaying login from {} by {:?}", ip, delay);
        tokio::time::sleep(delay).await;
    }
    next.run(request).await
}
