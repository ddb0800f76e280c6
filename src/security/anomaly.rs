/// Burst detection for login attempts per (IP, User-Agent)
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;

type ClientKey = (String, String);

pub struct AnomalyDetector {
    attempts: DashMap<ClientKey, VecDeque<DateTime<Utc>>>,
    window: Duration,
    max_attempts: usize,
}

impl AnomalyDetector {
    pub fn new(window_secs: i64, max_attempts: usize) -> Self {
        Self {
            attempts: DashMap::new(),
            window: Duration::seconds(window_secs),
            max_attempts,
        }
    }

    /// Record an attempt and report whether the client is now suspicious
    pub fn record(&self, ip: &str, user_agent: &str, now: DateTime<Utc>) -> bool {
        let key = (ip.to_string(), user_agent.to_string());
        let mut entry = self.attempts.entry(key).or_default();
        let cutoff = now - self.window;
        while entry.front().is_some_and(|t| *t <= cutoff) {
            entry.pop_front();
        }
        entry.push_back(now);
        entry.len() > self.max_attempts
    }

    /// Drop clients with no attempts inside the window
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.window;
        let before = self.attempts.len();
        self.attempts
            .retain(|_, times| times.back().is_some_and(|t| *t > cutoff));
        before - self.attempts.len()
    }

    #[cfg(test)]
    pub fn tracked_clients(&self) -> usize {
        self.attempts.len()
    }
}
