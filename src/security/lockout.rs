/// Per-username lockout after repeated failed logins
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

#[derive(Debug, Clone)]
struct FailureRecord {
    count: u32,
    first_failure: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
}

pub struct LoginLockout {
    failures: DashMap<String, FailureRecord>,
    max_failures: u32,
    duration: Duration,
}

impl LoginLockout {
    pub fn new(max_failures: u32, lockout_minutes: i64) -> Self {
        Self {
            failures: DashMap::new(),
            max_failures,
            duration: Duration::minutes(lockout_minutes),
        }
    }

    /// Fail with `AccountLocked` while a lockout is active
    pub fn check(&self, username: &str, now: DateTime<Utc>) -> ApiResult<()> {
        let expired = match self.failures.get(username) {
            Some(record) => match record.locked_until {
                Some(until) if until > now => {
                    return Err(ApiError::AccountLocked {
                        retry_after: remaining(until, now),
                    })
                }
                Some(_) => true,
                None => false,
            },
            None => false,
        };
        if expired {
            self.failures.remove(username);
        }
        Ok(())
    }

    /// Count a failure; returns the lockout length when this failure triggers one
    pub fn record_failure(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> Option<std::time::Duration> {
        let mut record = self
            .failures
            .entry(username.to_string())
            .or_insert_with(|| FailureRecord {
                count: 0,
                first_failure: now,
                locked_until: None,
            });

        // Failures spread wider than one lockout period start over
        if record.locked_until.is_none() && now - record.first_failure > self.duration {
            record.count = 0;
            record.first_failure = now;
        }

        record.count += 1;
        if record.count >= self.max_failures && record.locked_until.is_none() {
            let until = now + self.duration;
            record.locked_until = Some(until);
            return Some(remaining(until, now));
        }
        None
    }

    /// Forget failures after a successful login
    pub fn clear(&self, username: &str) {
        self.failures.remove(username);
    }

    /// Drop expired lockouts and stale failure counters
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let before = self.failures.len();
        let duration = self.duration;
        self.failures.retain(|_, r| match r.locked_until {
            Some(until) => until > now,
            None => now - r.first_failure <= duration,
        });
        before - self.failures.len()
    }

    #[cfg(test)]
    pub fn failure_count(&self, username: &str) -> u32 {
        self.failures.get(username).map(|r| r.count).unwrap_or(0)
    }
}

fn remaining(until: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    (until - now).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locks_after_max_failures() {
        let lockout = LoginLockout::new(5, 30);
        let now = Utc::now();

        for _ in 0..4 {
            assert!(lockout.record_failure("alice", now).is_none());
            assert!(lockout.check("alice", now).is_ok());
        }
        let locked_for = lockout.record_failure("alice", now).unwrap();
        assert_eq!(locked_for.as_secs(), 30 * 60);

        match lockout.check("alice", now + Duration::minutes(10)) {
            Err(ApiError::AccountLocked { retry_after }) => {
                assert_eq!(retry_after.as_secs(), 20 * 60)
            }
            other => panic!("expected lockout, got {:?}", other),
        }

        // Other usernames are unaffected
        assert!(lockout.check("bob", now).is_ok());
    }

    #[test]
    fn test_lockout_expires() {
        let lockout = LoginLockout::new(2, 30);
        let now = Utc::now();
        lockout.record_failure("alice", now);
        lockout.record_failure("alice", now);
        assert!(lockout.check("alice", now).is_err());

        assert!(lockout.check("alice", now + Duration::minutes(31)).is_ok());
        assert_eq!(lockout.failure_count("alice"), 0);
    }

    #[test]
    fn test_clear_resets_counter() {
        let lockout = LoginLockout::new(5, 30);
        let now = Utc::now();
        lockout.record_failure("alice", now);
        lockout.record_failure("alice", now);
        lockout.clear("alice");
        assert_eq!(lockout.failure_count("alice"), 0);
    }

    #[test]
    fn test_prune_drops_stale_entries() {
        let lockout = LoginLockout::new(5, 30);
        let now = Utc::now();
        lockout.record_failure("old", now - Duration::hours(2));
        lockout.record_failure("recent", now);

        assert_eq!(lockout.prune(now), 1);
        assert_eq!(lockout.failure_count("recent"), 1);
    }
}
