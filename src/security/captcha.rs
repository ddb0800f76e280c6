/// Arithmetic CAPTCHA challenges for suspicious login clients
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Challenge as handed to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaChallenge {
    pub id: String,
    pub question: String,
}

#[derive(Debug, Clone)]
struct IssuedChallenge {
    answer: i64,
    expires_at: DateTime<Utc>,
}

/// Issued challenges, consumed on first verification
pub struct CaptchaStore {
    challenges: DashMap<String, IssuedChallenge>,
    ttl: Duration,
}

impl CaptchaStore {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            challenges: DashMap::new(),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Generate and remember a new challenge
    pub fn issue(&self) -> CaptchaChallenge {
        let (question, answer) = generate_puzzle(&mut rand::thread_rng());
        let id = uuid::Uuid::new_v4().to_string();

        self.challenges.insert(
            id.clone(),
            IssuedChallenge {
                answer,
                expires_at: Utc::now() + self.ttl,
            },
        );

        CaptchaChallenge { id, question }
    }

    /// Check an answer. The challenge is removed whatever the outcome.
    pub fn verify(&self, id: &str, answer: &str) -> bool {
        let Some((_, issued)) = self.challenges.remove(id) else {
            return false;
        };
        if issued.expires_at < Utc::now() {
            return false;
        }
        answer.trim().parse::<i64>().ok() == Some(issued.answer)
    }

    /// Drop expired challenges, returning how many were removed
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        let before = self.challenges.len();
        self.challenges.retain(|_, c| c.expires_at >= now);
        before - self.challenges.len()
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

fn generate_puzzle<R: Rng>(rng: &mut R) -> (String, i64) {
    match rng.gen_range(0..3) {
        0 => {
            let (a, b) = (rng.gen_range(1..=20), rng.gen_range(1..=20));
            (format!("What is {} + {}?", a, b), a + b)
        }
        1 => {
            let a = rng.gen_range(2..=20);
            let b = rng.gen_range(1..=a);
            (format!("What is {} - {}?", a, b), a - b)
        }
        _ => {
            let (a, b) = (rng.gen_range(2..=9), rng.gen_range(2..=9));
            (format!("What is {} × {}?", a, b), a * b)
        }
    }
}
