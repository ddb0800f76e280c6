use std::{sync::Arc, time::Instant};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::security_state_prune_job(Arc::clone(&self)));
        tokio::spawn(Self::approval_token_cleanup_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Prune expired lockouts, limiter windows and captchas (runs every 5 minutes)
    async fn security_state_prune_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;
            let started = Instant::now();

            let removed = tasks::prune_security_state(&scheduler.context);
            if removed > 0 {
                debug!("Pruned {} expired security entries", removed);
            }
            crate::metrics::record_background_job(
                "prune_security_state",
                "success",
                started.elapsed().as_secs_f64(),
            );
        }
    }

    /// Clear expired approval tokens (runs every hour)
    async fn approval_token_cleanup_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600));

        loop {
            interval.tick().await;
            let started = Instant::now();

            let status = match tasks::clear_expired_approval_tokens(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleared {} expired approval tokens", count);
                    }
                    "success"
                }
                Err(e) => {
                    error!("Failed to clear expired approval tokens: {}", e);
                    "failure"
                }
            };
            crate::metrics::record_background_job(
                "clear_approval_tokens",
                status,
                started.elapsed().as_secs_f64(),
            );
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;
            let started = Instant::now();

            let status = match tasks::health_check(&scheduler.context).await {
                Ok(_) => "success",
                Err(e) => {
                    error!("Health check failed: {}", e);
                    "failure"
                }
            };
            crate::metrics::record_background_job(
                "health_check",
                status,
                started.elapsed().as_secs_f64(),
            );
        }
    }
}
