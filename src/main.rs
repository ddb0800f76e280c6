/// Mediahouse - back-office API for the marketing site
use mediahouse::{config::ServerConfig, jobs::JobScheduler, server, AppContext};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("mediahouse={},tower_http=info", config.logging.level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Mediahouse API v{}", env!("CARGO_PKG_VERSION"));

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    if let Some(bootstrap) = ctx.config.bootstrap.clone() {
        match ctx.account_manager.bootstrap_superadmin(&bootstrap).await {
            Ok(Some(admin)) => tracing::info!("Created superadmin {}", admin.username),
            Ok(None) => tracing::debug!("Superadmin already present, skipping bootstrap"),
            Err(e) => tracing::error!("Failed to bootstrap superadmin: {}", e),
        }
    }

    // Start background jobs
    let scheduler = Arc::new(JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}
