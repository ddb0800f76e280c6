/// Application context and dependency injection
use crate::{
    account::AccountManager,
    config::ServerConfig,
    db::Store,
    error::ApiResult,
    mailer::Mailer,
    security::SecurityState,
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub store: Store,
    pub account_manager: Arc<AccountManager>,
    pub mailer: Arc<Mailer>,
    // Rate limits, lockouts, captcha
    pub security: Arc<SecurityState>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        let store = Store::connect(&config.database).await?;
        tracing::info!("Connected to {} store", store.backend_name());

        let mailer = Mailer::new(config.email.clone())?;
        if !mailer.is_configured() {
            tracing::warn!("Email is not configured; approval links will not be mailed");
        }

        Ok(Self::assemble(config, store, mailer))
    }

    /// Build a context over an existing store and mailer
    pub fn with_store(config: ServerConfig, store: Store, mailer: Mailer) -> Self {
        Self::assemble(config, store, mailer)
    }

    fn assemble(config: ServerConfig, store: Store, mailer: Mailer) -> Self {
        let config = Arc::new(config);
        let mailer = Arc::new(mailer);
        let security = Arc::new(SecurityState::new(&config));

        let account_manager = Arc::new(AccountManager::new(
            store.clone(),
            mailer.clone(),
            security.clone(),
            config.clone(),
        ));

        Self {
            config,
            store,
            account_manager,
            mailer,
            security,
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> &str {
        &self.config.service.public_url
    }
}
