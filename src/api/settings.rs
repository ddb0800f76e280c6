/// Site settings endpoints
use crate::{
    api::{ok, ok_with_message, ApiJson, ApiResponse},
    auth::AdminAuth,
    context::AppContext,
    error::ApiResult,
    models::{SettingsUpdate, SiteSettings},
};
use axum::{extract::State, routing::get, Router};
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

/// Public settings; defaults until an admin saves some
async fn get_settings(State(ctx): State<AppContext>) -> ApiResult<ApiResponse<SiteSettings>> {
    let settings = ctx
        .store
        .settings
        .load_site_settings()
        .await?
        .unwrap_or_default();
    Ok(ok(settings))
}

async fn update_settings(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    ApiJson(update): ApiJson<SettingsUpdate>,
) -> ApiResult<ApiResponse<SiteSettings>> {
    update.validate()?;

    let mut settings = ctx
        .store
        .settings
        .load_site_settings()
        .await?
        .unwrap_or_default();
    settings.apply(update, auth.id());
    ctx.store.settings.save_site_settings(&settings).await?;

    tracing::info!("{} updated site settings", auth.account.username);
    Ok(ok_with_message("Settings updated", settings))
}
