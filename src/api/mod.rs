/// API routes and handlers
pub mod auth;
pub mod dashboard;
pub mod projects;
pub mod settings;
pub mod users;
pub mod videos;

use crate::{
    context::AppContext,
    error::ApiError,
    models::{Page, PageInfo},
};
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    Json, Router,
};
use serde::Serialize;

/// Build API routes
pub fn routes(ctx: &AppContext) -> Router<AppContext> {
    Router::new()
        .nest("/api/auth/admin", auth::routes(ctx))
        .nest("/api/users", users::routes())
        .nest("/api/videos", videos::routes())
        .nest("/api/projects", projects::routes())
        .nest("/api/dashboard", dashboard::routes())
        .nest("/api/settings", settings::routes())
}

/// JSON body whose rejections use the API error format
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections use the API error format
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Success envelope
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
}

pub type ApiResponse<T> = Json<Envelope<T>>;

pub fn ok<T: Serialize>(data: T) -> ApiResponse<T> {
    Json(Envelope {
        success: true,
        message: None,
        data,
        pagination: None,
    })
}

pub fn ok_with_message<T: Serialize>(message: impl Into<String>, data: T) -> ApiResponse<T> {
    Json(Envelope {
        success: true,
        message: Some(message.into()),
        data,
        pagination: None,
    })
}

pub fn created<T: Serialize>(
    message: impl Into<String>,
    data: T,
) -> (StatusCode, ApiResponse<T>) {
    (StatusCode::CREATED, ok_with_message(message, data))
}

pub fn paged<T: Serialize>(page: Page<T>) -> ApiResponse<Vec<T>> {
    let pagination = PageInfo::from(&page);
    Json(Envelope {
        success: true,
        message: None,
        data: page.items,
        pagination: Some(pagination),
    })
}
