/// Video catalogue endpoints
///
/// Reads are public; anonymous callers only ever see published videos.
use crate::{
    api::{created, ok, ok_with_message, paged, ApiJson, ApiQuery, ApiResponse},
    auth::{AdminAuth, OptionalAdminAuth},
    context::AppContext,
    error::{ApiError, ApiResult},
    models::{
        video::VideoFilter, ListParams, Video, VideoInput, VideoStatus, VideoUpdate,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/", get(list_videos).post(create_video))
        .route("/categories", get(list_categories))
        .route(
            "/:id",
            get(get_video).put(update_video).delete(delete_video),
        )
        .route("/:id/view", post(record_view))
}

fn not_found() -> ApiError {
    ApiError::NotFound("Video not found".to_string())
}

/// Status filter honouring caller visibility
fn visible_status(
    auth: &OptionalAdminAuth,
    requested: Option<&str>,
) -> ApiResult<Option<VideoStatus>> {
    if auth.0.is_none() {
        return Ok(Some(VideoStatus::Published));
    }
    match requested.map(str::trim) {
        Some(s) if !s.is_empty() && !s.eq_ignore_ascii_case("all") => Ok(Some(s.parse()?)),
        _ => Ok(None),
    }
}

async fn find_visible(ctx: &AppContext, auth: &OptionalAdminAuth, id: &str) -> ApiResult<Video> {
    let video = ctx.store.videos.find_video(id).await?.ok_or_else(not_found)?;
    if auth.0.is_none() && video.status != VideoStatus::Published {
        return Err(not_found());
    }
    Ok(video)
}

async fn list_videos(
    State(ctx): State<AppContext>,
    auth: OptionalAdminAuth,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<ApiResponse<Vec<Video>>> {
    let filter = VideoFilter {
        search: params.search_term(),
        category: params.category_filter(),
        status: visible_status(&auth, params.status.as_deref())?,
    };

    let page = ctx
        .store
        .videos
        .list_videos(&filter, params.pagination())
        .await?;
    Ok(paged(page))
}

async fn list_categories(
    State(ctx): State<AppContext>,
    auth: OptionalAdminAuth,
) -> ApiResult<ApiResponse<Vec<String>>> {
    let status = visible_status(&auth, None)?;
    Ok(ok(ctx.store.videos.video_categories(status).await?))
}

async fn get_video(
    State(ctx): State<AppContext>,
    auth: OptionalAdminAuth,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Video>> {
    Ok(ok(find_visible(&ctx, &auth, &id).await?))
}

#[derive(Debug, Serialize)]
struct ViewCount {
    views: i64,
}

async fn record_view(
    State(ctx): State<AppContext>,
    auth: OptionalAdminAuth,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<ViewCount>> {
    find_visible(&ctx, &auth, &id).await?;

    let views = ctx
        .store
        .videos
        .increment_video_views(&id)
        .await?
        .ok_or_else(not_found)?;
    Ok(ok(ViewCount { views }))
}

async fn create_video(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    ApiJson(input): ApiJson<VideoInput>,
) -> ApiResult<(StatusCode, ApiResponse<Video>)> {
    input.validate()?;

    let video = Video::create(input, auth.id());
    ctx.store.videos.insert_video(&video).await?;

    tracing::info!("{} created video {}", auth.account.username, video.id);
    Ok(created("Video created", video))
}

async fn update_video(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<VideoUpdate>,
) -> ApiResult<ApiResponse<Video>> {
    update.validate()?;

    let mut video = ctx.store.videos.find_video(&id).await?.ok_or_else(not_found)?;
    video.apply(update, auth.id());
    ctx.store.videos.save_video(&video).await?;

    Ok(ok_with_message("Video updated", video))
}

async fn delete_video(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Option<()>>> {
    if !ctx.store.videos.delete_video(&id).await? {
        return Err(not_found());
    }

    tracing::info!("{} deleted video {}", auth.account.username, id);
    Ok(ok_with_message("Video deleted", None))
}
