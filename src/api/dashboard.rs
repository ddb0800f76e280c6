/// Back-office dashboard statistics
use crate::{
    admin::Role,
    api::{ok, ApiResponse},
    auth::AdminAuth,
    context::AppContext,
    error::ApiResult,
    models::{
        project::ProjectFilter, video::VideoFilter, Pagination, Project, ProjectStatus, Video,
        VideoStatus,
    },
};
use axum::{extract::State, routing::get, Router};
use serde::Serialize;
use std::collections::BTreeMap;

const RECENT_ITEMS: u64 = 5;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/stats", get(get_stats))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoStats {
    total: u64,
    by_status: BTreeMap<&'static str, u64>,
    total_views: i64,
    recent: Vec<Video>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectStats {
    total: u64,
    by_status: BTreeMap<&'static str, u64>,
    recent: Vec<Project>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminStats {
    total: u64,
    pending: u64,
    superadmins: u64,
}

#[derive(Debug, Serialize)]
struct DashboardStats {
    videos: VideoStats,
    projects: ProjectStats,
    admins: AdminStats,
}

async fn get_stats(
    State(ctx): State<AppContext>,
    _auth: AdminAuth,
) -> ApiResult<ApiResponse<DashboardStats>> {
    let store = &ctx.store;
    let recent = Pagination::new(Some(1), Some(RECENT_ITEMS));

    let mut video_counts = BTreeMap::new();
    for status in VideoStatus::ALL {
        video_counts.insert(status.as_str(), store.videos.count_videos(Some(status)).await?);
    }
    let videos = VideoStats {
        total: store.videos.count_videos(None).await?,
        by_status: video_counts,
        total_views: store.videos.total_video_views().await?,
        recent: store
            .videos
            .list_videos(&VideoFilter::default(), recent)
            .await?
            .items,
    };

    let mut project_counts = BTreeMap::new();
    for status in ProjectStatus::ALL {
        project_counts.insert(
            status.as_str(),
            store.projects.count_projects(Some(status)).await?,
        );
    }
    let projects = ProjectStats {
        total: store.projects.count_projects(None).await?,
        by_status: project_counts,
        recent: store
            .projects
            .list_projects(&ProjectFilter::default(), recent)
            .await?
            .items,
    };

    let admins = AdminStats {
        total: store.admins.count_admins(None).await?,
        pending: store.admins.count_admins(Some(Role::Pending)).await?,
        superadmins: store.admins.count_admins(Some(Role::SuperAdmin)).await?,
    };

    Ok(ok(DashboardStats {
        videos,
        projects,
        admins,
    }))
}
