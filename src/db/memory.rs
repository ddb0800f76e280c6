/// In-process storage backend
use crate::{
    admin::Role,
    db::{
        AdminFilter, AdminRepository, ProjectRepository, SettingsRepository, StoreBackend,
        VideoRepository,
    },
    error::{ApiError, ApiResult},
    models::{
        project::ProjectFilter, video::VideoFilter, AdminAccount, Page, Pagination, Project,
        ProjectStatus, SiteSettings, Video, VideoStatus,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tokio::sync::RwLock;

/// Memory-backed store; collections are kept in insertion order
#[derive(Default)]
pub struct MemoryStore {
    admins: RwLock<Vec<AdminAccount>>,
    videos: RwLock<Vec<Video>>,
    projects: RwLock<Vec<Project>>,
    settings: RwLock<Option<SiteSettings>>,
}

/// Newest first; later insertions win ties
fn newest_first<T: Clone>(
    items: &[T],
    keep: impl Fn(&T) -> bool,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut out: Vec<T> = items.iter().rev().filter(|i| keep(i)).cloned().collect();
    out.sort_by_key(|i| std::cmp::Reverse(created_at(i)));
    out
}

fn sorted_unique(values: impl Iterator<Item = String>) -> Vec<String> {
    values
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn ping(&self) -> ApiResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl AdminRepository for MemoryStore {
    async fn insert_admin(&self, admin: &AdminAccount) -> ApiResult<()> {
        let mut admins = self.admins.write().await;
        if admins
            .iter()
            .any(|a| a.id == admin.id || a.username == admin.username || a.email == admin.email)
        {
            return Err(ApiError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }
        admins.push(admin.clone());
        Ok(())
    }

    async fn find_admin(&self, id: &str) -> ApiResult<Option<AdminAccount>> {
        Ok(self.admins.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn find_admin_by_username(&self, username: &str) -> ApiResult<Option<AdminAccount>> {
        Ok(self
            .admins
            .read()
            .await
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn find_admin_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> ApiResult<Option<AdminAccount>> {
        let admins = self.admins.read().await;
        Ok(admins
            .iter()
            .find(|a| a.username == username)
            .or_else(|| admins.iter().find(|a| a.email == email))
            .cloned())
    }

    async fn find_admin_by_token_hash(&self, token_hash: &str) -> ApiResult<Option<AdminAccount>> {
        Ok(self
            .admins
            .read()
            .await
            .iter()
            .find(|a| a.approval_token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn save_admin(&self, admin: &AdminAccount) -> ApiResult<()> {
        let mut admins = self.admins.write().await;
        if admins
            .iter()
            .any(|a| a.id != admin.id && (a.username == admin.username || a.email == admin.email))
        {
            return Err(ApiError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }
        match admins.iter_mut().find(|a| a.id == admin.id) {
            Some(slot) => {
                *slot = admin.clone();
                Ok(())
            }
            None => Err(ApiError::NotFound(format!("Admin {} not found", admin.id))),
        }
    }

    async fn delete_admin(&self, id: &str) -> ApiResult<bool> {
        let mut admins = self.admins.write().await;
        let before = admins.len();
        admins.retain(|a| a.id != id);
        Ok(admins.len() < before)
    }

    async fn list_admins(
        &self,
        filter: &AdminFilter,
        pagination: Pagination,
    ) -> ApiResult<Page<AdminAccount>> {
        let admins = self.admins.read().await;
        let matching = newest_first(&admins, |a| filter.matches(a), |a| a.created_at);
        Ok(Page::from_sorted(matching, pagination))
    }

    async fn count_admins(&self, role: Option<Role>) -> ApiResult<u64> {
        let admins = self.admins.read().await;
        Ok(admins
            .iter()
            .filter(|a| role.map_or(true, |r| a.role == r))
            .count() as u64)
    }

    async fn clear_expired_approval_tokens(&self, now: DateTime<Utc>) -> ApiResult<u64> {
        let mut admins = self.admins.write().await;
        let mut cleared = 0;
        for admin in admins.iter_mut() {
            let expired = admin.approval_token_hash.is_some()
                && admin.approval_token_expires.is_some_and(|exp| exp < now);
            if expired {
                admin.approval_token_hash = None;
                admin.approval_token_expires = None;
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

#[async_trait]
impl VideoRepository for MemoryStore {
    async fn insert_video(&self, video: &Video) -> ApiResult<()> {
        self.videos.write().await.push(video.clone());
        Ok(())
    }

    async fn find_video(&self, id: &str) -> ApiResult<Option<Video>> {
        Ok(self.videos.read().await.iter().find(|v| v.id == id).cloned())
    }

    async fn save_video(&self, video: &Video) -> ApiResult<()> {
        let mut videos = self.videos.write().await;
        match videos.iter_mut().find(|v| v.id == video.id) {
            Some(slot) => {
                *slot = video.clone();
                Ok(())
            }
            None => Err(ApiError::NotFound("Video not found".to_string())),
        }
    }

    async fn delete_video(&self, id: &str) -> ApiResult<bool> {
        let mut videos = self.videos.write().await;
        let before = videos.len();
        videos.retain(|v| v.id != id);
        Ok(videos.len() < before)
    }

    async fn list_videos(
        &self,
        filter: &VideoFilter,
        pagination: Pagination,
    ) -> ApiResult<Page<Video>> {
        let videos = self.videos.read().await;
        let matching = newest_first(&videos, |v| filter.matches(v), |v| v.created_at);
        Ok(Page::from_sorted(matching, pagination))
    }

    async fn increment_video_views(&self, id: &str) -> ApiResult<Option<i64>> {
        let mut videos = self.videos.write().await;
        Ok(videos.iter_mut().find(|v| v.id == id).map(|v| {
            v.views += 1;
            v.views
        }))
    }

    async fn video_categories(&self, status: Option<VideoStatus>) -> ApiResult<Vec<String>> {
        let videos = self.videos.read().await;
        Ok(sorted_unique(
            videos
                .iter()
                .filter(|v| status.map_or(true, |s| v.status == s))
                .map(|v| v.category.clone()),
        ))
    }

    async fn count_videos(&self, status: Option<VideoStatus>) -> ApiResult<u64> {
        let videos = self.videos.read().await;
        Ok(videos
            .iter()
            .filter(|v| status.map_or(true, |s| v.status == s))
            .count() as u64)
    }

    async fn total_video_views(&self) -> ApiResult<i64> {
        Ok(self.videos.read().await.iter().map(|v| v.views).sum())
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn insert_project(&self, project: &Project) -> ApiResult<()> {
        self.projects.write().await.push(project.clone());
        Ok(())
    }

    async fn find_project(&self, id: &str) -> ApiResult<Option<Project>> {
        Ok(self.projects.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn save_project(&self, project: &Project) -> ApiResult<()> {
        let mut projects = self.projects.write().await;
        match projects.iter_mut().find(|p| p.id == project.id) {
            Some(slot) => {
                *slot = project.clone();
                Ok(())
            }
            None => Err(ApiError::NotFound("Project not found".to_string())),
        }
    }

    async fn delete_project(&self, id: &str) -> ApiResult<bool> {
        let mut projects = self.projects.write().await;
        let before = projects.len();
        projects.retain(|p| p.id != id);
        Ok(projects.len() < before)
    }

    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        pagination: Pagination,
    ) -> ApiResult<Page<Project>> {
        let projects = self.projects.read().await;
        let matching = newest_first(&projects, |p| filter.matches(p), |p| p.created_at);
        Ok(Page::from_sorted(matching, pagination))
    }

    async fn project_categories(&self) -> ApiResult<Vec<String>> {
        let projects = self.projects.read().await;
        Ok(sorted_unique(projects.iter().map(|p| p.category.clone())))
    }

    async fn count_projects(&self, status: Option<ProjectStatus>) -> ApiResult<u64> {
        let projects = self.projects.read().await;
        Ok(projects
            .iter()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .count() as u64)
    }
}

#[async_trait]
impl SettingsRepository for MemoryStore {
    async fn load_site_settings(&self) -> ApiResult<Option<SiteSettings>> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_site_settings(&self, settings: &SiteSettings) -> ApiResult<()> {
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }
}
