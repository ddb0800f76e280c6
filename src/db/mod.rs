/// Database layer for the Mediahouse API
///
/// Repository traits over the four document collections (admins, videos,
/// projects, settings). `mongo` is the production backend; `memory` keeps
/// everything in process and backs the test-suite and `MEDIAHOUSE_STORAGE=memory`.

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use crate::{
    admin::Role,
    config::{DatabaseConfig, StorageBackend},
    error::ApiResult,
    models::{
        project::ProjectFilter, video::VideoFilter, AdminAccount, Page, Pagination, Project,
        ProjectStatus, SiteSettings, Video, VideoStatus,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Filters accepted by admin listings
#[derive(Debug, Clone, Default)]
pub struct AdminFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
}

impl AdminFilter {
    pub fn matches(&self, admin: &AdminAccount) -> bool {
        if let Some(role) = self.role {
            if admin.role != role {
                return false;
            }
        }
        match &self.search {
            Some(search) => crate::models::matches_search(search, &[&admin.username, &admin.email]),
            None => true,
        }
    }
}

/// Backend-level operations
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Check the backend is reachable
    async fn ping(&self) -> ApiResult<()>;

    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Insert a new account; duplicate username/email is a conflict
    async fn insert_admin(&self, admin: &AdminAccount) -> ApiResult<()>;

    async fn find_admin(&self, id: &str) -> ApiResult<Option<AdminAccount>>;

    async fn find_admin_by_username(&self, username: &str) -> ApiResult<Option<AdminAccount>>;

    /// Username match wins over email match
    async fn find_admin_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> ApiResult<Option<AdminAccount>>;

    async fn find_admin_by_token_hash(&self, token_hash: &str) -> ApiResult<Option<AdminAccount>>;

    /// Replace the stored account with `admin`
    async fn save_admin(&self, admin: &AdminAccount) -> ApiResult<()>;

    async fn delete_admin(&self, id: &str) -> ApiResult<bool>;

    async fn list_admins(
        &self,
        filter: &AdminFilter,
        pagination: Pagination,
    ) -> ApiResult<Page<AdminAccount>>;

    async fn count_admins(&self, role: Option<Role>) -> ApiResult<u64>;

    /// Drop approval tokens whose expiry has passed
    async fn clear_expired_approval_tokens(&self, now: DateTime<Utc>) -> ApiResult<u64>;
}

#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn insert_video(&self, video: &Video) -> ApiResult<()>;

    async fn find_video(&self, id: &str) -> ApiResult<Option<Video>>;

    async fn save_video(&self, video: &Video) -> ApiResult<()>;

    async fn delete_video(&self, id: &str) -> ApiResult<bool>;

    /// Newest first
    async fn list_videos(&self, filter: &VideoFilter, pagination: Pagination)
        -> ApiResult<Page<Video>>;

    /// Atomically bump the view counter, returning the new count
    async fn increment_video_views(&self, id: &str) -> ApiResult<Option<i64>>;

    async fn video_categories(&self, status: Option<VideoStatus>) -> ApiResult<Vec<String>>;

    async fn count_videos(&self, status: Option<VideoStatus>) -> ApiResult<u64>;

    async fn total_video_views(&self) -> ApiResult<i64>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn insert_project(&self, project: &Project) -> ApiResult<()>;

    async fn find_project(&self, id: &str) -> ApiResult<Option<Project>>;

    async fn save_project(&self, project: &Project) -> ApiResult<()>;

    async fn delete_project(&self, id: &str) -> ApiResult<bool>;

    /// Newest first
    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        pagination: Pagination,
    ) -> ApiResult<Page<Project>>;

    async fn project_categories(&self) -> ApiResult<Vec<String>>;

    async fn count_projects(&self, status: Option<ProjectStatus>) -> ApiResult<u64>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn load_site_settings(&self) -> ApiResult<Option<SiteSettings>>;

    /// Upsert keyed by `type = "site"`
    async fn save_site_settings(&self, settings: &SiteSettings) -> ApiResult<()>;
}

/// Handles to every repository, sharing one backend
#[derive(Clone)]
pub struct Store {
    pub admins: Arc<dyn AdminRepository>,
    pub videos: Arc<dyn VideoRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    backend: Arc<dyn StoreBackend>,
}

impl Store {
    pub fn new<B>(backend: Arc<B>) -> Self
    where
        B: AdminRepository
            + VideoRepository
            + ProjectRepository
            + SettingsRepository
            + StoreBackend
            + 'static,
    {
        Self {
            admins: backend.clone(),
            videos: backend.clone(),
            projects: backend.clone(),
            settings: backend.clone(),
            backend,
        }
    }

    /// Open the configured backend
    pub async fn connect(config: &DatabaseConfig) -> ApiResult<Self> {
        match config.backend {
            StorageBackend::Mongo => {
                let store = MongoStore::connect(config).await?;
                Ok(Self::new(Arc::new(store)))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage - data will not survive a restart");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    pub async fn ping(&self) -> ApiResult<()> {
        self.backend.ping().await
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}
