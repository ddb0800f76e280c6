/// MongoDB storage backend
use crate::{
    admin::Role,
    config::DatabaseConfig,
    db::{
        AdminFilter, AdminRepository, ProjectRepository, SettingsRepository, StoreBackend,
        VideoRepository,
    },
    error::{map_duplicate_key, ApiError, ApiResult},
    models::{
        project::ProjectFilter, settings::SITE_SETTINGS_TYPE, timestamp, video::VideoFilter,
        AdminAccount, Page, Pagination, Project, ProjectStatus, SiteSettings, Video, VideoStatus,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{
        ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReplaceOptions,
        ReturnDocument,
    },
    Client, Collection, Database, IndexModel,
};
use serde::de::DeserializeOwned;

const ADMINS: &str = "admins";
const VIDEOS: &str = "videos";
const PROJECTS: &str = "projects";
const SETTINGS: &str = "settings";

/// MongoDB-backed store
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    admins: Collection<AdminAccount>,
    videos: Collection<Video>,
    projects: Collection<Project>,
    settings: Collection<SiteSettings>,
}

impl MongoStore {
    /// Connect, verify the connection and make sure indexes exist
    pub async fn connect(config: &DatabaseConfig) -> ApiResult<Self> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.max_pool_size = Some(config.max_pool_size);
        options.app_name = Some("mediahouse".to_string());

        let client = Client::with_options(options)?;
        let store = Self::new(client.database(&config.name));

        store.ping().await?;
        store.ensure_indexes().await?;

        tracing::info!("Connected to MongoDB database '{}'", config.name);
        Ok(store)
    }

    pub fn new(db: Database) -> Self {
        Self {
            admins: db.collection(ADMINS),
            videos: db.collection(VIDEOS),
            projects: db.collection(PROJECTS),
            settings: db.collection(SETTINGS),
            db,
        }
    }

    async fn ensure_indexes(&self) -> ApiResult<()> {
        let unique = IndexOptions::builder().unique(true).build();

        self.admins
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "username": 1 })
                    .options(unique.clone())
                    .build(),
                None,
            )
            .await?;
        self.admins
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique.clone())
                    .build(),
                None,
            )
            .await?;
        self.admins
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "approvalTokenHash": 1 })
                    .build(),
                None,
            )
            .await?;

        self.videos
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "status": 1, "createdAt": -1 })
                    .build(),
                None,
            )
            .await?;
        self.projects
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "status": 1, "createdAt": -1 })
                    .build(),
                None,
            )
            .await?;

        self.settings
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "type": 1 })
                    .options(unique)
                    .build(),
                None,
            )
            .await?;

        Ok(())
    }
}

/// Case-insensitive match on any of `fields`, for use under `$or`
fn search_clauses(term: &str, fields: &[&str]) -> Vec<Document> {
    let pattern = regex::escape(term);
    fields
        .iter()
        .map(|field| {
            let mut clause = Document::new();
            clause.insert(*field, doc! { "$regex": pattern.as_str(), "$options": "i" });
            clause
        })
        .collect()
}

fn exact_ci(value: &str) -> Document {
    doc! { "$regex": format!("^{}$", regex::escape(value)), "$options": "i" }
}

fn video_filter_doc(filter: &VideoFilter) -> Document {
    let mut query = Document::new();
    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    if let Some(category) = &filter.category {
        query.insert("category", exact_ci(category));
    }
    if let Some(search) = &filter.search {
        query.insert("$or", search_clauses(search, &["title", "description", "keywords"]));
    }
    query
}

fn project_filter_doc(filter: &ProjectFilter) -> Document {
    let mut query = Document::new();
    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    if let Some(category) = &filter.category {
        query.insert("category", exact_ci(category));
    }
    if let Some(search) = &filter.search {
        query.insert(
            "$or",
            search_clauses(search, &["title", "description", "keywords", "client"]),
        );
    }
    query
}

fn admin_filter_doc(filter: &AdminFilter) -> Document {
    let mut query = Document::new();
    if let Some(role) = filter.role {
        query.insert("role", role.as_str());
    }
    if let Some(search) = &filter.search {
        query.insert("$or", search_clauses(search, &["username", "email"]));
    }
    query
}

/// Count + newest-first page for a collection
async fn paginate<T>(
    collection: &Collection<T>,
    filter: Document,
    pagination: Pagination,
) -> ApiResult<Page<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let total = collection.count_documents(filter.clone(), None).await?;

    let options = FindOptions::builder()
        .sort(doc! { "createdAt": -1, "_id": 1 })
        .skip(pagination.skip())
        .limit(pagination.limit as i64)
        .build();

    let items: Vec<T> = collection.find(filter, options).await?.try_collect().await?;

    Ok(Page {
        items,
        total,
        pagination,
    })
}

fn strings(values: Vec<Bson>) -> Vec<String> {
    let mut out: Vec<String> = values
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .filter(|s| !s.is_empty())
        .collect();
    out.sort();
    out
}

#[async_trait]
impl StoreBackend for MongoStore {
    async fn ping(&self) -> ApiResult<()> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mongodb"
    }
}

#[async_trait]
impl AdminRepository for MongoStore {
    async fn insert_admin(&self, admin: &AdminAccount) -> ApiResult<()> {
        self.admins
            .insert_one(admin, None)
            .await
            .map_err(|e| map_duplicate_key(e, "Username or email"))?;
        Ok(())
    }

    async fn find_admin(&self, id: &str) -> ApiResult<Option<AdminAccount>> {
        Ok(self.admins.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_admin_by_username(&self, username: &str) -> ApiResult<Option<AdminAccount>> {
        Ok(self
            .admins
            .find_one(doc! { "username": username }, None)
            .await?)
    }

    async fn find_admin_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> ApiResult<Option<AdminAccount>> {
        if let Some(found) = self.find_admin_by_username(username).await? {
            return Ok(Some(found));
        }
        Ok(self.admins.find_one(doc! { "email": email }, None).await?)
    }

    async fn find_admin_by_token_hash(&self, token_hash: &str) -> ApiResult<Option<AdminAccount>> {
        Ok(self
            .admins
            .find_one(doc! { "approvalTokenHash": token_hash }, None)
            .await?)
    }

    async fn save_admin(&self, admin: &AdminAccount) -> ApiResult<()> {
        let result = self
            .admins
            .replace_one(doc! { "_id": admin.id.as_str() }, admin, None)
            .await
            .map_err(|e| map_duplicate_key(e, "Username or email"))?;

        if result.matched_count == 0 {
            return Err(ApiError::NotFound(format!("Admin {} not found", admin.id)));
        }
        Ok(())
    }

    async fn delete_admin(&self, id: &str) -> ApiResult<bool> {
        let result = self.admins.delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn list_admins(
        &self,
        filter: &AdminFilter,
        pagination: Pagination,
    ) -> ApiResult<Page<AdminAccount>> {
        paginate(&self.admins, admin_filter_doc(filter), pagination).await
    }

    async fn count_admins(&self, role: Option<Role>) -> ApiResult<u64> {
        let filter = match role {
            Some(role) => doc! { "role": role.as_str() },
            None => doc! {},
        };
        Ok(self.admins.count_documents(filter, None).await?)
    }

    async fn clear_expired_approval_tokens(&self, now: DateTime<Utc>) -> ApiResult<u64> {
        let result = self
            .admins
            .update_many(
                doc! {
                    "approvalTokenHash": { "$ne": Bson::Null },
                    "approvalTokenExpires": { "$lt": timestamp::format(&now) },
                },
                doc! {
                    "$set": { "approvalTokenHash": Bson::Null, "approvalTokenExpires": Bson::Null }
                },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }
}

#[async_trait]
impl VideoRepository for MongoStore {
    async fn insert_video(&self, video: &Video) -> ApiResult<()> {
        self.videos.insert_one(video, None).await?;
        Ok(())
    }

    async fn find_video(&self, id: &str) -> ApiResult<Option<Video>> {
        Ok(self.videos.find_one(doc! { "_id": id }, None).await?)
    }

    async fn save_video(&self, video: &Video) -> ApiResult<()> {
        let result = self
            .videos
            .replace_one(doc! { "_id": video.id.as_str() }, video, None)
            .await?;
        if result.matched_count == 0 {
            return Err(ApiError::NotFound("Video not found".to_string()));
        }
        Ok(())
    }

    async fn delete_video(&self, id: &str) -> ApiResult<bool> {
        let result = self.videos.delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn list_videos(
        &self,
        filter: &VideoFilter,
        pagination: Pagination,
    ) -> ApiResult<Page<Video>> {
        paginate(&self.videos, video_filter_doc(filter), pagination).await
    }

    async fn increment_video_views(&self, id: &str) -> ApiResult<Option<i64>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .videos
            .find_one_and_update(doc! { "_id": id }, doc! { "$inc": { "views": 1_i64 } }, options)
            .await?;
        Ok(updated.map(|v| v.views))
    }

    async fn video_categories(&self, status: Option<VideoStatus>) -> ApiResult<Vec<String>> {
        let filter = status.map(|s| doc! { "status": s.as_str() });
        let values = self.videos.distinct("category", filter, None).await?;
        Ok(strings(values))
    }

    async fn count_videos(&self, status: Option<VideoStatus>) -> ApiResult<u64> {
        let filter = match status {
            Some(status) => doc! { "status": status.as_str() },
            None => doc! {},
        };
        Ok(self.videos.count_documents(filter, None).await?)
    }

    async fn total_video_views(&self) -> ApiResult<i64> {
        let pipeline = vec![doc! {
            "$group": { "_id": Bson::Null, "total": { "$sum": "$views" } }
        }];
        let mut cursor = self.videos.aggregate(pipeline, None).await?;

        let total = match cursor.try_next().await? {
            Some(row) => match row.get("total") {
                Some(Bson::Int64(n)) => *n,
                Some(Bson::Int32(n)) => i64::from(*n),
                Some(Bson::Double(n)) => *n as i64,
                _ => 0,
            },
            None => 0,
        };
        Ok(total)
    }
}

#[async_trait]
impl ProjectRepository for MongoStore {
    async fn insert_project(&self, project: &Project) -> ApiResult<()> {
        self.projects.insert_one(project, None).await?;
        Ok(())
    }

    async fn find_project(&self, id: &str) -> ApiResult<Option<Project>> {
        Ok(self.projects.find_one(doc! { "_id": id }, None).await?)
    }

    async fn save_project(&self, project: &Project) -> ApiResult<()> {
        let result = self
            .projects
            .replace_one(doc! { "_id": project.id.as_str() }, project, None)
            .await?;
        if result.matched_count == 0 {
            return Err(ApiError::NotFound("Project not found".to_string()));
        }
        Ok(())
    }

    async fn delete_project(&self, id: &str) -> ApiResult<bool> {
        let result = self.projects.delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn list_projects(
        &self,
        filter: &ProjectFilter,
        pagination: Pagination,
    ) -> ApiResult<Page<Project>> {
        paginate(&self.projects, project_filter_doc(filter), pagination).await
    }

    async fn project_categories(&self) -> ApiResult<Vec<String>> {
        let values = self.projects.distinct("category", None, None).await?;
        Ok(strings(values))
    }

    async fn count_projects(&self, status: Option<ProjectStatus>) -> ApiResult<u64> {
        let filter = match status {
            Some(status) => doc! { "status": status.as_str() },
            None => doc! {},
        };
        Ok(self.projects.count_documents(filter, None).await?)
    }
}

#[async_trait]
impl SettingsRepository for MongoStore {
    async fn load_site_settings(&self) -> ApiResult<Option<SiteSettings>> {
        Ok(self
            .settings
            .find_one(doc! { "type": SITE_SETTINGS_TYPE }, None)
            .await?)
    }

    async fn save_site_settings(&self, settings: &SiteSettings) -> ApiResult<()> {
        let options = ReplaceOptions::builder().upsert(true).build();
        self.settings
            .replace_one(doc! { "type": SITE_SETTINGS_TYPE }, settings, options)
            .await?;
        Ok(())
    }
}
