use crate::error::ApiError;
use crate::models::{deserialize_keywords, deserialize_optional_keywords, timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Publication state of a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Draft,
    #[default]
    Published,
    Archived,
}

impl VideoStatus {
    pub const ALL: [VideoStatus; 3] = [
        VideoStatus::Draft,
        VideoStatus::Published,
        VideoStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Draft => "draft",
            VideoStatus::Published => "published",
            VideoStatus::Archived => "archived",
        }
    }
}

impl FromStr for VideoStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(VideoStatus::Draft),
            "published" => Ok(VideoStatus::Published),
            "archived" => Ok(VideoStatus::Archived),
            _ => Err(ApiError::Validation(format!("Invalid video status: {}", s))),
        }
    }
}

/// Video document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub status: VideoStatus,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Create request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VideoInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(url(message = "Video URL must be a valid URL"))]
    pub url: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_keywords")]
    pub keywords: Vec<String>,
    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: String,
    pub duration: Option<String>,
    pub uploader: Option<String>,
    #[validate(url(message = "Thumbnail must be a valid URL"))]
    pub thumbnail_url: Option<String>,
    pub status: Option<VideoStatus>,
}

/// Partial update request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VideoUpdate {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(url(message = "Video URL must be a valid URL"))]
    pub url: Option<String>,
    #[validate(length(max = 5000, message = "Description is too long"))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_keywords")]
    pub keywords: Option<Vec<String>>,
    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: Option<String>,
    pub duration: Option<String>,
    pub uploader: Option<String>,
    #[validate(url(message = "Thumbnail must be a valid URL"))]
    pub thumbnail_url: Option<String>,
    pub status: Option<VideoStatus>,
}

impl Video {
    pub fn create(input: VideoInput, created_by: &str) -> Self {
        let now = super::now();
        Self {
            id: super::new_id(),
            title: input.title.trim().to_string(),
            url: input.url.trim().to_string(),
            description: input.description,
            keywords: input.keywords,
            category: input.category.trim().to_string(),
            duration: input.duration,
            uploader: input.uploader,
            thumbnail_url: input.thumbnail_url,
            views: 0,
            status: input.status.unwrap_or_default(),
            created_by: Some(created_by.to_string()),
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: VideoUpdate, updated_by: &str) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(url) = update.url {
            self.url = url.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(keywords) = update.keywords {
            self.keywords = keywords;
        }
        if let Some(category) = update.category {
            self.category = category.trim().to_string();
        }
        if update.duration.is_some() {
            self.duration = update.duration;
        }
        if update.uploader.is_some() {
            self.uploader = update.uploader;
        }
        if update.thumbnail_url.is_some() {
            self.thumbnail_url = update.thumbnail_url;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_by = Some(updated_by.to_string());
        self.updated_at = super::now();
    }
}

/// Filters accepted by video listings
#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<VideoStatus>,
}

impl VideoFilter {
    pub fn matches(&self, video: &Video) -> bool {
        if let Some(status) = self.status {
            if video.status != status {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if !video.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let keywords = video.keywords.join(" ");
            return super::matches_search(search, &[&video.title, &video.description, &keywords]);
        }
        true
    }
}
