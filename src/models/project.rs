use crate::error::ApiError;
use crate::models::{deserialize_keywords, deserialize_optional_keywords, timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Project lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Ongoing,
    Completed,
    Upcoming,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 3] = [
        ProjectStatus::Ongoing,
        ProjectStatus::Completed,
        ProjectStatus::Upcoming,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Ongoing => "ongoing",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Upcoming => "upcoming",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ongoing" => Ok(ProjectStatus::Ongoing),
            "completed" => Ok(ProjectStatus::Completed),
            "upcoming" => Ok(ProjectStatus::Upcoming),
            _ => Err(ApiError::Validation(format!("Invalid project status: {}", s))),
        }
    }
}

/// Project document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    pub category: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 10000, message = "Description is required"))]
    pub description: String,
    #[validate(url(message = "Image must be a valid URL"))]
    pub image: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: String,
    pub status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "deserialize_keywords")]
    pub keywords: Vec<String>,
    #[validate(length(max = 200, message = "Client name is too long"))]
    pub client: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 10000, message = "Description is required"))]
    pub description: Option<String>,
    #[validate(url(message = "Image must be a valid URL"))]
    pub image: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: Option<String>,
    pub status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_keywords")]
    pub keywords: Option<Vec<String>>,
    #[validate(length(max = 200, message = "Client name is too long"))]
    pub client: Option<String>,
}

impl Project {
    pub fn create(input: ProjectInput, created_by: &str) -> Self {
        let now = super::now();
        Self {
            id: super::new_id(),
            title: input.title.trim().to_string(),
            description: input.description,
            image: input.image,
            category: input.category.trim().to_string(),
            status: input.status.unwrap_or_default(),
            keywords: input.keywords,
            client: input.client,
            created_by: Some(created_by.to_string()),
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: ProjectUpdate, updated_by: &str) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if update.image.is_some() {
            self.image = update.image;
        }
        if let Some(category) = update.category {
            self.category = category.trim().to_string();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(keywords) = update.keywords {
            self.keywords = keywords;
        }
        if update.client.is_some() {
            self.client = update.client;
        }
        self.updated_by = Some(updated_by.to_string());
        self.updated_at = super::now();
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<ProjectStatus>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        if let Some(status) = self.status {
            if project.status != status {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if !project.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let keywords = project.keywords.join(" ");
            let client = project.client.clone().unwrap_or_default();
            return super::matches_search(
                search,
                &[&project.title, &project.description, &keywords, &client],
            );
        }
        true
    }
}
