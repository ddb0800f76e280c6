use crate::models::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

pub const SITE_SETTINGS_TYPE: &str = "site";

fn site_type() -> String {
    SITE_SETTINGS_TYPE.to_string()
}

fn enabled() -> bool {
    true
}

/// Singleton site settings document (`type = "site"`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    #[serde(rename = "type", default = "site_type")]
    pub kind: String,
    #[serde(default)]
    pub site_name: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
    #[serde(default = "enabled")]
    pub show_videos: bool,
    #[serde(default = "enabled")]
    pub show_projects: bool,
    #[serde(default)]
    pub maintenance_mode: bool,
    #[serde(default = "enabled")]
    pub allow_registration: bool,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            kind: site_type(),
            site_name: "Mediahouse".to_string(),
            tagline: None,
            contact_email: None,
            contact_phone: None,
            address: None,
            social_links: BTreeMap::new(),
            show_videos: true,
            show_projects: true,
            maintenance_mode: false,
            allow_registration: true,
            updated_by: None,
            updated_at: None,
        }
    }
}

/// Partial settings update
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[validate(length(min = 1, max = 100, message = "Site name must be 1-100 characters"))]
    pub site_name: Option<String>,
    #[validate(length(max = 200, message = "Tagline is too long"))]
    pub tagline: Option<String>,
    #[validate(email(message = "Contact email must be valid"))]
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub social_links: Option<BTreeMap<String, String>>,
    pub show_videos: Option<bool>,
    pub show_projects: Option<bool>,
    pub maintenance_mode: Option<bool>,
    pub allow_registration: Option<bool>,
}

impl SiteSettings {
    pub fn apply(&mut self, update: SettingsUpdate, updated_by: &str) {
        if let Some(site_name) = update.site_name {
            self.site_name = site_name.trim().to_string();
        }
        if update.tagline.is_some() {
            self.tagline = update.tagline;
        }
        if update.contact_email.is_some() {
            self.contact_email = update.contact_email;
        }
        if update.contact_phone.is_some() {
            self.contact_phone = update.contact_phone;
        }
        if update.address.is_some() {
            self.address = update.address;
        }
        if let Some(links) = update.social_links {
            self.social_links = links;
        }
        if let Some(v) = update.show_videos {
            self.show_videos = v;
        }
        if let Some(v) = update.show_projects {
            self.show_projects = v;
        }
        if let Some(v) = update.maintenance_mode {
            self.maintenance_mode = v;
        }
        if let Some(v) = update.allow_registration {
            self.allow_registration = v;
        }
        self.kind = site_type();
        self.updated_by = Some(updated_by.to_string());
        self.updated_at = Some(super::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let settings: SiteSettings = serde_json::from_str(r#"{"siteName": "Studio"}"#).unwrap();
        assert_eq!(settings.kind, "site");
        assert!(settings.show_videos);
        assert!(settings.allow_registration);
        assert!(!settings.maintenance_mode);
    }

    #[test]
    fn test_apply_only_touches_given_fields() {
        let mut settings = SiteSettings::default();
        settings.apply(
            SettingsUpdate {
                maintenance_mode: Some(true),
                ..SettingsUpdate::default()
            },
            "admin-1",
        );
        assert!(settings.maintenance_mode);
        assert_eq!(settings.site_name, "Mediahouse");
        assert_eq!(settings.updated_by.as_deref(), Some("admin-1"));
        assert!(settings.updated_at.is_some());
    }
}
