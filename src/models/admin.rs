use crate::admin::Role;
use crate::models::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Admin account document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccount {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub registration_attempts: i32,
    #[serde(default, with = "timestamp::option")]
    pub blocked_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approval_token_hash: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub approval_token_expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login_ip: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl AdminAccount {
    pub fn new(username: String, email: String, password_hash: String, role: Role) -> Self {
        let now = super::now();
        Self {
            id: super::new_id(),
            username,
            email,
            password_hash,
            role,
            registration_attempts: 0,
            blocked_until: None,
            approval_token_hash: None,
            approval_token_expires: None,
            approved_by: None,
            approved_at: None,
            last_login_at: None,
            last_login_ip: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.role == Role::Pending
    }

    /// Remaining registration block, if one is active at `now`
    pub fn active_block(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.blocked_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    pub fn profile(&self) -> AdminProfile {
        AdminProfile::from(self)
    }
}

/// Client-facing view of an admin account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub approved_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&AdminAccount> for AdminProfile {
    fn from(account: &AdminAccount) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            role: account.role,
            approved_at: account.approved_at,
            last_login_at: account.last_login_at,
            created_at: account.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_hides_secrets() {
        let mut account = AdminAccount::new(
            "editor".into(),
            "editor@example.com".into(),
            "$argon2id$secret".into(),
            Role::Pending,
        );
        account.approval_token_hash = Some("deadbeef".into());

        let json = serde_json::to_value(account.profile()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("approvalTokenHash").is_none());
        assert_eq!(json["role"], "pending");
    }

    #[test]
    fn test_active_block() {
        let now = Utc::now();
        let mut account =
            AdminAccount::new("a".into(), "a@example.com".into(), String::new(), Role::Pending);
        assert!(account.active_block(now).is_none());

        account.blocked_until = Some(now + chrono::Duration::minutes(10));
        assert!(account.active_block(now).is_some());

        account.blocked_until = Some(now - chrono::Duration::seconds(1));
        assert!(account.active_block(now).is_none());
    }

    #[test]
    fn test_document_round_trips_through_bson() {
        let account =
            AdminAccount::new("bob".into(), "bob@example.com".into(), "h".into(), Role::Admin);
        let doc = mongodb::bson::to_document(&account).unwrap();
        assert_eq!(doc.get_str("_id").unwrap(), account.id);
        assert_eq!(doc.get_str("role").unwrap(), "admin");

        let back: AdminAccount = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(back.created_at, account.created_at);
    }
}
