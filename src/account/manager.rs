/// Account manager - registration, approval, login and admin operations
use crate::{
    account::{
        normalize_username,
        password::{dummy_verify, hash_password, validate_password_strength, verify_password},
        ChangePasswordRequest, LoginRequest, RegisterRequest, RegistrationState,
        RegistrationStatus,
    },
    admin::{check_deletion, check_role_change, Role},
    config::{BootstrapAdmin, ServerConfig},
    db::{AdminFilter, Store},
    error::{ApiError, ApiResult},
    mailer::Mailer,
    metrics,
    models::{self, AdminAccount, Page, Pagination},
    security::{ClientInfo, SecurityState},
};
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use validator::Validate;

/// Label stored in `approved_by` for approvals made through the mailed link
pub const EMAIL_LINK_APPROVER: &str = "email-link";

/// Result of a registration call
#[derive(Debug, Clone)]
pub enum RegistrationOutcome {
    /// New pending account
    Created(AdminAccount),
    /// Existing pending account registered again; approval re-requested
    Resubmitted(AdminAccount),
}

impl RegistrationOutcome {
    pub fn account(&self) -> &AdminAccount {
        match self {
            RegistrationOutcome::Created(a) | RegistrationOutcome::Resubmitted(a) => a,
        }
    }
}

/// Generate an approval token, returning `(token, sha256_hex)`
pub fn generate_approval_token() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let hash = hash_token(&token);
    (token, hash)
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Account manager
pub struct AccountManager {
    store: Store,
    mailer: Arc<Mailer>,
    security: Arc<SecurityState>,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    pub fn new(
        store: Store,
        mailer: Arc<Mailer>,
        security: Arc<SecurityState>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            store,
            mailer,
            security,
            config,
        }
    }

    /// Register a new admin; the account stays pending until approved
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<RegistrationOutcome> {
        let settings = self
            .store
            .settings
            .load_site_settings()
            .await?
            .unwrap_or_default();
        if !settings.allow_registration {
            metrics::record_registration("closed");
            return Err(ApiError::RegistrationClosed);
        }

        req.validate()?;
        let username = normalize_username(&req.username)?;
        let email = req.email.trim().to_lowercase();
        validate_password_strength(&req.password)?;

        let now = models::now();
        let approval = &self.config.approval;

        if let Some(mut existing) = self
            .store
            .admins
            .find_admin_by_username_or_email(&username, &email)
            .await?
        {
            // A resubmission must repeat both the username and the email
            if !existing.is_pending() || existing.username != username || existing.email != email {
                metrics::record_registration("conflict");
                return Err(ApiError::Conflict(
                    "Username or email is already registered".to_string(),
                ));
            }

            if let Some(remaining) = existing.active_block(now) {
                tracing::warn!("Registration blocked for pending account {}", username);
                metrics::record_registration("blocked");
                metrics::record_security_event("registration_blocked");
                return Err(ApiError::RegistrationBlocked {
                    retry_after: remaining.to_std().unwrap_or_default(),
                });
            }
            if existing.blocked_until.is_some() {
                existing.blocked_until = None;
                existing.registration_attempts = 0;
            }

            existing.registration_attempts += 1;
            if existing.registration_attempts >= approval.max_registration_attempts {
                existing.blocked_until =
                    Some(now + Duration::minutes(approval.registration_block_minutes));
                tracing::warn!(
                    "Pending account {} reached {} registration attempts",
                    username,
                    existing.registration_attempts
                );
            }

            let token = self.rotate_approval_token(&mut existing);
            existing.updated_at = now;
            self.store.admins.save_admin(&existing).await?;

            self.request_approval(&existing, &token).await;
            metrics::record_registration("resubmitted");
            return Ok(RegistrationOutcome::Resubmitted(existing));
        }

        let mut account =
            AdminAccount::new(username, email, hash_password(&req.password)?, Role::Pending);
        account.registration_attempts = 1;
        let token = self.rotate_approval_token(&mut account);

        self.store.admins.insert_admin(&account).await?;
        tracing::info!("New admin registration: {}", account.username);

        self.request_approval(&account, &token).await;
        metrics::record_registration("created");
        Ok(RegistrationOutcome::Created(account))
    }

    fn rotate_approval_token(&self, account: &mut AdminAccount) -> String {
        let (token, hash) = generate_approval_token();
        account.approval_token_hash = Some(hash);
        account.approval_token_expires =
            Some(models::now() + Duration::hours(self.config.approval.token_ttl_hours));
        token
    }

    pub fn approval_url(&self, token: &str) -> String {
        format!(
            "{}/api/auth/admin/approve-token/{}",
            self.config.service.public_url.trim_end_matches('/'),
            token
        )
    }

    /// Mail the approval link; failures are logged only
    async fn request_approval(&self, account: &AdminAccount, token: &str) {
        let Some(superadmin_email) = &self.config.approval.superadmin_email else {
            tracing::warn!(
                "No superadmin email configured; approval link for {} not sent",
                account.username
            );
            return;
        };

        if let Err(e) = self
            .mailer
            .send_approval_request(
                superadmin_email,
                &account.username,
                &account.email,
                &self.approval_url(token),
                self.config.approval.token_ttl_hours,
            )
            .await
        {
            tracing::error!(
                "Failed to send approval request for {}: {}",
                account.username,
                e
            );
        }
    }

    /// Check credentials and login defenses; returns the account on success
    pub async fn login(&self, req: &LoginRequest, client: &ClientInfo) -> ApiResult<AdminAccount> {
        req.validate()?;
        let username = req.username.trim().to_lowercase();
        let now = Utc::now();
        let ip = client.ip.to_string();

        if self.security.anomaly.record(&ip, &client.user_agent, now) {
            self.check_captcha(req, &ip)?;
        }

        if let Err(e) = self.security.lockout.check(&username, now) {
            metrics::record_login("locked");
            return Err(e);
        }

        let account = match self.store.admins.find_admin_by_username(&username).await? {
            Some(account) => {
                if !verify_password(&req.password, &account.password_hash)? {
                    return Err(self.login_failure(&username, &ip));
                }
                account
            }
            None => {
                dummy_verify(&req.password);
                return Err(self.login_failure(&username, &ip));
            }
        };

        if account.is_pending() {
            metrics::record_login("pending");
            return Err(ApiError::AccountPending);
        }

        self.security.lockout.clear(&username);

        let mut account = account;
        account.last_login_at = Some(models::now());
        account.last_login_ip = Some(ip);
        self.store.admins.save_admin(&account).await?;

        tracing::info!("Admin {} logged in", account.username);
        metrics::record_login("success");
        Ok(account)
    }

    fn check_captcha(&self, req: &LoginRequest, ip: &str) -> ApiResult<()> {
        let (Some(id), Some(answer)) = (&req.captcha_id, &req.captcha_answer) else {
            tracing::warn!("Suspicious login activity from {}; captcha required", ip);
            metrics::record_security_event("captcha_required");
            return Err(ApiError::CaptchaRequired {
                challenge: self.security.captcha.issue(),
            });
        };

        if !self.security.captcha.verify(id, &answer.as_text()) {
            tracing::warn!("Failed captcha from {}", ip);
            metrics::record_security_event("captcha_failed");
            return Err(ApiError::InvalidCaptcha {
                challenge: self.security.captcha.issue(),
            });
        }
        Ok(())
    }

    fn login_failure(&self, username: &str, ip: &str) -> ApiError {
        metrics::record_login("failure");
        match self.security.lockout.record_failure(username, Utc::now()) {
            Some(retry_after) => {
                tracing::warn!("Locked out username {} after failed login from {}", username, ip);
                metrics::record_security_event("lockout");
                ApiError::AccountLocked { retry_after }
            }
            None => ApiError::InvalidCredentials,
        }
    }

    /// Reload an account for an authenticated request
    pub async fn get_admin(&self, id: &str) -> ApiResult<AdminAccount> {
        self.store
            .admins
            .find_admin(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Admin not found".to_string()))
    }

    pub async fn list_admins(
        &self,
        filter: &AdminFilter,
        pagination: Pagination,
    ) -> ApiResult<Page<AdminAccount>> {
        self.store.admins.list_admins(filter, pagination).await
    }

    pub async fn list_pending(&self, pagination: Pagination) -> ApiResult<Page<AdminAccount>> {
        let filter = AdminFilter {
            role: Some(Role::Pending),
            search: None,
        };
        self.store.admins.list_admins(&filter, pagination).await
    }

    /// Approve a pending account on behalf of a superadmin
    pub async fn approve(&self, id: &str, approver: &AdminAccount) -> ApiResult<AdminAccount> {
        let account = self.get_admin(id).await?;
        if !account.is_pending() {
            return Err(ApiError::Conflict("Account is already approved".to_string()));
        }
        let account = self.activate(account, &approver.username).await?;
        metrics::record_approval("approved", "panel");
        Ok(account)
    }

    /// Approve through the mailed link
    pub async fn approve_by_token(&self, token: &str) -> ApiResult<AdminAccount> {
        let account = self
            .store
            .admins
            .find_admin_by_token_hash(&hash_token(token))
            .await?
            .filter(AdminAccount::is_pending)
            .ok_or(ApiError::InvalidToken)?;

        if account
            .approval_token_expires
            .map_or(true, |expires| expires < Utc::now())
        {
            return Err(ApiError::TokenExpired);
        }

        let account = self.activate(account, EMAIL_LINK_APPROVER).await?;
        metrics::record_approval("approved", "email");
        Ok(account)
    }

    async fn activate(
        &self,
        mut account: AdminAccount,
        approved_by: &str,
    ) -> ApiResult<AdminAccount> {
        let now = models::now();
        account.role = Role::Admin;
        account.approval_token_hash = None;
        account.approval_token_expires = None;
        account.registration_attempts = 0;
        account.blocked_until = None;
        account.approved_by = Some(approved_by.to_string());
        account.approved_at = Some(now);
        account.updated_at = now;
        self.store.admins.save_admin(&account).await?;

        tracing::info!("Admin {} approved by {}", account.username, approved_by);

        if let Err(e) = self
            .mailer
            .send_approval_notice(&account.email, &account.username)
            .await
        {
            tracing::error!("Failed to send approval notice to {}: {}", account.email, e);
        }
        Ok(account)
    }

    /// Delete a pending registration
    pub async fn reject(&self, id: &str, approver: &AdminAccount) -> ApiResult<AdminAccount> {
        let account = self.get_admin(id).await?;
        if !account.is_pending() {
            return Err(ApiError::Conflict(
                "Only pending accounts can be rejected".to_string(),
            ));
        }
        self.store.admins.delete_admin(&account.id).await?;

        tracing::info!("Registration {} rejected by {}", account.username, approver.username);
        metrics::record_approval("rejected", "panel");
        Ok(account)
    }

    pub async fn registration_status(&self, username: &str) -> ApiResult<RegistrationStatus> {
        let username = username.trim().to_lowercase();
        let account = self
            .store
            .admins
            .find_admin_by_username(&username)
            .await?
            .ok_or_else(|| ApiError::NotFound("No registration found".to_string()))?;

        let now = Utc::now();
        Ok(RegistrationStatus {
            username: account.username.clone(),
            status: if account.is_pending() {
                RegistrationState::Pending
            } else {
                RegistrationState::Approved
            },
            blocked_until: account.blocked_until.filter(|until| *until > now),
            registered_at: account.created_at,
        })
    }

    pub async fn update_role(
        &self,
        actor: &AdminAccount,
        id: &str,
        role: Role,
    ) -> ApiResult<AdminAccount> {
        check_role_change(&actor.id, actor.role, id, role)?;

        let mut target = self.get_admin(id).await?;
        if target.is_pending() {
            return Err(ApiError::Conflict(
                "Pending accounts must be approved first".to_string(),
            ));
        }

        target.role = role;
        target.updated_at = models::now();
        self.store.admins.save_admin(&target).await?;

        tracing::info!(
            "{} changed role of {} to {}",
            actor.username,
            target.username,
            role.as_str()
        );
        Ok(target)
    }

    pub async fn delete_admin(&self, actor: &AdminAccount, id: &str) -> ApiResult<AdminAccount> {
        let target = self.get_admin(id).await?;
        check_deletion(&actor.id, actor.role, &target.id, target.role)?;

        self.store.admins.delete_admin(&target.id).await?;
        tracing::info!("{} deleted admin {}", actor.username, target.username);
        Ok(target)
    }

    pub async fn change_password(
        &self,
        actor: &AdminAccount,
        req: ChangePasswordRequest,
    ) -> ApiResult<()> {
        req.validate()?;

        let mut account = self.get_admin(&actor.id).await?;
        if !verify_password(&req.current_password, &account.password_hash)? {
            return Err(ApiError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }
        if req.current_password == req.new_password {
            return Err(ApiError::Validation(
                "New password must differ from the current one".to_string(),
            ));
        }
        validate_password_strength(&req.new_password)?;

        account.password_hash = hash_password(&req.new_password)?;
        account.updated_at = models::now();
        self.store.admins.save_admin(&account).await?;

        tracing::info!("Admin {} changed their password", account.username);
        Ok(())
    }

    /// Create the configured superadmin if none exists yet
    pub async fn bootstrap_superadmin(
        &self,
        bootstrap: &BootstrapAdmin,
    ) -> ApiResult<Option<AdminAccount>> {
        if self.store.admins.count_admins(Some(Role::SuperAdmin)).await? > 0 {
            return Ok(None);
        }

        let username = normalize_username(&bootstrap.username)?;
        validate_password_strength(&bootstrap.password)?;

        let mut account = AdminAccount::new(
            username,
            bootstrap.email.trim().to_lowercase(),
            hash_password(&bootstrap.password)?,
            Role::SuperAdmin,
        );
        account.approved_by = Some("bootstrap".to_string());
        account.approved_at = Some(account.created_at);

        self.store.admins.insert_admin(&account).await?;
        tracing::info!("Created superadmin {}", account.username);
        Ok(Some(account))
    }

    /// Clear approval tokens past their expiry
    pub async fn clear_expired_tokens(&self) -> ApiResult<u64> {
        self.store
            .admins
            .clear_expired_approval_tokens(Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SiteSettings;
    use std::net::IpAddr;

    struct Harness {
        manager: AccountManager,
        mailer: Arc<Mailer>,
        store: Store,
    }

    fn harness_with(config: ServerConfig) -> Harness {
        let config = Arc::new(config);
        let store = Store::in_memory();
        let mailer = Arc::new(Mailer::with_outbox());
        let security = Arc::new(SecurityState::new(&config));
        Harness {
            manager: AccountManager::new(store.clone(), mailer.clone(), security, config),
            mailer,
            store,
        }
    }

    fn harness() -> Harness {
        harness_with(ServerConfig::for_tests())
    }

    fn register_req(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{}@example.com", username.to_lowercase()),
            password: "Secret123".to_string(),
        }
    }

    fn login_req(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
            captcha_id: None,
            captcha_answer: None,
        }
    }

    fn client(agent: &str) -> ClientInfo {
        ClientInfo {
            ip: IpAddr::from([127, 0, 0, 1]),
            user_agent: agent.to_string(),
        }
    }

    fn token_from_mail(mailer: &Mailer) -> String {
        let sent = mailer.sent();
        let body = &sent.last().expect("approval mail").body;
        let start = body.find("/approve-token/").expect("link") + "/approve-token/".len();
        body[start..start + 64].to_string()
    }

    async fn approved_admin(h: &Harness, username: &str) -> AdminAccount {
        h.manager.register(register_req(username)).await.unwrap();
        let token = token_from_mail(&h.mailer);
        h.manager.approve_by_token(&token).await.unwrap()
    }

    #[tokio::test]
    async fn test_register_creates_pending_account_and_mails_superadmin() {
        let h = harness();
        let outcome = h.manager.register(register_req("Editor")).await.unwrap();

        assert!(matches!(outcome, RegistrationOutcome::Created(_)));
        let account = outcome.account();
        assert_eq!(account.username, "editor");
        assert_eq!(account.role, Role::Pending);
        assert_eq!(account.registration_attempts, 1);

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "owner@example.com");

        let token = token_from_mail(&h.mailer);
        assert_eq!(account.approval_token_hash.as_deref(), Some(hash_token(&token).as_str()));
        assert_ne!(account.approval_token_hash.as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn test_repeat_registration_blocks_on_third_attempt() {
        let h = harness();
        h.manager.register(register_req("editor")).await.unwrap();

        let second = h.manager.register(register_req("editor")).await.unwrap();
        assert!(matches!(second, RegistrationOutcome::Resubmitted(_)));
        assert!(second.account().blocked_until.is_none());

        let third = h.manager.register(register_req("editor")).await.unwrap();
        assert_eq!(third.account().registration_attempts, 3);
        assert!(third.account().blocked_until.is_some());

        let fourth = h.manager.register(register_req("editor")).await;
        assert!(matches!(fourth, Err(ApiError::RegistrationBlocked { .. })));

        // Each accepted attempt mailed a fresh link
        assert_eq!(h.mailer.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_elapsed_block_resets_counter() {
        let h = harness();
        h.manager.register(register_req("editor")).await.unwrap();

        let mut account = h
            .store
            .admins
            .find_admin_by_username("editor")
            .await
            .unwrap()
            .unwrap();
        account.registration_attempts = 3;
        account.blocked_until = Some(Utc::now() - Duration::minutes(1));
        h.store.admins.save_admin(&account).await.unwrap();

        let outcome = h.manager.register(register_req("editor")).await.unwrap();
        assert_eq!(outcome.account().registration_attempts, 1);
        assert!(outcome.account().blocked_until.is_none());
    }

    #[tokio::test]
    async fn test_register_conflicts() {
        let h = harness();
        approved_admin(&h, "editor").await;

        let same_username = h.manager.register(register_req("editor")).await;
        assert!(matches!(same_username, Err(ApiError::Conflict(_))));

        h.manager.register(register_req("writer")).await.unwrap();
        let mut same_email = register_req("other");
        same_email.email = "writer@example.com".to_string();
        assert!(matches!(
            h.manager.register(same_email).await,
            Err(ApiError::Conflict(_))
        ));

        // Pending username resubmitted with another email
        let mut new_email = register_req("writer");
        new_email.email = "someone-else@example.com".to_string();
        assert!(matches!(
            h.manager.register(new_email).await,
            Err(ApiError::Conflict(_))
        ));
        let stored = h
            .store
            .admins
            .find_admin_by_username("writer")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.email, "writer@example.com");
        assert_eq!(stored.registration_attempts, 1);
    }

    #[tokio::test]
    async fn test_registration_closed() {
        let h = harness();
        let settings = SiteSettings {
            allow_registration: false,
            ..SiteSettings::default()
        };
        h.store.settings.save_site_settings(&settings).await.unwrap();

        let result = h.manager.register(register_req("editor")).await;
        assert!(matches!(result, Err(ApiError::RegistrationClosed)));
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let h = harness();
        let mut req = register_req("editor");
        req.password = "password".to_string();
        assert!(matches!(
            h.manager.register(req).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_token_approval_is_single_use() {
        let h = harness();
        h.manager.register(register_req("editor")).await.unwrap();
        let token = token_from_mail(&h.mailer);

        let account = h.manager.approve_by_token(&token).await.unwrap();
        assert_eq!(account.role, Role::Admin);
        assert_eq!(account.approved_by.as_deref(), Some(EMAIL_LINK_APPROVER));
        assert!(account.approval_token_hash.is_none());

        // Applicant was notified
        assert_eq!(h.mailer.sent().last().unwrap().to, "editor@example.com");

        assert!(matches!(
            h.manager.approve_by_token(&token).await,
            Err(ApiError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let h = harness();
        let account = h
            .manager
            .register(register_req("editor"))
            .await
            .unwrap()
            .account()
            .clone();
        let token = token_from_mail(&h.mailer);

        let mut stored = h.manager.get_admin(&account.id).await.unwrap();
        stored.approval_token_expires = Some(Utc::now() - Duration::hours(1));
        h.store.admins.save_admin(&stored).await.unwrap();

        assert!(matches!(
            h.manager.approve_by_token(&token).await,
            Err(ApiError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_login_rules() {
        let h = harness();
        approved_admin(&h, "editor").await;
        h.manager.register(register_req("waiting")).await.unwrap();

        let ok = h
            .manager
            .login(&login_req("EDITOR", "Secret123"), &client("a"))
            .await
            .unwrap();
        assert!(ok.last_login_at.is_some());

        let wrong = h
            .manager
            .login(&login_req("editor", "Wrong1234"), &client("b"))
            .await;
        assert!(matches!(wrong, Err(ApiError::InvalidCredentials)));

        let pending = h
            .manager
            .login(&login_req("waiting", "Secret123"), &client("c"))
            .await;
        assert!(matches!(pending, Err(ApiError::AccountPending)));

        let unknown = h
            .manager
            .login(&login_req("ghost", "Secret123"), &client("d"))
            .await;
        assert!(matches!(unknown, Err(ApiError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_lockout_after_repeated_failures() {
        let mut config = ServerConfig::for_tests();
        config.security.anomaly_max_attempts = 100;
        let h = harness_with(config);
        approved_admin(&h, "editor").await;

        for _ in 0..4 {
            let result = h
                .manager
                .login(&login_req("editor", "Wrong1234"), &client("a"))
                .await;
            assert!(matches!(result, Err(ApiError::InvalidCredentials)));
        }
        let fifth = h
            .manager
            .login(&login_req("editor", "Wrong1234"), &client("a"))
            .await;
        assert!(matches!(fifth, Err(ApiError::AccountLocked { .. })));

        // Even the right password is refused while locked
        let locked = h
            .manager
            .login(&login_req("editor", "Secret123"), &client("a"))
            .await;
        assert!(matches!(locked, Err(ApiError::AccountLocked { .. })));
    }

    #[tokio::test]
    async fn test_burst_requires_captcha() {
        let h = harness();
        approved_admin(&h, "editor").await;

        for _ in 0..3 {
            let _ = h
                .manager
                .login(&login_req("editor", "Wrong1234"), &client("bot"))
                .await;
        }

        let challenge = match h
            .manager
            .login(&login_req("editor", "Secret123"), &client("bot"))
            .await
        {
            Err(ApiError::CaptchaRequired { challenge }) => challenge,
            other => panic!("expected captcha, got {:?}", other),
        };

        let mut wrong = login_req("editor", "Secret123");
        wrong.captcha_id = Some(challenge.id.clone());
        wrong.captcha_answer = Some(crate::account::CaptchaAnswer::Number(-1));
        assert!(matches!(
            h.manager.login(&wrong, &client("bot")).await,
            Err(ApiError::InvalidCaptcha { .. })
        ));
    }

    #[tokio::test]
    async fn test_superadmin_operations() {
        let h = harness();
        let boss = h
            .manager
            .bootstrap_superadmin(&BootstrapAdmin {
                username: "boss".into(),
                email: "boss@example.com".into(),
                password: "Secret123".into(),
            })
            .await
            .unwrap()
            .unwrap();
        let editor = approved_admin(&h, "editor").await;

        let promoted = h
            .manager
            .update_role(&boss, &editor.id, Role::SuperAdmin)
            .await
            .unwrap();
        assert_eq!(promoted.role, Role::SuperAdmin);

        // Superadmins can't be deleted
        assert!(matches!(
            h.manager.delete_admin(&boss, &editor.id).await,
            Err(ApiError::Authorization(_))
        ));

        h.manager
            .update_role(&boss, &editor.id, Role::Admin)
            .await
            .unwrap();
        h.manager.delete_admin(&boss, &editor.id).await.unwrap();
        assert!(h.manager.get_admin(&editor.id).await.is_err());

        // Bootstrap is a no-op once a superadmin exists
        let again = h
            .manager
            .bootstrap_superadmin(&BootstrapAdmin {
                username: "boss2".into(),
                email: "boss2@example.com".into(),
                password: "Secret123".into(),
            })
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_reject_only_pending() {
        let h = harness();
        let boss = approved_admin(&h, "boss").await;
        let pending = h
            .manager
            .register(register_req("waiting"))
            .await
            .unwrap()
            .account()
            .clone();

        assert!(matches!(
            h.manager.reject(&boss.id, &boss).await,
            Err(ApiError::Conflict(_))
        ));
        h.manager.reject(&pending.id, &boss).await.unwrap();
        assert!(matches!(
            h.manager.registration_status("waiting").await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let h = harness();
        let editor = approved_admin(&h, "editor").await;

        let wrong_current = h
            .manager
            .change_password(
                &editor,
                ChangePasswordRequest {
                    current_password: "Nope12345".into(),
                    new_password: "Another123".into(),
                },
            )
            .await;
        assert!(wrong_current.is_err());

        h.manager
            .change_password(
                &editor,
                ChangePasswordRequest {
                    current_password: "Secret123".into(),
                    new_password: "Another123".into(),
                },
            )
            .await
            .unwrap();

        assert!(h
            .manager
            .login(&login_req("editor", "Another123"), &client("x"))
            .await
            .is_ok());
    }
}
