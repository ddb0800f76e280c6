/// Admin authentication endpoints: registration, approval, login and sessions
use crate::{
    account::{LoginRequest, RegisterRequest, RegistrationOutcome, RegistrationStatus},
    admin::Role,
    api::{created, ok, ok_with_message, paged, ApiJson, ApiQuery, ApiResponse},
    auth::{clear_session_cookie, issue_session_token, session_cookie, AdminAuth},
    context::AppContext,
    error::ApiResult,
    models::{AdminAccount, AdminProfile, ListParams},
    require_role,
    security::{
        login_rate_limit, register_rate_limit, slow_down_middleware, CaptchaChallenge, ClientInfo,
    },
};
use axum::{
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use axum_extra::extract::CookieJar;
use serde::Serialize;

/// Build admin auth routes
pub fn routes(ctx: &AppContext) -> Router<AppContext> {
    Router::new()
        .route(
            "/register",
            post(register).layer(from_fn_with_state(ctx.clone(), register_rate_limit)),
        )
        .route(
            "/login",
            post(login)
                .layer(from_fn_with_state(ctx.clone(), slow_down_middleware))
                .layer(from_fn_with_state(ctx.clone(), login_rate_limit)),
        )
        .route("/logout", post(logout))
        .route("/check-status", get(check_status))
        .route("/refresh", post(refresh))
        .route("/captcha", get(captcha))
        .route("/registration-status/:username", get(registration_status))
        .route("/pending", get(list_pending))
        .route("/approve/:id", post(approve))
        .route("/approve-token/:token", get(approve_by_token))
        .route("/reject/:id", delete(reject))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationResponse {
    username: String,
    email: String,
    status: &'static str,
}

impl From<&AdminAccount> for RegistrationResponse {
    fn from(account: &AdminAccount) -> Self {
        Self {
            username: account.username.clone(),
            email: account.email.clone(),
            status: "pending",
        }
    }
}

/// Register a new admin account
async fn register(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<Response> {
    let response = match ctx.account_manager.register(req).await? {
        RegistrationOutcome::Created(account) => created(
            "Registration received. Your account is awaiting approval.",
            RegistrationResponse::from(&account),
        )
        .into_response(),
        RegistrationOutcome::Resubmitted(account) => ok_with_message(
            "Your registration is still awaiting approval. \
             The approval request has been sent again.",
            RegistrationResponse::from(&account),
        )
        .into_response(),
    };
    Ok(response)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    admin: AdminProfile,
    expires_in: i64,
}

fn start_session(
    ctx: &AppContext,
    jar: CookieJar,
    account: &AdminAccount,
    message: &str,
) -> ApiResult<(CookieJar, ApiResponse<SessionResponse>)> {
    let auth_config = &ctx.config.authentication;
    let token = issue_session_token(account, auth_config)?;

    Ok((
        jar.add(session_cookie(token, auth_config)),
        ok_with_message(
            message,
            SessionResponse {
                admin: account.profile(),
                expires_in: auth_config.session_ttl_secs,
            },
        ),
    ))
}

/// Log in and receive a session cookie
async fn login(
    State(ctx): State<AppContext>,
    client: ClientInfo,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<(CookieJar, ApiResponse<SessionResponse>)> {
    let account = ctx.account_manager.login(&req, &client).await?;
    start_session(&ctx, jar, &account, "Login successful")
}

/// Clear the session cookie
async fn logout(
    State(ctx): State<AppContext>,
    jar: CookieJar,
) -> (CookieJar, ApiResponse<Option<()>>) {
    (
        jar.add(clear_session_cookie(&ctx.config.authentication)),
        ok_with_message("Logged out", None),
    )
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    authenticated: bool,
    admin: AdminProfile,
}

/// Report the current session
async fn check_status(auth: AdminAuth) -> ApiResponse<StatusResponse> {
    ok(StatusResponse {
        authenticated: true,
        admin: auth.account.profile(),
    })
}

/// Re-issue the session cookie with a fresh expiry
async fn refresh(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    jar: CookieJar,
) -> ApiResult<(CookieJar, ApiResponse<SessionResponse>)> {
    start_session(&ctx, jar, &auth.account, "Session refreshed")
}

/// Issue a CAPTCHA challenge on demand
async fn captcha(State(ctx): State<AppContext>) -> ApiResponse<CaptchaChallenge> {
    ok(ctx.security.captcha.issue())
}

async fn registration_status(
    State(ctx): State<AppContext>,
    Path(username): Path<String>,
) -> ApiResult<ApiResponse<RegistrationStatus>> {
    Ok(ok(ctx.account_manager.registration_status(&username).await?))
}

/// List pending registrations
async fn list_pending(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<ApiResponse<Vec<AdminProfile>>> {
    require_role!(auth, Role::SuperAdmin);

    let page = ctx
        .account_manager
        .list_pending(params.pagination())
        .await?;
    Ok(paged(page.map(|a| a.profile())))
}

async fn approve(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<AdminProfile>> {
    require_role!(auth, Role::SuperAdmin);

    let account = ctx.account_manager.approve(&id, &auth.account).await?;
    Ok(ok_with_message(
        format!("{} has been approved", account.username),
        account.profile(),
    ))
}

/// Approval link from the registration email
async fn approve_by_token(
    State(ctx): State<AppContext>,
    Path(token): Path<String>,
) -> ApiResult<ApiResponse<AdminProfile>> {
    let account = ctx.account_manager.approve_by_token(&token).await?;
    Ok(ok_with_message(
        format!("{} has been approved", account.username),
        account.profile(),
    ))
}

async fn reject(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<AdminProfile>> {
    require_role!(auth, Role::SuperAdmin);

    let account = ctx.account_manager.reject(&id, &auth.account).await?;
    Ok(ok_with_message(
        format!("Registration for {} has been rejected", account.username),
        account.profile(),
    ))
}
