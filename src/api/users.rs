/// Admin account management endpoints
use crate::{
    account::{ChangePasswordRequest, RoleUpdateRequest},
    admin::Role,
    api::{ok, ok_with_message, paged, ApiJson, ApiQuery, ApiResponse},
    auth::AdminAuth,
    context::AppContext,
    db::AdminFilter,
    error::ApiResult,
    models::{AdminProfile, ListParams},
    require_role,
};
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/", get(list_users))
        .route("/me/password", put(change_password))
        .route("/:id", get(get_user).delete(delete_user))
        .route("/:id/role", put(update_role))
}

async fn list_users(
    State(ctx): State<AppContext>,
    _auth: AdminAuth,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<ApiResponse<Vec<AdminProfile>>> {
    let role = match params.role.as_deref().map(str::trim) {
        Some(role) if !role.is_empty() => Some(role.parse::<Role>()?),
        _ => None,
    };
    let filter = AdminFilter {
        search: params.search_term(),
        role,
    };

    let page = ctx
        .account_manager
        .list_admins(&filter, params.pagination())
        .await?;
    Ok(paged(page.map(|a| a.profile())))
}

async fn get_user(
    State(ctx): State<AppContext>,
    _auth: AdminAuth,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<AdminProfile>> {
    Ok(ok(ctx.account_manager.get_admin(&id).await?.profile()))
}

async fn update_role(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RoleUpdateRequest>,
) -> ApiResult<ApiResponse<AdminProfile>> {
    require_role!(auth, Role::SuperAdmin);

    let account = ctx
        .account_manager
        .update_role(&auth.account, &id, req.role)
        .await?;
    Ok(ok_with_message(
        format!("{} is now {}", account.username, account.role.as_str()),
        account.profile(),
    ))
}

async fn delete_user(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<AdminProfile>> {
    require_role!(auth, Role::SuperAdmin);

    let account = ctx.account_manager.delete_admin(&auth.account, &id).await?;
    Ok(ok_with_message(
        format!("{} has been deleted", account.username),
        account.profile(),
    ))
}

async fn change_password(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<ApiResponse<Option<()>>> {
    ctx.account_manager
        .change_password(&auth.account, req)
        .await?;
    Ok(ok_with_message("Password updated", None))
}
