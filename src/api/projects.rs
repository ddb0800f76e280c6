/// Project portfolio endpoints
use crate::{
    api::{created, ok, ok_with_message, paged, ApiJson, ApiQuery, ApiResponse},
    auth::AdminAuth,
    context::AppContext,
    error::{ApiError, ApiResult},
    models::{project::ProjectFilter, ListParams, Project, ProjectInput, ProjectUpdate},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/categories", get(list_categories))
        .route(
            "/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
}

fn not_found() -> ApiError {
    ApiError::NotFound("Project not found".to_string())
}

async fn list_projects(
    State(ctx): State<AppContext>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<ApiResponse<Vec<Project>>> {
    let status = match params.status.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() && !s.eq_ignore_ascii_case("all") => Some(s.parse()?),
        _ => None,
    };
    let filter = ProjectFilter {
        search: params.search_term(),
        category: params.category_filter(),
        status,
    };

    let page = ctx
        .store
        .projects
        .list_projects(&filter, params.pagination())
        .await?;
    Ok(paged(page))
}

async fn list_categories(State(ctx): State<AppContext>) -> ApiResult<ApiResponse<Vec<String>>> {
    Ok(ok(ctx.store.projects.project_categories().await?))
}

async fn get_project(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Project>> {
    let project = ctx
        .store
        .projects
        .find_project(&id)
        .await?
        .ok_or_else(not_found)?;
    Ok(ok(project))
}

async fn create_project(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    ApiJson(input): ApiJson<ProjectInput>,
) -> ApiResult<(StatusCode, ApiResponse<Project>)> {
    input.validate()?;

    let project = Project::create(input, auth.id());
    ctx.store.projects.insert_project(&project).await?;

    tracing::info!("{} created project {}", auth.account.username, project.id);
    Ok(created("Project created", project))
}

async fn update_project(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<ProjectUpdate>,
) -> ApiResult<ApiResponse<Project>> {
    update.validate()?;

    let mut project = ctx
        .store
        .projects
        .find_project(&id)
        .await?
        .ok_or_else(not_found)?;
    project.apply(update, auth.id());
    ctx.store.projects.save_project(&project).await?;

    Ok(ok_with_message("Project updated", project))
}

async fn delete_project(
    State(ctx): State<AppContext>,
    auth: AdminAuth,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Option<()>>> {
    if !ctx.store.projects.delete_project(&id).await? {
        return Err(not_found());
    }

    tracing::info!("{} deleted project {}", auth.account.username, id);
    Ok(ok_with_message("Project deleted", None))
}
