//! Handlers for the `/users` resource: listing and role membership.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use workhub_core::pagination::Paginated;
use workhub_core::types::DbId;
use workhub_db::models::permission::Permission;
use workhub_db::models::role::Role;
use workhub_db::models::user::UserResponse;

use crate::error::AppResult;
use crate::middleware::rbac::{RequirePermission, UserAssignRole, UserRead};
use crate::query::ListParams;
use crate::rbac::service::RoleIdsRequest;
use crate::rbac::AuthorizationService;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/users
pub async fn list(
    RequirePermission(..): RequirePermission<UserRead>,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Paginated<UserResponse>>> {
    let page = AuthorizationService::new(state.pool)
        .list_users(params.search_term(), params.page_request())
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/users/{id}/roles
pub async fn roles(
    RequirePermission(..): RequirePermission<UserRead>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Role>>>> {
    let roles = AuthorizationService::new(state.pool)
        .get_user_roles(id)
        .await?;
    Ok(Json(DataResponse { data: roles }))
}

/// GET /api/v1/users/{id}/permissions
///
/// The user's effective permission set.
pub async fn permissions(
    RequirePermission(..): RequirePermission<UserRead>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Permission>>>> {
    let permissions = AuthorizationService::new(state.pool)
        .get_user_permissions(id)
        .await?;
    Ok(Json(DataResponse { data: permissions }))
}

/// POST /api/v1/users/{id}/roles
pub async fn assign_roles(
    RequirePermission(actor, ..): RequirePermission<UserAssignRole>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RoleIdsRequest>,
) -> AppResult<StatusCode> {
    AuthorizationService::new(state.pool)
        .assign_roles_to_user(id, &input)
        .await?;
    tracing::info!(actor_id = %actor.user_id, user_id = %id, "Roles assigned");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/users/{id}/roles
pub async fn remove_roles(
    RequirePermission(actor, ..): RequirePermission<UserAssignRole>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RoleIdsRequest>,
) -> AppResult<StatusCode> {
    AuthorizationService::new(state.pool)
        .remove_roles_from_user(id, &input)
        .await?;
    tracing::info!(actor_id = %actor.user_id, user_id = %id, "Roles removed");
    Ok(StatusCode::NO_CONTENT)
}
