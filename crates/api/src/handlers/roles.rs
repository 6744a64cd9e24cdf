//! Handlers for the `/roles` resource and its permission grants.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use workhub_core::pagination::Paginated;
use workhub_core::types::DbId;
use workhub_db::models::role::Role;

use crate::error::AppResult;
use crate::middleware::rbac::{
    RequirePermission, RoleAssignPermission, RoleCreate, RoleDelete, RoleRead, RoleUpdate,
};
use crate::query::{ListParams, PageParams};
use crate::rbac::service::{
    CreateRoleRequest, PermissionIdsRequest, RoleWithPermissions, UpdateRoleRequest,
};
use crate::rbac::AuthorizationService;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/roles
pub async fn create(
    RequirePermission(..): RequirePermission<RoleCreate>,
    State(state): State<AppState>,
    Json(input): Json<CreateRoleRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Role>>)> {
    let role = AuthorizationService::new(state.pool).create_role(&input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: role })))
}

/// GET /api/v1/roles
pub async fn list(
    RequirePermission(..): RequirePermission<RoleRead>,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Paginated<Role>>> {
    let page = AuthorizationService::new(state.pool)
        .list_roles(params.search_term(), params.page_request())
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/roles/{id}
pub async fn get_by_id(
    RequirePermission(..): RequirePermission<RoleRead>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Role>>> {
    let role = AuthorizationService::new(state.pool).get_role(id).await?;
    Ok(Json(DataResponse { data: role }))
}

/// PUT /api/v1/roles/{id}
pub async fn update(
    RequirePermission(..): RequirePermission<RoleUpdate>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateRoleRequest>,
) -> AppResult<Json<DataResponse<Role>>> {
    let role = AuthorizationService::new(state.pool)
        .update_role(id, &input)
        .await?;
    Ok(Json(DataResponse { data: role }))
}

/// DELETE /api/v1/roles/{id}
///
/// Soft delete. Returns 204 No Content.
pub async fn delete(
    RequirePermission(..): RequirePermission<RoleDelete>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    AuthorizationService::new(state.pool).delete_role(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/roles/{id}/permissions
pub async fn permissions(
    RequirePermission(..): RequirePermission<RoleRead>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<DataResponse<RoleWithPermissions>>> {
    let role = AuthorizationService::new(state.pool)
        .get_role_with_permissions(id, params.page_request())
        .await?;
    Ok(Json(DataResponse { data: role }))
}

/// POST /api/v1/roles/{id}/permissions
pub async fn assign_permissions(
    RequirePermission(..): RequirePermission<RoleAssignPermission>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<PermissionIdsRequest>,
) -> AppResult<StatusCode> {
    AuthorizationService::new(state.pool)
        .assign_permissions_to_role(id, &input)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/roles/{id}/permissions
pub async fn remove_permissions(
    RequirePermission(..): RequirePermission<RoleAssignPermission>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<PermissionIdsRequest>,
) -> AppResult<StatusCode> {
    AuthorizationService::new(state.pool)
        .remove_permissions_from_role(id, &input)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
