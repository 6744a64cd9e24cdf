//! Handlers for the `/permissions` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use workhub_core::pagination::Paginated;
use workhub_core::types::DbId;
use workhub_db::models::permission::Permission;

use crate::error::AppResult;
use crate::middleware::rbac::{
    PermissionCreate, PermissionDelete, PermissionRead, PermissionUpdate, RequirePermission,
};
use crate::query::ListParams;
use crate::rbac::service::{CreatePermissionRequest, UpdatePermissionRequest};
use crate::rbac::AuthorizationService;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/permissions
pub async fn create(
    RequirePermission(..): RequirePermission<PermissionCreate>,
    State(state): State<AppState>,
    Json(input): Json<CreatePermissionRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Permission>>)> {
    let permission = AuthorizationService::new(state.pool)
        .create_permission(&input)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: permission })))
}

/// GET /api/v1/permissions
pub async fn list(
    RequirePermission(..): RequirePermission<PermissionRead>,
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Paginated<Permission>>> {
    let page = AuthorizationService::new(state.pool)
        .list_permissions(params.search_term(), params.page_request())
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/permissions/{id}
pub async fn get_by_id(
    RequirePermission(..): RequirePermission<PermissionRead>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Permission>>> {
    let permission = AuthorizationService::new(state.pool)
        .get_permission(id)
        .await?;
    Ok(Json(DataResponse { data: permission }))
}

/// PUT /api/v1/permissions/{id}
pub async fn update(
    RequirePermission(..): RequirePermission<PermissionUpdate>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePermissionRequest>,
) -> AppResult<Json<DataResponse<Permission>>> {
    let permission = AuthorizationService::new(state.pool)
        .update_permission(id, &input)
        .await?;
    Ok(Json(DataResponse { data: permission }))
}

/// DELETE /api/v1/permissions/{id}
///
/// Soft delete. Returns 204 No Content.
pub async fn delete(
    RequirePermission(..): RequirePermission<PermissionDelete>,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    AuthorizationService::new(state.pool)
        .delete_permission(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
