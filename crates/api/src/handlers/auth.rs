//! Handlers for the `/auth` resource.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use workhub_db::models::session::SessionResponse;

use crate::auth::jwt::UserInfo;
use crate::auth::service::{
    AuthService, ChangePasswordRequest, ClientMeta, LoginRequest, LoginResult, RefreshRequest,
    RegisterRequest,
};
use crate::error::AppResult;
use crate::middleware::auth::{AuthUser, LiveSession};
use crate::rbac::AuthorizationService;
use crate::response::DataResponse;
use crate::state::AppState;

/// Identity of the caller plus their effective permission codes.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserInfo,
    pub permissions: Vec<String>,
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserInfo>>)> {
    let user = AuthService::from_state(&state).register(&input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Returns an access/refresh token pair.
pub async fn login(
    State(state): State<AppState>,
    client: ClientMeta,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<LoginResult>> {
    let result = AuthService::from_state(&state).login(&input, client).await?;
    Ok(Json(result))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new pair. The old session is revoked.
pub async fn refresh(
    State(state): State<AppState>,
    client: ClientMeta,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<LoginResult>> {
    let result = AuthService::from_state(&state).refresh(&input, client).await?;
    Ok(Json(result))
}

/// POST /api/v1/auth/logout
///
/// Revoke the session the presented token belongs to. Returns 204 No Content.
pub async fn logout(
    State(state): State<AppState>,
    LiveSession(user): LiveSession,
) -> AppResult<StatusCode> {
    AuthService::from_state(&state).logout(&user.token).await?;
    tracing::info!(user_id = %user.user_id, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/logout-all
///
/// Revoke every session of the caller. Returns 204 No Content.
pub async fn logout_all(
    State(state): State<AppState>,
    LiveSession(user): LiveSession,
) -> AppResult<StatusCode> {
    AuthService::from_state(&state).logout_all(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<MeResponse>>> {
    let permissions = AuthorizationService::new(state.pool.clone())
        .get_user_permissions(user.user_id)
        .await?
        .into_iter()
        .map(|p| p.code)
        .collect();

    Ok(Json(DataResponse {
        data: MeResponse {
            user: UserInfo {
                id: user.user_id,
                email: user.email,
                username: user.username,
            },
            permissions,
        },
    }))
}

/// GET /api/v1/auth/sessions
///
/// The caller's active sessions. Tokens are never included.
pub async fn sessions(
    State(state): State<AppState>,
    LiveSession(user): LiveSession,
) -> AppResult<Json<DataResponse<Vec<SessionResponse>>>> {
    let sessions = AuthService::from_state(&state)
        .list_sessions(user.user_id)
        .await?
        .into_iter()
        .map(SessionResponse::from)
        .collect();
    Ok(Json(DataResponse { data: sessions }))
}

/// PUT /api/v1/auth/password
///
/// Change the caller's password. Every session, this one included, is
/// revoked. Returns 204 No Content.
pub async fn change_password(
    State(state): State<AppState>,
    LiveSession(user): LiveSession,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    AuthService::from_state(&state)
        .change_password(user.user_id, &input)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
