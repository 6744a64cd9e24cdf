//! Stage 1 of the request gate: bearer token authentication.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use workhub_core::error::CoreError;
use workhub_core::tokens::TokenKind;
use workhub_core::types::DbId;

use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// Only access tokens are accepted. The token is verified statelessly; use
/// [`LiveSession`] where a revoked session must be refused as well.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub email: String,
    pub username: String,
    /// The raw access token, for session lookups.
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims = state.tokens.verify(token).map_err(|e| {
            tracing::warn!(error = %e, "Bearer token rejected");
            unauthorized("Invalid or expired token")
        })?;

        if claims.kind != TokenKind::Access {
            tracing::warn!(user_id = %claims.user.id, kind = %claims.kind, "Non-access token presented");
            return Err(unauthorized("Invalid token type"));
        }

        Ok(AuthUser {
            user_id: claims.user.id,
            email: claims.user.email,
            username: claims.user.username,
            token: token.to_owned(),
        })
    }
}

/// [`AuthUser`] whose session is still active in the session store.
///
/// ```ignore
/// async fn logout(LiveSession(user): LiveSession) -> AppResult<StatusCode> { .. }
/// ```
#[derive(Debug, Clone)]
pub struct LiveSession(pub AuthUser);

impl FromRequestParts<AppState> for LiveSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !state.sessions.is_session_active(&user.token).await {
            tracing::debug!(user_id = %user.user_id, "Token belongs to an inactive session");
            return Err(unauthorized("Session is no longer active"));
        }
        Ok(LiveSession(user))
    }
}

/// Pull `<token>` out of `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| unauthorized("Authorization header is required"))?;

    header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            unauthorized("Invalid Authorization header format. Expected: Bearer <token>")
        })
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}
