//! Route definitions for the `/auth` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /register    -> register
/// POST /login       -> login
/// POST /refresh     -> refresh
/// POST /logout      -> logout (live session)
/// POST /logout-all  -> logout_all (live session)
/// GET  /me          -> me (access token)
/// GET  /sessions    -> sessions (live session)
/// PUT  /password    -> change_password (live session)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/logout-all", post(auth::logout_all))
        .route("/me", get(auth::me))
        .route("/sessions", get(auth::sessions))
        .route("/password", put(auth::change_password))
}
