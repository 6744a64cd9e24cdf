use axum::routing::get;
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET            /                  -> list (user.read)
/// GET            /{id}/roles        -> roles (user.read)
/// POST, DELETE   /{id}/roles        -> assign_roles, remove_roles (user.assign_role)
/// GET            /{id}/permissions  -> permissions (user.read)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list))
        .route(
            "/{id}/roles",
            get(users::roles)
                .post(users::assign_roles)
                .delete(users::remove_roles),
        )
        .route("/{id}/permissions", get(users::permissions))
}
