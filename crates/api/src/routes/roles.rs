use axum::routing::get;
use axum::Router;

use crate::handlers::roles;
use crate::state::AppState;

/// Routes mounted at `/roles`.
///
/// ```text
/// GET, POST            /                  -> list, create
/// GET, PUT, DELETE     /{id}              -> get_by_id, update, delete
/// GET, POST, DELETE    /{id}/permissions  -> permissions, assign, remove
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(roles::list).post(roles::create))
        .route(
            "/{id}",
            get(roles::get_by_id)
                .put(roles::update)
                .delete(roles::delete),
        )
        .route(
            "/{id}/permissions",
            get(roles::permissions)
                .post(roles::assign_permissions)
                .delete(roles::remove_permissions),
        )
}
