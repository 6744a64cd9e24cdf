use axum::routing::get;
use axum::Router;

use crate::handlers::permissions;
use crate::state::AppState;

/// Routes mounted at `/permissions`.
///
/// ```text
/// GET, POST          /      -> list, create
/// GET, PUT, DELETE   /{id}  -> get_by_id, update, delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(permissions::list).post(permissions::create))
        .route(
            "/{id}",
            get(permissions::get_by_id)
                .put(permissions::update)
                .delete(permissions::delete),
        )
}
