pub mod auth;
pub mod health;
pub mod permissions;
pub mod roles;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/register                       register (public)
/// /auth/login                          login (public)
/// /auth/refresh                        refresh (public)
/// /auth/logout                         logout (live session)
/// /auth/logout-all                     logout everywhere (live session)
/// /auth/me                             identity + permissions (access token)
/// /auth/sessions                       active sessions (live session)
/// /auth/password                       change password (live session)
///
/// /users                               list (user.read)
/// /users/{id}/roles                    list (user.read), assign/remove (user.assign_role)
/// /users/{id}/permissions              effective permissions (user.read)
///
/// /roles                               list, create (role.read, role.create)
/// /roles/{id}                          get, update, delete (role.read/update/delete)
/// /roles/{id}/permissions              get (role.read), assign/remove (role.assign_permission)
///
/// /permissions                         list, create (permission.read, permission.create)
/// /permissions/{id}                    get, update, delete (permission.read/update/delete)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/roles", roles::router())
        .nest("/permissions", permissions::router())
}
