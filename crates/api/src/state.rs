use std::sync::Arc;

use crate::auth::jwt::TokenAuthority;
use crate::config::ServerConfig;
use crate::session::SessionStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already a handle.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: workhub_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Signs and verifies bearer tokens.
    pub tokens: Arc<TokenAuthority>,
    /// Session rows plus their cache mirror.
    pub sessions: SessionStore,
}
