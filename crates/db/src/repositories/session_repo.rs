//! Repository for the `sessions` table.
//!
//! This is the source of truth behind the session cache. Revocation flips
//! `is_active` and never deletes, so revoked sessions stay listable for audit.

use sqlx::PgPool;
use workhub_core::types::DbId;

use crate::models::session::{CreateSession, Session};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, access_token, refresh_token, expires_at, is_active, \
     ip_address, user_agent, created_at, updated_at";

/// Provides persistence for login sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new active session, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateSession) -> Result<Session, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions
                (user_id, access_token, refresh_token, expires_at, ip_address, user_agent)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(input.user_id)
            .bind(&input.access_token)
            .bind(&input.refresh_token)
            .bind(input.expires_at)
            .bind(&input.ip_address)
            .bind(&input.user_agent)
            .fetch_one(pool)
            .await
    }

    /// Find a session by ID regardless of state.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the active session issued with `access_token`.
    ///
    /// Expiry is left to the caller so a cached and a relational lookup of
    /// the same token return the same record.
    pub async fn find_active_by_access_token(
        pool: &PgPool,
        access_token: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE access_token = $1 AND is_active"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(access_token)
            .fetch_optional(pool)
            .await
    }

    /// Find the active session holding `refresh_token`.
    ///
    /// `expires_at` tracks the access token, so it is not checked here; the
    /// refresh token's own `exp` claim bounds its lifetime.
    pub async fn find_active_by_refresh_token(
        pool: &PgPool,
        refresh_token: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE refresh_token = $1 AND is_active"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(refresh_token)
            .fetch_optional(pool)
            .await
    }

    /// Active, unexpired sessions of `user_id`, newest first.
    pub async fn list_active_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE user_id = $1 AND is_active AND expires_at > NOW()
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Deactivate one session. Returns the row as it was revoked, or `None` if
    /// it did not exist or was already inactive.
    pub async fn revoke(pool: &PgPool, id: DbId) -> Result<Option<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET is_active = FALSE
             WHERE id = $1 AND is_active
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Deactivate every active session of `user_id`, returning the revoked rows.
    pub async fn revoke_all_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Session>, sqlx::Error> {
        let query = format!(
            "UPDATE sessions SET is_active = FALSE
             WHERE user_id = $1 AND is_active
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
