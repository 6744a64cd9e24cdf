//! Dual-backed session store.
//!
//! PostgreSQL holds the authoritative session rows. An optional
//! [`SessionCache`] mirrors them under three keys (see
//! [`workhub_core::cache_keys`]) so the per-request liveness check can skip
//! the database. Cache writes are advisory: they are attempted after the
//! relational write has succeeded and their failures are logged, never
//! returned. Reads fall back to PostgreSQL on any cache miss or error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use workhub_core::cache_keys::{session_key, token_key, user_sessions_key};
use workhub_core::types::DbId;
use workhub_db::models::session::{CreateSession, Session};
use workhub_db::repositories::SessionRepo;
use workhub_db::DbPool;

use super::cache::{CacheError, SessionCache};

/// Outcome of a best-effort cache write.
///
/// Failures have already been logged by the time an `Advisory` is returned,
/// so callers are free to drop it.
#[derive(Debug)]
pub struct Advisory(Result<(), CacheError>);

impl Advisory {
    fn ok() -> Self {
        Self(Ok(()))
    }

    pub fn is_ok(&self) -> bool {
        self.0.is_ok()
    }
}

/// Session persistence with a cache mirror. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    pool: DbPool,
    cache: Option<Arc<dyn SessionCache>>,
    op_timeout: Duration,
}

impl SessionStore {
    /// `cache = None` disables mirroring; every read then goes to PostgreSQL.
    pub fn new(pool: DbPool, cache: Option<Arc<dyn SessionCache>>, op_timeout: Duration) -> Self {
        Self {
            pool,
            cache,
            op_timeout,
        }
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Insert the session row, then mirror it into the cache.
    ///
    /// Only the relational write can fail the call.
    pub async fn create_session(&self, input: &CreateSession) -> Result<Session, sqlx::Error> {
        let session = SessionRepo::create(&self.pool, input).await?;
        tracing::debug!(session_id = %session.id, user_id = %session.user_id, "Session persisted");
        let _ = self.mirror(&session).await;
        Ok(session)
    }

    /// Write `session` under its cache keys with a TTL equal to the time
    /// left until `expires_at`. Already-expired sessions are not mirrored.
    pub async fn mirror(&self, session: &Session) -> Advisory {
        let Some(cache) = &self.cache else {
            return Advisory::ok();
        };
        let Ok(ttl) = (session.expires_at - Utc::now()).to_std() else {
            return Advisory::ok();
        };
        if ttl.is_zero() {
            return Advisory::ok();
        }

        let result = async {
            let payload = serde_json::to_string(session)
                .map_err(|e| CacheError::Corrupt(e.to_string()))?;
            let id = session.id.to_string();
            self.bounded(cache.set_ex(&session_key(session.id), &payload, ttl))
                .await?;
            self.bounded(cache.set_ex(&token_key(&session.access_token), &id, ttl))
                .await?;
            self.bounded(cache.set_add(&user_sessions_key(session.user_id), &id, ttl))
                .await
        }
        .await;

        advisory("mirror", session.id, result)
    }

    /// Resolve a session from its access token.
    ///
    /// Tries `token:{token}` then `session:{id}` in the cache; on any miss or
    /// cache error, falls back to the active row holding `access_token`.
    /// Expiry is not checked here; see [`is_session_active`](Self::is_session_active).
    pub async fn get_by_token(&self, access_token: &str) -> Result<Option<Session>, sqlx::Error> {
        if let Some(cache) = &self.cache {
            match self.cached_by_token(cache.as_ref(), access_token).await {
                Ok(Some(session)) => return Ok(Some(session)),
                Ok(None) => tracing::debug!("Session cache miss, falling back to database"),
                Err(e) => {
                    tracing::warn!(error = %e, "Session cache lookup failed, falling back to database")
                }
            }
        }
        SessionRepo::find_active_by_access_token(&self.pool, access_token).await
    }

    /// Resolve a session by id, cache first.
    pub async fn get_by_id(&self, id: DbId) -> Result<Option<Session>, sqlx::Error> {
        if let Some(cache) = &self.cache {
            match self.cached_by_id(cache.as_ref(), id).await {
                Ok(Some(session)) => return Ok(Some(session)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "Session cache lookup failed, falling back to database")
                }
            }
        }
        SessionRepo::find_by_id(&self.pool, id).await
    }

    /// The active session holding `refresh_token`. Always relational.
    pub async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        SessionRepo::find_active_by_refresh_token(&self.pool, refresh_token).await
    }

    /// Active, unexpired sessions of `user_id`. Always relational.
    pub async fn list_active(&self, user_id: DbId) -> Result<Vec<Session>, sqlx::Error> {
        SessionRepo::list_active_for_user(&self.pool, user_id).await
    }

    /// True iff a session for `access_token` exists, is active, and has not
    /// passed `expires_at`. Lookup failures count as inactive.
    pub async fn is_session_active(&self, access_token: &str) -> bool {
        match self.get_by_token(access_token).await {
            Ok(Some(session)) => session.is_live_at(Utc::now()),
            Ok(None) => false,
            Err(e) => {
                tracing::error!(error = %e, "Session lookup failed, treating session as inactive");
                false
            }
        }
    }

    /// Deactivate one session and purge its cache entries.
    ///
    /// Returns the revoked row, or `None` if it was unknown or already inactive.
    pub async fn revoke(&self, id: DbId) -> Result<Option<Session>, sqlx::Error> {
        let revoked = SessionRepo::revoke(&self.pool, id).await?;
        match &revoked {
            Some(session) => {
                tracing::info!(session_id = %id, user_id = %session.user_id, "Session revoked");
                let _ = self.purge(session).await;
            }
            None => {
                // The row may be gone from the database's point of view but
                // still cached; drop the id key regardless.
                let _ = self.purge_id(id).await;
            }
        }
        Ok(revoked)
    }

    /// Deactivate every session of `user_id` and purge their cache entries.
    ///
    /// Returns the number of sessions revoked.
    pub async fn revoke_all(&self, user_id: DbId) -> Result<usize, sqlx::Error> {
        let revoked = SessionRepo::revoke_all_for_user(&self.pool, user_id).await?;
        tracing::info!(user_id = %user_id, count = revoked.len(), "All sessions revoked");
        let _ = self.purge_user(user_id, &revoked).await;
        Ok(revoked.len())
    }

    // -----------------------------------------------------------------------
    // Cache helpers
    // -----------------------------------------------------------------------

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| CacheError::Timeout)?
    }

    async fn cached_by_id(
        &self,
        cache: &dyn SessionCache,
        id: DbId,
    ) -> Result<Option<Session>, CacheError> {
        let Some(payload) = self.bounded(cache.get(&session_key(id))).await? else {
            return Ok(None);
        };
        serde_json::from_str(&payload)
            .map(Some)
            .map_err(|e| CacheError::Corrupt(e.to_string()))
    }

    async fn cached_by_token(
        &self,
        cache: &dyn SessionCache,
        access_token: &str,
    ) -> Result<Option<Session>, CacheError> {
        let Some(raw_id) = self.bounded(cache.get(&token_key(access_token))).await? else {
            return Ok(None);
        };
        let id: DbId = raw_id
            .parse()
            .map_err(|_| CacheError::Corrupt(format!("bad session id {raw_id:?}")))?;
        let session = self.cached_by_id(cache, id).await?;
        // A stale mapping may point at a session issued for another token.
        Ok(session.filter(|s| s.access_token == access_token))
    }

    async fn purge(&self, session: &Session) -> Advisory {
        let Some(cache) = &self.cache else {
            return Advisory::ok();
        };
        let result = async {
            self.bounded(cache.delete(&[
                session_key(session.id),
                token_key(&session.access_token),
            ]))
            .await?;
            self.bounded(cache.set_remove(
                &user_sessions_key(session.user_id),
                &session.id.to_string(),
            ))
            .await
        }
        .await;
        advisory("purge", session.id, result)
    }

    async fn purge_id(&self, id: DbId) -> Advisory {
        let Some(cache) = &self.cache else {
            return Advisory::ok();
        };
        let result = self.bounded(cache.delete(&[session_key(id)])).await;
        advisory("purge", id, result)
    }

    /// Remove every session of `user_id` from the cache: the rows just revoked
    /// plus anything still listed in the per-user set, then the set itself.
    ///
    /// The keys of `revoked` and the set key are always deleted. Walking the
    /// set only adds keys; a member that cannot be read is logged and its
    /// `session:{id}` key is still dropped.
    async fn purge_user(&self, user_id: DbId, revoked: &[Session]) -> Advisory {
        let Some(cache) = &self.cache else {
            return Advisory::ok();
        };
        let set_key = user_sessions_key(user_id);

        let mut keys: Vec<String> = Vec::with_capacity(revoked.len() * 2 + 1);
        for session in revoked {
            keys.push(session_key(session.id));
            keys.push(token_key(&session.access_token));
        }
        keys.push(set_key.clone());

        match self.bounded(cache.set_members(&set_key)).await {
            Ok(members) => {
                for raw_id in members {
                    let Ok(id) = raw_id.parse::<DbId>() else {
                        tracing::warn!(user_id = %user_id, member = %raw_id, "Skipping malformed session set member");
                        continue;
                    };
                    keys.push(session_key(id));
                    match self.cached_by_id(cache.as_ref(), id).await {
                        Ok(Some(session)) => keys.push(token_key(&session.access_token)),
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(user_id = %user_id, session_id = %id, error = %e, "Unreadable cached session, dropping its id key only")
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Could not list cached sessions, purging revoked rows only")
            }
        }

        keys.sort();
        keys.dedup();
        let result = self.bounded(cache.delete(&keys)).await;
        if let Err(e) = &result {
            tracing::warn!(user_id = %user_id, error = %e, "Best-effort cache purge failed");
        }
        Advisory(result)
    }
}

/// Log a failed advisory write at WARN and wrap the result.
fn advisory(op: &'static str, session_id: DbId, result: Result<(), CacheError>) -> Advisory {
    if let Err(e) = &result {
        tracing::warn!(op, session_id = %session_id, error = %e, "Best-effort session cache write failed");
    }
    Advisory(result)
}
