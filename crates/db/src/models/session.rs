//! Session model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use workhub_core::types::{DbId, Timestamp};

/// A session row from the `sessions` table.
///
/// Also the payload mirrored into the session cache under `session:{id}`,
/// hence `Deserialize`. Tokens are included; use [`SessionResponse`] for API
/// output.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Timestamp,
    pub is_active: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Session {
    /// Active and not yet past `expires_at`.
    pub fn is_live_at(&self, now: Timestamp) -> bool {
        self.is_active && now <= self.expires_at
    }
}

/// Token-free view of a session for listing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: DbId,
    pub expires_at: Timestamp,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

impl From<Session> for SessionResponse {
    fn from(s: Session) -> Self {
        Self {
            id: s.id,
            expires_at: s.expires_at,
            ip_address: s.ip_address,
            user_agent: s.user_agent,
            created_at: s.created_at,
        }
    }
}

/// DTO for creating a new session.
#[derive(Debug)]
pub struct CreateSession {
    pub user_id: DbId,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Timestamp,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
