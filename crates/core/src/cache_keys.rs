//! Key layout of the session cache.
//!
//! ```text
//! session:{id}             -> serialized session        (TTL)
//! token:{access_token}     -> session id                (TTL)
//! user:{user_id}:sessions  -> set of session ids        (TTL refreshed on write)
//! ```

use std::fmt::Display;

pub fn session_key(session_id: impl Display) -> String {
    format!("session:{session_id}")
}

pub fn token_key(access_token: &str) -> String {
    format!("token:{access_token}")
}

pub fn user_sessions_key(user_id: impl Display) -> String {
    format!("user:{user_id}:sessions")
}
