//! Request gate extractors.
//!
//! - [`auth::AuthUser`] -- verifies an access token from the `Authorization` header.
//! - [`auth::LiveSession`] -- `AuthUser` plus an active-session check.
//! - [`rbac::RequirePermission`] -- `AuthUser` plus a permission check.
//! - `ClientMeta` -- client IP and user agent, recorded on new sessions.

pub mod auth;
pub mod client;
pub mod rbac;
