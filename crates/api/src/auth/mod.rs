//! Authentication primitives and the login/session orchestration built on them.
//!
//! - [`jwt`] -- RS256 Token Authority.
//! - [`password`] -- Argon2id hashing and verification.
//! - [`service`] -- login, registration, refresh, logout, password change.

pub mod jwt;
pub mod password;
pub mod service;
