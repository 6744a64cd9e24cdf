//! Domain primitives shared by the persistence and HTTP layers.
//!
//! Nothing in this crate performs I/O.

pub mod cache_keys;
pub mod error;
pub mod pagination;
pub mod permissions;
pub mod tokens;
pub mod types;
pub mod validation;
