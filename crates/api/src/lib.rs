//! WorkHub API server library.
//!
//! Exposes config, state, the Token Authority, the session store, the
//! authentication and authorization services, the request gate extractors and
//! the route tree, so integration tests and the binary entrypoint can both
//! access them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod rbac;
pub mod response;
pub mod routes;
pub mod session;
pub mod state;
