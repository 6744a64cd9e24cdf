//! Role-based access control: permission resolution and administration.

pub mod service;

pub use service::AuthorizationService;
