//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod permission_repo;
pub mod rbac_repo;
pub mod role_repo;
pub mod session_repo;
pub mod user_repo;

pub use permission_repo::PermissionRepo;
pub use rbac_repo::RbacRepo;
pub use role_repo::RoleRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
