//! Well-known permission codes.
//!
//! These must match the seed data in `20260301000007_seed_rbac.sql`. Codes are
//! stable machine keys of the form `<resource>.<action>`.

pub const USER_READ: &str = "user.read";
pub const USER_ASSIGN_ROLE: &str = "user.assign_role";

pub const ROLE_CREATE: &str = "role.create";
pub const ROLE_READ: &str = "role.read";
pub const ROLE_UPDATE: &str = "role.update";
pub const ROLE_DELETE: &str = "role.delete";
pub const ROLE_ASSIGN_PERMISSION: &str = "role.assign_permission";

pub const PERMISSION_CREATE: &str = "permission.create";
pub const PERMISSION_READ: &str = "permission.read";
pub const PERMISSION_UPDATE: &str = "permission.update";
pub const PERMISSION_DELETE: &str = "permission.delete";

/// Every code the server gates a route on.
pub const ALL: &[&str] = &[
    USER_READ,
    USER_ASSIGN_ROLE,
    ROLE_CREATE,
    ROLE_READ,
    ROLE_UPDATE,
    ROLE_DELETE,
    ROLE_ASSIGN_PERMISSION,
    PERMISSION_CREATE,
    PERMISSION_READ,
    PERMISSION_UPDATE,
    PERMISSION_DELETE,
];

/// Code of the seeded role that holds every permission in [`ALL`].
pub const SUPER_ADMIN_ROLE_CODE: &str = "super_admin";

/// Returns `true` if `code` looks like `<resource>.<action>`.
///
/// Both halves must be non-empty and made of lowercase ASCII letters, digits
/// or underscores.
pub fn is_well_formed_code(code: &str) -> bool {
    let Some((resource, action)) = code.split_once('.') else {
        return false;
    };
    let valid_part = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    };
    valid_part(resource) && valid_part(action)
}
