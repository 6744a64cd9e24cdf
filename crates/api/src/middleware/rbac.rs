//! Stage 2 of the request gate: permission checks.
//!
//! [`RequirePermission`] wraps [`AuthUser`] and rejects requests whose user
//! does not hold the permission named by its marker type. The check goes to
//! the database on every request, so grants and revocations apply at once.

use std::marker::PhantomData;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use workhub_core::error::CoreError;
use workhub_core::permissions;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::rbac::AuthorizationService;
use crate::state::AppState;

/// A zero-sized marker naming one permission code.
pub trait PermissionCode: Send + Sync + 'static {
    const CODE: &'static str;
}

macro_rules! permission_markers {
    ($($(#[$meta:meta])* $name:ident => $code:path;)*) => {
        $(
            $(#[$meta])*
            pub struct $name;

            impl PermissionCode for $name {
                const CODE: &'static str = $code;
            }
        )*
    };
}

permission_markers! {
    /// `user.read`
    UserRead => permissions::USER_READ;
    /// `user.assign_role`
    UserAssignRole => permissions::USER_ASSIGN_ROLE;
    RoleCreate => permissions::ROLE_CREATE;
    RoleRead => permissions::ROLE_READ;
    RoleUpdate => permissions::ROLE_UPDATE;
    RoleDelete => permissions::ROLE_DELETE;
    /// `role.assign_permission`
    RoleAssignPermission => permissions::ROLE_ASSIGN_PERMISSION;
    PermissionCreate => permissions::PERMISSION_CREATE;
    PermissionRead => permissions::PERMISSION_READ;
    PermissionUpdate => permissions::PERMISSION_UPDATE;
    PermissionDelete => permissions::PERMISSION_DELETE;
}

/// Requires the permission `P::CODE`. Rejects with 403 naming the code
/// otherwise, and with 500 if the check itself fails.
///
/// ```ignore
/// async fn delete_role(RequirePermission(user, _): RequirePermission<RoleDelete>) { .. }
/// ```
pub struct RequirePermission<P>(pub AuthUser, pub PhantomData<fn() -> P>);

impl<P: PermissionCode> FromRequestParts<AppState> for RequirePermission<P> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        let granted = AuthorizationService::new(state.pool.clone())
            .user_has_permission(user.user_id, P::CODE)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user.user_id, permission = P::CODE, error = %e, "Permission check failed");
                AppError::InternalError(format!("Permission check failed: {e}"))
            })?;

        if !granted {
            tracing::info!(user_id = %user.user_id, permission = P::CODE, "Permission denied");
            return Err(AppError::Core(CoreError::Forbidden(format!(
                "Forbidden: missing permission '{}'",
                P::CODE
            ))));
        }

        Ok(RequirePermission(user, PhantomData))
    }
}
