//! Authorization Service: permission resolution and RBAC administration.
//!
//! Effective permissions are recomputed from the join tables on every call;
//! nothing is cached, so role and permission changes apply to the next request.

use serde::{Deserialize, Serialize};
use validator::Validate;
use workhub_core::error::CoreError;
use workhub_core::pagination::{PageRequest, Paginated};
use workhub_core::types::DbId;
use workhub_core::validation::{validate_input, validate_permission_code};
use workhub_db::models::permission::{CreatePermission, Permission, UpdatePermission};
use workhub_db::models::role::{CreateRole, Role, UpdateRole};
use workhub_db::models::user::UserResponse;
use workhub_db::repositories::{PermissionRepo, RbacRepo, RoleRepo, UserRepo};
use workhub_db::DbPool;

use crate::error::{map_unique_violation, AppResult};

const ROLE_UNIQUE: &[(&str, &str)] = &[("uq_roles_code", "code"), ("uq_roles_name", "name")];
const PERMISSION_UNIQUE: &[(&str, &str)] = &[("uq_permissions_code", "code")];

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /roles`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(length(min = 2, max = 50))]
    pub code: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Request body for `PUT /roles/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub code: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Request body for `POST /permissions`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePermissionRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(
        length(min = 2, max = 100),
        custom(function = "validate_permission_code")
    )]
    pub code: String,
    #[validate(length(min = 2, max = 50))]
    pub action: String,
    pub description: Option<String>,
}

/// Request body for `PUT /permissions/{id}`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePermissionRequest {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[validate(
        length(min = 2, max = 100),
        custom(function = "validate_permission_code")
    )]
    pub code: Option<String>,
    #[validate(length(min = 2, max = 50))]
    pub action: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Body of the role/permission assignment endpoints.
#[derive(Debug, Deserialize, Validate)]
pub struct PermissionIdsRequest {
    #[validate(length(min = 1, message = "at least one permission id is required"))]
    pub permission_ids: Vec<DbId>,
}

/// Body of the user/role assignment endpoints.
#[derive(Debug, Deserialize, Validate)]
pub struct RoleIdsRequest {
    #[validate(length(min = 1, message = "at least one role id is required"))]
    pub role_ids: Vec<DbId>,
}

/// A role together with one page of the active permissions it grants.
#[derive(Debug, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Paginated<Permission>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Resolves and administers roles, permissions and their assignments.
#[derive(Clone)]
pub struct AuthorizationService {
    pool: DbPool,
}

impl AuthorizationService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    // --- Resolution ---------------------------------------------------------

    /// Every active permission reachable from `user_id` through an active
    /// role, deduplicated and ordered by code. Empty if the user has none.
    pub async fn get_user_permissions(&self, user_id: DbId) -> Result<Vec<Permission>, sqlx::Error> {
        RbacRepo::user_permissions(&self.pool, user_id).await
    }

    /// Whether `user_id` holds `permission_code`. `Ok(false)` on no match.
    pub async fn user_has_permission(
        &self,
        user_id: DbId,
        permission_code: &str,
    ) -> Result<bool, sqlx::Error> {
        RbacRepo::user_has_permission(&self.pool, user_id, permission_code).await
    }

    // --- Roles --------------------------------------------------------------

    pub async fn create_role(&self, input: &CreateRoleRequest) -> AppResult<Role> {
        validate_input(input)?;
        self.ensure_role_code_free(&input.code, None).await?;
        self.ensure_role_name_free(&input.name, None).await?;

        let create = CreateRole {
            name: input.name.clone(),
            code: input.code.clone(),
            description: input.description.clone(),
            is_active: input.is_active,
        };
        let role = RoleRepo::create(&self.pool, &create)
            .await
            .map_err(|e| map_unique_violation(e, ROLE_UNIQUE))?;

        tracing::info!(role_id = %role.id, code = %role.code, "Role created");
        Ok(role)
    }

    pub async fn get_role(&self, id: DbId) -> AppResult<Role> {
        Ok(RoleRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(CoreError::NotFound { entity: "Role", id })?)
    }

    pub async fn update_role(&self, id: DbId, input: &UpdateRoleRequest) -> AppResult<Role> {
        validate_input(input)?;
        self.get_role(id).await?;
        if let Some(code) = &input.code {
            self.ensure_role_code_free(code, Some(id)).await?;
        }
        if let Some(name) = &input.name {
            self.ensure_role_name_free(name, Some(id)).await?;
        }

        let update = UpdateRole {
            name: input.name.clone(),
            code: input.code.clone(),
            description: input.description.clone(),
            is_active: input.is_active,
        };
        let role = RoleRepo::update(&self.pool, id, &update)
            .await
            .map_err(|e| map_unique_violation(e, ROLE_UNIQUE))?
            .ok_or(CoreError::NotFound { entity: "Role", id })?;

        tracing::info!(role_id = %id, "Role updated");
        Ok(role)
    }

    /// Soft delete: the row and its join rows stay, but the role stops
    /// granting anything.
    pub async fn delete_role(&self, id: DbId) -> AppResult<()> {
        if !RoleRepo::soft_delete(&self.pool, id).await? {
            return Err(CoreError::NotFound { entity: "Role", id }.into());
        }
        tracing::info!(role_id = %id, "Role deleted");
        Ok(())
    }

    pub async fn list_roles(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Paginated<Role>> {
        let (roles, total) = RoleRepo::list(&self.pool, search, page).await?;
        Ok(Paginated::new(roles, total, page))
    }

    // --- Permissions --------------------------------------------------------

    pub async fn create_permission(&self, input: &CreatePermissionRequest) -> AppResult<Permission> {
        validate_input(input)?;
        self.ensure_permission_code_free(&input.code, None).await?;

        let create = CreatePermission {
            name: input.name.clone(),
            code: input.code.clone(),
            action: input.action.clone(),
            description: input.description.clone(),
        };
        let permission = PermissionRepo::create(&self.pool, &create)
            .await
            .map_err(|e| map_unique_violation(e, PERMISSION_UNIQUE))?;

        tracing::info!(permission_id = %permission.id, code = %permission.code, "Permission created");
        Ok(permission)
    }

    pub async fn get_permission(&self, id: DbId) -> AppResult<Permission> {
        Ok(PermissionRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Permission",
                id,
            })?)
    }

    pub async fn update_permission(
        &self,
        id: DbId,
        input: &UpdatePermissionRequest,
    ) -> AppResult<Permission> {
        validate_input(input)?;
        self.get_permission(id).await?;
        if let Some(code) = &input.code {
            self.ensure_permission_code_free(code, Some(id)).await?;
        }

        let update = UpdatePermission {
            name: input.name.clone(),
            code: input.code.clone(),
            action: input.action.clone(),
            description: input.description.clone(),
            is_active: input.is_active,
        };
        let permission = PermissionRepo::update(&self.pool, id, &update)
            .await
            .map_err(|e| map_unique_violation(e, PERMISSION_UNIQUE))?
            .ok_or(CoreError::NotFound {
                entity: "Permission",
                id,
            })?;

        tracing::info!(permission_id = %id, "Permission updated");
        Ok(permission)
    }

    pub async fn delete_permission(&self, id: DbId) -> AppResult<()> {
        if !PermissionRepo::soft_delete(&self.pool, id).await? {
            return Err(CoreError::NotFound {
                entity: "Permission",
                id,
            }
            .into());
        }
        tracing::info!(permission_id = %id, "Permission deleted");
        Ok(())
    }

    pub async fn list_permissions(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Paginated<Permission>> {
        let (permissions, total) = PermissionRepo::list(&self.pool, search, page).await?;
        Ok(Paginated::new(permissions, total, page))
    }

    // --- Role <-> permission ------------------------------------------------

    /// Grant permissions to a role. The role and every permission must exist;
    /// pairs that are already granted are skipped.
    pub async fn assign_permissions_to_role(
        &self,
        role_id: DbId,
        input: &PermissionIdsRequest,
    ) -> AppResult<()> {
        validate_input(input)?;
        self.get_role(role_id).await?;
        let ids = dedup(&input.permission_ids);

        if let Some(&id) = PermissionRepo::missing_ids(&self.pool, &ids).await?.first() {
            return Err(CoreError::NotFound {
                entity: "Permission",
                id,
            }
            .into());
        }

        let added = RbacRepo::assign_permissions_to_role(&self.pool, role_id, &ids).await?;
        tracing::info!(role_id = %role_id, requested = ids.len(), added, "Permissions assigned to role");
        Ok(())
    }

    pub async fn remove_permissions_from_role(
        &self,
        role_id: DbId,
        input: &PermissionIdsRequest,
    ) -> AppResult<()> {
        validate_input(input)?;
        self.get_role(role_id).await?;
        let ids = dedup(&input.permission_ids);

        let removed = RbacRepo::remove_permissions_from_role(&self.pool, role_id, &ids).await?;
        tracing::info!(role_id = %role_id, removed, "Permissions removed from role");
        Ok(())
    }

    pub async fn get_role_with_permissions(
        &self,
        role_id: DbId,
        page: PageRequest,
    ) -> AppResult<RoleWithPermissions> {
        let role = self.get_role(role_id).await?;
        let (permissions, total) = RbacRepo::list_role_permissions(&self.pool, role_id, page).await?;
        Ok(RoleWithPermissions {
            role,
            permissions: Paginated::new(permissions, total, page),
        })
    }

    // --- User <-> role ------------------------------------------------------

    /// Give roles to a user. The user and every role must exist.
    pub async fn assign_roles_to_user(&self, user_id: DbId, input: &RoleIdsRequest) -> AppResult<()> {
        validate_input(input)?;
        self.ensure_user_exists(user_id).await?;
        let ids = dedup(&input.role_ids);

        if let Some(&id) = RoleRepo::missing_ids(&self.pool, &ids).await?.first() {
            return Err(CoreError::NotFound { entity: "Role", id }.into());
        }

        let added = RbacRepo::assign_roles_to_user(&self.pool, user_id, &ids).await?;
        tracing::info!(user_id = %user_id, requested = ids.len(), added, "Roles assigned to user");
        Ok(())
    }

    pub async fn remove_roles_from_user(&self, user_id: DbId, input: &RoleIdsRequest) -> AppResult<()> {
        validate_input(input)?;
        self.ensure_user_exists(user_id).await?;
        let ids = dedup(&input.role_ids);

        let removed = RbacRepo::remove_roles_from_user(&self.pool, user_id, &ids).await?;
        tracing::info!(user_id = %user_id, removed, "Roles removed from user");
        Ok(())
    }

    /// Active roles held by `user_id`.
    pub async fn get_user_roles(&self, user_id: DbId) -> AppResult<Vec<Role>> {
        self.ensure_user_exists(user_id).await?;
        Ok(RbacRepo::list_user_roles(&self.pool, user_id).await?)
    }

    // --- Users --------------------------------------------------------------

    pub async fn list_users(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Paginated<UserResponse>> {
        let (users, total) = UserRepo::list(&self.pool, search, page).await?;
        Ok(Paginated::new(users, total, page).map(UserResponse::from))
    }

    // --- Helpers ------------------------------------------------------------

    async fn ensure_user_exists(&self, user_id: DbId) -> AppResult<()> {
        match UserRepo::find_by_id(&self.pool, user_id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::NotFound {
                entity: "User",
                id: user_id,
            }
            .into()),
        }
    }

    /// Codes are compared against every row, soft-deleted ones included,
    /// because the unique constraint covers them too.
    async fn ensure_role_code_free(&self, code: &str, except: Option<DbId>) -> AppResult<()> {
        match RoleRepo::find_by_code(&self.pool, code).await? {
            Some(existing) if Some(existing.id) != except => {
                Err(CoreError::TakenCredential { field: "code" }.into())
            }
            _ => Ok(()),
        }
    }

    async fn ensure_role_name_free(&self, name: &str, except: Option<DbId>) -> AppResult<()> {
        match RoleRepo::find_by_name(&self.pool, name).await? {
            Some(existing) if Some(existing.id) != except => {
                Err(CoreError::TakenCredential { field: "name" }.into())
            }
            _ => Ok(()),
        }
    }

    async fn ensure_permission_code_free(&self, code: &str, except: Option<DbId>) -> AppResult<()> {
        match PermissionRepo::find_by_code(&self.pool, code).await? {
            Some(existing) if Some(existing.id) != except => {
                Err(CoreError::TakenCredential { field: "code" }.into())
            }
            _ => Ok(()),
        }
    }
}

/// Sorted, duplicate-free copy of `ids`.
fn dedup(ids: &[DbId]) -> Vec<DbId> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}
