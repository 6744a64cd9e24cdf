//! Repository for the RBAC join tables `role_permissions` and `user_roles`,
//! plus the permission-resolution queries built on them.
//!
//! A permission is granted to a user when some path
//! `user_roles -> roles -> role_permissions -> permissions` exists whose role
//! and permission are both active and not soft-deleted.

use sqlx::PgPool;
use workhub_core::pagination::PageRequest;
use workhub_core::types::DbId;

use crate::models::permission::Permission;
use crate::models::role::Role;

/// Permission columns qualified with the `p` alias used in joins.
const PERMISSION_COLUMNS: &str = "p.id, p.name, p.code, p.action, p.description, p.is_active, \
     p.created_at, p.updated_at, p.deleted_at";

/// Role columns qualified with the `r` alias used in joins.
const ROLE_COLUMNS: &str =
    "r.id, r.name, r.code, r.description, r.is_active, r.created_at, r.updated_at, r.deleted_at";

/// Provides join-table maintenance and permission resolution.
pub struct RbacRepo;

impl RbacRepo {
    /// Grant every permission in `permission_ids` to `role_id`.
    ///
    /// Already-granted pairs are left untouched. Returns the number of new rows.
    pub async fn assign_permissions_to_role(
        pool: &PgPool,
        role_id: DbId,
        permission_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO role_permissions (role_id, permission_id)
             SELECT $1, UNNEST($2::UUID[])
             ON CONFLICT (role_id, permission_id) DO NOTHING",
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Revoke the given permissions from `role_id`. Returns the number of rows removed.
    pub async fn remove_permissions_from_role(
        pool: &PgPool,
        role_id: DbId,
        permission_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM role_permissions
             WHERE role_id = $1 AND permission_id = ANY($2::UUID[])",
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Give `user_id` every role in `role_ids`. Existing pairs are kept.
    pub async fn assign_roles_to_user(
        pool: &PgPool,
        user_id: DbId,
        role_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id)
             SELECT $1, UNNEST($2::UUID[])
             ON CONFLICT (user_id, role_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(role_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Take the given roles away from `user_id`. Returns the number of rows removed.
    pub async fn remove_roles_from_user(
        pool: &PgPool,
        user_id: DbId,
        role_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_roles
             WHERE user_id = $1 AND role_id = ANY($2::UUID[])",
        )
        .bind(user_id)
        .bind(role_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Active permissions granted to `role_id`, ordered by code, one page at a time.
    pub async fn list_role_permissions(
        pool: &PgPool,
        role_id: DbId,
        page: PageRequest,
    ) -> Result<(Vec<Permission>, i64), sqlx::Error> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)
             FROM role_permissions rp
             JOIN permissions p ON p.id = rp.permission_id
             WHERE rp.role_id = $1 AND p.is_active AND p.deleted_at IS NULL",
        )
        .bind(role_id)
        .fetch_one(pool)
        .await?;

        let query = format!(
            "SELECT {PERMISSION_COLUMNS}
             FROM role_permissions rp
             JOIN permissions p ON p.id = rp.permission_id
             WHERE rp.role_id = $1 AND p.is_active AND p.deleted_at IS NULL
             ORDER BY p.code
             LIMIT $2 OFFSET $3"
        );
        let permissions = sqlx::query_as::<_, Permission>(&query)
            .bind(role_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok((permissions, total))
    }

    /// Active roles held by `user_id`, ordered by code.
    pub async fn list_user_roles(pool: &PgPool, user_id: DbId) -> Result<Vec<Role>, sqlx::Error> {
        let query = format!(
            "SELECT {ROLE_COLUMNS}
             FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = $1 AND r.is_active AND r.deleted_at IS NULL
             ORDER BY r.code"
        );
        sqlx::query_as::<_, Role>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Distinct active permissions `user_id` holds through any active role.
    pub async fn user_permissions(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Permission>, sqlx::Error> {
        let query = format!(
            "SELECT DISTINCT {PERMISSION_COLUMNS}
             FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             JOIN role_permissions rp ON rp.role_id = r.id
             JOIN permissions p ON p.id = rp.permission_id
             WHERE ur.user_id = $1
               AND r.is_active AND r.deleted_at IS NULL
               AND p.is_active AND p.deleted_at IS NULL
             ORDER BY p.code"
        );
        sqlx::query_as::<_, Permission>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Returns `true` if `user_id` holds `permission_code` through an active role.
    pub async fn user_has_permission(
        pool: &PgPool,
        user_id: DbId,
        permission_code: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1
                 FROM user_roles ur
                 JOIN roles r ON r.id = ur.role_id
                 JOIN role_permissions rp ON rp.role_id = r.id
                 JOIN permissions p ON p.id = rp.permission_id
                 WHERE ur.user_id = $1
                   AND p.code = $2
                   AND r.is_active AND r.deleted_at IS NULL
                   AND p.is_active AND p.deleted_at IS NULL
             )",
        )
        .bind(user_id)
        .bind(permission_code)
        .fetch_one(pool)
        .await
    }
}
