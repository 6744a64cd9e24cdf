//! Repository for the `permissions` table.
//!
//! Same soft-delete shape as [`RoleRepo`](super::RoleRepo).

use sqlx::PgPool;
use workhub_core::pagination::{like_pattern, PageRequest};
use workhub_core::types::DbId;

use crate::models::permission::{CreatePermission, Permission, UpdatePermission};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, name, code, action, description, is_active, created_at, updated_at, deleted_at";

/// Provides CRUD operations for permissions.
pub struct PermissionRepo;

impl PermissionRepo {
    /// Insert a new permission, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreatePermission,
    ) -> Result<Permission, sqlx::Error> {
        let query = format!(
            "INSERT INTO permissions (name, code, action, description)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Permission>(&query)
            .bind(&input.name)
            .bind(&input.code)
            .bind(&input.action)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a live permission by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Permission>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM permissions WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Permission>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find any permission (including soft-deleted) holding `code`.
    pub async fn find_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<Permission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM permissions WHERE code = $1");
        sqlx::query_as::<_, Permission>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// List live permissions newest first, optionally filtered by name, code
    /// or action. Returns the page and the total match count.
    pub async fn list(
        pool: &PgPool,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<Permission>, i64), sqlx::Error> {
        let pattern = search.map(like_pattern);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM permissions
             WHERE deleted_at IS NULL
               AND ($1::TEXT IS NULL OR name ILIKE $1 OR code ILIKE $1 OR action ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM permissions
             WHERE deleted_at IS NULL
               AND ($1::TEXT IS NULL OR name ILIKE $1 OR code ILIKE $1 OR action ILIKE $1)
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3"
        );
        let permissions = sqlx::query_as::<_, Permission>(&query)
            .bind(&pattern)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok((permissions, total))
    }

    /// Update a live permission. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePermission,
    ) -> Result<Option<Permission>, sqlx::Error> {
        let query = format!(
            "UPDATE permissions SET
                name = COALESCE($2, name),
                code = COALESCE($3, code),
                action = COALESCE($4, action),
                description = COALESCE($5, description),
                is_active = COALESCE($6, is_active)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Permission>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.code)
            .bind(&input.action)
            .bind(&input.description)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a permission. Returns `true` if a live row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE permissions SET deleted_at = NOW(), is_active = FALSE
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Return the subset of `ids` that do not name a live permission, in input order.
    pub async fn missing_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT t.id FROM UNNEST($1::UUID[]) WITH ORDINALITY AS t(id, ord)
             WHERE NOT EXISTS (
                 SELECT 1 FROM permissions p WHERE p.id = t.id AND p.deleted_at IS NULL
             )
             ORDER BY t.ord",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }
}
