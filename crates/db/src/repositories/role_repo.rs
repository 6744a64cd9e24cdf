//! Repository for the `roles` table.
//!
//! Deletion is soft: `deleted_at` is stamped and `is_active` cleared. Reads
//! skip soft-deleted rows, except the code/name lookups used for uniqueness
//! checks, which see every row because the unique constraints do too.

use sqlx::PgPool;
use workhub_core::pagination::{like_pattern, PageRequest};
use workhub_core::types::DbId;

use crate::models::role::{CreateRole, Role, UpdateRole};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, name, code, description, is_active, created_at, updated_at, deleted_at";

/// Provides CRUD operations for roles.
pub struct RoleRepo;

impl RoleRepo {
    /// Insert a new role, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateRole) -> Result<Role, sqlx::Error> {
        let query = format!(
            "INSERT INTO roles (name, code, description, is_active)
             VALUES ($1, $2, $3, COALESCE($4, TRUE))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Role>(&query)
            .bind(&input.name)
            .bind(&input.code)
            .bind(&input.description)
            .bind(input.is_active)
            .fetch_one(pool)
            .await
    }

    /// Find a live (not soft-deleted) role by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Role>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find any role (including soft-deleted) holding `code`.
    pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles WHERE code = $1");
        sqlx::query_as::<_, Role>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Find any role (including soft-deleted) holding `name`.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles WHERE name = $1");
        sqlx::query_as::<_, Role>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// List live roles newest first, optionally filtered by name or code.
    /// Returns the page and the total match count.
    pub async fn list(
        pool: &PgPool,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<Role>, i64), sqlx::Error> {
        let pattern = search.map(like_pattern);

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM roles
             WHERE deleted_at IS NULL
               AND ($1::TEXT IS NULL OR name ILIKE $1 OR code ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        let query = format!(
            "SELECT {COLUMNS} FROM roles
             WHERE deleted_at IS NULL
               AND ($1::TEXT IS NULL OR name ILIKE $1 OR code ILIKE $1)
             ORDER BY created_at DESC, id
             LIMIT $2 OFFSET $3"
        );
        let roles = sqlx::query_as::<_, Role>(&query)
            .bind(&pattern)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        Ok((roles, total))
    }

    /// Update a live role. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateRole,
    ) -> Result<Option<Role>, sqlx::Error> {
        let query = format!(
            "UPDATE roles SET
                name = COALESCE($2, name),
                code = COALESCE($3, code),
                description = COALESCE($4, description),
                is_active = COALESCE($5, is_active)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Role>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.code)
            .bind(&input.description)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a role. Join rows are kept for audit; resolution ignores
    /// them because the role is no longer active.
    ///
    /// Returns `true` if a live row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE roles SET deleted_at = NOW(), is_active = FALSE
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Return the subset of `ids` that do not name a live role, in input order.
    pub async fn missing_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT t.id FROM UNNEST($1::UUID[]) WITH ORDINALITY AS t(id, ord)
             WHERE NOT EXISTS (
                 SELECT 1 FROM roles r WHERE r.id = t.id AND r.deleted_at IS NULL
             )
             ORDER BY t.ord",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }
}
