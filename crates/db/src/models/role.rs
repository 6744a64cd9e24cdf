//! Role entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use workhub_core::types::{DbId, Timestamp};

/// A role row from the `roles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Role {
    pub id: DbId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

/// DTO for creating a new role.
#[derive(Debug, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// DTO for updating an existing role. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}
