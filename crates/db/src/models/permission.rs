//! Permission entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use workhub_core::types::{DbId, Timestamp};

/// A permission row from the `permissions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Permission {
    pub id: DbId,
    pub name: String,
    pub code: String,
    pub action: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

/// DTO for creating a new permission.
#[derive(Debug, Deserialize)]
pub struct CreatePermission {
    pub name: String,
    pub code: String,
    pub action: String,
    pub description: Option<String>,
}

/// DTO for updating an existing permission. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePermission {
    pub name: Option<String>,
    pub code: Option<String>,
    pub action: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}
