use crate::types::DbId;

/// Domain-level failures shared by the persistence and HTTP layers.
///
/// The two credential variants render identically on purpose. They are kept
/// apart so logs can tell an unknown email from a bad password while the
/// client cannot.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A uniqueness check failed on `field` (email, username, role code...).
    #[error("Credential already taken: {field}")]
    TakenCredential { field: &'static str },

    #[error("Invalid email or password")]
    UsernameOrPasswordIncorrect,

    #[error("Invalid email or password")]
    PasswordIncorrect,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}
