//! Shared response envelope types for API handlers.
//!
//! Single entities are returned as `{ "data": ... }`. Paginated listings use
//! [`workhub_core::pagination::Paginated`] directly.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: role }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
