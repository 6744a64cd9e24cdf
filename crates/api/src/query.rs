//! Shared query parameter types for API handlers.

use serde::Deserialize;
use workhub_core::pagination::PageRequest;

/// `?page=&page_size=&search=` for listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
}

impl ListParams {
    /// Normalized page request (defaults and clamping applied).
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }

    /// Trimmed search term, `None` if absent or blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// `?page=&page_size=` for nested listings that do not support search.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }
}
