//! Page/offset arithmetic for listing endpoints.

use serde::Serialize;

/// Page size used when the client sends none.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Upper bound on the page size a client may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// A normalized page request. Construct with [`PageRequest::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Normalize raw query values.
    ///
    /// Missing or non-positive `page` becomes 1. Missing or non-positive
    /// `page_size` becomes [`DEFAULT_PAGE_SIZE`]; larger values are capped at
    /// [`MAX_PAGE_SIZE`].
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let page_size = page_size
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    /// SQL `LIMIT`.
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// SQL `OFFSET`.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Listing envelope: `{ items, total_items, total_pages, current_page, page_size }`.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total_items: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub page_size: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_items: i64, request: PageRequest) -> Self {
        Self {
            items,
            total_items,
            total_pages: total_pages(total_items, request.page_size),
            current_page: request.page,
            page_size: request.page_size,
        }
    }

    /// Convert every item, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total_items: self.total_items,
            total_pages: self.total_pages,
            current_page: self.current_page,
            page_size: self.page_size,
        }
    }
}

/// Ceiling division of `total` by `page_size`. Zero items means zero pages.
pub fn total_pages(total: i64, page_size: i64) -> i64 {
    if total <= 0 || page_size <= 0 {
        return 0;
    }
    (total + page_size - 1) / page_size
}

/// Wrap a search term for `ILIKE`, escaping the pattern metacharacters.
pub fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
