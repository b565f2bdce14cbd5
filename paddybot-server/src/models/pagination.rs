//! Pagination types

use serde::{Deserialize, Serialize};

/// Maximum items per page
const MAX_PAGE_SIZE: u32 = 100;

/// Default items per page
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page (max 100)
    pub page_size: u32,
}

impl Pagination {
    /// Create pagination with validation.
    ///
    /// - Page is clamped to minimum of 1
    /// - Page size is clamped to 1..=100
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Calculate SQL OFFSET value.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    /// Get LIMIT value.
    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    /// Metadata for a page out of `total_items`.
    pub fn meta(&self, total_items: i64) -> PaginationMeta {
        calculate_pagination(self.page, self.page_size, total_items)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Pagination metadata returned alongside a page of items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Compute page counts and navigation flags.
///
/// An empty collection has zero pages.
pub fn calculate_pagination(page: u32, page_size: u32, total_items: i64) -> PaginationMeta {
    let page_size = page_size.max(1);
    let size = page_size as i64;
    let total_items = total_items.max(0);
    let total_pages = (total_items + size - 1) / size;

    PaginationMeta {
        page,
        page_size,
        total_items,
        total_pages,
        has_next: (page as i64) < total_pages,
        has_prev: page > 1,
    }
}

/// `(offset, limit)` for a 1-indexed page.
pub fn offset_limit(page: u32, page_size: u32) -> (i64, i64) {
    let p = Pagination::new(page, page_size);
    (p.offset(), p.limit())
}

/// Query parameters for pagination
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl From<PaginationParams> for Pagination {
    fn from(params: PaginationParams) -> Self {
        Self::new(
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}
