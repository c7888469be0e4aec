//! Pagination utilities
//!
//! Admin listings and the manga reader are paged. Callers pass `page` and
//! `per_page` query parameters; out-of-range pages are clamped rather than
//! rejected.

use serde::{Deserialize, Serialize};

/// Page size when the caller does not ask for one
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Upper bound on `per_page`
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Total number of pages
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
    /// Rows per page (SQL LIMIT)
    pub page_size: i64,
}

/// Calculate pagination metadata from total results and requested page
///
/// Ensures page is within valid bounds [1, total_pages]
///
/// # Examples
/// ```
/// use suzuani_web::pagination::calculate_pagination;
///
/// // 250 total results at 100 per page = 3 pages (100 + 100 + 50)
/// let p = calculate_pagination(250, 2, 100);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 100);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(250, 99, 100);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 200);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64, page_size: i64) -> Pagination {
    let page_size = page_size.max(1);
    let total_pages = (total_results.max(0) + page_size - 1) / page_size;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * page_size;

    Pagination {
        page,
        total_pages,
        offset,
        page_size,
    }
}

/// `?page=&per_page=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageParams {
    /// Effective page size, capped at [`MAX_PAGE_SIZE`]
    pub fn page_size(&self) -> i64 {
        self.per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn paginate(&self, total_results: i64) -> Pagination {
        calculate_pagination(total_results, self.page.unwrap_or(1), self.page_size())
    }
}

/// One page of a listing, as returned over HTTP
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        Self {
            items,
            page: pagination.page,
            per_page: pagination.page_size,
            total,
            total_pages: pagination.total_pages,
        }
    }
}
