// crates/canteen-core/src/core/paging.rs
// ============================================================================
// Module: Canteen Pagination
// Description: Page requests and page envelopes for listing endpoints.
// Purpose: Normalize client paging input and describe paged results.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Page numbers are zero-based. Limits are clamped to `1..=MAX_PAGE_LIMIT` so a
//! client cannot request unbounded listings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default page size when the client omits `limit`.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
/// Maximum page size accepted from clients.
pub const MAX_PAGE_LIMIT: u32 = 100;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Normalized page request.
///
/// # Invariants
/// - `limit` is within `1..=MAX_PAGE_LIMIT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    /// Zero-based page number.
    page: u32,
    /// Page size.
    limit: u32,
}

impl PageRequest {
    /// Builds a page request from optional client input, clamping the limit.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(0),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Returns the zero-based page number.
    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    /// Returns the page size.
    #[must_use]
    pub const fn limit(self) -> u32 {
        self.limit
    }

    /// Returns the row offset for this page.
    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page.
    pub content: Vec<T>,
    /// Zero-based page number.
    pub number: u32,
    /// Requested page size.
    pub page_size: u32,
    /// Total matching items across all pages.
    pub total_elements: u64,
    /// Total number of pages.
    pub total_pages: u64,
    /// Whether this is the last page.
    pub last: bool,
}

impl<T> Page<T> {
    /// Builds a page from its content, the request, and the total count.
    #[must_use]
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let total_pages = total_elements.div_ceil(u64::from(request.limit()));
        Self {
            content,
            number: request.page(),
            page_size: request.limit(),
            total_elements,
            total_pages,
            last: u64::from(request.page()) + 1 >= total_pages,
        }
    }

    /// Maps page content while keeping paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            last: self.last,
        }
    }

    /// Maps page content with a fallible function.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        let content = self.content.into_iter().map(f).collect::<Result<Vec<_>, E>>()?;
        Ok(Page {
            content,
            number: self.number,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            last: self.last,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
