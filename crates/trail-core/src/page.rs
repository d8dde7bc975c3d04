//! Offset/limit pagination shared by entity and history listings.

use serde::Serialize;

/// Page size used when a request does not specify one.
pub const DEFAULT_PER_PAGE: u32 = 15;

/// Hard upper bound on page size. Requests beyond it are clamped, not
/// rejected.
pub const MAX_PER_PAGE: u32 = 100;

/// A validated page request (1-based page number).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Build a request, clamping `page` to at least 1 and `per_page` to
    /// `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn per_page(self) -> u32 {
        self.per_page
    }

    /// Row offset for the SQL `LIMIT .. OFFSET ..` clause.
    #[must_use]
    pub const fn offset(self) -> u32 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PER_PAGE)
    }
}

/// One page of results plus the totals needed for a pagination envelope.
///
/// `total` is computed under the same WHERE predicate as `data`, so
/// visibility scoping never skews the reported counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.total.div_ceil(u64::from(self.per_page.max(1)))
        }
    }
}
