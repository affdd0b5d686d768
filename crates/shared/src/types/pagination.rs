//! Pagination types for list queries.
//!
//! Two flavours are offered: a counted `PageResponse` (total known) and an
//! uncounted `Slice` that only knows whether another page exists, obtained by
//! fetching one row more than requested.

use serde::{Deserialize, Serialize};

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Number of items per page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageRequest {
    /// Creates a page request.
    #[must_use]
    pub const fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) as usize * self.per_page as usize
    }

    /// Maximum number of rows to return.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.per_page as usize
    }

    /// Returns true for the first page.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.page <= 1
    }

    /// Clamps `per_page` into `1..=max` and `page` to at least 1.
    #[must_use]
    pub fn clamped(self, max: u32) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, max.max(1)),
        }
    }

    /// Cuts a page out of an already ordered sequence.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset())
            .take(self.limit())
            .collect()
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub meta: PageMeta,
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items across all pages.
    pub total: u64,
    /// Total number of pages.
    pub total_pages: u32,
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub fn new(data: Vec<T>, request: PageRequest, total: u64) -> Self {
        let per_page = u64::from(request.per_page.max(1));
        let total_pages = if total == 0 {
            1
        } else {
            u32::try_from(total.div_ceil(per_page)).unwrap_or(u32::MAX)
        };

        Self {
            data,
            meta: PageMeta {
                page: request.page,
                per_page: request.per_page,
                total,
                total_pages,
            },
        }
    }

    /// Returns true if the page is the first one.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.meta.page <= 1
    }

    /// Maps the items, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

/// A page whose total is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice<T> {
    /// The items in the current page.
    pub data: Vec<T>,
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Whether at least one more item exists after this page.
    pub has_next: bool,
}

impl<T> Slice<T> {
    /// Builds a slice from up to `per_page + 1` rows fetched after the offset.
    #[must_use]
    pub fn from_probe(mut rows: Vec<T>, request: PageRequest) -> Self {
        let has_next = rows.len() > request.limit();
        rows.truncate(request.limit());
        Self {
            data: rows,
            page: request.page,
            per_page: request.per_page,
            has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_offset_and_limit() {
        assert_eq!(PageRequest::new(1, 20).offset(), 0);
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
        assert_eq!(PageRequest::new(0, 20).offset(), 0);
        assert_eq!(PageRequest::new(2, 50).limit(), 50);
    }

    #[test]
    fn test_clamped() {
        let request = PageRequest::new(0, 10_000).clamped(500);
        assert_eq!(request, PageRequest::new(1, 500));
        assert_eq!(PageRequest::new(2, 0).clamped(500).per_page, 1);
    }

    #[test]
    fn test_page_response_total_pages() {
        let response: PageResponse<i32> = PageResponse::new(vec![], PageRequest::new(1, 10), 25);
        assert_eq!(response.meta.total_pages, 3);

        let response: PageResponse<i32> = PageResponse::new(vec![], PageRequest::new(1, 10), 0);
        assert_eq!(response.meta.total_pages, 1);
    }

    #[test]
    fn test_slice_detects_next_page() {
        let request = PageRequest::new(1, 2);
        let slice = Slice::from_probe(vec![1, 2, 3], request);
        assert_eq!(slice.data, vec![1, 2]);
        assert!(slice.has_next);

        let slice = Slice::from_probe(vec![1, 2], request);
        assert!(!slice.has_next);
    }

    #[test]
    fn test_apply_cuts_page() {
        let page = PageRequest::new(2, 3).apply(1..=8);
        assert_eq!(page, vec![4, 5, 6]);
    }
}
