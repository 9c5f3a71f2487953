//! Shared offset pagination helpers.

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Normalized page/limit pair taken from request query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Clamp raw query values into a valid request. Page numbers start at 1.
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn with_default_size(page: Option<u32>, per_page: Option<u32>, default: u32) -> Self {
        Self::new(page, per_page.or(Some(default.clamp(1, MAX_PAGE_SIZE))))
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the totals clients need to render pagination.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub total_pages: u64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn assemble(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let per_page = u64::from(request.per_page());
        let total_pages = total.div_ceil(per_page);
        Self {
            items,
            total,
            total_pages,
            page: request.page(),
            per_page: request.per_page(),
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self::assemble(Vec::new(), 0, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_defaults_and_clamps() {
        let request = PageRequest::new(None, None);
        assert_eq!(request.page(), 1);
        assert_eq!(request.per_page(), DEFAULT_PAGE_SIZE);

        let request = PageRequest::new(Some(0), Some(0));
        assert_eq!(request.page(), 1);
        assert_eq!(request.per_page(), 1);

        let request = PageRequest::new(Some(3), Some(1000));
        assert_eq!(request.page(), 3);
        assert_eq!(request.per_page(), MAX_PAGE_SIZE);
    }

    #[test]
    fn offset_reflects_page_number() {
        let request = PageRequest::new(Some(4), Some(10));
        assert_eq!(request.offset(), 30);
        assert_eq!(request.limit(), 10);
    }

    #[test]
    fn assemble_computes_total_pages() {
        let request = PageRequest::new(Some(1), Some(10));
        let page = Page::assemble(vec![1, 2, 3], 31, request);
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.total, 31);

        let empty: Page<i32> = Page::empty(request);
        assert_eq!(empty.total_pages, 0);
        assert!(empty.items.is_empty());
    }
}
