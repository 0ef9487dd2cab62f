use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i32 = 1;
pub const DEFAULT_PAGE_SIZE: i32 = 10;

/// Normalised list filter. `page >= 1`, `page_size >= 1`, search trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i32,
    pub page_size: i32,
    pub search: String,
}

impl Pagination {
    pub fn new(page: Option<i32>, page_size: Option<i32>, search: Option<String>) -> Self {
        let page = match page {
            Some(p) if p >= 1 => p,
            _ => DEFAULT_PAGE,
        };
        let page_size = match page_size {
            Some(s) if s >= 1 => s,
            _ => DEFAULT_PAGE_SIZE,
        };
        Self {
            page,
            page_size,
            search: search.unwrap_or_default().trim().to_string(),
        }
    }

    pub fn offset(&self) -> usize {
        ((self.page - 1) as usize) * (self.page_size as usize)
    }

    pub fn limit(&self) -> usize {
        self.page_size as usize
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

/// One page of results plus the unpaged total, the shape every list
/// operation returns and every list cache entry stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i32,
    pub page_size: i32,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, total: i64, filter: &Pagination) -> Self {
        Self {
            items,
            total,
            page: filter.page,
            page_size: filter.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let p = Pagination::new(None, None, None);
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, 10);
        assert_eq!(p.search, "");
    }

    #[test]
    fn test_non_positive_values_normalised() {
        let p = Pagination::new(Some(0), Some(-5), Some("  visa ".to_string()));
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, 10);
        assert_eq!(p.search, "visa");
    }

    #[test]
    fn test_offset_and_limit() {
        let p = Pagination::new(Some(3), Some(25), None);
        assert_eq!(p.offset(), 50);
        assert_eq!(p.limit(), 25);
    }
}
