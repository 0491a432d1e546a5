//! Pagination parameters and the page envelope returned by list operations.

use serde::{Deserialize, Serialize};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Hard upper bound on the page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// Offset/limit pagination request.
///
/// Raw values come straight from query strings, so they are normalized
/// before use: a missing or zero limit becomes [`DEFAULT_PAGE_SIZE`], a limit
/// above [`MAX_PAGE_SIZE`] is clamped, and a missing offset becomes zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    /// Requested page size.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Number of items to skip.
    #[serde(default)]
    pub offset: Option<usize>,
}

/// Pagination after normalization; always within bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page size in `1..=MAX_PAGE_SIZE`.
    pub limit: usize,
    /// Items to skip.
    pub offset: usize,
}

impl Pagination {
    /// Create a pagination request from raw values.
    #[must_use]
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self { limit, offset }
    }

    /// Clamp into a [`PageRequest`].
    #[must_use]
    pub fn normalize(self) -> PageRequest {
        let limit = match self.limit {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(n) => n.min(MAX_PAGE_SIZE),
        };
        PageRequest {
            limit,
            offset: self.offset.unwrap_or(0),
        }
    }
}

impl PageRequest {
    /// Slice a fully materialized, already ordered collection into a page.
    #[must_use]
    pub fn apply<T>(self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();
        Page { items, total }
    }
}

/// One page of results plus the total number of matching items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Total matching items across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// An empty page.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }

    /// Map every item, keeping the total.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(None, DEFAULT_PAGE_SIZE)]
    #[case(Some(0), DEFAULT_PAGE_SIZE)]
    #[case(Some(5), 5)]
    #[case(Some(100), 100)]
    #[case(Some(101), MAX_PAGE_SIZE)]
    #[case(Some(usize::MAX), MAX_PAGE_SIZE)]
    fn limit_is_bounded(#[case] raw: Option<usize>, #[case] expected: usize) {
        assert_eq!(Pagination::new(raw, None).normalize().limit, expected);
    }

    #[test]
    fn missing_offset_is_zero() {
        assert_eq!(Pagination::default().normalize().offset, 0);
    }

    #[test]
    fn apply_reports_true_total() {
        let req = Pagination::new(Some(2), Some(1)).normalize();
        let page = req.apply(vec![1, 2, 3, 4, 5]);
        assert_eq!(page.items, vec![2, 3]);
        assert_eq!(page.total, 5);
    }

    #[test]
    fn apply_past_end_is_empty_with_total() {
        let req = Pagination::new(Some(10), Some(50)).normalize();
        let page = req.apply(vec!['a', 'b']);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 2);
    }

    #[test]
    fn map_keeps_total() {
        let page = Page {
            items: vec![1, 2],
            total: 9,
        }
        .map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total, 9);
    }
}
