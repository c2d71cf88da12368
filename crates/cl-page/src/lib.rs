#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Requested page window: `size` rows per page, 1-based `number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub size: usize,
    pub number: usize,
}

impl PageWindow {
    #[must_use]
    pub fn new(size: usize, number: usize) -> Self {
        Self { size, number }
    }
}

/// One resolved page. `page_number` is the clamped value actually served,
/// which callers feed back into their pager widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: usize,
    pub page_number: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("page size must be at least 1")]
    ZeroPageSize,
}

/// Slice one page out of an ordered collection.
///
/// `total_pages` is at least 1 even for zero items, so "page 1 of 1,
/// 0 items" is representable. Out-of-range page numbers clamp to
/// `[1, total_pages]`: navigating past the end lands on the last page
/// rather than erroring, matching pager-widget behavior. Resetting to
/// page 1 after a filter or sort change is the caller's job; the engine
/// is stateless.
pub fn paginate<T: Clone>(items: &[T], window: PageWindow) -> Result<Page<T>, PageError> {
    if window.size == 0 {
        return Err(PageError::ZeroPageSize);
    }

    let total_pages = items.len().div_ceil(window.size).max(1);
    let page_number = window.number.clamp(1, total_pages);
    let start = (page_number - 1) * window.size;
    let end = (start + window.size).min(items.len());
    let page_items = if start >= items.len() {
        Vec::new()
    } else {
        items[start..end].to_vec()
    };

    Ok(Page {
        items: page_items,
        total_pages,
        page_number,
    })
}
