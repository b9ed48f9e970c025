//! Pagination cursor
//!
//! Page indices are 0-based. The cursor never clamps itself to the data:
//! an index past the last page simply yields an empty slice.

use canopy_core::{CanopyError, Result};
use serde::{Deserialize, Serialize};

/// Page sizes offered by the page-size selector unless configured
pub const DEFAULT_PAGE_SIZE_OPTIONS: [usize; 5] = [10, 20, 30, 40, 50];
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Events emitted when the cursor moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationEvent {
    PageChanged(usize),
    PageSizeChanged(usize),
}

/// Pagination cursor for a grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    /// Current page (0-indexed)
    pub page_index: usize,
    /// Rows per page, always greater than zero
    page_size: usize,
    /// Sizes offered by the selector
    pub page_size_options: Vec<usize>,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
        }
    }
}

impl PaginationState {
    /// Create a cursor on page 0; a zero page size is rejected
    pub fn new(page_size: usize, page_size_options: Vec<usize>) -> Result<Self> {
        if page_size == 0 {
            return Err(CanopyError::InvalidPageSize(page_size));
        }
        Ok(Self {
            page_index: 0,
            page_size,
            page_size_options: page_size_options.into_iter().filter(|s| *s > 0).collect(),
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Index of the first row on the current page
    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }

    /// Half-open row range of the current page, clipped to `total`
    pub fn range(&self, total: usize) -> std::ops::Range<usize> {
        let start = self.offset().min(total);
        let end = start.saturating_add(self.page_size).min(total);
        start..end
    }

    /// Number of pages for `total` rows; zero rows means zero pages
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size)
    }

    /// Page count as shown in "Page X of Y", never below one
    pub fn display_page_count(&self, total: usize) -> usize {
        self.page_count(total).max(1)
    }

    pub fn can_go_prev(&self) -> bool {
        self.page_index > 0
    }

    pub fn can_go_next(&self, total: usize) -> bool {
        self.page_index.saturating_add(1) < self.page_count(total)
    }

    pub fn first(&mut self) -> Option<PaginationEvent> {
        self.go_to_page(0, usize::MAX)
    }

    pub fn prev(&mut self) -> Option<PaginationEvent> {
        if !self.can_go_prev() {
            return None;
        }
        self.page_index -= 1;
        Some(PaginationEvent::PageChanged(self.page_index))
    }

    pub fn next(&mut self, total: usize) -> Option<PaginationEvent> {
        if !self.can_go_next(total) {
            return None;
        }
        self.page_index += 1;
        Some(PaginationEvent::PageChanged(self.page_index))
    }

    pub fn last(&mut self, total: usize) -> Option<PaginationEvent> {
        let last = self.page_count(total).saturating_sub(1);
        self.go_to_page(last, total)
    }

    /// Jump to `page`, clamped to the last page when `total` is known
    /// (`usize::MAX` means unknown)
    pub fn go_to_page(&mut self, page: usize, total: usize) -> Option<PaginationEvent> {
        let page = if total == usize::MAX {
            page
        } else {
            page.min(self.page_count(total).saturating_sub(1))
        };
        if page == self.page_index {
            return None;
        }
        self.page_index = page;
        Some(PaginationEvent::PageChanged(page))
    }

    /// Change the page size and return to the first page
    pub fn set_page_size(&mut self, page_size: usize) -> Result<Option<PaginationEvent>> {
        if page_size == 0 {
            return Err(CanopyError::InvalidPageSize(page_size));
        }
        self.page_index = 0;
        if page_size == self.page_size {
            return Ok(None);
        }
        self.page_size = page_size;
        Ok(Some(PaginationEvent::PageSizeChanged(page_size)))
    }

    /// Whether `page_size` is one of the selector options
    pub fn is_offered(&self, page_size: usize) -> bool {
        self.page_size_options.contains(&page_size)
    }

    /// Selector options including a custom current size
    pub fn selector_options(&self) -> Vec<usize> {
        let mut options = self.page_size_options.clone();
        if !options.contains(&self.page_size) {
            options.push(self.page_size);
            options.sort_unstable();
        }
        options
    }
}
