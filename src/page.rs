use tracing::trace;

use crate::domain::{DEFAULT_PAGE_SIZE, ViewError};

/// Page size and 1-based current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    page_size: usize,
    current_page: usize,
}

impl Default for PageSpec {
    fn default() -> Self {
        PageSpec {
            page_size: DEFAULT_PAGE_SIZE,
            current_page: 1,
        }
    }
}

impl PageSpec {
    pub fn new(page_size: usize) -> Result<Self, ViewError> {
        if page_size == 0 {
            return Err(ViewError::InvalidPageSize);
        }
        Ok(PageSpec {
            page_size,
            current_page: 1,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Never less than one, even for an empty row set.
    pub fn total_pages(&self, total_rows: usize) -> usize {
        total_rows.div_ceil(self.page_size).max(1)
    }

    /// Pulls the current page back into `[1, total_pages]`. Returns true when
    /// the page moved.
    pub fn clamp(&mut self, total_rows: usize) -> bool {
        let clamped = self.current_page.clamp(1, self.total_pages(total_rows));
        if clamped != self.current_page {
            trace!("Clamping page {} -> {clamped}", self.current_page);
            self.current_page = clamped;
            return true;
        }
        false
    }

    pub fn go_to(&mut self, page: usize, total_rows: usize) {
        self.current_page = page;
        self.clamp(total_rows);
    }

    pub fn has_next(&self, total_rows: usize) -> bool {
        self.current_page < self.total_pages(total_rows)
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn next(&mut self, total_rows: usize) -> bool {
        if self.has_next(total_rows) {
            self.current_page += 1;
            return true;
        }
        false
    }

    pub fn previous(&mut self) -> bool {
        if self.has_previous() {
            self.current_page -= 1;
            return true;
        }
        false
    }

    pub fn first(&mut self) {
        self.current_page = 1;
    }

    pub fn last(&mut self, total_rows: usize) {
        self.current_page = self.total_pages(total_rows);
    }

    /// Changes the page size keeping the first row of the current page on
    /// screen.
    pub fn set_page_size(&mut self, page_size: usize, total_rows: usize) -> Result<(), ViewError> {
        if page_size == 0 {
            return Err(ViewError::InvalidPageSize);
        }
        let first_row = (self.current_page - 1) * self.page_size;
        self.page_size = page_size;
        self.current_page = first_row / page_size + 1;
        self.clamp(total_rows);
        Ok(())
    }
}

/// One page worth of rows. Indices are zero-based and half-open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub rows: Vec<usize>,
    pub current: usize,
    pub total_pages: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Slices out the current page. An out-of-range page is read as the nearest
/// valid page without modifying `spec`.
pub fn paginate(rows: &[usize], spec: &PageSpec) -> Page {
    let mut spec = *spec;
    spec.clamp(rows.len());

    let start_index = ((spec.current_page - 1) * spec.page_size).min(rows.len());
    let end_index = (start_index + spec.page_size).min(rows.len());
    Page {
        rows: rows[start_index..end_index].to_vec(),
        current: spec.current_page,
        total_pages: spec.total_pages(rows.len()),
        start_index,
        end_index,
        has_next: spec.has_next(rows.len()),
        has_previous: spec.has_previous(),
    }
}
