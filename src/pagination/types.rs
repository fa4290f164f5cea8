//! Pagination types

/// Progress of one traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
    /// Offset of the next page to request
    pub offset: u32,
    /// Page size sent with every request
    pub per_page: u32,
    /// Pages fetched so far
    pub pages: u32,
    /// Total records fetched so far
    pub total_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create state starting at `offset`
    pub fn new(offset: u32, per_page: u32) -> Self {
        Self {
            offset,
            per_page,
            ..Default::default()
        }
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Record a fetched page of `count` records
    pub fn add_page(&mut self, count: usize) {
        self.pages += 1;
        self.total_fetched += count as u64;
    }

    /// Move to the next page; false when the next offset does not fit in `u32`
    pub fn advance(&mut self) -> bool {
        match self.offset.checked_add(self.per_page) {
            Some(next) => {
                self.offset = next;
                true
            }
            None => false,
        }
    }
}
