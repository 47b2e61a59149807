use crate::records::row::RowData;
use serde::Serialize;

/// Output of one pass of the page accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    pub records: Vec<RowData>,
    /// Source bytes committed to this page. The next page starts exactly this
    /// far past the current start offset.
    pub bytes_consumed: u64,
    pub has_next: bool,
}

/// What a page request hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub rows: Vec<RowData>,
    /// Opaque token for the next page; empty on the final page.
    pub next_cursor: String,
    pub reached_end: bool,
    pub row_count: usize,
    pub took_ms: u128,
}

impl FetchResult {
    pub fn has_next(&self) -> bool {
        !self.reached_end
    }
}
