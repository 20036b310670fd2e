//! Source text locators
//!
//! The source document arrives as one flat string plus a list of
//! `(start, end, page)` character spans. Windowing slices it by page range;
//! the core merger maps character offsets back to page numbers for
//! provenance.

use serde::{Deserialize, Serialize};

/// Character span of one page within the full source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpan {
    /// Inclusive start offset
    pub start: usize,
    /// Exclusive end offset
    pub end: usize,
    /// 1-based page number
    pub page: usize,
}

/// Page containing a character offset, via binary search over spans sorted
/// by start offset.
pub fn page_for_offset(spans: &[PageSpan], offset: usize) -> Option<usize> {
    let idx = spans.partition_point(|s| s.start <= offset);
    if idx == 0 {
        return None;
    }
    let span = &spans[idx - 1];
    (offset < span.end).then_some(span.page)
}
