//! Source text windowing and per-question slicing
//!
//! The source arrives as one flat string; form feeds delimit pages. Skip
//! extraction works on fixed-size page windows with overlap, content
//! extraction on a focused slice per question anchored on the indexed stem.

use std::collections::BTreeMap;

use surveydag_domain::source::PageSpan;
use surveydag_domain::QuestionIndexEntry;

/// One bounded slice of source text submitted to the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Zero-based window index, in document order
    pub idx: usize,
    /// First page covered (1-based, inclusive)
    pub start_page: usize,
    /// Last page covered (1-based, inclusive)
    pub end_page: usize,
    /// Window text
    pub text: String,
}

/// Split form-feed delimited text into page spans.
///
/// Each span covers one page's characters, excluding the form feed itself.
/// Empty input yields no spans.
pub fn paginate(full_text: &str) -> Vec<PageSpan> {
    if full_text.is_empty() {
        return Vec::new();
    }
    let mut spans = Vec::new();
    let mut start = 0;
    let mut page = 1;
    for (pos, _) in full_text.match_indices('\u{0c}') {
        spans.push(PageSpan { start, end: pos, page });
        start = pos + 1;
        page += 1;
    }
    if start <= full_text.len() {
        spans.push(PageSpan { start, end: full_text.len(), page });
    }
    spans
}

fn span_map(spans: &[PageSpan]) -> BTreeMap<usize, (usize, usize)> {
    spans.iter().map(|s| (s.page, (s.start, s.end))).collect()
}

fn slice_pages(full_text: &str, spans: &[PageSpan], start_page: usize, end_page: usize) -> String {
    let mp = span_map(spans);
    let s0 = mp.get(&start_page).map(|&(s, _)| s).unwrap_or(0);
    let e1 = mp.get(&end_page).map(|&(_, e)| e).unwrap_or(full_text.len());
    if s0 >= e1 {
        return String::new();
    }
    full_text[s0..e1].to_string()
}

/// Fixed-size page windows with overlap.
///
/// Consecutive windows share `overlap` pages so edges spanning a window
/// boundary are seen at least once in full. With no page spans the entire
/// text becomes a single window.
pub fn chunk_text_by_pages(
    full_text: &str,
    spans: &[PageSpan],
    chunk_size: usize,
    overlap: usize,
) -> Vec<Window> {
    if spans.is_empty() {
        return vec![Window { idx: 0, start_page: 1, end_page: 1, text: full_text.to_string() }];
    }
    let max_page = spans.iter().map(|s| s.page).max().unwrap_or(1);
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);
    let mut windows = Vec::new();
    let mut start = 1;
    let mut idx = 0;
    while start <= max_page {
        let end = (start + chunk_size - 1).min(max_page);
        windows.push(Window {
            idx,
            start_page: start,
            end_page: end,
            text: slice_pages(full_text, spans, start, end),
        });
        idx += 1;
        if end == max_page {
            break;
        }
        start = end - overlap + 1;
    }
    windows
}

/// Block-aware windows from detected content-block page ranges.
///
/// Overlapping or adjacent ranges are merged to reduce redundant calls.
/// With no blocks the entire text becomes a single window.
pub fn chunk_text_by_blocks(
    full_text: &str,
    spans: &[PageSpan],
    blocks: &[(usize, usize)],
) -> Vec<Window> {
    if blocks.is_empty() {
        let max_page = spans.iter().map(|s| s.page).max().unwrap_or(1);
        return vec![Window {
            idx: 0,
            start_page: 1,
            end_page: max_page,
            text: full_text.to_string(),
        }];
    }
    let mut ranges: Vec<(usize, usize)> = blocks.to_vec();
    ranges.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (s, e) in ranges {
        match merged.last_mut() {
            Some((_, pe)) if s <= *pe + 1 => *pe = (*pe).max(e),
            _ => merged.push((s, e)),
        }
    }
    merged
        .into_iter()
        .enumerate()
        .map(|(i, (s, e))| Window {
            idx: i,
            start_page: s,
            end_page: e,
            text: slice_pages(full_text, spans, s, e),
        })
        .collect()
}

fn floor_char(text: &str, mut pos: usize) -> usize {
    pos = pos.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn ceil_char(text: &str, mut pos: usize) -> usize {
    pos = pos.min(text.len());
    while pos < text.len() && !text.is_char_boundary(pos) {
        pos += 1;
    }
    pos
}

fn stem_needle(short_text: &str) -> &str {
    let end = short_text
        .char_indices()
        .nth(50)
        .map(|(i, _)| i)
        .unwrap_or(short_text.len());
    &short_text[..end]
}

/// Build a focused text slice per indexed question.
///
/// Anchors on the first 50 characters of the indexed stem when they occur
/// verbatim in the source; falls back to a page window around the page
/// guess, then to the guessed page alone, then to an empty slice.
pub fn create_question_slices(
    full_text: &str,
    spans: &[PageSpan],
    index: &[QuestionIndexEntry],
) -> BTreeMap<String, String> {
    let mp = span_map(spans);
    let max_page = spans.iter().map(|s| s.page).max().unwrap_or(0);
    let mut slices = BTreeMap::new();

    for q in index {
        if !q.short_text.is_empty() {
            let needle = stem_needle(&q.short_text);
            if !needle.is_empty() {
                if let Some(pos) = full_text.find(needle) {
                    let start = floor_char(full_text, pos.saturating_sub(1500));
                    let end = ceil_char(full_text, pos + 3000);
                    slices.insert(q.id.clone(), full_text[start..end].to_string());
                    continue;
                }
            }
        }

        // Page fallback: guessed page plus two pages of lookahead, with one
        // page of lead-in when available
        let end_page = (q.page_guess + 2).min(max_page);
        let slice = match (mp.get(&q.page_guess), mp.get(&end_page)) {
            (Some(&(mut start, _)), Some(&(_, end))) => {
                if q.page_guess > 1 {
                    if let Some(&(buffer_start, _)) = mp.get(&(q.page_guess - 1)) {
                        start = buffer_start;
                    }
                }
                full_text[start..end].to_string()
            }
            _ => match mp.get(&q.page_guess) {
                Some(&(start, end)) => full_text[start..end].to_string(),
                None => String::new(),
            },
        };
        slices.insert(q.id.clone(), slice);
    }
    slices
}

/// Center a slice around a reliable anchor to cut prompt size.
///
/// Anchor priority: indexed stem prefix, then the question id, then the
/// front of the slice clamped to `before + after` characters.
pub fn tighten_slice(
    slice_text: &str,
    qid: &str,
    short_text: &str,
    before: usize,
    after: usize,
) -> String {
    if slice_text.is_empty() {
        return String::new();
    }
    let mut anchor = None;
    if !short_text.is_empty() {
        anchor = slice_text.find(stem_needle(short_text));
    }
    if anchor.is_none() && !qid.is_empty() {
        anchor = slice_text.find(qid);
    }
    let Some(anchor) = anchor else {
        let max_len = ceil_char(slice_text, before + after);
        return slice_text[..max_len].to_string();
    };
    let start = floor_char(slice_text, anchor.saturating_sub(before));
    let end = ceil_char(slice_text, anchor + after);
    slice_text[start..end].to_string()
}
