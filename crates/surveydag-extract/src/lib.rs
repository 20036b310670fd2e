//! surveydag Extract Layer
//!
//! Runs the staged extraction pipeline over a paginated source document:
//!
//! ```text
//! source text → windows → index stage → content stage (parallel, per
//! question) → safety pass → skip stage (parallel, per window)
//! ```
//!
//! Each stage fans oracle calls out to a bounded worker pool, re-sorts the
//! results by window or question ordinal, and coerces the untrusted records
//! into the typed candidate documents the assembly layer reduces. Graph
//! assembly itself lives in `surveydag-assembly`; this crate only gets the
//! candidate documents out of the source.

#![warn(missing_docs)]

mod coerce;
mod config;
mod error;
mod pipeline;
mod windows;

pub use coerce::{coerce_content_record, coerce_index_records, coerce_skip_records};
pub use config::ExtractConfig;
pub use error::ExtractError;
pub use pipeline::{ensure_nodes_for_all_index, StageRunner};
pub use windows::{
    chunk_text_by_blocks, chunk_text_by_pages, create_question_slices, paginate, tighten_slice,
    Window,
};
