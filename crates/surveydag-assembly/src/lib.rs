//! surveydag Assembly Layer
//!
//! The graph assembly and repair pipeline: the algorithms that take noisy,
//! partially-overlapping, multi-pass extraction results and deterministically
//! reduce, repair, merge, and normalize them into one schema-consistent DAG.
//!
//! # Stages
//!
//! - [`reduce`]: union per-window candidate documents (first-occurrence wins)
//! - [`lossless`]: merge duplicate question records without information loss
//! - [`repair`]: canonicalize terminals, heal or drop dangling edge endpoints
//! - [`fallback`]: inject a linear chain when discovered routing is too sparse
//! - [`normalize`]: predicate id canonicalization and the schema-lossless
//!   rewrite with its recovery sidecar
//! - [`merge`]: join repaired structure with merged content into the final
//!   document
//!
//! # Contract
//!
//! Every function in this crate is total: malformed or empty input degrades
//! to a no-op (recorded in the repair report where one exists), never a
//! panic or an error. The pipeline's only hard-fail point is strict schema
//! validation, which lives in `surveydag-qc`.

#![warn(missing_docs)]

pub mod fallback;
pub mod lossless;
pub mod merge;
pub mod normalize;
pub mod reduce;
pub mod repair;

pub use fallback::{apply_sequential_fallback, needs_sequential_fallback};
pub use lossless::merge_content_nodes;
pub use merge::merge_to_core;
pub use normalize::{coerce_to_schema_lossless, normalize_predicates};
pub use reduce::{reduce_content_chunks, reduce_structure_chunks};
pub use repair::repair_structure_with_content;
