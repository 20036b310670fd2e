//! surveydag Domain Layer
//!
//! This crate contains the data model shared by every stage of the survey
//! DAG extraction pipeline. It defines the fundamental shapes and the trait
//! interfaces that all other layers depend upon.
//!
//! ## Key Concepts
//!
//! - **Node**: a question, junction, or terminal point in the survey flow
//! - **Edge**: a directed transition guarded by a predicate reference
//! - **Predicate**: a named boolean condition as a nested-list AST
//! - **Structure / Content documents**: the two intermediate artifacts the
//!   reducers union across extraction windows
//! - **Final document**: the schema-validated `survey_dag` artifact
//!
//! ## Architecture
//!
//! Documents are the system's wire format, so everything here derives
//! `Serialize`/`Deserialize`. Infrastructure (oracle calls, assembly
//! algorithms, validation) lives in other crates; this crate only carries
//! shapes, small derivations (AST dependencies, complexity), and the
//! `ExtractionOracle` boundary trait.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod document;
pub mod edge;
pub mod index;
pub mod node;
pub mod predicate;
pub mod report;
pub mod source;
pub mod terminal;
pub mod traits;

// Re-exports for convenience
pub use document::{BuildInfo, ContentDoc, ContentNode, CoreEdge, CoreGraph, CoreNode,
                   CorePredicate, DomainSpec, FinalDoc, Locator, Metadata, NodeMetadata,
                   Provenance, Structure, StructureDoc, SurveyContent, SurveyDag, Validation};
pub use edge::{EdgeKind, EdgeSubkind, StructureEdge};
pub use index::QuestionIndexEntry;
pub use node::{NodeKind, OptionCode, ResponseOption, ResponseType, RichRecord, StructureNode};
pub use predicate::{PredicateDef, P_TRUE};
pub use report::{RepairReport, Sidecar};
pub use source::{page_for_offset, PageSpan};
pub use terminal::{is_terminal_alias, CANON_TERMINAL, TERMINAL_ALIASES};
pub use traits::{ExtractionOracle, ExtractionRecord, OracleRequest, OracleTask};
