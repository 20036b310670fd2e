//! Document shapes - the pipeline's intermediate and final artifacts
//!
//! Three documents flow through the pipeline:
//!
//! - the **structure** document (`survey_dag_structure`): routing skeleton
//!   per window, later unioned and repaired;
//! - the **content** document (`survey_content`): question records per
//!   pass, later merged losslessly;
//! - the **final** document (`survey_dag`): the schema-validated artifact.
//!
//! Every field that extraction output may omit carries a serde default so
//! malformed chunks coerce instead of failing deserialization.

use crate::ast::Complexity;
use crate::edge::{EdgeKind, EdgeSubkind, StructureEdge};
use crate::node::{NodeKind, ResponseOption, ResponseType, StructureNode};
use crate::predicate::PredicateDef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Wrapper for the structure document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureDoc {
    /// The routing skeleton
    #[serde(default)]
    pub survey_dag_structure: Structure,
}

/// Routing skeleton: nodes, edges, and the predicate map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    /// Survey identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Structure document version
    #[serde(default)]
    pub version: Option<String>,
    /// Start node id (single entry point)
    #[serde(default)]
    pub start: Option<String>,
    /// Terminal node ids; canonicalized to one during repair
    #[serde(default)]
    pub terminals: Vec<String>,
    /// Nodes in document order
    #[serde(default)]
    pub nodes: Vec<StructureNode>,
    /// Edges; duplicates are tolerated until merge
    #[serde(default)]
    pub edges: Vec<StructureEdge>,
    /// Predicate bodies keyed by id
    #[serde(default)]
    pub predicates: BTreeMap<String, PredicateDef>,
}

impl Structure {
    /// Set of node ids present.
    pub fn node_id_set(&self) -> BTreeSet<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }
}

/// Wrapper for the content document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentDoc {
    /// Question content records
    #[serde(default)]
    pub survey_content: SurveyContent,
}

/// The content document body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyContent {
    /// Question records, one per question id after merge
    #[serde(default)]
    pub nodes: Vec<ContentNode>,
}

impl ContentDoc {
    /// Set of question ids with content. Used as repair evidence: an edge
    /// endpoint missing from the structure is only stubbed when its id
    /// appears here.
    pub fn id_set(&self) -> BTreeSet<String> {
        self.survey_content
            .nodes
            .iter()
            .filter(|n| !n.id.is_empty())
            .map(|n| n.id.clone())
            .collect()
    }
}

/// A single question's extracted content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    /// Printed survey id
    #[serde(default)]
    pub id: String,
    /// Question stem, verbatim
    #[serde(default)]
    pub text: String,
    /// Response domain kind
    #[serde(default)]
    pub response_type: Option<ResponseType>,
    /// Response options (rich or pre-flattened)
    #[serde(default)]
    pub response_options: Option<Vec<ResponseOption>>,
    /// Display condition, verbatim
    #[serde(default)]
    pub universe: Option<String>,
    /// Parsed display condition
    #[serde(default)]
    pub universe_ast: Option<Value>,
    /// Source locators (page, extraction method, safety-net markers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<BTreeMap<String, Value>>,
}

/// Wrapper for the final, schema-validated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalDoc {
    /// The assembled survey DAG
    pub survey_dag: SurveyDag,
}

/// Top-level body of the final document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyDag {
    /// Build and identity metadata
    pub metadata: Metadata,
    /// The graph itself
    pub graph: CoreGraph,
    /// Predicate map referenced by edges
    #[serde(default)]
    pub predicates: BTreeMap<String, CorePredicate>,
    /// Validation block, filled after QC
    #[serde(default)]
    pub validation: Validation,
    /// Analysis block, reserved for downstream consumers
    #[serde(default)]
    pub analysis: Value,
}

/// Identity and build metadata of a final document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Survey identifier
    #[serde(default)]
    pub id: String,
    /// Human-readable title, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Document version
    #[serde(default)]
    pub version: String,
    /// How this document was produced
    #[serde(default)]
    pub build: BuildInfo,
}

/// Provenance of the extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Version of the extractor that produced this document
    #[serde(default)]
    pub extractor_version: String,
    /// UTC timestamp of extraction
    #[serde(default)]
    pub extracted_at: String,
    /// Extraction method tag
    #[serde(default)]
    pub method: String,
    /// Source document format
    #[serde(default)]
    pub source_format: String,
    /// Run identifier
    #[serde(default)]
    pub run_id: String,
    /// Whether strict schema validation passed
    #[serde(default)]
    pub validation_passed: bool,
}

/// The final graph: start, terminals, nodes, edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreGraph {
    /// Single entry node id
    #[serde(default)]
    pub start: String,
    /// Terminal node ids
    #[serde(default)]
    pub terminals: Vec<String>,
    /// Nodes in traversal order (`order_index` ascending)
    #[serde(default)]
    pub nodes: Vec<CoreNode>,
    /// Edges with generated ids
    #[serde(default)]
    pub edges: Vec<CoreEdge>,
}

impl CoreGraph {
    /// Set of node ids present.
    pub fn node_id_set(&self) -> BTreeSet<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }
}

/// A node in the final document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreNode {
    /// Node id
    pub id: String,
    /// Node kind
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    /// Position in structure order
    #[serde(default)]
    pub order_index: usize,
    /// Section label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    /// Response domain (kind + flat values)
    #[serde(default)]
    pub domain: DomainSpec,
    /// Rich response options carried through merge; flattened away (with a
    /// sidecar) by schema-lossless normalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_options: Option<Vec<ResponseOption>>,
    /// Question metadata
    #[serde(default)]
    pub metadata: NodeMetadata,
    /// Free-form annotations, e.g. `labels: 1=Yes; 2=No`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
    /// Source provenance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl CoreNode {
    /// Minimal terminal node appended when the canonical terminal is
    /// missing from the merged node list.
    pub fn terminal(id: impl Into<String>, order_index: usize) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Terminal,
            order_index,
            block: None,
            domain: DomainSpec::default(),
            response_options: None,
            metadata: NodeMetadata::default(),
            annotations: Vec::new(),
            provenance: None,
        }
    }
}

/// Response domain in the final document; `values` are schema primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSpec {
    /// Domain kind
    pub kind: ResponseType,
    /// Flat value list (numbers/strings only)
    #[serde(default)]
    pub values: Vec<Value>,
}

impl Default for DomainSpec {
    fn default() -> Self {
        Self { kind: ResponseType::Text, values: Vec::new() }
    }
}

/// Question metadata in the final document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Question stem, verbatim
    #[serde(default)]
    pub text: String,
    /// Whether an answer is required
    #[serde(default)]
    pub required: bool,
}

/// Source provenance of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Extraction method tag
    #[serde(default)]
    pub method: String,
    /// Source locators
    #[serde(default)]
    pub locators: Vec<Locator>,
}

/// A single source locator, e.g. `{type: "page", value: "12"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Locator {
    /// Locator type
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Locator value
    #[serde(default)]
    pub value: String,
}

/// An edge in the final document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreEdge {
    /// Generated edge id, `E_<10-digit ordinal>`
    pub id: String,
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    /// Guarding predicate id
    pub predicate: String,
    /// Edge classification
    pub kind: EdgeKind,
    /// Finer classification
    pub subkind: EdgeSubkind,
    /// Tie-break among simultaneous outgoing edges; lower wins
    #[serde(default)]
    pub priority: i64,
}

/// A predicate in the final document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorePredicate {
    /// Nested-list expression tree
    pub ast: Value,
    /// Printed condition text
    #[serde(default)]
    pub text: String,
    /// Node ids referenced by the AST
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Derived classification
    pub complexity: Complexity,
}

/// Validation block of the final document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    /// `PASS` or `FAIL`
    #[serde(default)]
    pub status: String,
    /// Issue records from QC
    #[serde(default)]
    pub issues: Vec<Value>,
    /// Named gate outcomes
    #[serde(default)]
    pub gates: BTreeMap<String, Value>,
}

impl Default for Validation {
    fn default() -> Self {
        Self {
            status: "FAIL".to_string(),
            issues: Vec::new(),
            gates: BTreeMap::new(),
        }
    }
}
