//! Node shapes - questions, junctions, and terminals

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a node in the survey flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// An answerable survey question
    Question,
    /// A routing-only point with no response
    Junction,
    /// An exit point of the survey
    Terminal,
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::Question
    }
}

/// Response domain of a question.
///
/// Richness ordering (used by the mergers when two candidates disagree):
/// enum > set > number/boolean > text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Single choice from coded options
    Enum,
    /// Multiple choice from coded options
    Set,
    /// Free text
    Text,
    /// Numeric entry
    Number,
    /// Yes/no entry
    Boolean,
}

impl ResponseType {
    /// Richness rank; higher is richer. Used to pick between competing
    /// candidates for the same question across extraction passes.
    pub fn richness(rt: Option<ResponseType>) -> u8 {
        match rt {
            Some(ResponseType::Enum) | Some(ResponseType::Set) => 3,
            Some(ResponseType::Number) | Some(ResponseType::Boolean) => 2,
            Some(ResponseType::Text) => 1,
            None => 0,
        }
    }
}

/// Option code as printed in the questionnaire. Extraction output carries
/// either an integer or a digit string; both compare equal for dedupe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionCode {
    /// Integer code
    Int(i64),
    /// String code (possibly numeric-looking)
    Str(String),
}

impl OptionCode {
    /// Numeric value when the code is an integer or a digit string.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            OptionCode::Int(n) => Some(*n),
            OptionCode::Str(s) => s.trim().parse::<i64>().ok(),
        }
    }

    /// Stable string key for dedupe.
    pub fn key(&self) -> String {
        match self {
            OptionCode::Int(n) => n.to_string(),
            OptionCode::Str(s) => s.trim().to_string(),
        }
    }
}

/// A single response option as extracted. Either a rich `{code, text}` pair
/// or an already-flat scalar (the strict schema only allows scalars).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseOption {
    /// Rich record with printed code and verbatim label
    Rich {
        /// Printed option code, when present
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<OptionCode>,
        /// Verbatim option label
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    /// Pre-flattened scalar value
    Scalar(Value),
}

impl ResponseOption {
    /// Dedupe key: (code-or-text, lowercased text). Two options collide when
    /// either the code or the label repeats.
    pub fn dedupe_key(&self) -> (String, String) {
        match self {
            ResponseOption::Rich { code, text } => {
                let t = text.clone().unwrap_or_default().trim().to_string();
                let c = code
                    .as_ref()
                    .map(|c| c.key())
                    .filter(|k| !k.is_empty())
                    .unwrap_or_else(|| t.clone());
                (c, t.to_lowercase())
            }
            ResponseOption::Scalar(v) => {
                let t = scalar_text(v);
                (t.clone(), t.to_lowercase())
            }
        }
    }

    /// Flatten to a schema-primitive value plus the rich record (if any)
    /// that a sidecar needs to reconstruct the original.
    ///
    /// Flattening rule: prefer the numeric code when one is present and
    /// numeric-looking, else the verbatim text label.
    pub fn flatten(&self) -> (Value, Option<RichRecord>) {
        match self {
            ResponseOption::Rich { code, text } => {
                let code_value = code.as_ref().map(|c| match c.as_number() {
                    Some(n) => Value::from(n),
                    None => Value::from(c.key()),
                });
                let label = text
                    .clone()
                    .or_else(|| code_value.as_ref().map(scalar_text));
                match (code.as_ref().and_then(|c| c.as_number()), label) {
                    (Some(n), Some(t)) => (
                        Value::from(n),
                        Some(RichRecord { code: code_value, text: t }),
                    ),
                    (None, Some(t)) => (
                        Value::from(t.clone()),
                        Some(RichRecord { code: code_value, text: t }),
                    ),
                    (Some(n), None) => {
                        let cv = Value::from(n);
                        (cv.clone(), Some(RichRecord { code: Some(cv.clone()), text: n.to_string() }))
                    }
                    (None, None) => (Value::Null, None),
                }
            }
            ResponseOption::Scalar(v) => (v.clone(), None),
        }
    }

    /// Numeric code for this option when it carries one.
    pub fn code_number(&self) -> Option<i64> {
        match self {
            ResponseOption::Rich { code, .. } => code.as_ref().and_then(|c| c.as_number()),
            ResponseOption::Scalar(v) => v.as_i64(),
        }
    }
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Rich `{code, text}` record preserved in the sidecar after flattening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichRecord {
    /// Option code as a schema primitive (number or string)
    pub code: Option<Value>,
    /// Verbatim option label
    pub text: String,
}

/// A node as it appears in structure documents (routing skeleton, no
/// question content yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureNode {
    /// Stable printed survey id, e.g. `NDX4_2`
    pub id: String,
    /// Node kind; extraction output that omits it defaults to question
    #[serde(default)]
    pub kind: NodeKind,
    /// Optional grouping label (section name)
    #[serde(default)]
    pub block: Option<String>,
    /// Response type when the structure pass recovered one
    #[serde(default)]
    pub response_type: Option<ResponseType>,
    /// Display condition, verbatim
    #[serde(default)]
    pub universe: Option<String>,
    /// Parsed display condition
    #[serde(default)]
    pub universe_ast: Option<Value>,
}

impl StructureNode {
    /// Minimal placeholder synthesized during repair to satisfy an
    /// edge-endpoint-exists invariant.
    pub fn stub(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Question,
            block: None,
            response_type: None,
            universe: None,
            universe_ast: None,
        }
    }

    /// Stub of a specific kind (terminal/junction synthesis).
    pub fn stub_of_kind(id: impl Into<String>, kind: NodeKind) -> Self {
        let mut node = Self::stub(id);
        node.kind = kind;
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_richness_ordering() {
        assert!(ResponseType::richness(Some(ResponseType::Enum))
            > ResponseType::richness(Some(ResponseType::Number)));
        assert!(ResponseType::richness(Some(ResponseType::Number))
            > ResponseType::richness(Some(ResponseType::Text)));
        assert!(ResponseType::richness(Some(ResponseType::Text)) > ResponseType::richness(None));
        assert_eq!(
            ResponseType::richness(Some(ResponseType::Enum)),
            ResponseType::richness(Some(ResponseType::Set))
        );
    }

    #[test]
    fn test_option_dedupe_key_by_code() {
        let a: ResponseOption = serde_json::from_value(json!({"code": 1, "text": "Yes"})).unwrap();
        let b: ResponseOption = serde_json::from_value(json!({"code": "1", "text": "Yes"})).unwrap();
        assert_eq!(a.dedupe_key(), b.dedupe_key());
    }

    #[test]
    fn test_option_dedupe_key_case_insensitive_text() {
        let a: ResponseOption = serde_json::from_value(json!({"text": "Yes"})).unwrap();
        let b: ResponseOption = serde_json::from_value(json!({"text": "YES"})).unwrap();
        assert_eq!(a.dedupe_key().1, b.dedupe_key().1);
    }

    #[test]
    fn test_flatten_prefers_numeric_code() {
        let opt: ResponseOption = serde_json::from_value(json!({"code": 1, "text": "Yes"})).unwrap();
        let (flat, rich) = opt.flatten();
        assert_eq!(flat, json!(1));
        let rich = rich.unwrap();
        assert_eq!(rich.code, Some(json!(1)));
        assert_eq!(rich.text, "Yes");
    }

    #[test]
    fn test_flatten_falls_back_to_label() {
        let opt: ResponseOption = serde_json::from_value(json!({"text": "Other"})).unwrap();
        let (flat, rich) = opt.flatten();
        assert_eq!(flat, json!("Other"));
        assert_eq!(rich.unwrap().text, "Other");
    }

    #[test]
    fn test_flatten_scalar_passthrough() {
        let opt: ResponseOption = serde_json::from_value(json!(3)).unwrap();
        let (flat, rich) = opt.flatten();
        assert_eq!(flat, json!(3));
        assert!(rich.is_none());
    }

    #[test]
    fn test_structure_node_defaults_to_question() {
        let node: StructureNode = serde_json::from_value(json!({"id": "Q1"})).unwrap();
        assert_eq!(node.kind, NodeKind::Question);
        assert!(node.response_type.is_none());
    }
}
