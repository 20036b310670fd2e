//! Prompt construction for extraction tasks
//!
//! Each oracle task carries its own instruction block and a small few-shot
//! example set. Prompts ask for a JSON array of records tagged by class so
//! the response parser stays uniform across tasks.

use serde_json::json;
use surveydag_domain::OracleTask;

const INDEX_TASK: &str = "\
From the provided text window, extract ONLY question index records.
Each record must copy verbatim the question ID and the first 8-12 words of the stem.
Emit records with class \"question_index\" and attributes {id, short_text, page_guess}.
Rules:
- \"id\" must be the printed survey id (e.g., NDX4_2).
- \"short_text\" must be a verbatim substring from the window (no paraphrase).
- \"page_guess\" = the starting page number of this window (given).
- No content/options. No edges/predicates.";

const CONTENT_TASK: &str = "\
Extract the FULL CONTENT for exactly ONE question with id={target_id}.
Emit ONE record with class \"question_content\" and attributes
{id, text, response_type, response_options?}.
Rules:
- Copy \"id\" and the stem \"text\" verbatim from the window.
- response_type is one of enum, set, text, number, boolean.
- For enum/set: codes must be contiguous 1..N; copy option labels verbatim.
- Emit nothing if {target_id} is not present in this window.";

const SKIP_TASK: &str = "\
From the provided text window, extract ONLY explicit skip/branch logic
printed in the survey (e.g., \"If No, skip to Q8\").
Emit records:
- class \"structure_edge\" with attributes {source, target, predicate}
- class \"structure_predicate\" with attributes {id, expr, ast, depends_on}
Rules:
- Copy any printed cue verbatim into the record text, otherwise leave it empty.
- Use P_TRUE for unconditional flows ONLY if the flow is explicitly printed.
- Predicates must use the survey ids and primitive AST: [\"==\",\"Q5\",2].
- Do not invent edges; only what is printed in the window.";

/// Render the instruction + few-shot + window prompt for a task.
pub fn build_prompt(task: &OracleTask, window_text: &str) -> String {
    let (instructions, examples) = match task {
        OracleTask::QuestionIndex { page_start } => (
            format!("{INDEX_TASK}\n<context>page_start={page_start}</context>"),
            json!([{
                "class": "question_index",
                "text": "NDX4_2. Number displaced: Children",
                "attributes": {"id": "NDX4_2", "short_text": "NDX4_2. Number displaced: Children", "page_guess": 10}
            }]),
        ),
        OracleTask::QuestionContent { target_id } => (
            CONTENT_TASK.replace("{target_id}", target_id),
            json!([{
                "class": "question_content",
                "text": "NDX4_2. Number displaced: Children",
                "attributes": {
                    "id": "NDX4_2",
                    "text": "NDX4_2. Number displaced: Children",
                    "response_type": "enum",
                    "response_options": [
                        {"code": 1, "text": "None"},
                        {"code": 2, "text": "One"},
                        {"code": 3, "text": "Two or more"}
                    ]
                }
            }]),
        ),
        OracleTask::SkipLogic => (
            SKIP_TASK.to_string(),
            json!([
                {
                    "class": "structure_edge",
                    "text": "If No, skip to Q15.",
                    "attributes": {"source": "Q12", "target": "Q15", "predicate": "P_Q12_EQ_2"}
                },
                {
                    "class": "structure_predicate",
                    "text": "Q12 == No",
                    "attributes": {"id": "P_Q12_EQ_2", "expr": "Q12 == No", "ast": ["==", "Q12", 2], "depends_on": ["Q12"]}
                }
            ]),
        ),
    };

    format!(
        "<task>\n{instructions}\n</task>\n<examples>\n{}\n</examples>\n<window>\n{window_text}\n</window>\n\
         Return ONLY a JSON array of records.",
        serde_json::to_string_pretty(&examples).unwrap_or_default()
    )
}
