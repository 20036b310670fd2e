//! Staged extraction pipeline
//!
//! Three oracle-backed stages run over the windowed source: a cheap index
//! pass, a parallel per-question content pass, and a skip-logic pass per
//! window. Each stage is a barrier: reduction never starts until every
//! call for the stage has returned or failed. Results are keyed by window
//! or index ordinal and re-sorted before use, so completion order of
//! concurrent calls cannot leak into the output.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;
use surveydag_domain::source::PageSpan;
use surveydag_domain::{
    ContentDoc, ContentNode, ExtractionOracle, OracleRequest, OracleTask, QuestionIndexEntry,
    ResponseType, Structure, StructureDoc, StructureNode, SurveyContent, CANON_TERMINAL,
};
use surveydag_oracle::retry::with_retries;
use surveydag_oracle::{OracleError, RateLimiter, RetryPolicy};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::coerce::{coerce_content_record, coerce_index_records, coerce_skip_records};
use crate::config::ExtractConfig;
use crate::error::ExtractError;
use crate::windows::{create_question_slices, tighten_slice, Window};

// Tight context for safety-net placeholders; these slices never reach the
// oracle, they only seed placeholder text.
const SAFETY_BEFORE: usize = 500;
const SAFETY_AFTER: usize = 1400;

/// Runs the oracle-backed stages of the extraction pipeline.
///
/// The oracle call is synchronous (it may sleep inside the rate limiter),
/// so every call is bridged onto the blocking pool; stage concurrency is
/// bounded by the configured worker counts.
pub struct StageRunner<O> {
    oracle: Arc<O>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    config: ExtractConfig,
}

impl<O> StageRunner<O>
where
    O: ExtractionOracle<Error = OracleError> + Send + Sync + 'static,
{
    /// Create a runner over an oracle with the given limiter and policy.
    pub fn new(
        oracle: O,
        limiter: RateLimiter,
        retry: RetryPolicy,
        config: ExtractConfig,
    ) -> Result<Self, ExtractError> {
        config.validate().map_err(ExtractError::Config)?;
        Ok(Self {
            oracle: Arc::new(oracle),
            limiter: Arc::new(limiter),
            retry,
            config,
        })
    }

    fn call_blocking(
        &self,
        request: OracleRequest,
    ) -> tokio::task::JoinHandle<Result<Vec<surveydag_domain::ExtractionRecord>, OracleError>> {
        let oracle = Arc::clone(&self.oracle);
        let limiter = Arc::clone(&self.limiter);
        let retry = self.retry;
        tokio::task::spawn_blocking(move || {
            with_retries(&limiter, &retry, || oracle.extract(&request))
        })
    }

    /// Stage 1: index question ids, short stems, and coarse pages.
    ///
    /// Windows are processed sequentially; the stage is cheap and its
    /// output seeds everything downstream. The union across windows is
    /// deduped by id, first-seen after a stable sort by (page guess, id).
    pub async fn index_stage(
        &self,
        windows: &[Window],
    ) -> Result<Vec<QuestionIndexEntry>, ExtractError> {
        let mut items = Vec::new();
        for w in windows {
            info!(window = w.idx, start_page = w.start_page, end_page = w.end_page, "indexing window");
            let request = OracleRequest {
                text: w.text.clone(),
                task: OracleTask::QuestionIndex { page_start: w.start_page },
            };
            let records = self.call_blocking(request).await??;
            items.extend(coerce_index_records(&records, w.start_page));
        }
        let ordered = dedupe_index(items);
        info!(questions = ordered.len(), "index stage complete");
        Ok(ordered)
    }

    /// Stage 2: extract full content for every indexed question, in
    /// parallel, one tightened slice per question.
    ///
    /// A question whose slice is too short to be worth a call, or whose
    /// call fails or returns nothing usable, degrades to a placeholder
    /// node rather than being dropped. The returned document has exactly
    /// one node per indexed question, in index order.
    pub async fn content_stage(
        &self,
        index: &[QuestionIndexEntry],
        full_text: &str,
        spans: &[PageSpan],
    ) -> Result<ContentDoc, ExtractError> {
        let slices = create_question_slices(full_text, spans, index);
        let sem = Arc::new(Semaphore::new(self.config.content_workers));
        let mut tasks: JoinSet<Result<(usize, ContentNode), ExtractError>> = JoinSet::new();

        for (ordinal, q) in index.iter().enumerate() {
            let entry = q.clone();
            let slice = slices.get(&q.id).cloned().unwrap_or_default();
            if slice.trim().len() < self.config.min_slice_chars {
                debug!(question = %q.id, "slice too short, skipping oracle call");
                tasks.spawn(async move { Ok((ordinal, placeholder_node(&entry))) });
                continue;
            }
            let tight = tighten_slice(
                &slice,
                &q.id,
                &q.short_text,
                self.config.slice_before,
                self.config.slice_after,
            );
            let oracle = Arc::clone(&self.oracle);
            let limiter = Arc::clone(&self.limiter);
            let retry = self.retry;
            let sem = Arc::clone(&sem);
            tasks.spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| ExtractError::TaskJoin(e.to_string()))?;
                let request = OracleRequest {
                    text: tight,
                    task: OracleTask::QuestionContent { target_id: entry.id.clone() },
                };
                let outcome = tokio::task::spawn_blocking(move || {
                    with_retries(&limiter, &retry, || oracle.extract(&request))
                })
                .await?;
                let node = match outcome {
                    Ok(records) => coerce_content_record(&records, &entry.id)
                        .unwrap_or_else(|| placeholder_node(&entry)),
                    Err(err) => {
                        warn!(question = %entry.id, error = %err, "content extraction failed, degrading to placeholder");
                        placeholder_node(&entry)
                    }
                };
                Ok((ordinal, node))
            });
        }

        let mut by_ordinal = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (ordinal, node) = joined??;
            by_ordinal.insert(ordinal, node);
        }

        let nodes = by_ordinal.into_values().collect();
        let nodes = ensure_nodes_for_all_index(index, nodes, full_text, spans);
        info!(nodes = nodes.len(), "content stage complete");
        Ok(ContentDoc { survey_content: SurveyContent { nodes } })
    }

    /// Stage 3: extract explicit skip/branch logic per window.
    ///
    /// Each window's edges and predicates are wrapped into a candidate
    /// structure document sharing the indexed node list, ready for chunk
    /// reduction. Results are keyed by window index and returned in
    /// document order regardless of completion order.
    pub async fn skip_stage(
        &self,
        windows: &[Window],
        index: &[QuestionIndexEntry],
    ) -> Result<Vec<(usize, StructureDoc)>, ExtractError> {
        let question_nodes: Vec<StructureNode> =
            index.iter().map(|q| StructureNode::stub(q.id.as_str())).collect();
        let start = index.first().map(|q| q.id.clone());
        let sem = Arc::new(Semaphore::new(self.config.skip_workers));
        let mut tasks: JoinSet<Result<(usize, StructureDoc), ExtractError>> = JoinSet::new();

        for w in windows {
            let idx = w.idx;
            let text = w.text.clone();
            let nodes = question_nodes.clone();
            let start = start.clone();
            let oracle = Arc::clone(&self.oracle);
            let limiter = Arc::clone(&self.limiter);
            let retry = self.retry;
            let sem = Arc::clone(&sem);
            tasks.spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| ExtractError::TaskJoin(e.to_string()))?;
                let request = OracleRequest { text, task: OracleTask::SkipLogic };
                let records = tokio::task::spawn_blocking(move || {
                    with_retries(&limiter, &retry, || oracle.extract(&request))
                })
                .await??;
                let (edges, predicates) = coerce_skip_records(&records);
                let doc = StructureDoc {
                    survey_dag_structure: Structure {
                        id: Some("survey".to_string()),
                        version: Some("v0".to_string()),
                        start,
                        terminals: vec![CANON_TERMINAL.to_string()],
                        nodes,
                        edges,
                        predicates,
                    },
                };
                Ok((idx, doc))
            });
        }

        let mut chunks = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            chunks.push(joined??);
        }
        chunks.sort_by_key(|(idx, _)| *idx);
        info!(windows = chunks.len(), "skip stage complete");
        Ok(chunks)
    }
}

fn placeholder_node(entry: &QuestionIndexEntry) -> ContentNode {
    ContentNode {
        id: entry.id.clone(),
        text: entry.short_text.clone(),
        response_type: Some(ResponseType::Text),
        ..ContentNode::default()
    }
}

fn dedupe_index(mut items: Vec<QuestionIndexEntry>) -> Vec<QuestionIndexEntry> {
    items.sort_by(|a, b| (a.page_guess, &a.id).cmp(&(b.page_guess, &b.id)));
    let mut seen = BTreeSet::new();
    items.into_iter().filter(|q| seen.insert(q.id.clone())).collect()
}

/// Guarantee that every indexed question has a content node.
///
/// Questions the content stage missed get a conservative placeholder with
/// a best-guess text slice and a `safety_net` provenance marker. Blank-id
/// nodes are stripped and the result is re-sorted into index order.
pub fn ensure_nodes_for_all_index(
    index: &[QuestionIndexEntry],
    mut nodes: Vec<ContentNode>,
    full_text: &str,
    spans: &[PageSpan],
) -> Vec<ContentNode> {
    nodes.retain(|n| !n.id.is_empty());
    let have: BTreeSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let need: Vec<&QuestionIndexEntry> =
        index.iter().filter(|q| !have.contains(&q.id)).collect();

    if !need.is_empty() {
        let slices = create_question_slices(full_text, spans, index);
        for q in need {
            warn!(question = %q.id, "no content node extracted, adding safety-net placeholder");
            let slice = tighten_slice(
                slices.get(&q.id).map(String::as_str).unwrap_or(""),
                &q.id,
                &q.short_text,
                SAFETY_BEFORE,
                SAFETY_AFTER,
            );
            let text = if q.short_text.is_empty() {
                slice.chars().take(300).collect()
            } else {
                q.short_text.clone()
            };
            let mut provenance = BTreeMap::new();
            provenance.insert("safety_net".to_string(), Value::Bool(true));
            nodes.push(ContentNode {
                id: q.id.clone(),
                text,
                response_type: Some(ResponseType::Text),
                provenance: Some(provenance),
                ..ContentNode::default()
            });
        }
    }

    let order: BTreeMap<&str, usize> =
        index.iter().enumerate().map(|(i, q)| (q.id.as_str(), i)).collect();
    nodes.sort_by_key(|n| order.get(n.id.as_str()).copied().unwrap_or(usize::MAX));
    nodes
}
