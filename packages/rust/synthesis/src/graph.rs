//! Mind-map graph synthesis.
//!
//! Builds the generation prompt for a source document, calls the generative
//! service once, and normalizes the tolerantly-parsed output into domain
//! nodes and edges. Normalization trusts node ids from the service and
//! performs no structural validation of references between nodes and edges.

use serde::Deserialize;
use tracing::{debug, instrument};

use mindcite_shared::{
    IMPORTANCE_DEFAULT, IMPORTANCE_MAX, IMPORTANCE_MIN, MindCiteError, MindMapEdge, MindMapNode,
    Result,
};

use crate::client::GenerativeClient;
use crate::parse::parse_lenient;

/// Maximum source characters embedded in one synthesis prompt.
const MAX_SOURCE_CHARS: usize = 24_000;

/// Fixed system instruction: output contract plus domain rules.
const SYSTEM_INSTRUCTION: &str = "\
You are a medical education assistant that converts study notes into a concept map.
Respond with a single JSON object and nothing else, using this schema:
{
  \"sourceSummary\": string,
  \"nodes\": [{\"id\": string, \"title\": string, \"summary\": string, \"parentIds\": [string], \"importance\": number, \"tags\": [string]}],
  \"edges\": [{\"source\": string, \"target\": string, \"label\": string}]
}
Rules:
- Use concise, clinically accurate language.
- Express hierarchy through parentIds; at least one node must have an empty parentIds (a root).
- Give every node a unique lowercase slug id (e.g. \"beta-blockers\").
- importance is an integer from 1 to 5.
- tags are optional short topic labels.";

/// Task instruction appended after the system instruction.
fn build_task_instruction(source_text: &str) -> String {
    format!(
        "Create a mind map from the study notes below.
Keep each node summary under 35 words. Rate importance 5 for core concepts \
down to 1 for peripheral details. Prefer tags from: anatomy, physiology, \
pathology, pharmacology, microbiology, biochemistry, diagnosis, treatment.

STUDY NOTES:
{source_text}"
    )
}

/// Build the complete synthesis prompt for one source document.
pub fn build_synthesis_prompt(source_text: &str) -> String {
    let source = truncate_source(source_text, MAX_SOURCE_CHARS);
    format!("{SYSTEM_INSTRUCTION}\n\n{}", build_task_instruction(&source))
}

/// Truncate source text to approximately `max_chars` characters.
fn truncate_source(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        text.to_string()
    } else {
        let mut end = max_chars;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}\n\n[... notes truncated ...]", &text[..end])
    }
}

// ---------------------------------------------------------------------------
// Raw wire shapes (tolerantly deserialized, then normalized)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGraph {
    #[serde(default)]
    source_summary: String,
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    parent_ids: Vec<String>,
    #[serde(default)]
    importance: Option<i64>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    #[serde(default)]
    source: String,
    #[serde(default)]
    target: String,
    #[serde(default)]
    label: Option<String>,
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// A normalized synthesized graph, before verification.
#[derive(Debug, Clone)]
pub struct SynthesizedGraph {
    /// Nodes in the order the service produced them.
    pub nodes: Vec<MindMapNode>,
    /// Edges in the order the service produced them.
    pub edges: Vec<MindMapEdge>,
    /// One-paragraph summary of the source document.
    pub source_summary: String,
}

/// Synthesize a mind map from extracted source text.
///
/// One generation call; tolerant parse; normalization into the domain model.
/// Fails with `UpstreamEmpty` / `Parse` per the shared output contract.
#[instrument(skip_all, fields(source_len = source_text.len()))]
pub async fn synthesize_graph(
    client: &GenerativeClient,
    source_text: &str,
) -> Result<SynthesizedGraph> {
    let prompt = build_synthesis_prompt(source_text);
    let output = client.complete(&prompt).await?;
    let value = parse_lenient(&output)?;

    let raw: RawGraph = serde_json::from_value(value)
        .map_err(|e| MindCiteError::parse(format!("graph shape mismatch: {e}")))?;

    let graph = normalize_graph(raw);
    debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "synthesis complete"
    );

    Ok(graph)
}

/// Normalize a raw graph into domain nodes and edges.
///
/// Citations and `verified` are always initialized empty/false here no matter
/// what the service emitted; verification is the single source of truth for
/// both. Edge ids are computed once from the input position and optional
/// label.
fn normalize_graph(raw: RawGraph) -> SynthesizedGraph {
    let nodes = raw
        .nodes
        .into_iter()
        .map(|node| MindMapNode {
            id: node.id,
            title: node.title,
            summary: node.summary,
            parent_ids: node.parent_ids,
            importance: clamp_importance(node.importance),
            tags: node.tags,
            citations: Vec::new(),
            verified: false,
            auto_corrected: false,
        })
        .collect();

    let edges = raw
        .edges
        .into_iter()
        .enumerate()
        .map(|(index, edge)| {
            let label = edge.label.filter(|l| !l.is_empty());
            MindMapEdge {
                id: edge_id(index, &edge.source, &edge.target, label.as_deref()),
                source: edge.source,
                target: edge.target,
                label,
            }
        })
        .collect();

    SynthesizedGraph {
        nodes,
        edges,
        source_summary: raw.source_summary,
    }
}

/// Clamp a raw importance value into [1, 5], defaulting to 3 when absent.
fn clamp_importance(raw: Option<i64>) -> u8 {
    match raw {
        None => IMPORTANCE_DEFAULT,
        Some(i) => i.clamp(i64::from(IMPORTANCE_MIN), i64::from(IMPORTANCE_MAX)) as u8,
    }
}

/// Derive an edge id from its input position, endpoints, and optional label.
///
/// Two unlabeled edges never collide as long as their positions differ.
pub fn edge_id(index: usize, source: &str, target: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{source}-{target}-{label}"),
        None => format!("edge-{index}"),
    }
}
