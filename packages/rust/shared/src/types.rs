//! Core domain types for MindCite mind maps.
//!
//! These types are the payload contract consumed by external collaborators
//! (graph renderers, editors, exporters), so they serialize with camelCase
//! field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive lower bound for node importance.
pub const IMPORTANCE_MIN: u8 = 1;

/// Inclusive upper bound for node importance.
pub const IMPORTANCE_MAX: u8 = 5;

/// Importance assigned when the synthesized node omits the field.
pub const IMPORTANCE_DEFAULT: u8 = 3;

// ---------------------------------------------------------------------------
// Citation
// ---------------------------------------------------------------------------

/// A supporting reference attached to a node after verification.
///
/// Citations are value objects; two citations are the same citation iff
/// their `url` is the same. Title, snippet, and source label are carried
/// for display but do not participate in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Display title of the referenced page.
    pub title: String,
    /// Outbound link; dedup identity key.
    pub url: String,
    /// Short descriptive text from the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Origin label (e.g., "medlineplus", "wikipedia").
    pub source: String,
}

// ---------------------------------------------------------------------------
// MindMapNode
// ---------------------------------------------------------------------------

/// One concept in the mind map.
///
/// Created once per synthesis call. Mutated only by verification (citations,
/// `verified`) and later by refinement (summary, tags, `auto_corrected`);
/// node removal is an external-editor concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapNode {
    /// Slug identifier, unique within one payload (trusted from synthesis).
    pub id: String,
    /// Concept title.
    pub title: String,
    /// Short clinical summary.
    pub summary: String,
    /// Parent node ids; empty means this node is a root.
    #[serde(default)]
    pub parent_ids: Vec<String>,
    /// Importance rank, always within [1, 5].
    pub importance: u8,
    /// Free-form topic tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Supporting citations; never two entries with the same url.
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// True iff `citations` is non-empty.
    #[serde(default)]
    pub verified: bool,
    /// True once refinement has rewritten the summary/tags.
    #[serde(default)]
    pub auto_corrected: bool,
}

// ---------------------------------------------------------------------------
// MindMapEdge
// ---------------------------------------------------------------------------

/// A labeled connection between two nodes.
///
/// Edges are carried alongside `parent_ids` without cross-validation; the two
/// representations are independent and endpoints are not checked against the
/// node id set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapEdge {
    /// Derived identifier: `{source}-{target}-{label}` when a label exists,
    /// else `edge-{index}` using the input position.
    pub id: String,
    /// Source node id.
    pub source: String,
    /// Target node id.
    pub target: String,
    /// Optional relationship label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

// ---------------------------------------------------------------------------
// MindMapPayload
// ---------------------------------------------------------------------------

/// The unit exchanged with external collaborators: the complete generated
/// and verified mind map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapPayload {
    /// All nodes, in synthesis order.
    pub nodes: Vec<MindMapNode>,
    /// All edges, in synthesis order.
    pub edges: Vec<MindMapEdge>,
    /// When this payload was generated.
    pub generated_at: DateTime<Utc>,
    /// One-paragraph summary of the source document.
    pub source_summary: String,
}

// ---------------------------------------------------------------------------
// NodeRevision
// ---------------------------------------------------------------------------

/// Result of the single-node refine operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRevision {
    /// Revised summary, aligned with the node's citations.
    pub summary: String,
    /// Revised tag set.
    pub tags: Vec<String>,
}
