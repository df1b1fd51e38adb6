//! Single-node refinement.
//!
//! Asks the generative service to revise one node's summary and tag set so
//! they stay factually aligned with the node's citations. Reuses the
//! response-envelope extraction and tolerant parsing of the synthesis path.

use serde::Deserialize;
use tracing::{debug, instrument};

use mindcite_shared::{MindCiteError, MindMapNode, NodeRevision, Result};

use crate::client::GenerativeClient;
use crate::parse::parse_lenient;

/// Marker embedded in the prompt when the node carries no citations.
const NO_CITATIONS_MARKER: &str = "no citations available";

/// Build the refinement prompt for one node.
pub fn build_refine_prompt(node: &MindMapNode) -> String {
    let citations = if node.citations.is_empty() {
        NO_CITATIONS_MARKER.to_string()
    } else {
        node.citations
            .iter()
            .map(|c| {
                let snippet = c.snippet.as_deref().unwrap_or("");
                format!("- {} ({}) {}: {}", c.title, c.source, c.url, snippet)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You revise medical concept-map nodes so their text matches the cited sources.
Respond with a single JSON object and nothing else: {{\"summary\": string, \"tags\": [string]}}.
The summary must be clinically precise and under 35 words.

NODE TITLE: {}
CURRENT SUMMARY: {}
CURRENT TAGS: {}

CITATIONS:
{}",
        node.title,
        node.summary,
        node.tags.join(", "),
        citations
    )
}

/// Wire shape of a revision; both fields optional so omissions can fall back.
#[derive(Debug, Deserialize)]
struct RawRevision {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Request a revised summary/tag set for one node.
///
/// Does not mutate the node; when the service omits a field, the node's
/// existing value is returned in its place, so the revision never carries a
/// missing summary or tag set. Setting `auto_corrected` on acceptance is the
/// caller's responsibility.
#[instrument(skip_all, fields(node_id = %node.id, citations = node.citations.len()))]
pub async fn refine_node(client: &GenerativeClient, node: &MindMapNode) -> Result<NodeRevision> {
    let prompt = build_refine_prompt(node);
    let output = client.complete(&prompt).await?;
    let value = parse_lenient(&output)?;

    let raw: RawRevision = serde_json::from_value(value)
        .map_err(|e| MindCiteError::parse(format!("revision shape mismatch: {e}")))?;

    let revision = NodeRevision {
        summary: raw.summary.unwrap_or_else(|| node.summary.clone()),
        tags: raw.tags.unwrap_or_else(|| node.tags.clone()),
    };

    debug!(
        summary_len = revision.summary.len(),
        tags = revision.tags.len(),
        "refinement complete"
    );

    Ok(revision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindcite_shared::Citation;

    fn node_without_citations() -> MindMapNode {
        MindMapNode {
            id: "ace-inhibitors".into(),
            title: "ACE Inhibitors".into(),
            summary: "Block conversion of angiotensin I to II.".into(),
            parent_ids: vec![],
            importance: 4,
            tags: vec!["pharmacology".into()],
            citations: vec![],
            verified: false,
            auto_corrected: false,
        }
    }

    fn node_with_citation() -> MindMapNode {
        let mut node = node_without_citations();
        node.citations = vec![Citation {
            title: "ACE Inhibitors".into(),
            url: "https://medlineplus.gov/aceinhibitors.html".into(),
            snippet: Some("Medicines that widen blood vessels.".into()),
            source: "medlineplus".into(),
        }];
        node.verified = true;
        node
    }

    #[test]
    fn prompt_marks_missing_citations() {
        let prompt = build_refine_prompt(&node_without_citations());
        assert!(prompt.contains("no citations available"));
    }

    #[test]
    fn prompt_renders_citations() {
        let prompt = build_refine_prompt(&node_with_citation());
        assert!(!prompt.contains("no citations available"));
        assert!(prompt.contains("https://medlineplus.gov/aceinhibitors.html"));
        assert!(prompt.contains("(medlineplus)"));
        assert!(prompt.contains("Medicines that widen blood vessels."));
    }

    async fn refine_against(body: serde_json::Value, node: &MindMapNode) -> Result<NodeRevision> {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/responses"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let config = mindcite_shared::GenerativeConfig {
            api_key_env: "UNUSED".into(),
            base_url: server.uri(),
            default_model: "test-model".into(),
            effort: "low".into(),
        };
        let client = GenerativeClient::with_key(&config, "test-key").unwrap();
        refine_node(&client, node).await
    }

    #[tokio::test]
    async fn refine_overwrites_both_fields() {
        let body = serde_json::json!({
            "output_text": r#"{"summary":"Inhibit ACE, lowering angiotensin II.","tags":["pharmacology","treatment"]}"#
        });
        let revision = refine_against(body, &node_with_citation()).await.unwrap();
        assert_eq!(revision.summary, "Inhibit ACE, lowering angiotensin II.");
        assert_eq!(revision.tags, vec!["pharmacology", "treatment"]);
    }

    #[tokio::test]
    async fn refine_falls_back_on_omitted_fields() {
        let node = node_with_citation();
        let body = serde_json::json!({
            "output_text": r#"{"summary":"Inhibit ACE, lowering angiotensin II."}"#
        });
        let revision = refine_against(body, &node).await.unwrap();
        assert_eq!(revision.summary, "Inhibit ACE, lowering angiotensin II.");
        // omitted tags keep the node's existing value, never null
        assert_eq!(revision.tags, node.tags);

        let body = serde_json::json!({"output_text": "{}"});
        let revision = refine_against(body, &node).await.unwrap();
        assert_eq!(revision.summary, node.summary);
        assert_eq!(revision.tags, node.tags);
    }

    #[tokio::test]
    async fn refine_propagates_parse_failure() {
        let body = serde_json::json!({"output_text": "cannot help with that"});
        let err = refine_against(body, &node_without_citations())
            .await
            .unwrap_err();
        assert_eq!(err.status_class(), "parse_error");
    }
}
