//! End-to-end pipelines: document bytes → verified mind map, and
//! single-node refinement.
//!
//! The full generation flow is: extract → synthesize → verify each node in
//! order → assemble payload. Extraction and synthesis failures abort the
//! whole operation; verification never does, since a node the reference
//! sources cannot support simply stays unverified.

use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};

use mindcite_shared::{
    AppConfig, Citation, MindCiteError, MindMapNode, MindMapPayload, NodeRevision, Result,
    validate_api_key,
};
use mindcite_synthesis::{GenerativeClient, refine_node, synthesize_graph};
use mindcite_verify::ReferenceVerifier;

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each node finishes verification.
    fn node_verified(&self, title: &str, current: usize, total: usize, citations: usize);
    /// Called when the pipeline completes.
    fn done(&self, payload: &MindMapPayload);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn node_verified(&self, _title: &str, _current: usize, _total: usize, _citations: usize) {}
    fn done(&self, _payload: &MindMapPayload) {}
}

// ---------------------------------------------------------------------------
// Generate
// ---------------------------------------------------------------------------

/// Run the full generation pipeline on raw document bytes.
///
/// 1. Extract text (page order preserved)
/// 2. Synthesize the graph (one generative call)
/// 3. Verify each node against the reference sources
/// 4. Assemble the payload
#[instrument(skip_all, fields(byte_len = document.len()))]
pub async fn generate(
    config: &AppConfig,
    document: &[u8],
    progress: &dyn ProgressReporter,
) -> Result<MindMapPayload> {
    progress.phase("Extracting text");
    let text = mindcite_extract::extract_text(document)?;

    generate_from_text(config, &text, progress).await
}

/// Run the generation pipeline on already-extracted text.
///
/// Empty text fails with [`MindCiteError::EmptyExtraction`] and a missing
/// credential with [`MindCiteError::MissingConfiguration`], both before any
/// external call is made.
#[instrument(skip_all, fields(text_len = text.len()))]
pub async fn generate_from_text(
    config: &AppConfig,
    text: &str,
    progress: &dyn ProgressReporter,
) -> Result<MindMapPayload> {
    let start = Instant::now();

    if text.is_empty() {
        return Err(MindCiteError::EmptyExtraction);
    }
    validate_api_key(config)?;

    let client = GenerativeClient::new(&config.generative)?;
    let verifier = ReferenceVerifier::new(&config.reference)?;

    // --- Phase 1: Synthesis ---
    progress.phase("Synthesizing mind map");
    let graph = synthesize_graph(&client, text).await?;

    info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "graph synthesized, verifying nodes"
    );

    // --- Phase 2: Verification ---
    // Sequential on purpose: one node fully resolved (primary query plus
    // optional fallback) before the next begins, keeping outbound pressure
    // on the reference sources at a single request at a time. Output order
    // matches synthesis order.
    progress.phase("Verifying nodes");
    let total = graph.nodes.len();
    let mut nodes: Vec<MindMapNode> = Vec::with_capacity(total);

    for (i, mut node) in graph.nodes.into_iter().enumerate() {
        let citations = dedup_citations(verifier.verify(&node.title).await);

        if citations.is_empty() {
            warn!(node = %node.id, title = %node.title, "no citations found");
        }

        progress.node_verified(&node.title, i + 1, total, citations.len());

        node.verified = !citations.is_empty();
        node.citations = citations;
        nodes.push(node);
    }

    // --- Phase 3: Assemble payload ---
    let payload = MindMapPayload {
        nodes,
        edges: graph.edges,
        generated_at: Utc::now(),
        source_summary: graph.source_summary,
    };

    progress.done(&payload);

    info!(
        nodes = payload.nodes.len(),
        verified = payload.nodes.iter().filter(|n| n.verified).count(),
        elapsed_ms = start.elapsed().as_millis(),
        "generation complete"
    );

    Ok(payload)
}

// ---------------------------------------------------------------------------
// Refine
// ---------------------------------------------------------------------------

/// Revise one node's summary and tags against its citations.
///
/// The node is not mutated here; callers apply the revision and set
/// `auto_corrected` themselves.
#[instrument(skip_all, fields(node_id = %node.id))]
pub async fn refine(config: &AppConfig, node: &MindMapNode) -> Result<NodeRevision> {
    validate_api_key(config)?;

    if node.id.trim().is_empty() || node.title.trim().is_empty() {
        return Err(MindCiteError::invalid_request(
            "node must carry a non-empty id and title",
        ));
    }

    let client = GenerativeClient::new(&config.generative)?;
    refine_node(&client, node).await
}

// ---------------------------------------------------------------------------
// Citation dedup
// ---------------------------------------------------------------------------

/// Drop citations whose url was already seen, preserving original order.
///
/// The first-seen citation wins and keeps all of its fields; identity is the
/// url alone.
pub fn dedup_citations(citations: Vec<Citation>) -> Vec<Citation> {
    let mut seen: HashSet<String> = HashSet::with_capacity(citations.len());
    citations
        .into_iter()
        .filter(|c| seen.insert(c.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindcite_shared::{GenerativeConfig, ReferenceConfig};

    fn citation(url: &str, title: &str) -> Citation {
        Citation {
            title: title.into(),
            url: url.into(),
            snippet: None,
            source: "medlineplus".into(),
        }
    }

    #[test]
    fn dedup_keeps_first_seen_in_order() {
        let deduped = dedup_citations(vec![
            citation("https://x", "first"),
            citation("https://y", "second"),
            citation("https://x", "duplicate"),
        ]);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].url, "https://x");
        assert_eq!(deduped[0].title, "first");
        assert_eq!(deduped[1].url, "https://y");
    }

    #[test]
    fn dedup_is_idempotent() {
        let once = dedup_citations(vec![
            citation("https://x", "a"),
            citation("https://y", "b"),
            citation("https://x", "c"),
        ]);
        let twice = dedup_citations(once.clone());
        assert_eq!(once.len(), twice.len());
        assert_eq!(once[0].title, twice[0].title);
    }

    fn test_app_config(server_uri: &str, api_key_env: &str) -> AppConfig {
        AppConfig {
            generative: GenerativeConfig {
                api_key_env: api_key_env.into(),
                base_url: server_uri.into(),
                default_model: "test-model".into(),
                effort: "low".into(),
            },
            reference: ReferenceConfig {
                primary_base_url: format!("{server_uri}/ws/query"),
                primary_site_base: "https://medlineplus.gov".into(),
                secondary_base_url: format!("{server_uri}/api/rest_v1"),
            },
        }
    }

    #[tokio::test]
    async fn empty_text_fails_before_any_external_call() {
        let server = wiremock::MockServer::start().await;

        // Nothing may be called: not the generative service, not the sources.
        wiremock::Mock::given(wiremock::matchers::path_regex(".*"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = test_app_config(&server.uri(), "MINDCITE_TEST_KEY_EMPTY_TEXT");
        let err = generate_from_text(&config, "", &SilentProgress)
            .await
            .unwrap_err();
        assert_eq!(err.status_class(), "empty_extraction");
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_external_call() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path_regex(".*"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = test_app_config(&server.uri(), "MINDCITE_TEST_KEY_THAT_IS_NOT_SET");
        let err = generate_from_text(&config, "some notes", &SilentProgress)
            .await
            .unwrap_err();
        assert_eq!(err.status_class(), "missing_configuration");
    }

    #[tokio::test]
    async fn generate_verifies_and_assembles_payload() {
        let server = wiremock::MockServer::start().await;

        let graph_json = r#"{"sourceSummary":"s","nodes":[{"id":"n1","title":"T","summary":"S"}],"edges":[]}"#;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/responses"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"output_text": graph_json}),
            ))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/ws/query"))
            .and(wiremock::matchers::query_param("term", "T"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"documents": [{
                    "name": "T",
                    "contents": [
                        {"name": "FullSummary", "value": "...", "url": "https://x"},
                        {"name": "snippet", "value": "sn"}
                    ]
                }]}),
            ))
            .mount(&server)
            .await;

        let key_var = "MINDCITE_TEST_KEY_E2E";
        unsafe { std::env::set_var(key_var, "test-key") };

        let config = test_app_config(&server.uri(), key_var);
        let payload = generate_from_text(&config, "study notes", &SilentProgress)
            .await
            .unwrap();

        assert_eq!(payload.nodes.len(), 1);
        assert_eq!(payload.source_summary, "s");

        let node = &payload.nodes[0];
        assert!(node.verified);
        assert_eq!(node.citations.len(), 1);
        assert_eq!(node.citations[0].title, "T");
        assert_eq!(node.citations[0].url, "https://x");
        assert_eq!(node.citations[0].snippet.as_deref(), Some("sn"));
        assert_eq!(node.citations[0].source, "medlineplus");
    }

    #[tokio::test]
    async fn unsupported_nodes_stay_unverified() {
        let server = wiremock::MockServer::start().await;

        let graph_json = r#"{"sourceSummary":"s","nodes":[{"id":"n1","title":"Obscure","summary":"S"}],"edges":[]}"#;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/responses"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"output_text": graph_json}),
            ))
            .mount(&server)
            .await;

        // Primary source is down; generation must still complete.
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/ws/query"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let key_var = "MINDCITE_TEST_KEY_UNVERIFIED";
        unsafe { std::env::set_var(key_var, "test-key") };

        let config = test_app_config(&server.uri(), key_var);
        let payload = generate_from_text(&config, "study notes", &SilentProgress)
            .await
            .unwrap();

        let node = &payload.nodes[0];
        assert!(!node.verified);
        assert!(node.citations.is_empty());
    }

    #[tokio::test]
    async fn synthesis_failure_aborts_without_partial_payload() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/responses"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"output_text": "not json at all"}),
            ))
            .mount(&server)
            .await;

        // No reference call may happen once synthesis has failed.
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/ws/query"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let key_var = "MINDCITE_TEST_KEY_ABORT";
        unsafe { std::env::set_var(key_var, "test-key") };

        let config = test_app_config(&server.uri(), key_var);
        let err = generate_from_text(&config, "study notes", &SilentProgress)
            .await
            .unwrap_err();
        assert_eq!(err.status_class(), "parse_error");
    }

    #[tokio::test]
    async fn refine_rejects_malformed_node() {
        let config = test_app_config("http://unused.invalid", "PATH");
        let node = MindMapNode {
            id: "".into(),
            title: "T".into(),
            summary: "S".into(),
            parent_ids: vec![],
            importance: 3,
            tags: vec![],
            citations: vec![],
            verified: false,
            auto_corrected: false,
        };

        let err = refine(&config, &node).await.unwrap_err();
        assert_eq!(err.status_class(), "invalid_request");
    }
}
