//! HTTP client for the generative text service.
//!
//! The service accepts a single free-text prompt plus a model/effort selector
//! and returns a heterogeneous response envelope: either a flattened text
//! field, or a sequence of output items each carrying content fragments.
//! [`ResponseEnvelope::flatten_text`] is the one place that resolves the two
//! shapes into a single string.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use mindcite_shared::{GenerativeConfig, MindCiteError, Result};

/// User-Agent string for generative requests.
const USER_AGENT: &str = concat!("MindCite/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout; only guards a single hung connection. Overall
/// wall-clock limits are the hosting boundary's concern.
const REQUEST_TIMEOUT_SECS: u64 = 120;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Request body for a single generation call.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    input: &'a str,
    reasoning: Reasoning<'a>,
}

/// Reasoning effort selector.
#[derive(Debug, Serialize)]
struct Reasoning<'a> {
    effort: &'a str,
}

/// The service's response envelope.
///
/// Either `output_text` is populated directly, or the text is spread across
/// `output[].content[].text` fragments. Both may be absent, which callers
/// must treat as an empty response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseEnvelope {
    /// Flattened convenience field; used verbatim when present and non-empty.
    #[serde(default)]
    pub output_text: Option<String>,
    /// Structured output items carrying text fragments.
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

/// One output item in the structured envelope shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputItem {
    /// Content fragments in order.
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

/// One content fragment; non-text fragments have no `text` field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentPart {
    #[serde(default)]
    pub text: Option<String>,
}

impl ResponseEnvelope {
    /// Resolve the envelope to a single output string.
    ///
    /// Priority order: (1) a present, non-empty `output_text` is used
    /// verbatim; (2) otherwise every text fragment across every output item
    /// is concatenated in order, joined by newlines; (3) otherwise the
    /// result is the empty string.
    pub fn flatten_text(&self) -> String {
        if let Some(text) = &self.output_text {
            if !text.is_empty() {
                return text.clone();
            }
        }

        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the generative text service.
pub struct GenerativeClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    effort: String,
}

impl GenerativeClient {
    /// Create a client, resolving the API key from the configured env var.
    pub fn new(config: &GenerativeConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                MindCiteError::missing_configuration(format!(
                    "generative API key not found. Set the {} environment variable.",
                    config.api_key_env
                ))
            })?;

        Self::with_key(config, api_key)
    }

    /// Create a client with an explicit API key (for hosts that inject the
    /// credential themselves, and for tests).
    pub fn with_key(config: &GenerativeConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| MindCiteError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.default_model.clone(),
            effort: config.effort.clone(),
        })
    }

    /// Override the model for this client (CLI `--model` flag).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send one prompt and return the flattened output text.
    ///
    /// Fails with [`MindCiteError::UpstreamEmpty`] when the envelope decodes
    /// but carries no usable text, and [`MindCiteError::Network`] on
    /// transport or HTTP faults.
    #[instrument(skip_all, fields(model = %self.model, prompt_len = prompt.len()))]
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/responses", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            input: prompt,
            reasoning: Reasoning {
                effort: &self.effort,
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MindCiteError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail = &detail[..detail.len().min(200)];
            return Err(MindCiteError::Network(format!(
                "{url}: HTTP {status}: {detail}"
            )));
        }

        let envelope: ResponseEnvelope = response
            .json()
            .await
            .map_err(|e| MindCiteError::Network(format!("{url}: invalid response body: {e}")))?;

        let text = envelope.flatten_text();
        if text.is_empty() {
            return Err(MindCiteError::UpstreamEmpty);
        }

        debug!(output_len = text.len(), "generation complete");
        Ok(text)
    }
}
