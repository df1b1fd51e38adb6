//! Citation lookup against external reference sources.
//!
//! A node title is checked first against the primary medical reference
//! service; only when the primary service parses to an empty document list is
//! the secondary encyclopedic summary service consulted. Lookup never fails
//! outward: transport and decoding faults are logged and degrade to an empty
//! citation list, which the caller records as an unverified node.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use mindcite_shared::{Citation, MindCiteError, ReferenceConfig, Result};

/// User-Agent string for reference requests.
const USER_AGENT: &str = concat!("MindCite/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout for reference lookups.
const REQUEST_TIMEOUT_SECS: u64 = 20;

/// Maximum citations taken from a primary result.
const MAX_PRIMARY_CITATIONS: usize = 3;

/// Source label attached to primary citations.
pub const SOURCE_PRIMARY: &str = "medlineplus";

/// Source label attached to secondary citations.
pub const SOURCE_SECONDARY: &str = "wikipedia";

/// Strips everything that is not a lowercase letter or digit when deriving
/// fallback page slugs.
static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug regex"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Primary service response: a collection of named documents.
#[derive(Debug, Deserialize)]
struct PrimaryResponse {
    #[serde(default)]
    documents: Vec<PrimaryDocument>,
}

/// One primary document: a display name plus named content entries.
#[derive(Debug, Deserialize)]
struct PrimaryDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    contents: Vec<PrimaryContent>,
}

/// A named content entry; the `FullSummary` entry may carry an outbound link.
#[derive(Debug, Deserialize)]
struct PrimaryContent {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    url: Option<String>,
}

/// Secondary service response (REST page-summary shape).
#[derive(Debug, Deserialize)]
struct SecondarySummary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    content_urls: Option<SecondaryContentUrls>,
}

#[derive(Debug, Deserialize)]
struct SecondaryContentUrls {
    desktop: Option<SecondaryDesktop>,
}

#[derive(Debug, Deserialize)]
struct SecondaryDesktop {
    page: String,
}

// ---------------------------------------------------------------------------
// ReferenceVerifier
// ---------------------------------------------------------------------------

/// Looks up supporting citations for a node title.
pub struct ReferenceVerifier {
    client: Client,
    config: ReferenceConfig,
}

impl ReferenceVerifier {
    /// Create a verifier for the configured reference endpoints.
    pub fn new(config: &ReferenceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| MindCiteError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Find up to three citations for `title`.
    ///
    /// The secondary source is queried iff the primary source parsed to an
    /// empty document list; a failed primary call yields an empty result
    /// without falling back. Absence of citations is a normal outcome, not
    /// an error.
    #[instrument(skip_all, fields(title = %title))]
    pub async fn verify(&self, title: &str) -> Vec<Citation> {
        match self.query_primary(title).await {
            Ok(documents) if !documents.is_empty() => {
                let citations = self.primary_citations(title, documents);
                debug!(count = citations.len(), "primary lookup succeeded");
                citations
            }
            Ok(_) => {
                debug!("primary lookup empty, trying secondary");
                self.query_secondary(title).await
            }
            Err(e) => {
                warn!(error = %e, "primary lookup failed, node stays unverified");
                Vec::new()
            }
        }
    }

    /// Query the primary medical reference service for `title`.
    async fn query_primary(&self, title: &str) -> Result<Vec<PrimaryDocument>> {
        let url = &self.config.primary_base_url;
        let response = self
            .client
            .get(url)
            .query(&[("db", "healthTopics"), ("term", title), ("rettype", "all")])
            .send()
            .await
            .map_err(|e| MindCiteError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MindCiteError::Network(format!("{url}: HTTP {status}")));
        }

        let parsed: PrimaryResponse = response
            .json()
            .await
            .map_err(|e| MindCiteError::Network(format!("{url}: invalid response body: {e}")))?;

        Ok(parsed.documents)
    }

    /// Turn a non-empty primary document list into at most three citations.
    fn primary_citations(&self, query: &str, documents: Vec<PrimaryDocument>) -> Vec<Citation> {
        documents
            .into_iter()
            .take(MAX_PRIMARY_CITATIONS)
            .map(|doc| {
                let full_summary = doc.contents.iter().find(|c| c.name == "FullSummary");
                let snippet = doc
                    .contents
                    .iter()
                    .find(|c| c.name == "snippet")
                    .map(|c| c.value.clone())
                    .filter(|v| !v.is_empty());

                let url = full_summary
                    .and_then(|c| c.url.clone())
                    .unwrap_or_else(|| self.fallback_link(query));

                let title = if doc.name.is_empty() {
                    query.to_string()
                } else {
                    doc.name
                };

                Citation {
                    title,
                    url,
                    snippet,
                    source: SOURCE_PRIMARY.into(),
                }
            })
            .collect()
    }

    /// Synthesize a primary-site link for documents that carry no
    /// full-summary link of their own.
    fn fallback_link(&self, query: &str) -> String {
        format!(
            "{}/{}.html",
            self.config.primary_site_base.trim_end_matches('/'),
            slugify(query)
        )
    }

    /// Query the secondary encyclopedic summary service for `title`.
    ///
    /// A well-formed response yields exactly one citation; not-found and
    /// ill-formed responses yield none.
    async fn query_secondary(&self, title: &str) -> Vec<Citation> {
        let url = match self.secondary_url(title) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "could not build secondary URL");
                return Vec::new();
            }
        };

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "secondary lookup failed");
                return Vec::new();
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "secondary lookup returned no page");
            return Vec::new();
        }

        let summary: SecondarySummary = match response.json().await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "secondary response undecodable");
                return Vec::new();
            }
        };

        let Some(page) = summary.content_urls.and_then(|u| u.desktop).map(|d| d.page) else {
            debug!("secondary summary has no canonical page link");
            return Vec::new();
        };

        let title = if summary.title.is_empty() {
            title.to_string()
        } else {
            summary.title
        };

        vec![Citation {
            title,
            url: page,
            snippet: summary.extract.filter(|e| !e.is_empty()),
            source: SOURCE_SECONDARY.into(),
        }]
    }

    /// Build the secondary page-summary URL, percent-encoding the title.
    fn secondary_url(&self, title: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.secondary_base_url)
            .map_err(|e| MindCiteError::Network(format!("bad secondary base URL: {e}")))?;
        let page_title = title.replace(' ', "_");
        url.path_segments_mut()
            .map_err(|_| MindCiteError::Network("secondary base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["page", "summary", page_title.as_str()]);
        Ok(url)
    }
}

/// Lowercase a query and strip everything but letters and digits, matching
/// the primary site's page-slug convention.
fn slugify(query: &str) -> String {
    SLUG_RE.replace_all(&query.to_lowercase(), "").into_owned()
}
