//! PDF-to-text extraction.
//!
//! Turns the raw bytes of a paginated document into a single normalized text
//! blob: pages are visited in order, text items within a page are joined by
//! single spaces, and pages are joined by newlines. Layout beyond page
//! sequence is not preserved.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use mindcite_shared::{MindCiteError, Result};

/// Collapses any run of whitespace (including layout-driven line breaks
/// inside a page) to a single space.
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Extract the text content of a PDF document.
///
/// Returns the trimmed text blob. A document that parses but carries no
/// extractable text yields `Ok("")`; callers must treat the empty string as
/// a distinct condition rather than an error. Unparsable bytes yield
/// [`MindCiteError::Extraction`]. The PDF decoder is scoped to this call and
/// released when it returns, on both paths.
#[instrument(skip_all, fields(byte_len = bytes.len()))]
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| MindCiteError::extraction(format!("could not parse document: {e}")))?;

    let blob = pages
        .iter()
        .map(|page| normalize_page(page))
        .collect::<Vec<_>>()
        .join("\n");
    let blob = blob.trim().to_string();

    debug!(
        page_count = pages.len(),
        text_len = blob.len(),
        "extraction complete"
    );

    Ok(blob)
}

/// Normalize one page's raw text: trim and collapse whitespace runs so the
/// page reads as its text items joined by single spaces.
fn normalize_page(raw: &str) -> String {
    WHITESPACE_RE.replace_all(raw.trim(), " ").into_owned()
}
