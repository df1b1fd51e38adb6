//! Tolerant JSON recovery for generative output.
//!
//! Models routinely wrap the requested JSON in prose or markdown fences.
//! Parsing is an explicit two-stage strategy: strict first, then the
//! substring between the first `{` and the last `}` inclusive. Anything that
//! survives neither stage is a parse error, never a silent best-effort value.

use mindcite_shared::{MindCiteError, Result};

/// Parse generative output as JSON, tolerating surrounding text.
pub fn parse_lenient(text: &str) -> Result<serde_json::Value> {
    let strict_err = match serde_json::from_str(text) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&text[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(MindCiteError::parse(format!(
        "output is not JSON and no recoverable object was found: {strict_err}"
    )))
}
