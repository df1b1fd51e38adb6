//! Application configuration for MindCite.
//!
//! User config lives at `~/.mindcite/mindcite.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MindCiteError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "mindcite.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".mindcite";

// ---------------------------------------------------------------------------
// Config structs (matching mindcite.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generative text service settings.
    #[serde(default)]
    pub generative: GenerativeConfig,

    /// Reference source endpoints.
    #[serde(default)]
    pub reference: ReferenceConfig,
}

/// `[generative]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the generative service API.
    #[serde(default = "default_generative_base_url")]
    pub base_url: String,

    /// Default model to use for synthesis and refinement.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Reasoning effort selector passed with every request.
    #[serde(default = "default_effort")]
    pub effort: String,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_generative_base_url(),
            default_model: default_model(),
            effort: default_effort(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_generative_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-5-mini".into()
}
fn default_effort() -> String {
    "medium".into()
}

/// `[reference]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Search endpoint of the primary medical reference service.
    #[serde(default = "default_primary_base_url")]
    pub primary_base_url: String,

    /// Site base used to synthesize outbound links when a document carries
    /// no full-summary link of its own.
    #[serde(default = "default_primary_site_base")]
    pub primary_site_base: String,

    /// REST base of the secondary encyclopedic summary service.
    #[serde(default = "default_secondary_base_url")]
    pub secondary_base_url: String,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            primary_base_url: default_primary_base_url(),
            primary_site_base: default_primary_site_base(),
            secondary_base_url: default_secondary_base_url(),
        }
    }
}

fn default_primary_base_url() -> String {
    "https://wsearch.nlm.nih.gov/ws/query".into()
}
fn default_primary_site_base() -> String {
    "https://medlineplus.gov".into()
}
fn default_secondary_base_url() -> String {
    "https://en.wikipedia.org/api/rest_v1".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.mindcite/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        MindCiteError::missing_configuration("could not determine home directory")
    })?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.mindcite/mindcite.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MindCiteError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        MindCiteError::missing_configuration(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MindCiteError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config)
        .map_err(|e| MindCiteError::missing_configuration(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MindCiteError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the generative API key env var is set and non-empty.
///
/// Called before any external work: a missing credential must fail the
/// operation without a single outbound request.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.generative.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(MindCiteError::missing_configuration(format!(
            "generative API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("medlineplus.gov"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.generative.effort, "medium");
        assert_eq!(
            parsed.reference.secondary_base_url,
            "https://en.wikipedia.org/api/rest_v1"
        );
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[generative]
default_model = "gpt-5"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.generative.default_model, "gpt-5");
        assert_eq!(config.generative.api_key_env, "OPENAI_API_KEY");
        assert_eq!(
            config.reference.primary_site_base,
            "https://medlineplus.gov"
        );
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.generative.api_key_env = "MINDCITE_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.status_class(), "missing_configuration");
        assert!(err.to_string().contains("API key not found"));
    }
}
