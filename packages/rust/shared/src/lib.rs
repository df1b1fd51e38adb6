//! Shared types, error model, and configuration for MindCite.
//!
//! This crate is the foundation depended on by all other MindCite crates.
//! It provides:
//! - [`MindCiteError`] — the unified error type with stable status classes
//! - Domain types ([`MindMapPayload`], [`MindMapNode`], [`MindMapEdge`], [`Citation`])
//! - Configuration ([`AppConfig`], config loading, credential validation)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GenerativeConfig, ReferenceConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, validate_api_key,
};
pub use error::{MindCiteError, Result};
pub use types::{
    Citation, IMPORTANCE_DEFAULT, IMPORTANCE_MAX, IMPORTANCE_MIN, MindMapEdge, MindMapNode,
    MindMapPayload, NodeRevision,
};
