//! Core pipeline orchestration for MindCite.
//!
//! Ties extraction, synthesis, and verification together into the two
//! supported operations: full mind-map generation and single-node
//! refinement.

pub mod pipeline;

pub use pipeline::{
    ProgressReporter, SilentProgress, dedup_citations, generate, generate_from_text, refine,
};
