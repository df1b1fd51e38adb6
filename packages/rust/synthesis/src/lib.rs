//! Generative synthesis for MindCite.
//!
//! Talks to the generative text service and turns its output into domain
//! data under a tolerant output contract:
//! - [`client`] — HTTP client and heterogeneous response envelope
//! - [`parse`] — strict-then-lenient JSON recovery
//! - [`graph`] — mind-map synthesis and normalization
//! - [`refine`] — single-node summary/tag revision

pub mod client;
pub mod graph;
pub mod parse;
pub mod refine;

pub use client::{ContentPart, GenerativeClient, OutputItem, ResponseEnvelope};
pub use graph::{SynthesizedGraph, build_synthesis_prompt, edge_id, synthesize_graph};
pub use parse::parse_lenient;
pub use refine::{build_refine_prompt, refine_node};
