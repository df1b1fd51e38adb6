//! MindCite CLI — turn medical study notes into a cited mind map.
//!
//! Extracts text from a PDF, synthesizes a concept graph through a
//! generative service, and verifies each node against external reference
//! sources.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
