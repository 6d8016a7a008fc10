//! SeoPress CLI: generates SEO blog articles from a keyword queue.
//!
//! Runs one generation from the command line, serves the HTTP trigger, and
//! manages the keyword table.

mod commands;
mod server;

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
