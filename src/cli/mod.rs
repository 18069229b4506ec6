//! CLI module for Prompt Playground
//!
//! - `serve`: HTTP API server
//! - `run`: one-shot experiment from a JSON request file

pub mod run;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Prompt Playground - compare prompts across LLM providers
#[derive(Parser)]
#[command(name = "prompt-playground")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Run one experiment and print the result as JSON
    Run(run::RunArgs),
}

/// Load `.env` and layered configuration, then install the subscriber
pub(crate) fn load_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("Logging already initialized: {}", e);
    }

    Ok(config)
}
