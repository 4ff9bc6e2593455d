//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod analyze;
mod scrape;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};

#[derive(Parser)]
#[command(name = "contentpilot")]
#[command(about = "Summarize text, web pages, images and documents into action items")]
#[command(version)]
pub struct Cli {
    /// Config file path (TOML, or JSON by extension)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default from config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Fetch a page with the hybrid scraper and print its main text
    Scrape {
        /// Page URL (http or https)
        url: String,
    },

    /// Run one analysis locally and print each event as a JSON line
    Analyze {
        /// Free text to analyze
        #[arg(long, conflicts_with_all = ["url", "file"])]
        text: Option<String>,
        /// Page URL to scrape and analyze
        #[arg(long, conflicts_with = "file")]
        url: Option<String>,
        /// Image, PDF or DOCX file to analyze
        #[arg(long)]
        file: Option<PathBuf>,
        /// MIME type of --file (guessed from the extension when omitted)
        #[arg(long, requires = "file")]
        mime: Option<String>,
        /// Record the result in history under this owner id
        #[arg(long)]
        owner: Option<String>,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(LoadOptions {
        config_path: cli.config,
    })
    .await?;

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(&settings, bind.as_deref()).await,
        Commands::Scrape { url } => scrape::cmd_scrape(&settings, &url).await,
        Commands::Analyze {
            text,
            url,
            file,
            mime,
            owner,
        } => {
            let input = analyze::AnalyzeInput {
                text,
                url,
                file,
                mime,
            };
            analyze::cmd_analyze(&settings, input, owner.as_deref()).await
        }
    }
}
