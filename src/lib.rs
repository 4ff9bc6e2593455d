//! contentpilot: turn text, web pages, images and documents into a summary,
//! action items and next steps, streamed from a generative model.
//!
//! The request pipeline is extractor → prompt assembler → generation client
//! → stream relay, with completed results handed to a history sink.

pub mod cli;
pub mod config;
pub mod documents;
pub mod error;
pub mod history;
pub mod identity;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod scrapers;
pub mod server;
pub mod services;
pub mod utils;

pub use error::AnalysisError;
