//! Generative model access.

pub mod client;

pub use client::{
    GeminiClient, GeminiConfig, GenerationClient, LlmError, TextStream, HARM_CATEGORIES,
};
