//! OpenAI Assistants API client.

pub mod client;
pub mod types;

pub use client::OpenAiEngine;
