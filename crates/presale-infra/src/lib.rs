//! Infrastructure implementations for Presale.
//!
//! Concrete adapters behind the presale-core seams: the SQLite record
//! store, the OpenAI Assistants engine client, the HTTP token verifier,
//! and configuration loading.

pub mod auth;
pub mod config;
pub mod openai;
pub mod sqlite;
