//! Shared domain types for Presale.
//!
//! This crate contains the core domain types used across the Presale
//! negotiation service: chats, messages, deals, assistant descriptors,
//! engine wire types, WebSocket frames, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod assistant;
pub mod chat;
pub mod engine;
pub mod error;
pub mod frame;
pub mod identity;
