//! Conversation orchestration engine for Presale.
//!
//! This crate holds the real state-machine and concurrency content of the
//! service: the session registry, the per-thread run coordinator, the
//! assistant identity cache, structured-field extraction from free-text
//! replies, and the top-level per-frame orchestrator.
//!
//! The durable record store, the token verifier, and the external
//! conversation engine are collaborators behind traits defined here
//! (RPITIT-style); concrete implementations live in presale-infra.

pub mod assistant;
pub mod engine;
pub mod extractor;
pub mod orchestrator;
pub mod poll;
pub mod registry;
pub mod repository;
pub mod run;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testutil;
