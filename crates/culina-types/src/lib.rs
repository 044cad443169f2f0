//! Shared domain types for Culina.
//!
//! This crate contains the core domain types used across the Culina
//! workspace: chat sessions and transcript entries, generation requests,
//! recipes, configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod recipe;
