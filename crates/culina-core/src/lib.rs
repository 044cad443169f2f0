//! Conversational pipeline and port trait definitions for Culina.
//!
//! This crate implements the generation pipeline (memory, mention
//! resolution, stream relay, callback filtering, coordination) and defines
//! the "ports" (runtime, transcript, catalog traits) that the
//! infrastructure layer implements. It depends only on `culina-types` --
//! never on `culina-infra` or any database/IO crate.

pub mod catalog;
pub mod chat;
pub mod runtime;
pub mod transcript;
