//! The conversational-generation pipeline.
//!
//! Turns a submitted user utterance into a streamed assistant response
//! while the UI stays responsive: mention expansion, bounded token relay
//! with generation-id fencing, callback filtering, and transcript
//! reconciliation. Entry point: [`coordinator::GenerationCoordinator`].

pub mod callbacks;
pub mod coordinator;
pub mod memory;
pub mod mention;
pub mod relay;
pub mod summary;
