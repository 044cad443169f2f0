//! Interactive CLI chat experience for Culina.
//!
//! This module implements the full chat loop: streamed responses with
//! generation-id fencing, cancel-on-resubmit, markdown rendering, thinking
//! spinners, `@[Recipe]` mention expansion, and slash commands. Entry
//! point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
