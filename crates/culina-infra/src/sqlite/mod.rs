//! SQLite-backed implementations of the culina-core repository traits.

pub mod catalog;
pub mod pool;
pub mod transcript;
