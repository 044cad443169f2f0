//! Observability setup for Culina.

pub mod tracing_setup;
