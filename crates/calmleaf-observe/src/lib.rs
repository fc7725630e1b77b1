//! Observability setup for Calmleaf.

pub mod tracing_setup;
