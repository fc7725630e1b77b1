//! Chat turn orchestration: context assembly, streaming relay, persistence.

pub mod context;
pub mod knowledge;
pub mod repository;
pub mod sanitize;
pub mod service;
