//! LLM provider implementations.
//!
//! Both backends speak the OpenAI-style chat completions protocol with
//! provider-specific twists (DeepSeek: reasoning via a model variant;
//! Zhipu: reasoning via a `thinking` payload field). Shared wire types,
//! HTTP plumbing, and SSE decoding live in the sibling modules.

mod client;
pub mod deepseek;
mod sse;
mod wire;
pub mod zhipu;
