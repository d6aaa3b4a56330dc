// ABOUTME: Model provider adapters implementing the ChatGateway trait.
// ABOUTME: OpenRouter is the only production provider; test doubles live in crate::testing.

pub mod openrouter;

pub use openrouter::{ModelInfo, OpenRouterGateway};
