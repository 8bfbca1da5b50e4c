//! LLM Governance Gateway
//!
//! A gateway between client applications and third-party LLM providers.
//! Every chat-completion request is authenticated against hashed API keys,
//! admitted through a per-key token bucket, routed deterministically by
//! task/budget/latency hints, executed against the selected provider with a
//! timeout and fallback chain, and accounted for: one cost record per
//! successful attempt, plus Prometheus metrics and structured JSON logs.
//!
//! # Architecture
//!
//! - [`core`]: configuration, errors, logging, metrics, rate limiting,
//!   persistence
//! - [`providers`]: adapters translating the internal contract to each
//!   upstream API
//! - [`routing`]: deterministic provider selection
//! - [`services`]: fallback execution across the routed chain
//! - [`cost`]: pricing table and cost recording
//! - [`api`]: HTTP handlers and request/response models

pub mod api;
pub mod core;
pub mod cost;
pub mod providers;
pub mod routing;
pub mod services;

// Re-export commonly used types for convenience
pub use crate::api::{AppState, ChatCompletionRequest, ChatCompletionResponse};
pub use crate::core::{Database, GatewayError, RateLimiter, Result, Settings};
pub use crate::providers::{LlmProvider, ProviderError, ProviderKind};
