// crates/metric-gate-server/src/lib.rs
// ============================================================================
// Module: Metric Gate Server
// Description: Query orchestration, normalization, LLM loop, and the HTTP
//              surface of the Domain MCP.
// Purpose: Tie adapters, plugins, resources, and rate limiting into the
//          tool handlers exposed over REST and JSON-RPC MCP transports.
// Dependencies: metric-gate-adapters, metric-gate-config, metric-gate-contract,
//               metric-gate-core, metric-gate-plugins, axum, reqwest, tokio
// ============================================================================

//! ## Overview
//! The server crate hosts the fetch/merge orchestrator (fast label path
//! versus dataset fallback path per merge strategy), the parameter
//! normalizer, the LLM query orchestrator with its bounded tool-call loop,
//! the per-client rate limiter, the resources registry, correlation ID
//! handling, and the axum HTTP surface with JSON-RPC MCP endpoints.
//! Invariants:
//! - Registries are populated at startup and read-only under load; only the
//!   rate limiter mutates per-request state, under a mutex.
//! - Every error leaving the HTTP surface carries a stable `error_type`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod correlation;
pub mod errors;
pub mod llm;
pub mod normalize;
pub mod orchestrator;
pub mod rate_limiter;
pub mod resources;
pub mod routes;
pub mod telemetry;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use correlation::CorrelationContext;
pub use correlation::CorrelationIdGenerator;
pub use errors::ServerError;
pub use llm::GeminiClient;
pub use llm::LlmClient;
pub use llm::QueryOrchestrator;
pub use normalize::normalize_get_key_metrics_params;
pub use orchestrator::Orchestrator;
pub use orchestrator::ToolOutcome;
pub use orchestrator::gather_partial;
pub use orchestrator::merge_metric_points;
pub use rate_limiter::RateLimitConfig;
pub use rate_limiter::RateLimitDecision;
pub use rate_limiter::RateLimiter;
pub use resources::ResourceRegistry;
pub use routes::AppState;
pub use routes::build_router;
pub use tools::ToolRouter;
