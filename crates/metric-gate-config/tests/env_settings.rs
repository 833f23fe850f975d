// crates/metric-gate-config/tests/env_settings.rs
// ============================================================================
// Module: Environment Settings Tests
// Description: Integration tests for environment-driven settings parsing.
// Purpose: Validate defaults, range enforcement, and LLM gating.
// Dependencies: metric-gate-config
// ============================================================================

//! ## Overview
//! Drives `EnvSettings::from_lookup` with synthetic environments to check
//! documented defaults, range validation, CORS parsing, and the
//! LLM-configured predicate.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::float_cmp,
    reason = "Test-only assertions use unwrap/expect and exact float checks."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use metric_gate_config::ConfigError;
use metric_gate_config::EnvSettings;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Builds settings from a map-backed environment.
fn from_map(entries: &[(&str, &str)]) -> Result<EnvSettings, ConfigError> {
    let map: BTreeMap<String, String> =
        entries.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    EnvSettings::from_lookup(|name| map.get(name).cloned())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn empty_environment_yields_defaults() {
    let settings = from_map(&[]).expect("settings");
    assert_eq!(settings.log_level, "info");
    assert_eq!(settings.http_token, None);
    assert!(settings.cors_origins.is_empty());
    assert_eq!(settings.llm_temperature, 0.1);
    assert_eq!(settings.llm_max_tokens, 4096);
    assert_eq!(settings.llm_max_iterations, 10);
    assert!(settings.rate_limit_enabled);
    assert_eq!(settings.rate_limit_requests_per_hour, 100);
    assert_eq!(settings.rate_limit_tokens_per_hour, 100_000);
    assert_eq!(settings.query_max_length, 2000);
    assert!(!settings.llm_configured());
}

#[test]
fn parses_cors_origins_as_comma_list() {
    let settings = from_map(&[(
        "DOMAIN_MCP_CORS_ORIGINS",
        "https://chat.example.com, https://other.example.com ,",
    )])
    .expect("settings");
    assert_eq!(
        settings.cors_origins,
        vec![
            "https://chat.example.com".to_string(),
            "https://other.example.com".to_string(),
        ]
    );
}

#[test]
fn llm_requires_provider_key_and_model() {
    let partial = from_map(&[("LLM_PROVIDER", "gemini"), ("LLM_API_KEY", "k")])
        .expect("settings");
    assert!(!partial.llm_configured());

    let full = from_map(&[
        ("LLM_PROVIDER", "gemini"),
        ("LLM_API_KEY", "k"),
        ("LLM_MODEL", "gemini-1.5-pro"),
    ])
    .expect("settings");
    assert!(full.llm_configured());
}

#[test]
fn enforces_temperature_range() {
    let settings = from_map(&[("LLM_TEMPERATURE", "0.7")]).expect("settings");
    assert_eq!(settings.llm_temperature, 0.7);

    let err = from_map(&[("LLM_TEMPERATURE", "1.5")]).expect_err("expected range error");
    assert!(matches!(err, ConfigError::Validation { .. }));
}

#[test]
fn enforces_iteration_bounds() {
    let settings = from_map(&[("LLM_MAX_ITERATIONS", "30")]).expect("settings");
    assert_eq!(settings.llm_max_iterations, 30);

    assert!(from_map(&[("LLM_MAX_ITERATIONS", "0")]).is_err());
    assert!(from_map(&[("LLM_MAX_ITERATIONS", "101")]).is_err());
}

#[test]
fn enforces_token_budget_floor() {
    assert!(from_map(&[("RATE_LIMIT_TOKENS_PER_HOUR", "999")]).is_err());
    let settings =
        from_map(&[("RATE_LIMIT_TOKENS_PER_HOUR", "50000")]).expect("settings");
    assert_eq!(settings.rate_limit_tokens_per_hour, 50_000);
}

#[test]
fn parses_rate_limit_toggle() {
    let off = from_map(&[("RATE_LIMIT_ENABLED", "false")]).expect("settings");
    assert!(!off.rate_limit_enabled);
    let on = from_map(&[("RATE_LIMIT_ENABLED", "1")]).expect("settings");
    assert!(on.rate_limit_enabled);
    assert!(from_map(&[("RATE_LIMIT_ENABLED", "maybe")]).is_err());
}

#[test]
fn enforces_query_length_bounds() {
    assert!(from_map(&[("QUERY_MAX_LENGTH", "99")]).is_err());
    assert!(from_map(&[("QUERY_MAX_LENGTH", "10001")]).is_err());
    let settings = from_map(&[("QUERY_MAX_LENGTH", "5000")]).expect("settings");
    assert_eq!(settings.query_max_length, 5000);
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let settings = from_map(&[("DOMAIN_MCP_HTTP_TOKEN", "   "), ("LLM_TEMPERATURE", "")])
        .expect("settings");
    assert_eq!(settings.http_token, None);
    assert_eq!(settings.llm_temperature, 0.1);
}
