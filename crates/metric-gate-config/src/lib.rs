// crates/metric-gate-config/src/lib.rs
// ============================================================================
// Module: Metric Gate Config
// Description: File- and environment-based configuration models.
// Purpose: Load and validate source connections, plugin flags, and runtime
//          settings before the application assembles.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Configuration comes from two places: a JSON file referenced by
//! `DOMAIN_MCP_CONFIG` (source connections and plugin enable flags) and
//! environment variables (logging, HTTP auth, CORS, LLM, and rate-limit
//! settings). Invalid values are startup errors; absent values take
//! documented defaults. Values are validated here so downstream crates can
//! trust their ranges.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("config file unreadable: {message}")]
    Io {
        /// Underlying I/O failure description.
        message: String,
    },
    /// Configuration file is not valid JSON for the expected shape.
    #[error("config file invalid: {message}")]
    Parse {
        /// Parse failure description.
        message: String,
    },
    /// A configuration value is out of its documented range.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Validation failure description.
        message: String,
    },
}

// ============================================================================
// SECTION: Source Configuration
// ============================================================================

/// Accepted source type spellings for HTTP-connected Horreum MCPs.
pub const HTTP_SOURCE_TYPES: [&str; 3] = ["horreum-mcp-http", "horreum", "http"];

/// Accepted source type spellings for stdio-connected Horreum MCPs.
pub const STDIO_SOURCE_TYPES: [&str; 3] = ["horreum-mcp-stdio", "horreum-stdio", "stdio"];

/// Accepted source type spellings for stdio-connected Elasticsearch MCPs.
pub const ELASTICSEARCH_SOURCE_TYPES: [&str; 2] = ["elasticsearch", "elasticsearch-stdio"];

/// Transport family a source type resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// HTTP JSON against a Horreum MCP.
    Http,
    /// Stdio JSON-RPC bridge to a Horreum MCP.
    Stdio,
    /// Stdio JSON-RPC bridge with the Elasticsearch mapping.
    Elasticsearch,
}

/// Configuration for a single Source MCP connection.
///
/// # Invariants
/// - `endpoint` is a URL for HTTP kinds and a command for stdio kinds.
/// - `backoff_multiplier` is at least 1.0 after validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// MCP endpoint URL or stdio command.
    pub endpoint: String,
    /// Optional bearer token used to authenticate to the source.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Source type identifier (see the accepted spellings).
    #[serde(default = "default_source_type", rename = "type")]
    pub source_type: String,
    /// Request timeout in seconds for adapter operations.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Number of retry attempts after the initial call.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial backoff in milliseconds.
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,
    /// Backoff multiplier per attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Arguments for the stdio command (stdio kinds only).
    #[serde(default)]
    pub stdio_args: Option<Vec<String>>,
    /// Environment variables for the stdio process (stdio kinds only).
    #[serde(default)]
    pub env: Option<BTreeMap<String, String>>,
}

/// Serde default for the source type.
fn default_source_type() -> String {
    "horreum-mcp-http".to_string()
}

/// Serde default for the request timeout.
const fn default_timeout_seconds() -> u64 {
    30
}

/// Serde default for retry attempts.
const fn default_max_retries() -> u32 {
    1
}

/// Serde default for the initial backoff.
const fn default_backoff_initial_ms() -> u64 {
    200
}

/// Serde default for the backoff multiplier.
const fn default_backoff_multiplier() -> f64 {
    2.0
}

impl SourceConfig {
    /// Resolves the source type string to its transport family.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for unknown type spellings.
    pub fn kind(&self) -> Result<SourceKind, ConfigError> {
        let source_type = self.source_type.as_str();
        if HTTP_SOURCE_TYPES.contains(&source_type) {
            return Ok(SourceKind::Http);
        }
        if STDIO_SOURCE_TYPES.contains(&source_type) {
            return Ok(SourceKind::Stdio);
        }
        if ELASTICSEARCH_SOURCE_TYPES.contains(&source_type) {
            return Ok(SourceKind::Elasticsearch);
        }
        Err(ConfigError::Validation {
            message: format!("unknown source type: {source_type}"),
        })
    }

    /// Validates value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "source endpoint must not be empty".to_string(),
            });
        }
        if self.timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                message: "timeout_seconds must be at least 1".to_string(),
            });
        }
        if self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Validation {
                message: "backoff_multiplier must be at least 1.0".to_string(),
            });
        }
        self.kind().map(|_| ())
    }
}

// ============================================================================
// SECTION: Application Configuration
// ============================================================================

/// Top-level application configuration from the JSON config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source connections keyed by logical source id.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
    /// Feature flags for dataset-type plugins by identifier.
    #[serde(default)]
    pub enabled_plugins: BTreeMap<String, bool>,
}

impl AppConfig {
    /// Loads and validates application config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable, unparsable, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            message: format!("{}: {err}", path.display()),
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|err| ConfigError::Parse {
            message: err.to_string(),
        })?;
        for (source_id, source) in &config.sources {
            source.validate().map_err(|err| ConfigError::Validation {
                message: format!("source '{source_id}': {err}"),
            })?;
        }
        Ok(config)
    }
}

// ============================================================================
// SECTION: Environment Settings
// ============================================================================

/// Environment-driven runtime settings.
///
/// # Invariants
/// - All numeric fields are within their documented ranges after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvSettings {
    /// Logging level name (e.g. `debug`, `info`).
    pub log_level: String,
    /// Bearer token protecting the HTTP tool surface, when set.
    pub http_token: Option<String>,
    /// Allowed CORS origins; empty disables CORS.
    pub cors_origins: Vec<String>,
    /// LLM provider name; `None` disables the natural-language endpoint.
    pub llm_provider: Option<String>,
    /// LLM API key.
    pub llm_api_key: Option<String>,
    /// LLM model name.
    pub llm_model: Option<String>,
    /// Custom Gemini endpoint for Vertex AI / corporate instances.
    pub llm_gemini_endpoint: Option<String>,
    /// Google Cloud project id for Vertex AI billing.
    pub llm_gemini_project: Option<String>,
    /// LLM sampling temperature in `0.0..=1.0`.
    pub llm_temperature: f64,
    /// Maximum tokens per LLM response.
    pub llm_max_tokens: u32,
    /// Maximum LLM orchestration iterations in `1..=100`.
    pub llm_max_iterations: u32,
    /// Whether the `/api/query` rate limiter is active.
    pub rate_limit_enabled: bool,
    /// Maximum requests per client per hour.
    pub rate_limit_requests_per_hour: u32,
    /// Maximum tokens per client per hour.
    pub rate_limit_tokens_per_hour: u64,
    /// Admin key bypassing rate limits, when set.
    pub rate_limit_admin_key: Option<String>,
    /// Maximum accepted natural-language query length.
    pub query_max_length: usize,
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            http_token: None,
            cors_origins: Vec::new(),
            llm_provider: None,
            llm_api_key: None,
            llm_model: None,
            llm_gemini_endpoint: None,
            llm_gemini_project: None,
            llm_temperature: 0.1,
            llm_max_tokens: 4096,
            llm_max_iterations: 10,
            rate_limit_enabled: true,
            rate_limit_requests_per_hour: 100,
            rate_limit_tokens_per_hour: 100_000,
            rate_limit_admin_key: None,
            query_max_length: 2000,
        }
    }
}

impl EnvSettings {
    /// Reads settings from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for unparsable or out-of-range
    /// values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings from an arbitrary lookup (testing and embedding).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for unparsable or out-of-range
    /// values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        if let Some(level) = non_empty(lookup("DOMAIN_MCP_LOG_LEVEL")) {
            settings.log_level = level.to_lowercase();
        }
        settings.http_token = non_empty(lookup("DOMAIN_MCP_HTTP_TOKEN"));
        if let Some(origins) = non_empty(lookup("DOMAIN_MCP_CORS_ORIGINS")) {
            settings.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        settings.llm_provider = non_empty(lookup("LLM_PROVIDER"));
        settings.llm_api_key = non_empty(lookup("LLM_API_KEY"));
        settings.llm_model = non_empty(lookup("LLM_MODEL"));
        settings.llm_gemini_endpoint = non_empty(lookup("LLM_GEMINI_ENDPOINT"));
        settings.llm_gemini_project = non_empty(lookup("LLM_GEMINI_PROJECT"));
        if let Some(raw) = non_empty(lookup("LLM_TEMPERATURE")) {
            settings.llm_temperature = parse_ranged_f64("LLM_TEMPERATURE", &raw, 0.0, 1.0)?;
        }
        if let Some(raw) = non_empty(lookup("LLM_MAX_TOKENS")) {
            settings.llm_max_tokens =
                parse_ranged_u64("LLM_MAX_TOKENS", &raw, 1, 32_768).map(u64_to_u32)?;
        }
        if let Some(raw) = non_empty(lookup("LLM_MAX_ITERATIONS")) {
            settings.llm_max_iterations =
                parse_ranged_u64("LLM_MAX_ITERATIONS", &raw, 1, 100).map(u64_to_u32)?;
        }
        if let Some(raw) = non_empty(lookup("RATE_LIMIT_ENABLED")) {
            settings.rate_limit_enabled = parse_bool("RATE_LIMIT_ENABLED", &raw)?;
        }
        if let Some(raw) = non_empty(lookup("RATE_LIMIT_REQUESTS_PER_HOUR")) {
            settings.rate_limit_requests_per_hour =
                parse_ranged_u64("RATE_LIMIT_REQUESTS_PER_HOUR", &raw, 1, u64::from(u32::MAX))
                    .map(u64_to_u32)?;
        }
        if let Some(raw) = non_empty(lookup("RATE_LIMIT_TOKENS_PER_HOUR")) {
            settings.rate_limit_tokens_per_hour =
                parse_ranged_u64("RATE_LIMIT_TOKENS_PER_HOUR", &raw, 1000, u64::MAX)?;
        }
        settings.rate_limit_admin_key = non_empty(lookup("RATE_LIMIT_ADMIN_KEY"));
        if let Some(raw) = non_empty(lookup("QUERY_MAX_LENGTH")) {
            let value = parse_ranged_u64("QUERY_MAX_LENGTH", &raw, 100, 10_000)?;
            settings.query_max_length = usize::try_from(value).unwrap_or(10_000);
        }
        Ok(settings)
    }

    /// Returns true when the LLM endpoint has everything it needs.
    #[must_use]
    pub const fn llm_configured(&self) -> bool {
        self.llm_provider.is_some() && self.llm_api_key.is_some() && self.llm_model.is_some()
    }
}

/// Normalizes an optional env value, dropping empty strings.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Parses a boolean env value ("true"/"false"/"1"/"0").
fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::Validation {
            message: format!("{name} must be a boolean, got '{other}'"),
        }),
    }
}

/// Parses a ranged integer env value.
fn parse_ranged_u64(name: &str, raw: &str, min: u64, max: u64) -> Result<u64, ConfigError> {
    let value = raw.trim().parse::<u64>().map_err(|_| ConfigError::Validation {
        message: format!("{name} must be an integer, got '{raw}'"),
    })?;
    if value < min || value > max {
        return Err(ConfigError::Validation {
            message: format!("{name} must be in {min}..={max}, got {value}"),
        });
    }
    Ok(value)
}

/// Parses a ranged float env value.
fn parse_ranged_f64(name: &str, raw: &str, min: f64, max: f64) -> Result<f64, ConfigError> {
    let value = raw.trim().parse::<f64>().map_err(|_| ConfigError::Validation {
        message: format!("{name} must be a number, got '{raw}'"),
    })?;
    if !(min..=max).contains(&value) {
        return Err(ConfigError::Validation {
            message: format!("{name} must be in {min}..={max}, got {value}"),
        });
    }
    Ok(value)
}

/// Narrows a range-checked u64 into u32.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Callers range-check the value below u32::MAX first."
)]
const fn u64_to_u32(value: u64) -> u32 {
    value as u32
}
