// crates/metric-gate-adapters/src/http.rs
// ============================================================================
// Module: Horreum HTTP Adapter
// Description: Source MCP adapter speaking HTTP JSON to a Horreum MCP.
// Purpose: Translate contract calls to Horreum tool endpoints with retry,
//          session re-initialization, and circuit breaking.
// Dependencies: metric-gate-contract, reqwest, serde_json, tokio
// ============================================================================

//! ## Overview
//! Each contract operation becomes a `POST /api/tools/<tool>` with a JSON
//! body. Horreum emits numeric identifiers, so ids are coerced to integers
//! on egress and back to strings on ingress to satisfy the string-typed
//! contract. Failures are classified for retry: connect errors, timeouts,
//! 429, and 5xx retry with exponential backoff; 401/403/440 or a session
//! header trigger `POST /mcp/initialize` before the retry; any other 4xx is
//! fatal and carries a truncated body preview. A circuit breaker guards
//! every round-trip and rate-limit headers are captured from every response.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use metric_gate_contract::ArtifactsGetRequest;
use metric_gate_contract::ArtifactsGetResponse;
use metric_gate_contract::ContractVersion;
use metric_gate_contract::DatasetLabelValuesRequest;
use metric_gate_contract::DatasetLabelValuesResponse;
use metric_gate_contract::DatasetsGetRequest;
use metric_gate_contract::DatasetsGetResponse;
use metric_gate_contract::DatasetsSearchRequest;
use metric_gate_contract::DatasetsSearchResponse;
use metric_gate_contract::RunLabelValuesRequest;
use metric_gate_contract::RunLabelValuesResponse;
use metric_gate_contract::RunsListRequest;
use metric_gate_contract::RunsListResponse;
use metric_gate_contract::SourceCapabilities;
use metric_gate_contract::SourceDescribeRequest;
use metric_gate_contract::SourceDescribeResponse;
use metric_gate_contract::SourceLimits;
use metric_gate_contract::SourceType;
use metric_gate_contract::TestLabelValuesRequest;
use metric_gate_contract::TestLabelValuesResponse;
use metric_gate_contract::TestsListRequest;
use metric_gate_contract::TestsListResponse;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tokio::sync::Mutex;

use crate::AdapterError;
use crate::SourceAdapter;
use crate::breaker::CircuitBreaker;
use crate::breaker::CircuitBreakerConfig;
use crate::breaker::RateLimitInfo;
use crate::breaker::extract_rate_limit_info;
use crate::breaker::retry_sleep_hint;
use crate::truncate_body_preview;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Implementation version advertised by `source.describe`.
const ADAPTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound applied to `Retry-After` sleep hints, in seconds.
const MAX_RETRY_SLEEP_SECONDS: f64 = 30.0;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the Horreum HTTP adapter.
///
/// # Invariants
/// - `backoff_multiplier` is clamped to at least 1.0 at construction.
/// - Session re-initialization triggers are configurable rather than
///   hard-coded in the request loop.
#[derive(Debug, Clone, PartialEq)]
pub struct HorreumHttpConfig {
    /// Base URL of the Horreum MCP HTTP API.
    pub endpoint: String,
    /// Optional bearer token attached to every request.
    pub api_key: Option<String>,
    /// Request timeout in seconds for all HTTP operations.
    pub timeout_seconds: u64,
    /// Number of retry attempts after the initial call.
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds.
    pub backoff_initial_ms: u64,
    /// Backoff multiplier applied per attempt.
    pub backoff_multiplier: f64,
    /// Statuses that trigger session re-initialization before retrying.
    pub session_reinit_statuses: Vec<u16>,
    /// Response headers that trigger session re-initialization.
    pub session_reinit_headers: Vec<String>,
}

impl HorreumHttpConfig {
    /// Creates a configuration with default retry and session policy.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout_seconds: 30,
            max_retries: 1,
            backoff_initial_ms: 200,
            backoff_multiplier: 2.0,
            session_reinit_statuses: vec![401, 403, 440],
            session_reinit_headers: vec![
                "mcp-session-reinit".to_string(),
                "mcp-session-id-expired".to_string(),
            ],
        }
    }
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// Source MCP adapter for a Horreum MCP reachable over HTTP.
///
/// # Invariants
/// - `session_id` is only written after a successful `/mcp/initialize`.
/// - Every round-trip passes through the circuit breaker.
pub struct HorreumHttpAdapter {
    /// Adapter configuration.
    config: HorreumHttpConfig,
    /// Shared async HTTP client.
    client: reqwest::Client,
    /// MCP session id captured from the backend, when initialized.
    session_id: Mutex<Option<String>>,
    /// Per-adapter circuit breaker.
    breaker: CircuitBreaker,
    /// Rate-limit information from the most recent response.
    last_rate_limit: Mutex<Option<RateLimitInfo>>,
}

impl HorreumHttpAdapter {
    /// Creates an adapter for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Connection`] when the HTTP client cannot be
    /// constructed.
    pub fn new(name: impl Into<String>, mut config: HorreumHttpConfig) -> Result<Self, AdapterError> {
        config.backoff_multiplier = config.backoff_multiplier.max(1.0);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|err| AdapterError::Connection {
                message: format!("http client build failed: {err}"),
            })?;
        let name = name.into();
        tracing::info!(
            endpoint = %config.endpoint,
            timeout_seconds = config.timeout_seconds,
            "horreum.adapter.init"
        );
        Ok(Self {
            config,
            client,
            session_id: Mutex::new(None),
            breaker: CircuitBreaker::new(name, CircuitBreakerConfig::default()),
            last_rate_limit: Mutex::new(None),
        })
    }

    /// Returns rate-limit information from the most recent response.
    pub async fn last_rate_limit(&self) -> Option<RateLimitInfo> {
        *self.last_rate_limit.lock().await
    }

    /// Returns the adapter's circuit breaker for observability.
    #[must_use]
    pub const fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// POSTs JSON to a tool endpoint with the full retry lifecycle.
    ///
    /// # Errors
    ///
    /// Returns the final classified [`AdapterError`] after retries are
    /// exhausted or a fatal client error is observed.
    async fn post_json(&self, path: &str, payload: Value) -> Result<Value, AdapterError> {
        let url = format!("{}{path}", self.config.endpoint.trim_end_matches('/'));
        let mut attempt: u32 = 0;
        loop {
            self.breaker.preflight().await?;
            tracing::debug!(path, attempt, "horreum.http.post");
            match self.send_once(&url, &payload).await {
                Ok(body) => {
                    self.breaker.on_success().await;
                    return Ok(body);
                }
                Err(outcome) => {
                    self.breaker.on_failure(&outcome.error).await;
                    if !outcome.retryable || attempt >= self.config.max_retries {
                        if let AdapterError::Status {
                            status,
                            body_preview,
                        } = &outcome.error
                        {
                            tracing::error!(
                                path,
                                status,
                                body_preview = %body_preview,
                                "horreum.http.status_error"
                            );
                        }
                        return Err(outcome.error);
                    }
                    if outcome.reinit_session {
                        self.init_session().await;
                    }
                    self.sleep_before_retry(attempt, outcome.retry_after).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Sends a single POST and classifies the outcome.
    async fn send_once(&self, url: &str, payload: &Value) -> Result<Value, CallFailure> {
        let mut request = self.client.post(url).json(payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        {
            let session = self.session_id.lock().await;
            if let Some(session_id) = session.as_ref() {
                request = request.header("mcp-session-id", session_id.clone());
            }
        }
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                return Err(self.classify_transport_error(&err));
            }
        };

        let headers = response.headers().clone();
        let rate_limit = extract_rate_limit_info(|name| {
            headers.get(name).and_then(|value| value.to_str().ok())
        });
        *self.last_rate_limit.lock().await = Some(rate_limit);

        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return serde_json::from_str::<Value>(&body).map_err(|err| CallFailure {
                error: AdapterError::Json {
                    message: err.to_string(),
                },
                retryable: false,
                reinit_session: false,
                retry_after: None,
            });
        }

        let reinit_header = self
            .config
            .session_reinit_headers
            .iter()
            .any(|name| headers.contains_key(name.as_str()));
        let reinit_status = self.config.session_reinit_statuses.contains(&status);
        let body = response.text().await.unwrap_or_default();
        let error = AdapterError::Status {
            status,
            body_preview: truncate_body_preview(&body),
        };
        let retryable = reinit_header || reinit_status || status == 429 || status >= 500;
        let retry_after = if status == 429 {
            retry_sleep_hint(&rate_limit, MAX_RETRY_SLEEP_SECONDS)
        } else {
            None
        };
        Err(CallFailure {
            error,
            retryable,
            reinit_session: reinit_header || reinit_status,
            retry_after,
        })
    }

    /// Classifies a reqwest transport error into a retryable failure.
    fn classify_transport_error(&self, err: &reqwest::Error) -> CallFailure {
        let error = if err.is_timeout() {
            tracing::warn!(
                timeout_seconds = self.config.timeout_seconds,
                "horreum.http.timeout"
            );
            AdapterError::Timeout {
                seconds: self.config.timeout_seconds,
            }
        } else {
            AdapterError::Connection {
                message: err.to_string(),
            }
        };
        CallFailure {
            error,
            retryable: true,
            reinit_session: false,
            retry_after: None,
        }
    }

    /// Sleeps the exponential backoff (or a server-provided hint) before a retry.
    async fn sleep_before_retry(&self, attempt: u32, retry_after: Option<Duration>) {
        let backoff_ms = backoff_millis(
            self.config.backoff_initial_ms,
            self.config.backoff_multiplier,
            attempt,
        );
        let mut delay = Duration::from_millis(backoff_ms);
        if let Some(hint) = retry_after {
            delay = delay.max(hint);
        }
        tokio::time::sleep(delay).await;
    }

    /// Initializes an MCP session, storing the returned session id.
    ///
    /// Failures are swallowed; the retried call will surface them if the
    /// session is genuinely required.
    async fn init_session(&self) {
        let url = format!("{}/mcp/initialize", self.config.endpoint.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&json!({}));
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        let Ok(response) = request.send().await else {
            return;
        };
        if !response.status().is_success() {
            return;
        }
        let header_session = response
            .headers()
            .get("mcp-session-id")
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let body_session = body
            .get("session_id")
            .or_else(|| body.get("sessionId"))
            .and_then(Value::as_str)
            .filter(|session| !session.is_empty())
            .map(ToString::to_string);
        if let Some(session_id) = body_session.or(header_session) {
            tracing::info!("horreum.session.initialized");
            *self.session_id.lock().await = Some(session_id);
        }
    }
}

/// Classified outcome of one HTTP attempt.
struct CallFailure {
    /// The surfaced error.
    error: AdapterError,
    /// Whether the attempt may be retried.
    retryable: bool,
    /// Whether session re-initialization should run before the retry.
    reinit_session: bool,
    /// Optional server-provided sleep hint.
    retry_after: Option<Duration>,
}

/// Computes the exponential backoff delay for an attempt.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    reason = "Backoff delays are small positive millisecond values."
)]
fn backoff_millis(initial_ms: u64, multiplier: f64, attempt: u32) -> u64 {
    let factor = multiplier.max(1.0).powi(i32::try_from(attempt).unwrap_or(i32::MAX));
    (initial_ms as f64 * factor) as u64
}

// ============================================================================
// SECTION: ID Coercion
// ============================================================================

/// Coerces a string field to an integer for Horreum-specific endpoints.
fn coerce_field_to_int(payload: &mut Map<String, Value>, key: &str) {
    if let Some(Value::String(text)) = payload.get(key) {
        if let Ok(number) = text.parse::<i64>() {
            payload.insert(key.to_string(), json!(number));
        }
    }
}

/// Coerces every string element of a list field to an integer.
fn coerce_list_to_int(payload: &mut Map<String, Value>, key: &str) {
    let Some(Value::Array(items)) = payload.get(key) else {
        return;
    };
    let coerced: Vec<Value> = items
        .iter()
        .map(|item| match item {
            Value::String(text) => {
                text.parse::<i64>().map_or_else(|_| item.clone(), |number| json!(number))
            }
            other => other.clone(),
        })
        .collect();
    payload.insert(key.to_string(), Value::Array(coerced));
}

/// Coerces a numeric field to a string for contract validation.
fn coerce_field_to_string(object: &mut Map<String, Value>, key: &str) {
    if let Some(Value::Number(number)) = object.get(key) {
        let text = number.to_string();
        object.insert(key.to_string(), Value::String(text));
    }
}

/// Coerces identifier fields to strings on every element of a list field.
fn coerce_ids_in_items(body: &mut Value, list_key: &str, id_keys: &[&str]) {
    let Some(Value::Array(items)) = body.get_mut(list_key) else {
        return;
    };
    for item in items {
        if let Value::Object(object) = item {
            for key in id_keys {
                coerce_field_to_string(object, key);
            }
            // Nested label-value ids also arrive numeric from Horreum.
            if let Some(Value::Array(values)) = object.get_mut("values") {
                for value in values {
                    if let Value::Object(value_object) = value {
                        coerce_field_to_string(value_object, "id");
                    }
                }
            }
        }
    }
}

/// Serializes a contract request into a JSON object map.
fn request_to_map<T: serde::Serialize>(req: &T) -> Result<Map<String, Value>, AdapterError> {
    match serde_json::to_value(req) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AdapterError::Protocol {
            message: "contract request did not serialize to an object".to_string(),
        }),
        Err(err) => Err(AdapterError::Json {
            message: err.to_string(),
        }),
    }
}

/// Deserializes a backend body into a contract response type.
fn response_from_value<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, AdapterError> {
    serde_json::from_value(body).map_err(|err| AdapterError::Json {
        message: err.to_string(),
    })
}

// ============================================================================
// SECTION: Contract Implementation
// ============================================================================

#[async_trait]
impl SourceAdapter for HorreumHttpAdapter {
    async fn source_describe(
        &self,
        _req: SourceDescribeRequest,
    ) -> Result<SourceDescribeResponse, AdapterError> {
        // Answered locally; capability declaration needs no round-trip.
        Ok(SourceDescribeResponse {
            source_type: SourceType::Horreum,
            version: ADAPTER_VERSION.to_string(),
            contract_version: ContractVersion::V1_0_0,
            capabilities: SourceCapabilities::default(),
            limits: Some(SourceLimits {
                max_page_size: Some(1000),
                max_dataset_size: None,
                rate_limit_per_minute: None,
            }),
        })
    }

    async fn tests_list(&self, req: TestsListRequest) -> Result<TestsListResponse, AdapterError> {
        // Horreum MCP uses "name" for text search and "limit" for page size.
        let mut payload = Map::new();
        if let Some(query) = &req.query {
            payload.insert("name".to_string(), json!(query));
        }
        payload.insert("limit".to_string(), json!(req.page_size));
        if let Some(page_token) = &req.page_token {
            payload.insert("page_token".to_string(), json!(page_token));
        }
        let mut body = self.post_json("/api/tools/horreum_list_tests", Value::Object(payload)).await?;
        coerce_ids_in_items(&mut body, "tests", &["id", "test_id"]);
        response_from_value(body)
    }

    async fn runs_list(&self, req: RunsListRequest) -> Result<RunsListResponse, AdapterError> {
        let mut payload = request_to_map(&req)?;
        coerce_field_to_int(&mut payload, "test_id");
        let mut body = self.post_json("/api/tools/horreum_list_runs", Value::Object(payload)).await?;
        coerce_ids_in_items(&mut body, "runs", &["run_id", "test_id"]);
        response_from_value(body)
    }

    async fn datasets_search(
        &self,
        req: DatasetsSearchRequest,
    ) -> Result<DatasetsSearchResponse, AdapterError> {
        let mut payload = request_to_map(&req)?;
        coerce_field_to_int(&mut payload, "test_id");
        coerce_list_to_int(&mut payload, "run_ids");
        let mut body =
            self.post_json("/api/tools/horreum_list_datasets", Value::Object(payload)).await?;
        coerce_ids_in_items(&mut body, "datasets", &["dataset_id", "run_id", "test_id"]);
        response_from_value(body)
    }

    async fn datasets_get(
        &self,
        req: DatasetsGetRequest,
    ) -> Result<DatasetsGetResponse, AdapterError> {
        let mut payload = request_to_map(&req)?;
        coerce_field_to_int(&mut payload, "dataset_id");
        let mut body =
            self.post_json("/api/tools/horreum_get_dataset", Value::Object(payload)).await?;
        if let Value::Object(object) = &mut body {
            coerce_field_to_string(object, "dataset_id");
            coerce_field_to_string(object, "run_id");
            coerce_field_to_string(object, "test_id");
        }
        response_from_value(body)
    }

    async fn artifacts_get(
        &self,
        req: ArtifactsGetRequest,
    ) -> Result<ArtifactsGetResponse, AdapterError> {
        let mut payload = request_to_map(&req)?;
        coerce_field_to_int(&mut payload, "run_id");
        let mut body =
            self.post_json("/api/tools/horreum_get_artifact", Value::Object(payload)).await?;
        if let Value::Object(object) = &mut body {
            coerce_field_to_string(object, "run_id");
        }
        response_from_value(body)
    }

    async fn get_run_label_values(
        &self,
        req: RunLabelValuesRequest,
    ) -> Result<RunLabelValuesResponse, AdapterError> {
        let mut payload = request_to_map(&req)?;
        coerce_field_to_int(&mut payload, "run_id");
        let mut body = self
            .post_json("/api/tools/horreum_get_run_label_values", Value::Object(payload))
            .await?;
        coerce_ids_in_items(&mut body, "items", &["run_id", "dataset_id"]);
        response_from_value(body)
    }

    async fn get_test_label_values(
        &self,
        req: TestLabelValuesRequest,
    ) -> Result<TestLabelValuesResponse, AdapterError> {
        let mut payload = request_to_map(&req)?;
        coerce_field_to_int(&mut payload, "test_id");
        let mut body = self
            .post_json("/api/tools/horreum_get_test_label_values", Value::Object(payload))
            .await?;
        coerce_ids_in_items(&mut body, "items", &["run_id", "dataset_id"]);
        response_from_value(body)
    }

    async fn get_dataset_label_values(
        &self,
        req: DatasetLabelValuesRequest,
    ) -> Result<DatasetLabelValuesResponse, AdapterError> {
        let mut payload = request_to_map(&req)?;
        coerce_field_to_int(&mut payload, "dataset_id");
        let mut body = self
            .post_json("/api/tools/horreum_get_dataset_label_values", Value::Object(payload))
            .await?;
        if let Some(Value::Array(values)) = body.get_mut("values") {
            for value in values {
                if let Value::Object(object) = value {
                    coerce_field_to_string(object, "id");
                }
            }
        }
        response_from_value(body)
    }
}
