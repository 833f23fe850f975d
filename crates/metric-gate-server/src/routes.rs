// crates/metric-gate-server/src/routes.rs
// ============================================================================
// Module: HTTP Surface
// Description: Axum routes for REST tools, resources, MCP transports, and
//              the natural-language query endpoint.
// Purpose: Expose the Domain MCP over HTTP with uniform errors, bearer auth,
//          CORS, correlation, and request telemetry.
// Dependencies: axum, tower-http, metric-gate-* crates
// ============================================================================

//! ## Overview
//! The router mirrors the tool surface three ways: REST (`/tools/*`),
//! JSON-RPC MCP (`/mcp` SSE-framed and `/mcp/http` plain), and the
//! LLM-driven `/api/query`. Health, readiness, capabilities, and resources
//! stay unauthenticated; tool, query, and MCP routes require the bearer
//! token when `DOMAIN_MCP_HTTP_TOKEN` is set. Every response flows through
//! the correlation/telemetry middleware, and every error serializes into the
//! uniform `{"detail": {...}}` envelope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::extract::MatchedPath;
use axum::extract::Path;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use metric_gate_adapters::AdapterRegistry;
use metric_gate_config::EnvSettings;
use metric_gate_core::DOMAIN_MODEL_VERSION;
use metric_gate_plugins::PluginRegistry;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;

use crate::correlation::CORRELATION_HEADER;
use crate::correlation::CorrelationContext;
use crate::correlation::CorrelationIdGenerator;
use crate::errors::ServerError;
use crate::llm::LlmClient;
use crate::llm::QueryOrchestrator;
use crate::llm::ToolCallTrace;
use crate::rate_limiter::RateLimitDecision;
use crate::rate_limiter::RateLimiter;
use crate::resources::ResourceRegistry;
use crate::telemetry::MetricsSink;
use crate::telemetry::RequestMetricEvent;
use crate::telemetry::RequestOutcome;
use crate::tools::DebugExtractRequest;
use crate::tools::ToolRouter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prompt-injection markers rejected in natural-language queries.
const SUSPICIOUS_QUERY_PATTERNS: [&str; 6] =
    ["\\X00", "\u{0}", "IGNORE PREVIOUS", "IGNORE ALL", "SYSTEM:", "</S>"];

/// Model control token rejected in natural-language queries.
const ENDOFTEXT_MARKER: &str = "<|ENDOFTEXT|>";

// ============================================================================
// SECTION: Application State
// ============================================================================

/// Shared state behind every route.
pub struct AppState {
    /// Shared tool dispatcher.
    pub tools: Arc<ToolRouter>,
    /// Resources registry.
    pub resources: Arc<ResourceRegistry>,
    /// Plugin registry (capabilities listing).
    pub plugins: Arc<PluginRegistry>,
    /// Adapter registry (capabilities listing).
    pub adapters: Arc<AdapterRegistry>,
    /// Environment-driven settings.
    pub settings: EnvSettings,
    /// Per-client rate limiter for the query endpoint.
    pub rate_limiter: Arc<RateLimiter>,
    /// LLM client; `None` disables `/api/query`.
    pub llm: Option<Arc<dyn LlmClient>>,
    /// Correlation id generator.
    pub correlation: Arc<CorrelationIdGenerator>,
    /// Request metrics sink.
    pub metrics: Arc<dyn MetricsSink>,
}

/// Builds the full application router with middleware applied.
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/capabilities", get(capabilities))
        .route("/resources", get(list_resources))
        .route("/resources/{category}/{name}", get(read_resource))
        .route("/tools/get_key_metrics", post(get_key_metrics))
        .route("/tools/get_key_metrics_raw", post(get_key_metrics_raw))
        .route("/debug/extract", post(debug_extract))
        .route("/api/query", post(api_query))
        .route("/mcp", post(mcp_sse))
        .route("/mcp/http", post(mcp_http));

    if !state.settings.cors_origins.is_empty() {
        let origins: Vec<HeaderValue> = state
            .settings
            .cors_origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();
        router = router.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );
    }

    router
        .layer(axum::middleware::from_fn_with_state(Arc::clone(&state), observe))
        .with_state(state)
}

// ============================================================================
// SECTION: Middleware
// ============================================================================

/// Correlation and telemetry middleware around every route.
async fn observe(
    State(state): State<Arc<AppState>>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |path| path.as_str().to_string());
    let header = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok());
    let correlation = CorrelationContext::from_header(header, &state.correlation);

    let mut response = next.run(request).await;

    let status = response.status().as_u16();
    let outcome =
        if response.status().is_success() { RequestOutcome::Ok } else { RequestOutcome::Error };
    state.metrics.record_request(&RequestMetricEvent {
        route,
        outcome,
        status,
        duration: started.elapsed(),
        correlation_id: correlation.server_id.clone(),
    });
    if let Ok(value) = HeaderValue::from_str(correlation.request_id()) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

/// Checks the bearer token on protected routes.
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = &state.settings.http_token else {
        return Ok(());
    };
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if provided == Some(expected.as_str()) {
        return Ok(());
    }
    let envelope = json!({
        "detail": {
            "detail": "missing or invalid bearer token",
            "error_type": "http_error",
        }
    });
    Err((StatusCode::UNAUTHORIZED, Json(envelope)).into_response())
}

/// Unwraps a JSON body rejection into the uniform validation envelope.
fn json_body(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Map<String, Value>, ServerError> {
    let Json(value) = body.map_err(|rejection| ServerError::validation(rejection.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ServerError::validation(format!(
            "request body must be a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// JSON type label for validation messages.
const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Client identity for rate limiting: forwarded address or `unknown`.
fn client_identity(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map_or_else(|| "unknown".to_string(), |ip| ip.trim().to_string())
}

// ============================================================================
// SECTION: Health and Capabilities
// ============================================================================

/// Liveness probe (never authenticated).
async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Readiness probe (never authenticated).
async fn ready() -> Json<Value> {
    Json(json!({"status": "ready"}))
}

/// Server capabilities summary.
async fn capabilities(State(state): State<Arc<AppState>>) -> Json<Value> {
    let tools = vec!["get_key_metrics", "get_key_metrics_raw"];
    let plugins = state.plugins.plugin_ids();
    let sources = state.adapters.source_ids();
    Json(json!({
        "domain_version": DOMAIN_MODEL_VERSION,
        "http_auth": if state.settings.http_token.is_some() { "enabled" } else { "disabled" },
        "cors_origins": state.settings.cors_origins,
        "modes": {
            "raw": true,
            "source_driven": !sources.is_empty(),
        },
        "tools": tools,
        "plugins": plugins,
        "sources": sources,
    }))
}

// ============================================================================
// SECTION: Resources
// ============================================================================

/// Lists MCP resources (metadata only).
async fn list_resources(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({"resources": state.resources.list_resources()}))
}

/// Reads one MCP resource by category and name.
async fn read_resource(
    State(state): State<Arc<AppState>>,
    Path((category, name)): Path<(String, String)>,
) -> Response {
    let uri = format!("domain://{category}/{name}");
    match state.resources.read_resource(&uri) {
        Some(contents) => Json(contents).into_response(),
        None => {
            let envelope = json!({
                "detail": {
                    "detail": format!("resource not found: {uri}"),
                    "error_type": "http_error",
                }
            });
            (StatusCode::NOT_FOUND, Json(envelope)).into_response()
        }
    }
}

// ============================================================================
// SECTION: Tool Endpoints
// ============================================================================

/// `POST /tools/get_key_metrics` (bearer-protected).
async fn get_key_metrics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    let params = match json_body(body) {
        Ok(params) => params,
        Err(error) => return error.into_response(),
    };
    match state.tools.get_key_metrics(params).await {
        Ok(result) => Json(result).into_response(),
        Err(error) => error.into_response(),
    }
}

/// `POST /tools/get_key_metrics_raw` (bearer-protected).
async fn get_key_metrics_raw(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    let params = match json_body(body) {
        Ok(params) => params,
        Err(error) => return error.into_response(),
    };
    match state.tools.get_key_metrics_raw(params).await {
        Ok(result) => Json(result).into_response(),
        Err(error) => error.into_response(),
    }
}

/// `POST /debug/extract` diagnostic endpoint.
async fn debug_extract(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let params = match json_body(body) {
        Ok(params) => params,
        Err(error) => return error.into_response(),
    };
    let request: DebugExtractRequest = match serde_json::from_value(Value::Object(params)) {
        Ok(request) => request,
        Err(err) => return ServerError::validation(err.to_string()).into_response(),
    };
    match state.tools.debug_extract(request).await {
        Ok(response) => Json(response).into_response(),
        Err(error) => error.into_response(),
    }
}

// ============================================================================
// SECTION: Natural-Language Query
// ============================================================================

/// Request body for `/api/query`.
#[derive(Debug, Deserialize)]
struct QueryRequest {
    /// Natural-language query text.
    query: String,
    /// Optional admin key bypassing rate limits.
    #[serde(default)]
    admin_key: Option<String>,
}

/// Response body for `/api/query`.
#[derive(Debug, Serialize)]
struct QueryResponse {
    /// Echoed query text.
    query: String,
    /// Final answer from the orchestration loop.
    answer: String,
    /// Execution metadata (counts, durations, rate-limit stats).
    metadata: Value,
    /// Executed tool calls in order.
    tool_calls: Vec<ToolCallTrace>,
}

/// `POST /api/query` (bearer-protected, rate-limited).
async fn api_query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    let params = match json_body(body) {
        Ok(params) => params,
        Err(error) => return error.into_response(),
    };
    let request: QueryRequest = match serde_json::from_value(Value::Object(params)) {
        Ok(request) => request,
        Err(err) => return ServerError::validation(err.to_string()).into_response(),
    };

    let Some(llm) = state.llm.clone() else {
        let envelope = json!({
            "detail": {
                "detail": "LLM not configured; set LLM_PROVIDER, LLM_API_KEY, and LLM_MODEL",
                "error_type": "missing_configuration",
            }
        });
        return (StatusCode::SERVICE_UNAVAILABLE, Json(envelope)).into_response();
    };

    let query = request.query.trim().to_string();
    if let Err(error) = validate_query(&query, state.settings.query_max_length) {
        return error.into_response();
    }

    let client_id = client_identity(&headers);
    match state.rate_limiter.check(&client_id, request.admin_key.as_deref()) {
        RateLimitDecision::Allowed => {}
        RateLimitDecision::Denied {
            message,
            retry_after_seconds,
        } => {
            let envelope = json!({
                "detail": {
                    "detail": message,
                    "error_type": "rate_limit_exceeded",
                    "retry_after_seconds": retry_after_seconds,
                }
            });
            return (StatusCode::TOO_MANY_REQUESTS, Json(envelope)).into_response();
        }
    }

    tracing::info!(client_id = %client_id, query_length = query.len(), "api.query.start");
    let orchestrator = QueryOrchestrator::new(
        llm,
        state.tools.llm_tool_handlers(),
        state.settings.llm_max_iterations,
        state.settings.llm_temperature,
        state.settings.llm_max_tokens,
    );
    match orchestrator.execute_query(&query).await {
        Ok(result) => {
            state.rate_limiter.record(&client_id, result.total_tokens);
            let rate_stats = state.rate_limiter.client_stats(&client_id);
            tracing::info!(
                client_id = %client_id,
                tool_calls = result.tool_calls.len(),
                llm_calls = result.llm_calls,
                total_tokens = result.total_tokens,
                duration_ms = result.total_duration_ms,
                "api.query.complete"
            );
            let response = QueryResponse {
                query,
                answer: result.answer,
                metadata: json!({
                    "tool_calls": result.tool_calls.len(),
                    "llm_calls": result.llm_calls,
                    "duration_ms": result.total_duration_ms,
                    "total_tokens": result.total_tokens,
                    "rate_limit": rate_stats,
                }),
                tool_calls: result.tool_calls,
            };
            Json(response).into_response()
        }
        Err(error) => {
            tracing::error!(error = %error, "api.query.failed");
            if error.is_rate_limited() {
                let envelope = json!({
                    "detail": {
                        "detail": format!("LLM API rate limit exceeded: {error}"),
                        "error_type": "rate_limit_exceeded",
                    }
                });
                return (StatusCode::TOO_MANY_REQUESTS, Json(envelope)).into_response();
            }
            ServerError::internal("query processing failed; see server logs").into_response()
        }
    }
}

/// Validates a natural-language query for length and injection markers.
fn validate_query(query: &str, max_length: usize) -> Result<(), ServerError> {
    if query.is_empty() {
        return Err(ServerError::validation("query cannot be empty"));
    }
    let length = query.chars().count();
    if length > max_length {
        return Err(ServerError::validation(format!(
            "query too long ({length} > {max_length} characters)"
        )));
    }
    let upper = query.to_uppercase();
    let injected = SUSPICIOUS_QUERY_PATTERNS
        .iter()
        .any(|pattern| upper.contains(pattern))
        || upper.contains(ENDOFTEXT_MARKER);
    if injected {
        let prefix: String = query.chars().take(100).collect();
        tracing::warn!(query_prefix = %prefix, "api.query.suspicious");
        return Err(ServerError::validation(
            "query contains suspicious control sequences; please rephrase",
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: MCP Transports
// ============================================================================

/// JSON-RPC request envelope accepted on the MCP endpoints.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// Request identifier (echoed in the response).
    #[serde(default)]
    id: Option<Value>,
    /// Method name to invoke.
    method: String,
    /// Optional parameters payload.
    #[serde(default)]
    params: Option<Value>,
}

/// Builds a JSON-RPC success envelope.
fn rpc_ok(id: Option<Value>, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

/// Builds a JSON-RPC error envelope.
fn rpc_err(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}

/// `POST /mcp/http`: plain JSON-RPC transport.
async fn mcp_http(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    let envelope = dispatch_json_rpc(&state, body).await;
    Json(envelope).into_response()
}

/// `POST /mcp`: SSE-framed JSON-RPC transport.
///
/// The reply is a single `data:` event carrying the JSON-RPC envelope.
async fn mcp_sse(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    let envelope = dispatch_json_rpc(&state, body).await;
    let payload = format!("data: {envelope}\n\n");
    ([(axum::http::header::CONTENT_TYPE, "text/event-stream")], payload).into_response()
}

/// Parses and dispatches one JSON-RPC request.
async fn dispatch_json_rpc(
    state: &Arc<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Value {
    let value = match body {
        Ok(Json(value)) => value,
        Err(rejection) => return rpc_err(None, -32700, &rejection.to_string()),
    };
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(err) => return rpc_err(None, -32600, &err.to_string()),
    };
    let id = request.id.clone();
    match request.method.as_str() {
        "initialize" => rpc_ok(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "serverInfo": {"name": "metric-gate", "version": DOMAIN_MODEL_VERSION},
                "capabilities": {"tools": {}, "resources": {}},
            }),
        ),
        "tools/list" => {
            let tools: Vec<Value> = metric_gate_contract::tool_definitions()
                .into_iter()
                .map(|definition| {
                    json!({
                        "name": definition.name.as_str(),
                        "description": definition.description,
                        "inputSchema": definition.input_schema,
                    })
                })
                .collect();
            rpc_ok(id, json!({"tools": tools}))
        }
        "tools/call" => {
            let params = request.params.unwrap_or(Value::Null);
            let Some(name) = params.get("name").and_then(Value::as_str) else {
                return rpc_err(id, -32602, "tools/call requires 'name'");
            };
            let arguments = params
                .get("arguments")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            match state.tools.call_tool(name, arguments).await {
                Ok(result) => {
                    rpc_ok(id, json!({"content": [{"type": "json", "json": result}]}))
                }
                Err(error) => rpc_err(id, -32000, &error.to_string()),
            }
        }
        "resources/list" => rpc_ok(id, json!({"resources": state.resources.list_resources()})),
        "resources/read" => {
            let uri = request
                .params
                .as_ref()
                .and_then(|params| params.get("uri"))
                .and_then(Value::as_str);
            let Some(uri) = uri else {
                return rpc_err(id, -32602, "resources/read requires 'uri'");
            };
            match state.resources.read_resource(uri) {
                Some(contents) => rpc_ok(
                    id,
                    serde_json::to_value(contents).unwrap_or_else(|_| json!({"contents": []})),
                ),
                None => rpc_err(id, -32602, &format!("resource not found: {uri}")),
            }
        }
        other => rpc_err(id, -32601, &format!("method not found: {other}")),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
