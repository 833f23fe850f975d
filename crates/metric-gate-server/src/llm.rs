// crates/metric-gate-server/src/llm.rs
// ============================================================================
// Module: LLM Query Orchestrator
// Description: Bounded tool-call loop driving an external LLM.
// Purpose: Turn natural-language queries into tool executions and a final
//          answer with an execution trace.
// Dependencies: metric-gate-server, async-trait, reqwest, serde_json, tokio
// ============================================================================

//! ## Overview
//! One async task per query runs a bounded loop: call the LLM, parse tool
//! calls from the reply (either `TOOL_CALL:` followed by a JSON object,
//! extracted with a brace-counting state machine that understands string
//! literals and escapes, or a fenced ```json block), execute the requested
//! tools sequentially, feed the results back as a synthetic user message,
//! and repeat until the model answers without tool calls or the iteration
//! cap is reached. Tool calls within one turn run in order so later calls
//! can see earlier results only through the next turn's history.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::errors::ServerError;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmMessage {
    /// Message role: `system`, `user`, or `assistant`.
    pub role: &'static str,
    /// Message content.
    pub content: String,
}

impl LlmMessage {
    /// Builds a system message.
    #[must_use]
    pub const fn system(content: String) -> Self {
        Self {
            role: "system",
            content,
        }
    }

    /// Builds a user message.
    #[must_use]
    pub const fn user(content: String) -> Self {
        Self {
            role: "user",
            content,
        }
    }

    /// Builds an assistant message.
    #[must_use]
    pub const fn assistant(content: String) -> Self {
        Self {
            role: "assistant",
            content,
        }
    }
}

/// Request to the LLM API.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Conversation so far, system message first.
    pub messages: Vec<LlmMessage>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens for the response.
    pub max_tokens: u32,
}

/// Token usage metadata from one LLM response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u64,
    /// Tokens produced in the completion.
    pub completion_tokens: u64,
    /// Total tokens for the call.
    pub total_tokens: u64,
}

/// Response from the LLM API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    /// Generated content.
    pub content: String,
    /// Usage metadata, when the provider reports it.
    pub usage: Option<TokenUsage>,
}

/// Errors produced by LLM clients and the orchestration loop.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider API failure.
    #[error("llm api error: {message}")]
    Api {
        /// Failure description (may include provider status text).
        message: String,
    },
    /// Provider response failed to parse.
    #[error("llm response parse error: {message}")]
    Parse {
        /// Parse failure description.
        message: String,
    },
}

impl LlmError {
    /// Returns true when the failure looks like provider rate limiting.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        let message = self.to_string().to_lowercase();
        message.contains("rate limit") || message.contains("429")
    }
}

/// Client for a large language model provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given request.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when the provider call fails.
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;
}

// ============================================================================
// SECTION: Gemini Client
// ============================================================================

/// Default public Gemini API endpoint.
const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini client speaking the `generateContent` REST API.
///
/// Supports both the public API and Vertex AI / corporate endpoints via a
/// custom endpoint.
pub struct GeminiClient {
    /// API key for authentication.
    api_key: String,
    /// Model name (e.g. `gemini-1.5-pro`).
    model: String,
    /// API endpoint base URL.
    endpoint: String,
    /// Shared HTTP client.
    client: reqwest::Client,
}

impl GeminiClient {
    /// Creates a Gemini client.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Api`] when the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: Option<String>,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().build().map_err(|err| LlmError::Api {
            message: format!("http client build failed: {err}"),
        })?;
        let model = model.into();
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string());
        tracing::info!(model = %model, endpoint = %endpoint, "llm.gemini.init");
        Ok(Self {
            api_key: api_key.into(),
            model,
            endpoint,
            client,
        })
    }

    /// Converts conversation messages to the Gemini wire shape.
    ///
    /// Gemini keeps the system instruction separate and names the assistant
    /// role `model`.
    fn convert_messages(messages: &[LlmMessage]) -> (Option<String>, Vec<Value>) {
        let mut system_instruction = None;
        let mut contents = Vec::new();
        for message in messages {
            if message.role == "system" {
                system_instruction = Some(message.content.clone());
            } else {
                let role = if message.role == "assistant" { "model" } else { "user" };
                contents.push(json!({"role": role, "parts": [{"text": message.content}]}));
            }
        }
        (system_instruction, contents)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let (system_instruction, contents) = Self::convert_messages(&request.messages);
        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
            },
            // Performance analysis queries are technical, not harmful.
            "safetySettings": [
                {"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_ONLY_HIGH"},
                {"category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_ONLY_HIGH"},
                {"category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": "BLOCK_ONLY_HIGH"},
                {"category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_ONLY_HIGH"},
            ],
        });
        if let Some(instruction) = system_instruction {
            if let Value::Object(object) = &mut body {
                object.insert(
                    "systemInstruction".to_string(),
                    json!({"parts": [{"text": instruction}]}),
                );
            }
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            self.model,
            self.api_key
        );
        let response =
            self.client.post(&url).json(&body).send().await.map_err(|err| LlmError::Api {
                message: err.to_string(),
            })?;
        let status = response.status();
        let payload: Value = response.json().await.map_err(|err| LlmError::Parse {
            message: err.to_string(),
        })?;
        if !status.is_success() {
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown provider error");
            return Err(LlmError::Api {
                message: format!("status {}: {message}", status.as_u16()),
            });
        }

        let content = extract_gemini_text(&payload)?;
        let usage = payload.get("usageMetadata").map(|metadata| TokenUsage {
            prompt_tokens: metadata
                .get("promptTokenCount")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            completion_tokens: metadata
                .get("candidatesTokenCount")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            total_tokens: metadata.get("totalTokenCount").and_then(Value::as_u64).unwrap_or(0),
        });
        Ok(LlmResponse {
            content,
            usage,
        })
    }
}

/// Extracts candidate text, synthesizing a message for safety blocks.
///
/// # Errors
///
/// Returns [`LlmError::Parse`] when the payload has neither text nor a
/// finish reason to explain its absence.
fn extract_gemini_text(payload: &Value) -> Result<String, LlmError> {
    let candidate = payload.pointer("/candidates/0");
    let parts = candidate
        .and_then(|candidate| candidate.pointer("/content/parts"))
        .and_then(Value::as_array);
    if let Some(parts) = parts {
        let text: String =
            parts.iter().filter_map(|part| part.get("text").and_then(Value::as_str)).collect();
        if !text.is_empty() {
            return Ok(text);
        }
    }
    let finish_reason =
        candidate.and_then(|candidate| candidate.get("finishReason")).and_then(Value::as_str);
    if let Some(finish_reason) = finish_reason {
        tracing::warn!(finish_reason, "llm.gemini.blocked");
        return Ok(format!(
            "I apologize, but I cannot complete this query due to content safety \
             restrictions. This can happen with very long or complex queries. Please try:\n\
             1. Simplifying your query (fewer requirements/rules)\n\
             2. Breaking it into smaller queries\n\
             3. Rephrasing with less structured output requirements\n\
             \nTechnical details: finish_reason={finish_reason}"
        ));
    }
    Err(LlmError::Parse {
        message: "provider response contained no candidate text".to_string(),
    })
}

// ============================================================================
// SECTION: Tool Registry
// ============================================================================

/// Boxed future returned by a tool handler.
pub type ToolHandlerFuture = Pin<Box<dyn Future<Output = Result<Value, ServerError>> + Send>>;

/// Async tool handler taking the parsed JSON argument map.
pub type ToolHandler = Arc<dyn Fn(Map<String, Value>) -> ToolHandlerFuture + Send + Sync>;

/// Static documentation table injected into the system prompt per tool.
#[must_use]
pub fn tool_docs() -> BTreeMap<&'static str, &'static str> {
    let mut docs = BTreeMap::new();
    docs.insert(
        "get_key_metrics",
        "### get_key_metrics\n\
         Get boot time and performance metrics from configured sources.\n\n\
         **PRIMARY TOOL** for boot time and performance analysis queries.\n\n\
         **Parameters (all optional):**\n\
         - `run_id` (string): fetch metrics for one specific run id; when provided, \
           time filters are ignored. Use this for \"analyze run ID X\" queries.\n\
         - `from_timestamp` (string): start time filter (\"last 30 days\", ISO 8601, \
           or epoch millis).\n\
         - `to_timestamp` (string): end time filter (same formats).\n\
         - `os_id` (string): OS filter, e.g. \"rhel\" or \"autosd\".\n\
         - `run_type` (string): run type filter: nightly, ci, release, or manual.\n\
         - `limit` (integer): page size (default 100); the server paginates all results.\n\n\
         **DO NOT use these parameters** (they are auto-configured):\n\
         - test_id (auto-discovered for boot time queries)\n\
         - source_id (auto-selected)\n\
         - dataset_types (defaults to [\"boot-time-verbose\"])\n\n\
         **Returns:** `metric_points` (each with metric_id, timestamp, value, \
         dimensions os_id/mode/target, source) and `domain_model_version`.\n\n\
         **Example:**\n\
         TOOL_CALL: {\"name\": \"get_key_metrics\", \"arguments\": \
         {\"from_timestamp\": \"last 30 days\", \"os_id\": \"rhel\"}}",
    );
    docs.insert(
        "resources/read",
        "### resources/read\n\
         Read an MCP resource containing domain knowledge or templates.\n\n\
         **Parameters:**\n\
         - `uri` (string, required): resource URI, format \
           \"domain://<category>/<resource-name>\".\n\n\
         **Returns:** resource content as JSON text.\n\n\
         **Example:**\n\
         TOOL_CALL: {\"name\": \"resources/read\", \"arguments\": \
         {\"uri\": \"domain://glossary/boot-time\"}}",
    );
    docs
}

/// Builds the system prompt including per-tool documentation.
#[must_use]
pub fn create_system_prompt(tool_names: &[&str]) -> String {
    let docs = tool_docs();
    let sections: Vec<String> = tool_names
        .iter()
        .map(|name| {
            docs.get(name).map_or_else(
                || format!("### {name}\nNo documentation available."),
                |doc| (*doc).to_string(),
            )
        })
        .collect();
    format!(
        "You are an assistant for querying performance data.\n\n\
         ## Tool Call Format\n\n\
         Execute tools using this exact syntax:\n\
         ```\n\
         TOOL_CALL: {{\"name\": \"tool_name\", \"arguments\": {{\"param1\": \"value1\"}}}}\n\
         ```\n\n\
         **DO NOT** just describe what you would do. **ACTUALLY EXECUTE** the tool calls.\n\n\
         ## Available Tools\n\n{}\n\n\
         ## Workflow\n\n\
         1. Read MCP resources to understand the domain (use the resources/read tool)\n\
         2. Execute data queries (use the get_key_metrics tool)\n\
         3. Format responses according to templates from resources",
        sections.join("\n\n")
    )
}

/// Wraps the user's query for the conversation.
#[must_use]
pub fn create_user_prompt(query: &str) -> String {
    format!(
        "User query: {query}\n\n\
         Use the available tools to gather the data you need, then provide a clear, \
         well-structured answer."
    )
}

// ============================================================================
// SECTION: Tool Call Parsing
// ============================================================================

/// Tool call request parsed from an LLM response.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Tool name to invoke.
    pub name: String,
    /// Parsed argument map.
    pub arguments: Map<String, Value>,
}

/// Parses tool-call requests from LLM response content.
///
/// Two formats are recognized: the substring `TOOL_CALL:` followed by a JSON
/// object, and fenced ```json blocks carrying `tool`/`name` plus
/// `parameters`/`arguments` keys.
#[must_use]
pub fn parse_tool_calls(content: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();

    // Format 1: TOOL_CALL: {...}
    let marker = "TOOL_CALL:";
    let mut search_from = 0;
    while let Some(found) = content[search_from..].find(marker) {
        let start = search_from + found + marker.len();
        if let Some(object_text) = extract_json_object(&content[start..]) {
            match serde_json::from_str::<Value>(&object_text) {
                Ok(parsed) => {
                    let name = parsed.get("name").and_then(Value::as_str);
                    let arguments = parsed.get("arguments").and_then(Value::as_object).cloned();
                    if let Some(name) = name {
                        calls.push(ToolCall {
                            name: name.to_string(),
                            arguments: arguments.unwrap_or_default(),
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "llm.parse_tool_call_failed");
                }
            }
        }
        search_from = start;
    }

    // Format 2: fenced ```json blocks.
    let fence = "```json";
    let mut block_from = 0;
    while let Some(found) = content[block_from..].find(fence) {
        let start = block_from + found + fence.len();
        let Some(end) = content[start..].find("```") else {
            break;
        };
        let block = &content[start..start + end];
        if let Some(object_text) = extract_json_object(block) {
            if let Ok(parsed) = serde_json::from_str::<Value>(&object_text) {
                let name = parsed
                    .get("tool")
                    .or_else(|| parsed.get("name"))
                    .and_then(Value::as_str);
                let arguments = parsed
                    .get("parameters")
                    .or_else(|| parsed.get("arguments"))
                    .and_then(Value::as_object)
                    .cloned();
                if let Some(name) = name {
                    // TOOL_CALL blocks inside fences were already collected.
                    let duplicate = calls
                        .iter()
                        .any(|call| call.name == name && Some(&call.arguments) == arguments.as_ref());
                    if !duplicate {
                        calls.push(ToolCall {
                            name: name.to_string(),
                            arguments: arguments.unwrap_or_default(),
                        });
                    }
                }
            }
        }
        block_from = start + end + 3;
    }

    calls
}

/// Extracts a complete JSON object from text using brace counting.
///
/// The state machine tracks string literals and backslash escapes so nested
/// multi-line JSON survives intact.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut brace_count = 0_i32;
    let mut in_string = false;
    let mut escape_next = false;
    for (offset, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => brace_count += 1,
            '}' if !in_string => {
                brace_count -= 1;
                if brace_count == 0 {
                    return Some(text[start..=start + offset].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// SECTION: Orchestration
// ============================================================================

/// Trace entry for one executed tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallTrace {
    /// Tool name.
    pub tool: String,
    /// Arguments passed to the tool.
    pub arguments: Value,
    /// Tool result (or `{"error": ...}` on failure).
    pub result: Value,
    /// Execution duration in milliseconds.
    pub duration_ms: u64,
}

/// Orchestration result: the final answer plus its execution trace.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationResult {
    /// Final answer text.
    pub answer: String,
    /// Executed tool calls in order.
    pub tool_calls: Vec<ToolCallTrace>,
    /// Total wall-clock duration in milliseconds.
    pub total_duration_ms: u64,
    /// Number of LLM invocations.
    pub llm_calls: u32,
    /// Cumulative token usage across LLM invocations.
    pub total_tokens: u64,
}

/// Orchestrator for natural-language queries over LLM plus tools.
///
/// # Invariants
/// - The loop never exceeds `max_iterations` LLM calls per query.
/// - Tool calls within one turn execute sequentially in emission order.
pub struct QueryOrchestrator {
    /// LLM client.
    llm: Arc<dyn LlmClient>,
    /// Tool handlers keyed by tool name.
    tools: BTreeMap<String, ToolHandler>,
    /// Iteration cap for the tool-call loop.
    max_iterations: u32,
    /// Sampling temperature.
    temperature: f64,
    /// Maximum tokens per LLM response.
    max_tokens: u32,
}

impl QueryOrchestrator {
    /// Creates an orchestrator over the given client and tool registry.
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: BTreeMap<String, ToolHandler>,
        max_iterations: u32,
        temperature: f64,
        max_tokens: u32,
    ) -> Self {
        Self {
            llm,
            tools,
            max_iterations,
            temperature,
            max_tokens,
        }
    }

    /// Executes a natural-language query to completion.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when the provider fails; per-tool failures are
    /// captured into the conversation instead of propagating.
    pub async fn execute_query(&self, query: &str) -> Result<OrchestrationResult, LlmError> {
        let started = Instant::now();
        let tool_names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        let mut conversation = vec![
            LlmMessage::system(create_system_prompt(&tool_names)),
            LlmMessage::user(create_user_prompt(query)),
        ];
        let mut trace: Vec<ToolCallTrace> = Vec::new();
        let mut llm_calls = 0_u32;
        let mut total_tokens = 0_u64;
        let mut final_answer: Option<String> = None;

        for iteration in 1..=self.max_iterations {
            llm_calls += 1;
            let response = self
                .llm
                .complete(LlmRequest {
                    messages: conversation.clone(),
                    temperature: self.temperature,
                    max_tokens: self.max_tokens,
                })
                .await?;
            if let Some(usage) = response.usage {
                total_tokens += usage.total_tokens;
            }
            let content = response.content.trim().to_string();
            conversation.push(LlmMessage::assistant(content.clone()));

            let requests = parse_tool_calls(&content);
            if requests.is_empty() {
                tracing::info!(iteration, "llm.final_answer");
                final_answer = Some(content);
                break;
            }
            tracing::info!(
                iteration,
                tool_count = requests.len(),
                "llm.tool_calls_requested"
            );

            // Execute sequentially in emission order.
            let mut turn_results: Vec<(String, Result<Value, String>)> = Vec::new();
            for request in requests {
                let tool_started = Instant::now();
                let outcome = self.execute_tool(&request).await;
                let duration_ms =
                    u64::try_from(tool_started.elapsed().as_millis()).unwrap_or(u64::MAX);
                match outcome {
                    Ok(result) => {
                        trace.push(ToolCallTrace {
                            tool: request.name.clone(),
                            arguments: Value::Object(request.arguments.clone()),
                            result: result.clone(),
                            duration_ms,
                        });
                        turn_results.push((request.name, Ok(result)));
                    }
                    Err(error) => {
                        let message = error.to_string();
                        tracing::error!(tool = %request.name, error = %message, "llm.tool_failed");
                        trace.push(ToolCallTrace {
                            tool: request.name.clone(),
                            arguments: Value::Object(request.arguments.clone()),
                            result: json!({"error": message}),
                            duration_ms,
                        });
                        turn_results.push((request.name, Err(message)));
                    }
                }
            }

            conversation.push(LlmMessage::user(format_tool_results(&turn_results)));

            if turn_results.iter().all(|(_, outcome)| outcome.is_err()) {
                let failures: Vec<String> = turn_results
                    .iter()
                    .map(|(tool, outcome)| match outcome {
                        Err(message) => format!("- {tool}: {message}"),
                        Ok(_) => String::new(),
                    })
                    .collect();
                final_answer = Some(format!(
                    "I encountered errors while trying to query the data:\n\n{}\n\nPlease \
                     check the query parameters or try a different query.",
                    failures.join("\n")
                ));
                tracing::warn!(iteration, "llm.all_tools_failed");
                break;
            }
        }

        let answer = final_answer.unwrap_or_else(|| {
            format!(
                "I reached the maximum number of iterations ({}) without completing the \
                 query. Please try a simpler or more specific query.",
                self.max_iterations
            )
        });
        Ok(OrchestrationResult {
            answer,
            tool_calls: trace,
            total_duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            llm_calls,
            total_tokens,
        })
    }

    /// Executes one tool call via the registered handler.
    async fn execute_tool(&self, request: &ToolCall) -> Result<Value, ServerError> {
        let Some(handler) = self.tools.get(&request.name) else {
            return Err(ServerError::validation(format!("tool '{}' not found", request.name)));
        };
        handler(request.arguments.clone()).await
    }
}

/// Formats one turn's tool results as the synthetic user message.
fn format_tool_results(results: &[(String, Result<Value, String>)]) -> String {
    let parts: Vec<String> = results
        .iter()
        .map(|(tool, outcome)| match outcome {
            Ok(result) => {
                let rendered = serde_json::to_string_pretty(result)
                    .unwrap_or_else(|_| result.to_string());
                format!("TOOL_RESULT [{tool}]:\n{rendered}")
            }
            Err(message) => format!("TOOL_ERROR [{tool}]: {message}"),
        })
        .collect();
    format!(
        "Tool execution results:\n\n{}\n\nBased on these results, please provide your \
         analysis or make additional tool calls if needed.",
        parts.join("\n\n")
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
