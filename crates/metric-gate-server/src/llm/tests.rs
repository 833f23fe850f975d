// crates/metric-gate-server/src/llm/tests.rs
// ============================================================================
// Module: LLM Orchestrator Tests
// Description: Unit tests for tool-call parsing and the bounded loop.
// Purpose: Validate both parse formats, the brace-counting extractor, the
//          iteration cap, and error feedback into the conversation.
// Dependencies: metric-gate-server, serde_json, tokio
// ============================================================================

//! ## Overview
//! Drives the orchestration loop with a scripted fake LLM: a tool-calling
//! turn followed by a final answer, the all-tools-failed synthesis, and the
//! iteration cap. Parsing tests cover `TOOL_CALL:` with nested multi-line
//! JSON, fenced ```json blocks, and the brace-counting extractor with
//! strings and escapes.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

use super::LlmClient;
use super::LlmError;
use super::LlmRequest;
use super::LlmResponse;
use super::QueryOrchestrator;
use super::TokenUsage;
use super::ToolHandler;
use super::create_system_prompt;
use super::extract_json_object;
use super::parse_tool_calls;
use crate::errors::ServerError;

// ============================================================================
// SECTION: Fake Client
// ============================================================================

/// Scripted LLM replaying canned responses and recording requests.
struct FakeLlm {
    /// Canned responses consumed in order; the last repeats.
    responses: Mutex<Vec<LlmResponse>>,
    /// Recorded requests.
    requests: Mutex<Vec<LlmRequest>>,
}

impl FakeLlm {
    /// Creates the fake from response contents.
    fn new(contents: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(
                contents
                    .iter()
                    .map(|content| LlmResponse {
                        content: (*content).to_string(),
                        usage: Some(TokenUsage {
                            prompt_tokens: 10,
                            completion_tokens: 5,
                            total_tokens: 15,
                        }),
                    })
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Returns the recorded requests.
    fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let mut responses = self.responses.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if responses.len() > 1 {
            Ok(responses.remove(0))
        } else {
            responses.first().cloned().ok_or(LlmError::Api {
                message: "no scripted response".to_string(),
            })
        }
    }
}

/// Tool registry with one recording echo tool.
fn echo_tools(fail: bool) -> (BTreeMap<String, ToolHandler>, Arc<Mutex<Vec<Value>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);
    let handler: ToolHandler = Arc::new(move |arguments| {
        let recorded = Arc::clone(&recorded);
        let future: super::ToolHandlerFuture = Box::pin(async move {
            if let Ok(mut log) = recorded.lock() {
                log.push(Value::Object(arguments.clone()));
            }
            if fail {
                Err(ServerError::validation("tool exploded"))
            } else {
                Ok(json!({"echo": Value::Object(arguments)}))
            }
        });
        future
    });
    let mut tools = BTreeMap::new();
    tools.insert("get_key_metrics".to_string(), handler);
    (tools, calls)
}

/// Builds an orchestrator over the fake client and tools.
fn orchestrator(
    llm: Arc<FakeLlm>,
    tools: BTreeMap<String, ToolHandler>,
    max_iterations: u32,
) -> QueryOrchestrator {
    QueryOrchestrator::new(llm, tools, max_iterations, 0.1, 4096)
}

// ============================================================================
// SECTION: Loop Tests
// ============================================================================

#[tokio::test]
async fn answer_without_tool_calls_ends_the_loop() {
    let llm = FakeLlm::new(&["The mean boot time was 12.5 seconds."]);
    let (tools, calls) = echo_tools(false);
    let result = orchestrator(Arc::clone(&llm), tools, 10)
        .execute_query("what was the mean boot time?")
        .await
        .expect("result");
    assert_eq!(result.answer, "The mean boot time was 12.5 seconds.");
    assert_eq!(result.llm_calls, 1);
    assert_eq!(result.total_tokens, 15);
    assert!(result.tool_calls.is_empty());
    assert!(calls.lock().expect("calls").is_empty());
}

#[tokio::test]
async fn tool_call_turn_feeds_results_back() {
    let llm = FakeLlm::new(&[
        "TOOL_CALL: {\"name\": \"get_key_metrics\", \"arguments\": {\"os_id\": \"rhel\"}}",
        "Based on the data, boot times look stable.",
    ]);
    let (tools, calls) = echo_tools(false);
    let result = orchestrator(Arc::clone(&llm), tools, 10)
        .execute_query("rhel boot times")
        .await
        .expect("result");
    assert_eq!(result.answer, "Based on the data, boot times look stable.");
    assert_eq!(result.llm_calls, 2);
    assert_eq!(result.total_tokens, 30);
    assert_eq!(result.tool_calls.len(), 1);
    assert_eq!(result.tool_calls[0].tool, "get_key_metrics");
    assert_eq!(calls.lock().expect("calls").len(), 1);

    // The second request's last message carries the tool result feedback.
    let requests = llm.requests();
    let feedback = &requests[1].messages.last().expect("feedback").content;
    assert!(feedback.contains("TOOL_RESULT [get_key_metrics]"));
}

#[tokio::test]
async fn all_failed_tools_synthesize_an_answer() {
    let llm = FakeLlm::new(&[
        "TOOL_CALL: {\"name\": \"get_key_metrics\", \"arguments\": {}}",
        "never reached",
    ]);
    let (tools, _calls) = echo_tools(true);
    let result = orchestrator(llm, tools, 10).execute_query("query").await.expect("result");
    assert!(result.answer.contains("I encountered errors"));
    assert!(result.answer.contains("get_key_metrics"));
    assert_eq!(result.llm_calls, 1);
}

#[tokio::test]
async fn unknown_tools_become_tool_errors() {
    let llm = FakeLlm::new(&[
        "TOOL_CALL: {\"name\": \"no_such_tool\", \"arguments\": {}}",
        "done",
    ]);
    let (tools, _calls) = echo_tools(false);
    let result = orchestrator(Arc::clone(&llm), tools, 10)
        .execute_query("query")
        .await
        .expect("result");
    // The single tool failed, so the loop synthesized the error answer.
    assert!(result.answer.contains("no_such_tool"));
}

#[tokio::test]
async fn loop_never_exceeds_max_iterations() {
    // Every turn requests another tool call; the loop must stop at the cap.
    let llm =
        FakeLlm::new(&["TOOL_CALL: {\"name\": \"get_key_metrics\", \"arguments\": {}}"]);
    let (tools, _calls) = echo_tools(false);
    let result = orchestrator(Arc::clone(&llm), tools, 3)
        .execute_query("query")
        .await
        .expect("result");
    assert_eq!(result.llm_calls, 3);
    assert!(result.answer.contains("maximum number of iterations (3)"));
}

// ============================================================================
// SECTION: Parsing Tests
// ============================================================================

#[test]
fn parses_multiline_nested_tool_call() {
    let content = "I will query the data now.\n\
                   TOOL_CALL: {\n  \"name\": \"get_key_metrics\",\n  \"arguments\": {\n    \
                   \"filter\": {\"os_id\": \"rhel\", \"note\": \"a {brace} inside\"}\n  }\n}\n\
                   Stand by.";
    let calls = parse_tool_calls(content);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "get_key_metrics");
    assert_eq!(
        calls[0].arguments.get("filter").and_then(|filter| filter.get("note")),
        Some(&json!("a {brace} inside"))
    );
}

#[test]
fn parses_multiple_tool_calls_in_order() {
    let content = "TOOL_CALL: {\"name\": \"first\", \"arguments\": {}}\n\
                   TOOL_CALL: {\"name\": \"second\", \"arguments\": {\"x\": 1}}";
    let calls = parse_tool_calls(content);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].name, "first");
    assert_eq!(calls[1].name, "second");
}

#[test]
fn parses_fenced_json_blocks_with_alternate_keys() {
    let content = "Let me call the tool:\n```json\n{\"tool\": \"get_key_metrics\", \
                   \"parameters\": {\"run_id\": \"127723\"}}\n```\ndone";
    let calls = parse_tool_calls(content);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "get_key_metrics");
    assert_eq!(calls[0].arguments.get("run_id"), Some(&json!("127723")));
}

#[test]
fn plain_answers_parse_no_calls() {
    assert!(parse_tool_calls("The boot time improved by 3% this week.").is_empty());
    assert!(parse_tool_calls("TOOL_CALL: not json at all").is_empty());
}

#[test]
fn extractor_counts_braces_through_strings_and_escapes() {
    let text = "{\"a\": \"quote \\\" and { brace\", \"b\": {\"c\": 1}} trailing";
    let object = extract_json_object(text).expect("object");
    assert_eq!(object, "{\"a\": \"quote \\\" and { brace\", \"b\": {\"c\": 1}}");
    let parsed: Value = serde_json::from_str(&object).expect("valid json");
    assert_eq!(parsed.pointer("/b/c"), Some(&json!(1)));
}

#[test]
fn extractor_returns_none_for_unbalanced_braces() {
    assert!(extract_json_object("{\"a\": {\"b\": 1}").is_none());
    assert!(extract_json_object("no braces here").is_none());
}

// ============================================================================
// SECTION: Prompt Tests
// ============================================================================

#[test]
fn system_prompt_includes_documented_tools() {
    let prompt = create_system_prompt(&["get_key_metrics", "resources/read"]);
    assert!(prompt.contains("### get_key_metrics"));
    assert!(prompt.contains("### resources/read"));
    assert!(prompt.contains("TOOL_CALL:"));
}

#[test]
fn undocumented_tools_get_a_placeholder() {
    let prompt = create_system_prompt(&["mystery_tool"]);
    assert!(prompt.contains("### mystery_tool"));
    assert!(prompt.contains("No documentation available."));
}
