// crates/metric-gate-adapters/src/stdio.rs
// ============================================================================
// Module: Stdio Bridge Adapter
// Description: Source MCP adapter speaking JSON-RPC over a child process.
// Purpose: Reach Source MCPs that are only available via stdio transports.
// Dependencies: metric-gate-contract, tokio, serde_json
// ============================================================================

//! ## Overview
//! The bridge spawns a configured command and speaks `Content-Length`-framed
//! JSON-RPC over its stdio: one `initialize` on first use, then `tools/call`
//! per contract operation. Tool results arrive as MCP content lists; the
//! first `text` item is parsed as the JSON payload. Every call runs under a
//! deadline equal to the configured `timeout_seconds`; expiry surfaces as a
//! retryable timeout. The [`BridgeTransport`] trait lets tests inject an
//! in-process fake instead of spawning a subprocess.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
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
use metric_gate_contract::SchemasGetRequest;
use metric_gate_contract::SchemasGetResponse;
use metric_gate_contract::SourceCapabilities;
use metric_gate_contract::SourceDescribeRequest;
use metric_gate_contract::SourceDescribeResponse;
use metric_gate_contract::SourceLimits;
use metric_gate_contract::SourceType;
use metric_gate_contract::TestLabelValuesRequest;
use metric_gate_contract::TestLabelValuesResponse;
use metric_gate_contract::TestsListRequest;
use metric_gate_contract::TestsListResponse;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::ChildStdin;
use tokio::process::ChildStdout;
use tokio::process::Command;
use tokio::sync::Mutex;

use crate::AdapterError;
use crate::SourceAdapter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Implementation version advertised by `source.describe`.
const ADAPTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum framed message size accepted from the child process.
const MAX_FRAME_BYTES: u64 = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Transport Trait
// ============================================================================

/// Transport capable of invoking a remote MCP tool and returning its JSON.
///
/// The production implementation spawns a subprocess; tests inject an
/// in-process fake to bypass it entirely.
#[async_trait]
pub trait BridgeTransport: Send + Sync {
    /// Invokes a remote tool by name with a JSON argument object.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] when the transport or remote tool fails.
    async fn call_tool(&self, name: &str, args: Value) -> Result<Value, AdapterError>;
}

/// Runs a transport call under the configured deadline.
///
/// # Errors
///
/// Returns [`AdapterError::Timeout`] (retryable) when the deadline expires,
/// or the transport's own error.
pub async fn call_with_deadline<F>(
    timeout_seconds: u64,
    tool: &str,
    call: F,
) -> Result<Value, AdapterError>
where
    F: Future<Output = Result<Value, AdapterError>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_seconds), call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(tool, timeout_seconds, "mcp_bridge.call_timeout");
            Err(AdapterError::Timeout {
                seconds: timeout_seconds,
            })
        }
    }
}

// ============================================================================
// SECTION: Process Transport
// ============================================================================

/// Configuration for spawning a stdio MCP child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdioTransportConfig {
    /// Executable to spawn.
    pub command: String,
    /// Command-line arguments.
    pub args: Vec<String>,
    /// Environment variables for the child process.
    pub env: BTreeMap<String, String>,
}

/// Guarded stdio pipes of the child process.
///
/// One mutex covers both directions so a request/response exchange is never
/// interleaved with another call's frames.
struct StdioPipes {
    /// Child stdin for framed requests.
    stdin: ChildStdin,
    /// Buffered child stdout for framed responses.
    stdout: BufReader<ChildStdout>,
    /// Whether the MCP `initialize` handshake has completed.
    initialized: bool,
}

/// Bridge transport backed by a spawned child process.
///
/// # Invariants
/// - `next_id` is strictly increasing for each request sent.
/// - The child is killed when the transport drops.
pub struct StdioProcessTransport {
    /// Child process handle, kept alive for the transport's lifetime.
    _child: Child,
    /// Request/response pipes under one lock.
    pipes: Mutex<StdioPipes>,
    /// Next JSON-RPC request identifier.
    next_id: AtomicU64,
}

impl StdioProcessTransport {
    /// Spawns the configured command and prepares the framed pipes.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Connection`] when the process cannot be
    /// spawned or its stdio streams are unavailable.
    pub fn spawn(config: &StdioTransportConfig) -> Result<Self, AdapterError> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true);
        for (key, value) in &config.env {
            command.env(key, value);
        }
        let mut child = command.spawn().map_err(|err| AdapterError::Connection {
            message: format!("spawn stdio failed: {err}"),
        })?;
        let stdin = child.stdin.take().ok_or_else(|| AdapterError::Connection {
            message: "missing child stdin".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| AdapterError::Connection {
            message: "missing child stdout".to_string(),
        })?;
        tracing::info!(command = %config.command, "mcp_bridge.spawned");
        Ok(Self {
            _child: child,
            pipes: Mutex::new(StdioPipes {
                stdin,
                stdout: BufReader::new(stdout),
                initialized: false,
            }),
            next_id: AtomicU64::new(1),
        })
    }

    /// Sends one JSON-RPC request and reads the matching framed response.
    async fn send_request(
        &self,
        pipes: &mut StdioPipes,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let payload = serde_json::to_vec(&request).map_err(|err| AdapterError::Json {
            message: format!("jsonrpc serialization failed: {err}"),
        })?;
        write_framed(&mut pipes.stdin, &payload).await?;
        let response_bytes = read_framed(&mut pipes.stdout).await?;
        let response: Value =
            serde_json::from_slice(&response_bytes).map_err(|err| AdapterError::Protocol {
                message: format!("invalid json-rpc response: {err}"),
            })?;
        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown json-rpc error");
            return Err(AdapterError::Protocol {
                message: message.to_string(),
            });
        }
        response.get("result").cloned().ok_or_else(|| AdapterError::Protocol {
            message: format!("missing result for method {method}"),
        })
    }
}

#[async_trait]
impl BridgeTransport for StdioProcessTransport {
    async fn call_tool(&self, name: &str, args: Value) -> Result<Value, AdapterError> {
        let mut pipes = self.pipes.lock().await;
        if !pipes.initialized {
            self.send_request(
                &mut pipes,
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "metric-gate", "version": ADAPTER_VERSION},
                }),
            )
            .await?;
            pipes.initialized = true;
        }
        let result = self
            .send_request(
                &mut pipes,
                "tools/call",
                json!({"name": name, "arguments": args}),
            )
            .await?;
        parse_tool_content(result)
    }
}

/// Extracts the JSON payload from an MCP tool-call result.
///
/// Content lists yield their first `text` item parsed as JSON; bare objects
/// pass through unchanged.
fn parse_tool_content(result: Value) -> Result<Value, AdapterError> {
    let Some(Value::Array(content)) = result.get("content") else {
        return Ok(result);
    };
    for item in content {
        if let Some(text) = item.get("text").and_then(Value::as_str) {
            return serde_json::from_str(text).map_err(|err| AdapterError::Json {
                message: format!("invalid tool content json: {err}"),
            });
        }
    }
    Err(AdapterError::Protocol {
        message: "tool result contained no text content".to_string(),
    })
}

// ============================================================================
// SECTION: Framing
// ============================================================================

/// Writes a `Content-Length`-framed JSON-RPC message.
///
/// # Errors
///
/// Returns [`AdapterError::Connection`] when the write fails.
async fn write_framed(writer: &mut ChildStdin, payload: &[u8]) -> Result<(), AdapterError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer.write_all(header.as_bytes()).await.map_err(|err| AdapterError::Connection {
        message: format!("stdio write failed: {err}"),
    })?;
    writer.write_all(payload).await.map_err(|err| AdapterError::Connection {
        message: format!("stdio write failed: {err}"),
    })?;
    writer.flush().await.map_err(|err| AdapterError::Connection {
        message: format!("stdio write failed: {err}"),
    })
}

/// Reads a `Content-Length`-framed JSON-RPC message.
///
/// # Errors
///
/// Returns [`AdapterError`] when framing headers are invalid, the frame
/// exceeds [`MAX_FRAME_BYTES`], or I/O fails.
async fn read_framed(reader: &mut BufReader<ChildStdout>) -> Result<Vec<u8>, AdapterError> {
    let mut content_length: Option<u64> = None;
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader.read_line(&mut line).await.map_err(|err| AdapterError::Connection {
            message: format!("stdio read failed: {err}"),
        })?;
        if bytes == 0 {
            return Err(AdapterError::Connection {
                message: "stdio closed".to_string(),
            });
        }
        if line.trim().is_empty() {
            break;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let parsed = value.trim().parse::<u64>().map_err(|_| AdapterError::Protocol {
                message: "invalid content length".to_string(),
            })?;
            content_length = Some(parsed);
        }
    }
    let length = content_length.ok_or_else(|| AdapterError::Protocol {
        message: "missing content length in stdio response".to_string(),
    })?;
    if length > MAX_FRAME_BYTES {
        return Err(AdapterError::Protocol {
            message: format!("stdio frame exceeds size limit ({length} > {MAX_FRAME_BYTES})"),
        });
    }
    let length = usize::try_from(length).map_err(|_| AdapterError::Protocol {
        message: "content length exceeds addressable size".to_string(),
    })?;
    let mut buffer = vec![0_u8; length];
    reader.read_exact(&mut buffer).await.map_err(|err| AdapterError::Connection {
        message: format!("stdio read failed: {err}"),
    })?;
    Ok(buffer)
}

// ============================================================================
// SECTION: Bridge Adapter
// ============================================================================

/// Source MCP adapter proxying contract operations over a bridge transport.
///
/// # Invariants
/// - Every remote call runs under the configured deadline.
pub struct StdioBridgeAdapter {
    /// Underlying transport (subprocess in production, fake in tests).
    transport: std::sync::Arc<dyn BridgeTransport>,
    /// Deadline applied to every tool invocation, in seconds.
    timeout_seconds: u64,
}

impl StdioBridgeAdapter {
    /// Creates a bridge adapter over the given transport.
    #[must_use]
    pub fn new(transport: std::sync::Arc<dyn BridgeTransport>, timeout_seconds: u64) -> Self {
        Self {
            transport,
            timeout_seconds,
        }
    }

    /// Invokes a remote contract tool with a serialized request.
    async fn proxy<T, R>(&self, tool: &'static str, req: &T) -> Result<R, AdapterError>
    where
        T: serde::Serialize + Sync,
        R: serde::de::DeserializeOwned,
    {
        let args = serde_json::to_value(req).map_err(|err| AdapterError::Json {
            message: err.to_string(),
        })?;
        let body =
            call_with_deadline(self.timeout_seconds, tool, self.transport.call_tool(tool, args))
                .await?;
        serde_json::from_value(body).map_err(|err| AdapterError::Json {
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl SourceAdapter for StdioBridgeAdapter {
    async fn source_describe(
        &self,
        _req: SourceDescribeRequest,
    ) -> Result<SourceDescribeResponse, AdapterError> {
        // Local capabilities for the bridge; does not call the remote.
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
        self.proxy("tests.list", &req).await
    }

    async fn runs_list(&self, req: RunsListRequest) -> Result<RunsListResponse, AdapterError> {
        self.proxy("runs.list", &req).await
    }

    async fn datasets_search(
        &self,
        req: DatasetsSearchRequest,
    ) -> Result<DatasetsSearchResponse, AdapterError> {
        self.proxy("datasets.search", &req).await
    }

    async fn datasets_get(
        &self,
        req: DatasetsGetRequest,
    ) -> Result<DatasetsGetResponse, AdapterError> {
        self.proxy("datasets.get", &req).await
    }

    async fn artifacts_get(
        &self,
        req: ArtifactsGetRequest,
    ) -> Result<ArtifactsGetResponse, AdapterError> {
        self.proxy("artifacts.get", &req).await
    }

    async fn schemas_get(
        &self,
        req: SchemasGetRequest,
    ) -> Result<SchemasGetResponse, AdapterError> {
        self.proxy("schemas.get", &req).await
    }

    async fn get_run_label_values(
        &self,
        req: RunLabelValuesRequest,
    ) -> Result<RunLabelValuesResponse, AdapterError> {
        self.proxy("run_label_values.get", &req).await
    }

    async fn get_test_label_values(
        &self,
        req: TestLabelValuesRequest,
    ) -> Result<TestLabelValuesResponse, AdapterError> {
        self.proxy("test_label_values.get", &req).await
    }

    async fn get_dataset_label_values(
        &self,
        req: DatasetLabelValuesRequest,
    ) -> Result<DatasetLabelValuesResponse, AdapterError> {
        self.proxy("dataset_label_values.get", &req).await
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
