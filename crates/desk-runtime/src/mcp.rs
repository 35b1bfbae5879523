//! Stdio client for a Model Context Protocol tool server.
//!
//! Requests are newline-delimited JSON-RPC 2.0 on the child's stdin;
//! responses are matched back to callers by id from a background reader.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use desk_core::CommandSpec;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::error::{Result, RuntimeError};

const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    id: Option<u64>,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// A tool advertised by the server.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// Result of one `tools/call`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Text content blocks joined by newlines, or the raw content as JSON.
    pub text: String,
    /// The server flagged the call as failed.
    pub is_error: bool,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<std::result::Result<Value, String>>>>>;

/// A running tool server and its session.
///
/// The child is killed when the client is dropped.
pub struct McpClient {
    name: String,
    stdin: Mutex<ChildStdin>,
    next_id: AtomicU64,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    tools: Vec<McpTool>,
    _child: Child,
}

impl McpClient {
    /// Launch the server, run the initialize handshake and fetch its tools.
    pub async fn start(command: &CommandSpec) -> Result<Self> {
        let name = command.program.display().to_string();
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RuntimeError::Mcp(format!("failed to launch {}: {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RuntimeError::Mcp(format!("{}: no stdin", name)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RuntimeError::Mcp(format!("{}: no stdout", name)))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        tokio::spawn(reader_task(
            stdout,
            pending.clone(),
            closed.clone(),
            name.clone(),
        ));

        let mut client = Self {
            name,
            stdin: Mutex::new(stdin),
            next_id: AtomicU64::new(1),
            pending,
            closed,
            tools: Vec::new(),
            _child: child,
        };

        client.initialize().await?;
        client.refresh_tools().await?;
        info!(server = %client.name, tools = client.tools.len(), "tool server ready");

        Ok(client)
    }

    /// Tools advertised at startup.
    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    /// Invoke a tool.
    ///
    /// A tool that reports failure is a successful call with `is_error`
    /// set; only protocol and transport failures are errors.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput> {
        let result = self
            .request("tools/call", Some(json!({"name": name, "arguments": arguments})))
            .await?;

        let is_error = result["isError"].as_bool().unwrap_or(false);
        let content = result.get("content").cloned().unwrap_or(Value::Null);
        let text = content
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"] == "text")
                    .filter_map(|b| b["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| content.to_string());

        debug!(server = %self.name, tool = name, is_error, "tool call finished");
        Ok(ToolOutput { text, is_error })
    }

    async fn initialize(&self) -> Result<()> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "mcp-desk",
                "version": env!("CARGO_PKG_VERSION"),
            }
        });
        let result = self.request("initialize", Some(params)).await?;
        debug!(server = %self.name, version = %result["protocolVersion"], "initialized");

        self.send_line(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await
    }

    async fn refresh_tools(&mut self) -> Result<()> {
        let result = self.request("tools/list", None).await?;
        let tools = result.get("tools").cloned().unwrap_or_else(|| json!([]));
        self.tools = serde_json::from_value(tools)
            .map_err(|e| RuntimeError::Mcp(format!("{}: bad tool list: {}", self.name, e)))?;
        Ok(())
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        {
            // Checked under the lock the reader drains with, so no slot is
            // registered after the drain.
            let mut pending = self.pending.lock().await;
            if self.closed.load(Ordering::SeqCst) {
                return Err(RuntimeError::Mcp(format!("{}: server closed", self.name)));
            }
            pending.insert(id, tx);
        }

        debug!(server = %self.name, id, method, "request");
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        if let Err(e) = self.send_line(&request).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        rx.await
            .map_err(|_| RuntimeError::Mcp(format!("{}: server closed", self.name)))?
            .map_err(|e| RuntimeError::Mcp(format!("{}: {}: {}", self.name, method, e)))
    }

    async fn send_line<T: Serialize>(&self, message: &T) -> Result<()> {
        let mut line = serde_json::to_vec(message)
            .map_err(|e| RuntimeError::Mcp(format!("{}: serialize: {}", self.name, e)))?;
        line.push(b'\n');

        let mut stdin = self.stdin.lock().await;
        let written = async {
            stdin.write_all(&line).await?;
            stdin.flush().await
        }
        .await;
        written.map_err(|e| RuntimeError::Mcp(format!("{}: write: {}", self.name, e)))
    }
}

/// Dispatch responses to waiting callers until the server closes stdout.
async fn reader_task(
    stdout: ChildStdout,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    name: String,
) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => {
                let response = match serde_json::from_str::<JsonRpcResponse>(&line) {
                    Ok(response) => response,
                    Err(e) => {
                        warn!(server = %name, error = %e, "unparseable message");
                        continue;
                    }
                };
                // Server notifications carry no id.
                let Some(id) = response.id else { continue };
                if let Some(tx) = pending.lock().await.remove(&id) {
                    let payload = match response.error {
                        Some(err) => Err(format!("error {}: {}", err.code, err.message)),
                        None => Ok(response.result.unwrap_or(Value::Null)),
                    };
                    let _ = tx.send(payload);
                }
            }
            Ok(None) => {
                debug!(server = %name, "stdout closed");
                break;
            }
            Err(e) => {
                warn!(server = %name, error = %e, "read error");
                break;
            }
        }
    }

    let mut pending = pending.lock().await;
    closed.store(true, Ordering::SeqCst);
    for (_, tx) in pending.drain() {
        let _ = tx.send(Err("server stdout closed".to_string()));
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Scripted server answering ids 1 (initialize), 2 (tools/list) and,
    /// after that, whatever `tail` prints.
    fn fake_server(tail: &str) -> CommandSpec {
        let script = format!(
            concat!(
                "read l; echo '{{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{{\"protocolVersion\":\"2024-11-05\",\"capabilities\":{{}}}}}}'; ",
                "read l; ",
                "read l; echo '{{\"jsonrpc\":\"2.0\",\"method\":\"notifications/message\"}}'; ",
                "echo '{{\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{{\"tools\":[",
                "{{\"name\":\"browser_navigate\",\"description\":\"Navigate to a URL\",\"inputSchema\":{{\"type\":\"object\"}}}},",
                "{{\"name\":\"browser_snapshot\"}}]}}}}'; ",
                "{}"
            ),
            tail
        );
        CommandSpec::new("/bin/sh").args(["-c", script.as_str()])
    }

    #[tokio::test]
    async fn test_handshake_lists_tools() {
        let client = McpClient::start(&fake_server("")).await.unwrap();
        let names: Vec<&str> = client.tools().iter().map(|t| t.name.as_str()).collect();

        assert_eq!(names, vec!["browser_navigate", "browser_snapshot"]);
        assert_eq!(client.tools()[0].description.as_deref(), Some("Navigate to a URL"));
        assert_eq!(client.tools()[1].input_schema, Value::Null);
    }

    #[tokio::test]
    async fn test_call_tool_joins_text_blocks() {
        let tail = r#"read l; echo '{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"navigated"},{"type":"image","data":"x"},{"type":"text","text":"title: Example"}]}}'"#;
        let client = McpClient::start(&fake_server(tail)).await.unwrap();

        let output = client
            .call_tool("browser_navigate", json!({"url": "https://example.com"}))
            .await
            .unwrap();
        assert_eq!(output.text, "navigated\ntitle: Example");
        assert!(!output.is_error);
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported_not_raised() {
        let tail = r#"read l; echo '{"jsonrpc":"2.0","id":3,"result":{"isError":true,"content":[{"type":"text","text":"no such element"}]}}'"#;
        let client = McpClient::start(&fake_server(tail)).await.unwrap();

        let output = client.call_tool("browser_click", json!({})).await.unwrap();
        assert!(output.is_error);
        assert_eq!(output.text, "no such element");
    }

    #[tokio::test]
    async fn test_rpc_error_is_raised() {
        let tail = r#"read l; echo '{"jsonrpc":"2.0","id":3,"error":{"code":-32602,"message":"unknown tool"}}'"#;
        let client = McpClient::start(&fake_server(tail)).await.unwrap();

        let err = client.call_tool("nope", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("unknown tool"));
    }

    #[tokio::test]
    async fn test_server_exit_fails_pending_call() {
        let client = McpClient::start(&fake_server("read l; exit 0")).await.unwrap();
        let err = client.call_tool("browser_snapshot", json!({})).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Mcp(_)));
    }

    #[tokio::test]
    async fn test_server_that_never_answers_fails_start() {
        let server = CommandSpec::new("/bin/sh").args(["-c", "exit 0"]);
        assert!(McpClient::start(&server).await.is_err());
    }

    #[tokio::test]
    async fn test_calls_after_server_exit_fail_fast() {
        let client = McpClient::start(&fake_server("exit 0")).await.unwrap();
        for _ in 0..3 {
            let call = client.call_tool("browser_snapshot", json!({}));
            let result = tokio::time::timeout(std::time::Duration::from_secs(5), call)
                .await
                .expect("call hung after server exit");
            assert!(result.is_err());
        }
    }

    #[tokio::test]
    async fn test_missing_server_fails_start() {
        let err = McpClient::start(&CommandSpec::new("/nonexistent/mcp-server"))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("/nonexistent/mcp-server"));
    }
}
