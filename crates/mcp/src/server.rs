//! MCP server over stdio.
//!
//! Newline-delimited JSON-RPC 2.0. Each request runs on its own task so a
//! slow upstream fetch never blocks `ping` or a cancellation notice; a single
//! writer task serializes responses onto the output stream.

use crate::protocol::*;
use crate::tools::ToolRegistry;
use anyhow::Result;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const SERVER_NAME: &str = "mcp-br";

#[derive(Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    in_flight: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Serve on the process stdin/stdout until the client closes stdin
    pub async fn start(&self) -> Result<()> {
        info!(tools = self.registry.len(), "MCP server starting on stdio");
        self.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve requests read from `reader`, writing responses to `writer`.
    ///
    /// Returns once the reader hits EOF and every in-flight request has
    /// written its response.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(response) = rx.recv().await {
                let mut line = serde_json::to_string(&response)?;
                line.push('\n');
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await?;
            }
            Ok::<_, anyhow::Error>(())
        });

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!(bytes = line.len(), "Received message");

            let request = match parse_request(line) {
                Ok(request) => request,
                Err(response) => {
                    let _ = tx.send(response);
                    continue;
                }
            };

            // Register before spawning so a following cancel always finds it
            let token = match self.begin_request(&request) {
                Ok(token) => token,
                Err(response) => {
                    let _ = tx.send(response);
                    continue;
                }
            };
            let server = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = server.handle_request(request, token).await {
                    let _ = tx.send(response);
                }
            });
        }

        info!("Client closed connection");
        drop(tx);
        writer_task.await??;
        Ok(())
    }

    /// Handle one raw message; `None` for notifications
    pub async fn handle_message(&self, line: &str) -> Option<JsonRpcResponse> {
        let request = match parse_request(line) {
            Ok(request) => request,
            Err(response) => return Some(response),
        };
        let token = match self.begin_request(&request) {
            Ok(token) => token,
            Err(response) => return Some(response),
        };
        self.handle_request(request, token).await
    }

    /// Number of tool calls currently running
    pub fn in_flight(&self) -> usize {
        self.lock_in_flight().len()
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a cancellation handle for a tool call. An id that is still
    /// in flight is rejected so each handle stays owned by one call.
    fn begin_request(
        &self,
        request: &JsonRpcRequest,
    ) -> Result<Option<CancellationToken>, JsonRpcResponse> {
        let Some(id) = request.id.as_ref() else {
            return Ok(None);
        };
        if request.method != "tools/call" {
            return Ok(None);
        }

        match self.lock_in_flight().entry(request_key(id)) {
            Entry::Occupied(_) => {
                warn!(request_id = %id, "Request id already in flight");
                Err(JsonRpcResponse::error(id.clone(), JsonRpcError::invalid_request()))
            }
            Entry::Vacant(slot) => {
                let token = CancellationToken::new();
                slot.insert(token.clone());
                Ok(Some(token))
            }
        }
    }

    async fn handle_request(
        &self,
        request: JsonRpcRequest,
        token: Option<CancellationToken>,
    ) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            match request.method.as_str() {
                "notifications/cancelled" => self.handle_cancelled(request.params),
                "notifications/initialized" => {}
                method => debug!(method, "Ignoring notification"),
            }
            return None;
        }

        let result = match (request.method.as_str(), &request.id) {
            (_, None) => return None,
            ("initialize", Some(_)) => self.handle_initialize(request.params),
            ("ping", Some(_)) => Ok(serde_json::json!({})),
            ("tools/list", Some(_)) => self.handle_list_tools(),
            ("tools/call", Some(id)) => {
                let token = token.unwrap_or_else(CancellationToken::new);
                let result = self.handle_call_tool(request.params, &token).await;
                self.lock_in_flight().remove(&request_key(id));
                // A cancelled request gets no response
                if token.is_cancelled() {
                    debug!(request_id = %id, "Dropping response for cancelled request");
                    return None;
                }
                result
            }
            (method, Some(_)) => Err(JsonRpcError::method_not_found(method)),
        };

        let id = request.id.unwrap_or(Value::Null);
        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid initialize params: {}", e)))?;

        info!(
            client = params.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
            protocol_version = %params.protocol_version,
            "Client initialized"
        );

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        serde_json::to_value(result)
            .map_err(|e| JsonRpcError::internal_error(format!("Failed to serialize result: {}", e)))
    }

    fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        let result = ListToolsResult {
            tools: self.registry.list_schemas(),
        };
        serde_json::to_value(result)
            .map_err(|e| JsonRpcError::internal_error(format!("Failed to serialize tools: {}", e)))
    }

    async fn handle_call_tool(
        &self,
        params: Option<Value>,
        token: &CancellationToken,
    ) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tool call params: {}", e)))?;

        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)))?;

        let result = tool.execute(params.arguments, token).await.map_err(|e| {
            warn!(tool = %params.name, error = %e, "Tool execution failed");
            JsonRpcError::internal_error(format!("Tool execution failed: {}", params.name))
        })?;

        serde_json::to_value(result).map_err(|e| {
            JsonRpcError::internal_error(format!("Failed to serialize tool result: {}", e))
        })
    }

    fn handle_cancelled(&self, params: Option<Value>) {
        let Some(params) = params.and_then(|p| serde_json::from_value::<CancelledParams>(p).ok())
        else {
            warn!("Ignoring malformed cancellation notice");
            return;
        };

        match self.lock_in_flight().get(&request_key(&params.request_id)) {
            Some(token) => {
                info!(request_id = %params.request_id, reason = ?params.reason, "Cancelling request");
                token.cancel();
            }
            None => debug!(request_id = %params.request_id, "Cancellation for unknown request"),
        }
    }
}

fn parse_request(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let request: JsonRpcRequest = serde_json::from_str(line).map_err(|e| {
        warn!(error = %e, "Failed to parse message");
        JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error())
    })?;

    if request.jsonrpc != "2.0" {
        return Err(JsonRpcResponse::error(
            request.id.unwrap_or(Value::Null),
            JsonRpcError::invalid_request(),
        ));
    }
    Ok(request)
}

/// Request ids may be numbers or strings; key them by their JSON text
fn request_key(id: &Value) -> String {
    id.to_string()
}
