//! MCP server implementation.
//!
//! The server handles the MCP protocol lifecycle:
//! 1. Initialize - exchange capabilities, once per session
//! 2. List and call tools through the shared [`ToolHandler`]
//! 3. Shutdown - EOF on stdio, or `DELETE /mcp` over HTTP
//!
//! Protocol state lives in a [`Session`] owned by the transport, so the
//! server itself is immutable and can be shared across HTTP requests.

use std::io;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::handlers::ToolHandler;
use crate::protocol::{
    IncomingMessage, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, RequestId, ServerCapabilities, ServerInfo, ToolCallParams, ToolsCapability,
    ToolsListResult, MCP_VERSION,
};
use crate::transport::StdioTransport;

pub const SERVER_NAME: &str = "azdo-mcp";

/// Per-connection protocol state.
#[derive(Debug, Default, Clone)]
pub struct Session {
    initialized: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// MCP server for azdo-tools.
pub struct McpServer {
    handler: Arc<ToolHandler>,
}

impl McpServer {
    pub fn new(handler: Arc<ToolHandler>) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &ToolHandler {
        &self.handler
    }

    /// Serve one session over stdin/stdout until EOF.
    pub async fn run_stdio(&self) -> azdo_core::Result<()> {
        self.serve(StdioTransport::stdio()).await
    }

    /// Run the message loop over `transport` until EOF or a write failure.
    pub async fn serve(&self, mut transport: StdioTransport) -> azdo_core::Result<()> {
        tracing::info!(
            "Starting MCP server with {} tools",
            self.handler.available_tools().len()
        );

        let mut session = Session::new();
        loop {
            let response = match transport.read_message() {
                Ok(Some(msg)) => self.handle_message(&mut session, msg).await,
                Ok(None) => {
                    tracing::info!("EOF received, shutting down");
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::InvalidData => Some(JsonRpcResponse::error(
                    RequestId::Null,
                    JsonRpcError::parse_error(&e.to_string()),
                )),
                Err(e) => {
                    tracing::error!("Transport error: {}", e);
                    break;
                }
            };

            if let Some(resp) = response {
                if let Err(e) = transport.write_response(&resp) {
                    tracing::error!("Failed to write response: {}", e);
                    break;
                }
            }
        }

        tracing::info!("MCP server stopped");
        Ok(())
    }

    /// Handle an incoming message. Notifications never get a response.
    pub async fn handle_message(
        &self,
        session: &mut Session,
        msg: IncomingMessage,
    ) -> Option<JsonRpcResponse> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(session, req).await),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif.method);
                None
            }
        }
    }

    async fn handle_request(&self, session: &mut Session, req: JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!("Handling request: {} (id: {:?})", req.method, req.id);

        match req.method.as_str() {
            "initialize" => self.handle_initialize(session, req.id, req.params),
            "tools/list" => self.handle_tools_list(req.id),
            "tools/call" => self.handle_tools_call(req.id, req.params).await,
            "ping" => JsonRpcResponse::success(req.id, serde_json::json!({})),
            method => {
                tracing::warn!("Unknown method: {}", method);
                JsonRpcResponse::error(req.id, JsonRpcError::method_not_found(method))
            }
        }
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" | "initialized" => {
                tracing::info!("Client initialized");
            }
            "notifications/cancelled" => {
                tracing::debug!("Request cancelled by client");
            }
            _ => {
                tracing::debug!("Ignoring notification: {}", method);
            }
        }
    }

    fn handle_initialize(
        &self,
        session: &mut Session,
        id: RequestId,
        params: Option<Value>,
    ) -> JsonRpcResponse {
        if session.initialized {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Server already initialized"),
            );
        }

        // Client info is only logged; malformed params do not fail the handshake.
        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(init) => tracing::info!(
                    "Client: {} v{} (protocol: {})",
                    init.client_info.name,
                    init.client_info.version,
                    init.protocol_version
                ),
                Err(e) => tracing::warn!("Failed to parse initialize params: {}", e),
            }
        }

        session.initialized = true;

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        respond(id, &result)
    }

    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.handler.available_tools().to_vec(),
        };
        respond(id, &result)
    }

    async fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p @ Value::Object(_)) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(&e.to_string()),
                    );
                }
            },
            Some(_) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("params must be an object"),
                );
            }
            None => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("Missing params"));
            }
        };

        tracing::info!("Calling tool: {}", params.name);

        let result = self.handler.execute(&params.name, params.arguments).await;
        respond(id, &result)
    }
}

fn respond<T: Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(&e.to_string())),
    }
}
