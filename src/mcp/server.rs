//! MCP server setup and lifecycle.
//!
//! Implements a JSON-RPC based MCP server over stdio or HTTP transport.
//!
//! ## Transports
//!
//! - **Stdio**: one JSON-RPC message per line; responses go to stdout.
//! - **HTTP**: `POST /mcp` with a JSON-RPC body. Requires the `http` feature.
//!   There is no client authentication; bind it to trusted networks only.

use super::dispatch::McpMethod;
use crate::config::{ServerSettings, SteamMcpConfig};
use crate::mcp::ToolRegistry;
use crate::steam::SteamClient;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info_span;

/// Default maximum requests per rate limit window.
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: usize = 1000;

/// Default rate limit window duration (1 minute).
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Maximum number of HTTP clients tracked by the rate limiter.
#[cfg_attr(not(feature = "http"), allow(dead_code))]
const MAX_RATE_LIMITED_CLIENTS: usize = 4096;

/// Maximum request body size (1MB).
const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024;

/// MCP protocol version.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name.
const SERVER_NAME: &str = "steam";

/// JSON-RPC error codes.
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const PARSE_ERROR: i32 = -32700;
const RATE_LIMITED: i32 = -32000;

/// MCP rate limit configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: usize,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

impl RateLimitConfig {
    /// Creates config from server settings.
    #[must_use]
    pub const fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            max_requests: settings.rate_limit_max_requests,
            window: Duration::from_secs(settings.rate_limit_window_secs),
        }
    }

    /// Sets maximum requests per window.
    #[must_use]
    pub const fn with_max_requests(mut self, max: usize) -> Self {
        self.max_requests = max;
        self
    }

    /// Sets window duration in seconds.
    #[must_use]
    pub const fn with_window_secs(mut self, secs: u64) -> Self {
        self.window = Duration::from_secs(secs);
        self
    }
}

/// Fixed-window request counter.
#[derive(Debug, Clone)]
struct RateLimiter {
    config: RateLimitConfig,
    request_count: usize,
    window_start: Instant,
}

impl RateLimiter {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            request_count: 0,
            window_start: Instant::now(),
        }
    }

    /// Counts a request; returns false when the window's budget is spent.
    fn try_acquire(&mut self) -> bool {
        if self.window_expired() {
            self.request_count = 0;
            self.window_start = Instant::now();
        }
        if self.request_count >= self.config.max_requests {
            return false;
        }
        self.request_count += 1;
        true
    }

    fn window_expired(&self) -> bool {
        self.window_start.elapsed() > self.config.window
    }

    fn exceeded_message(&self) -> String {
        format!(
            "Rate limit exceeded: max {} requests per {:?}",
            self.config.max_requests, self.config.window
        )
    }
}

/// Rate limiters keyed by client address, holding at most `max_clients`.
///
/// When a new client arrives at capacity, clients whose window has elapsed are
/// dropped first, then the client with the oldest window.
#[cfg_attr(not(feature = "http"), allow(dead_code))]
struct ClientRateLimits {
    config: RateLimitConfig,
    max_clients: usize,
    limiters: Mutex<HashMap<IpAddr, RateLimiter>>,
}

#[cfg_attr(not(feature = "http"), allow(dead_code))]
impl ClientRateLimits {
    fn new(config: RateLimitConfig, max_clients: usize) -> Self {
        Self {
            config,
            max_clients: max_clients.max(1),
            limiters: Mutex::new(HashMap::new()),
        }
    }

    /// Counts a request from `client`; `Err(message)` when it is over budget.
    fn check(&self, client: IpAddr) -> std::result::Result<(), String> {
        let Ok(mut limiters) = self.limiters.lock() else {
            return Err("Internal server error".to_string());
        };

        if limiters.len() >= self.max_clients && !limiters.contains_key(&client) {
            limiters.retain(|_, limiter| !limiter.window_expired());
            if limiters.len() >= self.max_clients {
                let oldest = limiters
                    .iter()
                    .min_by_key(|(_, limiter)| limiter.window_start)
                    .map(|(ip, _)| *ip);
                if let Some(oldest) = oldest {
                    limiters.remove(&oldest);
                }
            }
        }

        let limiter = limiters
            .entry(client)
            .or_insert_with(|| RateLimiter::new(self.config.clone()));
        if limiter.try_acquire() {
            Ok(())
        } else {
            Err(limiter.exceeded_message())
        }
    }
}

/// Transport type for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Standard input/output (default for desktop assistants).
    #[default]
    Stdio,
    /// HTTP transport.
    Http,
}

impl Transport {
    /// Metric and span label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

/// MCP server exposing the Steam tools.
pub struct McpServer {
    /// Tool registry, shared with HTTP workers.
    tools: Arc<ToolRegistry>,
    /// Transport type.
    transport: Transport,
    /// HTTP port (if using HTTP transport).
    port: u16,
    /// Rate limit configuration.
    rate_limit: RateLimitConfig,
}

impl McpServer {
    /// Creates a server around a Steam client with default settings.
    #[must_use]
    pub fn new(client: SteamClient) -> Self {
        Self {
            tools: Arc::new(ToolRegistry::new(client)),
            transport: Transport::Stdio,
            port: ServerSettings::default().port,
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// Creates a server from configuration.
    #[must_use]
    pub fn from_config(config: &SteamMcpConfig) -> Self {
        Self::new(SteamClient::new(config))
            .with_port(config.server.port)
            .with_rate_limit(RateLimitConfig::from_settings(&config.server))
    }

    /// Sets the rate limit configuration.
    #[must_use]
    pub const fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Sets the transport type.
    #[must_use]
    pub const fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the HTTP port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Returns the tool registry.
    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Starts the MCP server.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to start.
    pub fn start(&self) -> Result<()> {
        match self.transport {
            Transport::Stdio => self.run_stdio(),
            Transport::Http => self.run_http(),
        }
    }

    /// Runs the server over stdio.
    fn run_stdio(&self) -> Result<()> {
        tracing::info!(tools = self.tools.list_tools().len(), "Starting MCP stdio server");
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        self.serve_lines(BufReader::new(stdin.lock()), stdout.lock())
    }

    /// Serves newline-delimited JSON-RPC messages until `reader` is exhausted.
    ///
    /// Each request gets one response line; notifications get none.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub fn serve_lines<R: BufRead, W: Write>(&self, mut reader: R, mut writer: W) -> Result<()> {
        let mut limiter = RateLimiter::new(self.rate_limit.clone());
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| Error::operation("read_stdin", e))?;
            if read == 0 {
                break;
            }

            let response = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.handle_limited(line, &mut limiter),
                Err(e) => {
                    tracing::warn!(error = %e, "Input line is not valid UTF-8");
                    Some(format_error(
                        Some(Value::Null),
                        PARSE_ERROR,
                        &format!("Parse error: {e}"),
                    ))
                },
            };

            if let Some(response) = response {
                writeln!(writer, "{response}").map_err(|e| Error::operation("write_stdout", e))?;
                writer
                    .flush()
                    .map_err(|e| Error::operation("flush_stdout", e))?;
            }
        }

        tracing::info!("Input closed, MCP server stopping");
        Ok(())
    }

    /// Handles one line if the limiter allows it, otherwise answers with a
    /// rate limit error carrying the request's id.
    fn handle_limited(&self, line: &str, limiter: &mut RateLimiter) -> Option<String> {
        if limiter.try_acquire() {
            return self.handle_request(line);
        }

        tracing::warn!(
            max_requests = self.rate_limit.max_requests,
            window = ?self.rate_limit.window,
            "Rate limit exceeded"
        );
        metrics::counter!("mcp_rate_limit_exceeded_total", "transport" => "stdio").increment(1);
        reply_id(line).map(|id| format_error(Some(id), RATE_LIMITED, &limiter.exceeded_message()))
    }

    /// Handles one JSON-RPC message, returning the serialized response.
    ///
    /// Returns `None` for notifications, which take no response.
    #[must_use]
    pub fn handle_request(&self, request: &str) -> Option<String> {
        process_message(&self.tools, request, self.transport).map(|response| {
            serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
        })
    }

    /// Runs the server over HTTP.
    #[cfg(feature = "http")]
    fn run_http(&self) -> Result<()> {
        use axum::http::header;
        use axum::{Router, routing::post};
        use std::net::SocketAddr;
        use tower_http::set_header::SetResponseHeaderLayer;
        use tower_http::trace::TraceLayer;

        let state = Arc::new(http_transport::McpHttpState::new(
            Arc::clone(&self.tools),
            self.rate_limit.clone(),
        ));

        let app = Router::new()
            .route("/mcp", post(http_transport::handle_http_request))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                header::HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                header::HeaderValue::from_static("no-store"),
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let rt = tokio::runtime::Runtime::new().map_err(|e| Error::operation("create_runtime", e))?;

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        tracing::info!(port = self.port, "Starting MCP HTTP server");

        rt.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| Error::operation("bind", e))?;

            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .map_err(|e| Error::operation("serve", e))
        })
    }

    /// Runs the server over HTTP (feature not enabled).
    #[cfg(not(feature = "http"))]
    fn run_http(&self) -> Result<()> {
        Err(Error::FeatureNotEnabled("http".to_string()))
    }
}

/// Parses, dispatches and records one JSON-RPC message.
fn process_message(
    tools: &ToolRegistry,
    request: &str,
    transport: Transport,
) -> Option<JsonRpcResponse> {
    if request.len() > MAX_REQUEST_BODY_SIZE {
        tracing::warn!(
            request_size = request.len(),
            max_size = MAX_REQUEST_BODY_SIZE,
            "Request exceeds maximum size limit"
        );
        return Some(error_response(
            None,
            INVALID_REQUEST,
            &format!(
                "Request too large: {} bytes (max: {MAX_REQUEST_BODY_SIZE} bytes)",
                request.len()
            ),
        ));
    }

    let start = Instant::now();
    let transport_label = transport.as_str();

    let span = info_span!(
        "mcp.request",
        transport = transport_label,
        rpc.method = tracing::field::Empty,
        rpc.id = tracing::field::Empty,
        status = tracing::field::Empty
    );
    let _guard = span.enter();

    let parsed: std::result::Result<JsonRpcRequest, _> = serde_json::from_str(request);
    let mut method_label = "parse_error".to_string();
    let mut status_label = "error";

    let response = match parsed {
        Ok(req) => {
            let method = McpMethod::from(req.method.as_str());
            span.record("rpc.method", req.method.as_str());
            if req.id.is_none() {
                tracing::debug!(method = %method, "Received notification");
                span.record("status", "notification");
                return None;
            }
            method_label = method.metrics_label().to_string();
            if let Some(id) = &req.id {
                let id_str = id.to_string();
                span.record("rpc.id", id_str.as_str());
            }

            tracing::info!(method = %req.method, transport = transport_label, "Processing MCP request");

            let result = dispatch_method(tools, method, req.params);
            status_label = if result.is_ok() { "success" } else { "error" };
            span.record("status", status_label);
            format_response(req.id, result)
        },
        Err(e) => {
            span.record("status", "parse_error");
            error_response(None, PARSE_ERROR, &format!("Parse error: {e}"))
        },
    };

    metrics::counter!(
        "mcp_requests_total",
        "method" => method_label.clone(),
        "transport" => transport_label,
        "status" => status_label
    )
    .increment(1);
    metrics::histogram!(
        "mcp_request_duration_ms",
        "method" => method_label,
        "transport" => transport_label
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);

    Some(response)
}

/// Dispatches a method call.
fn dispatch_method(tools: &ToolRegistry, method: McpMethod, params: Option<Value>) -> DispatchResult {
    match method {
        McpMethod::Initialize => Ok(handle_initialize()),
        McpMethod::ListTools => Ok(handle_list_tools(tools)),
        McpMethod::CallTool => handle_call_tool(tools, params),
        McpMethod::Ping => Ok(serde_json::json!({})),
        McpMethod::Notification(name) | McpMethod::Unknown(name) => {
            Err((METHOD_NOT_FOUND, format!("Method not found: {name}")))
        },
    }
}

/// Handles the initialize method.
fn handle_initialize() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

/// Handles tools/list.
fn handle_list_tools(tools: &ToolRegistry) -> Value {
    let tools: Vec<Value> = tools
        .list_tools()
        .iter()
        .map(|t| {
            serde_json::json!({
                "name": t.name,
                "description": t.description,
                "inputSchema": t.input_schema
            })
        })
        .collect();

    serde_json::json!({ "tools": tools })
}

/// Handles tools/call.
///
/// Tool failures are reported in the result with `isError` set, not as
/// JSON-RPC errors.
fn handle_call_tool(tools: &ToolRegistry, params: Option<Value>) -> DispatchResult {
    let params = params.ok_or((INVALID_PARAMS, "Missing params".to_string()))?;

    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or((INVALID_PARAMS, "Missing tool name".to_string()))?;
    let tool_name = if tools.get_tool(name).is_some() {
        name.to_string()
    } else {
        "unknown".to_string()
    };
    let span = info_span!("mcp.tool.call", tool.name = name);
    let _guard = span.enter();
    let start = Instant::now();

    let arguments = params
        .get("arguments")
        .cloned()
        .unwrap_or(serde_json::json!({}));

    let (result, status_label) = match tools.execute(name, arguments) {
        Ok(result) => {
            let status_label = if result.is_error { "error" } else { "success" };
            (
                serde_json::json!({
                    "content": result.content,
                    "isError": result.is_error
                }),
                status_label,
            )
        },
        Err(e) => {
            tracing::warn!(tool = name, error = %e, "Tool call failed");
            (
                serde_json::json!({
                    "content": [{ "type": "text", "text": e.to_string() }],
                    "isError": true
                }),
                "error",
            )
        },
    };
    metrics::counter!(
        "mcp_tool_calls_total",
        "tool" => tool_name.clone(),
        "status" => status_label
    )
    .increment(1);
    metrics::histogram!(
        "mcp_tool_duration_ms",
        "tool" => tool_name,
        "status" => status_label
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);

    Ok(result)
}

/// Id to answer a rejected message with.
///
/// `None` means the message is a notification and gets no reply. A message
/// that cannot be read as a JSON object is answered with a null id.
fn reply_id(request: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(request) {
        Ok(Value::Object(message)) => message.get("id").filter(|id| !id.is_null()).cloned(),
        _ => Some(Value::Null),
    }
}

/// Builds the response for a dispatch result.
fn format_response(id: Option<Value>, result: DispatchResult) -> JsonRpcResponse {
    match result {
        Ok(value) => JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(value),
            error: None,
        },
        Err((code, message)) => error_response(id, code, &message),
    }
}

/// Builds an error response.
fn error_response(id: Option<Value>, code: i32, message: &str) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.to_string(),
            data: None,
        }),
    }
}

/// Formats an error response.
fn format_error(id: Option<Value>, code: i32, message: &str) -> String {
    serde_json::to_string(&error_response(id, code, message)).unwrap_or_else(|_| "{}".to_string())
}

/// Result type for method dispatch.
type DispatchResult = std::result::Result<Value, (i32, String)>;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC version (required by protocol but not used in code).
    #[serde(rename = "jsonrpc")]
    _jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

#[cfg(feature = "http")]
mod http_transport {
    use super::{
        ClientRateLimits, INVALID_REQUEST, MAX_RATE_LIMITED_CLIENTS, PARSE_ERROR, RATE_LIMITED,
        RateLimitConfig, ToolRegistry, Transport, error_response, process_message, reply_id,
    };
    use axum::Json;
    use axum::extract::{ConnectInfo, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use std::net::SocketAddr;
    use std::sync::Arc;

    /// Shared state for HTTP transport.
    pub struct McpHttpState {
        tools: Arc<ToolRegistry>,
        /// Per-client rate limits keyed by peer address.
        rate_limits: ClientRateLimits,
    }

    impl McpHttpState {
        pub fn new(tools: Arc<ToolRegistry>, rate_limit_config: RateLimitConfig) -> Self {
            Self {
                tools,
                rate_limits: ClientRateLimits::new(rate_limit_config, MAX_RATE_LIMITED_CLIENTS),
            }
        }
    }

    /// HTTP request handler.
    ///
    /// Tool calls run on the blocking pool since the Steam client is blocking.
    pub async fn handle_http_request(
        State(state): State<Arc<McpHttpState>>,
        ConnectInfo(peer): ConnectInfo<SocketAddr>,
        body: String,
    ) -> Response {
        if let Err(message) = state.rate_limits.check(peer.ip()) {
            tracing::warn!(client = %peer.ip(), "Per-client rate limit exceeded");
            metrics::counter!("mcp_rate_limit_exceeded_total", "transport" => "http").increment(1);
            return match reply_id(&body) {
                Some(id) => (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(error_response(Some(id), RATE_LIMITED, &message)),
                )
                    .into_response(),
                None => StatusCode::TOO_MANY_REQUESTS.into_response(),
            };
        }

        let tools = Arc::clone(&state.tools);
        let joined =
            tokio::task::spawn_blocking(move || process_message(&tools, &body, Transport::Http))
                .await;

        match joined {
            Ok(Some(response)) => {
                let status = match response.error.as_ref().map(|e| e.code) {
                    Some(INVALID_REQUEST) => StatusCode::PAYLOAD_TOO_LARGE,
                    Some(PARSE_ERROR) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::OK,
                };
                (status, Json(response)).into_response()
            },
            Ok(None) => StatusCode::ACCEPTED.into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Request worker failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(error_response(None, -32603, "Internal server error")),
                )
                    .into_response()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> McpServer {
        let config = SteamMcpConfig::default().with_base_url("http://127.0.0.1:1");
        McpServer::from_config(&config)
    }

    fn respond(server: &McpServer, request: &str) -> Value {
        let line = server.handle_request(request).unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[test]
    fn test_with_transport() {
        let server = server().with_transport(Transport::Http).with_port(8080);
        assert_eq!(server.transport, Transport::Http);
        assert_eq!(server.port, 8080);
    }

    #[test]
    fn test_from_config_uses_server_settings() {
        let mut config = SteamMcpConfig::default();
        config.server.port = 9100;
        config.server.rate_limit_max_requests = 5;
        let server = McpServer::from_config(&config);
        assert_eq!(server.port, 9100);
        assert_eq!(server.rate_limit.max_requests, 5);
    }

    #[test]
    fn test_handle_initialize() {
        let response = respond(
            &server(),
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        );
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
    }

    #[test]
    fn test_handle_list_tools() {
        let response = respond(&server(), r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#);
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 5);
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }

    #[test]
    fn test_handle_ping() {
        let response = respond(&server(), r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#);
        assert_eq!(response["id"], "a");
        assert!(response["result"].is_object());
    }

    #[test]
    fn test_handle_unknown_method() {
        let response = respond(
            &server(),
            r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#,
        );
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
    }

    #[test]
    fn test_handle_parse_error() {
        let response = respond(&server(), "not valid json");
        assert_eq!(response["error"]["code"], PARSE_ERROR);
    }

    #[test]
    fn test_handle_missing_params() {
        let response = respond(&server(), r#"{"jsonrpc":"2.0","id":1,"method":"tools/call"}"#);
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
    }

    #[test]
    fn test_notification_gets_no_response() {
        let server = server();
        assert!(
            server
                .handle_request(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .is_none()
        );
    }

    #[test]
    fn test_oversize_request_rejected() {
        let big = format!(
            r#"{{"jsonrpc":"2.0","id":1,"method":"ping","params":{{"pad":"{}"}}}}"#,
            "x".repeat(MAX_REQUEST_BODY_SIZE)
        );
        let response = respond(&server(), &big);
        assert_eq!(response["error"]["code"], INVALID_REQUEST);
    }

    #[test]
    fn test_tool_error_is_result_not_rpc_error() {
        let response = respond(
            &server(),
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"get_owned_games","arguments":{}}}"#,
        );
        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("missing configuration"));
    }

    #[test]
    fn test_rate_limiter() {
        let mut limiter = RateLimiter::new(
            RateLimitConfig::default()
                .with_max_requests(2)
                .with_window_secs(3600),
        );
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        assert!(limiter.exceeded_message().contains("max 2 requests"));
    }

    #[test]
    fn test_serve_lines_applies_rate_limit() {
        let server = server().with_rate_limit(
            RateLimitConfig::default()
                .with_max_requests(1)
                .with_window_secs(3600),
        );
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n"
        );
        let mut output = Vec::new();
        server.serve_lines(input.as_bytes(), &mut output).unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["error"]["code"], RATE_LIMITED);
        assert_eq!(lines[1]["id"], 2);
    }

    fn serve(server: &McpServer, input: &[u8]) -> Vec<Value> {
        let mut output = Vec::new();
        server.serve_lines(input, &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_serve_lines_survives_invalid_utf8() {
        let mut input = Vec::new();
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n");
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"p\xffng\"}\n");
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}");

        let lines = serve(&server(), &input);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["error"]["code"], PARSE_ERROR);
        assert!(lines[1]["id"].is_null());
        assert_eq!(lines[2]["id"], 3);
        assert!(lines[2]["result"].is_object());
    }

    #[test]
    fn test_rate_limited_notification_gets_no_reply() {
        let server = server().with_rate_limit(
            RateLimitConfig::default()
                .with_max_requests(1)
                .with_window_secs(3600),
        );
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            "garbage\n"
        );
        let lines = serve(&server, input.as_bytes());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["error"]["code"], RATE_LIMITED);
        assert!(lines[1]["id"].is_null());
    }

    #[test]
    fn test_message_without_id_gets_no_reply() {
        let server = server();
        for request in [
            r#"{"jsonrpc":"2.0","method":"custom/event"}"#,
            r#"{"jsonrpc":"2.0","method":"ping"}"#,
            r#"{"jsonrpc":"2.0","id":null,"method":"tools/list"}"#,
        ] {
            assert!(server.handle_request(request).is_none(), "{request}");
        }
    }

    #[test]
    fn test_reply_id() {
        assert_eq!(reply_id(r#"{"id":7,"method":"ping"}"#), Some(serde_json::json!(7)));
        assert_eq!(reply_id(r#"{"id":"a"}"#), Some(serde_json::json!("a")));
        assert_eq!(reply_id(r#"{"method":"notifications/x"}"#), None);
        assert_eq!(reply_id("not json"), Some(Value::Null));
        assert_eq!(reply_id("[1,2]"), Some(Value::Null));
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn test_client_rate_limits_are_per_client() {
        let limits = ClientRateLimits::new(RateLimitConfig::default().with_max_requests(1), 16);
        assert!(limits.check(ip(1)).is_ok());
        assert!(limits.check(ip(1)).is_err());
        assert!(limits.check(ip(2)).is_ok());
    }

    #[test]
    fn test_client_rate_limits_evict_expired_windows() {
        let limits = ClientRateLimits::new(RateLimitConfig::default().with_window_secs(0), 2);
        limits.check(ip(1)).unwrap();
        limits.check(ip(2)).unwrap();
        std::thread::sleep(Duration::from_millis(10));

        limits.check(ip(3)).unwrap();
        let tracked = limits.limiters.lock().unwrap();
        assert_eq!(tracked.len(), 1);
        assert!(tracked.contains_key(&ip(3)));
    }

    #[test]
    fn test_client_rate_limits_stay_bounded() {
        let limits = ClientRateLimits::new(RateLimitConfig::default().with_window_secs(3600), 2);
        limits.check(ip(1)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        limits.check(ip(2)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        limits.check(ip(3)).unwrap();

        let tracked = limits.limiters.lock().unwrap();
        assert_eq!(tracked.len(), 2);
        assert!(!tracked.contains_key(&ip(1)));
        assert!(tracked.contains_key(&ip(2)));
        assert!(tracked.contains_key(&ip(3)));
    }
}
