//! JSON-RPC dispatch for the MCP tool surface.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use librarian_core::config::LibrarianConfig;
use librarian_core::embed::Embedder;
use librarian_core::sqlite::SqliteStore;
use librarian_core::types::SymbolKind;
use librarian_index::embedder::EmbeddingClient;
use librarian_search::rewrite::{HttpRewriter, Rewriter};
use librarian_search::{SearchEngine, SearchOptions};

use crate::diagram::mermaid_graph;

#[derive(Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    params: Option<Value>,
    id: Option<Value>,
}

#[derive(Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Value,
}

#[derive(Serialize)]
pub(crate) struct JsonRpcError {
    pub(crate) code: i64,
    pub(crate) message: String,
}

#[derive(Serialize)]
struct ToolInfo {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

/// The server state: one store handle all tool calls serialise onto, plus
/// the pooled embedding and rewrite clients.
pub struct McpServer {
    store: Mutex<SqliteStore>,
    embedder: Option<EmbeddingClient>,
    rewriter: Option<HttpRewriter>,
}

impl McpServer {
    pub fn new(store: SqliteStore, config: &LibrarianConfig) -> Self {
        Self {
            store: Mutex::new(store),
            embedder: EmbeddingClient::from_config(&config.embeddings),
            rewriter: HttpRewriter::from_config(config.query_rewrite.as_ref()),
        }
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, SqliteStore>, JsonRpcError> {
        self.store.lock().map_err(|_| JsonRpcError {
            code: -32603,
            message: "store lock poisoned".into(),
        })
    }
}

fn tool_list() -> Vec<ToolInfo> {
    let name_schema = |field: &str| {
        serde_json::json!({
            "type": "object",
            "required": [field],
            "properties": { field: { "type": "string" } }
        })
    };
    vec![
        ToolInfo {
            name: "search_code".into(),
            description: "Hybrid full-text and semantic search over indexed symbols".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": { "type": "string" },
                    "limit": { "type": "integer", "default": 10 },
                    "mode": { "type": "string", "enum": ["hybrid", "semantic", "text"] },
                    "rewrite": { "type": "boolean", "default": false }
                }
            }),
        },
        ToolInfo {
            name: "lookup_symbol".into(),
            description: "Find symbols by exact name or qualified name".into(),
            input_schema: name_schema("name"),
        },
        ToolInfo {
            name: "list_symbols".into(),
            description: "List indexed symbols with optional kind/path/name filters".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "kind": { "type": "string", "enum": ["function", "method", "class", "module"] },
                    "path": { "type": "string" },
                    "name": { "type": "string" },
                    "limit": { "type": "integer", "default": 50 }
                }
            }),
        },
        ToolInfo {
            name: "get_callers".into(),
            description: "Transitive callers of a symbol, up to a depth".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["qname"],
                "properties": {
                    "qname": { "type": "string" },
                    "depth": { "type": "integer", "default": 1 }
                }
            }),
        },
        ToolInfo {
            name: "get_callees".into(),
            description: "Transitive callees of a symbol, up to a depth".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["qname"],
                "properties": {
                    "qname": { "type": "string" },
                    "depth": { "type": "integer", "default": 1 }
                }
            }),
        },
        ToolInfo {
            name: "count_callers".into(),
            description: "Number of direct callers of a symbol".into(),
            input_schema: name_schema("qname"),
        },
        ToolInfo {
            name: "count_callees".into(),
            description: "Number of direct callees of a symbol".into(),
            input_schema: name_schema("qname"),
        },
        ToolInfo {
            name: "get_class_hierarchy".into(),
            description: "Parent and child classes of a class".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "required": ["name"],
                "properties": {
                    "name": { "type": "string" },
                    "depth": { "type": "integer", "default": 3 }
                }
            }),
        },
        ToolInfo {
            name: "get_file_imports".into(),
            description: "Import edges recorded for one file".into(),
            input_schema: name_schema("path"),
        },
        ToolInfo {
            name: "get_call_diagram".into(),
            description: "Mermaid diagram of the resolved call graph".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "limit": { "type": "integer", "default": 200 } }
            }),
        },
        ToolInfo {
            name: "get_import_diagram".into(),
            description: "Mermaid diagram of resolved module imports".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "limit": { "type": "integer", "default": 200 } }
            }),
        },
    ]
}

fn dispatch(server: &McpServer, method: &str, params: Option<Value>) -> Result<Value, JsonRpcError> {
    match method {
        "initialize" => Ok(serde_json::json!({
            "protocolVersion": "2024-11-05",
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": "codelibrarian",
                "version": env!("CARGO_PKG_VERSION")
            }
        })),
        "notifications/initialized" => Ok(Value::Null),
        "tools/list" => {
            serde_json::to_value(serde_json::json!({ "tools": tool_list() })).map_err(internal_err)
        }
        "tools/call" => {
            let name = param_str(&params, "name").ok_or_else(|| missing_param("name"))?;
            let arguments = params
                .as_ref()
                .and_then(|p| p.get("arguments"))
                .cloned();
            let result = dispatch_tool(server, &name, arguments)?;
            // MCP tool results travel as text content blocks.
            Ok(serde_json::json!({
                "content": [{ "type": "text", "text": result.to_string() }],
                "isError": false
            }))
        }
        other => dispatch_tool(server, other, params),
    }
}

fn dispatch_tool(
    server: &McpServer,
    name: &str,
    params: Option<Value>,
) -> Result<Value, JsonRpcError> {
    match name {
        "search_code" => handle_search(server, params),
        "lookup_symbol" => handle_lookup(server, params),
        "list_symbols" => handle_list(server, params),
        "get_callers" => handle_call_graph(server, params, true),
        "get_callees" => handle_call_graph(server, params, false),
        "count_callers" => handle_call_count(server, params, true),
        "count_callees" => handle_call_count(server, params, false),
        "get_class_hierarchy" => handle_hierarchy(server, params),
        "get_file_imports" => handle_imports(server, params),
        "get_call_diagram" => handle_diagram(server, params, true),
        "get_import_diagram" => handle_diagram(server, params, false),
        _ => Err(JsonRpcError {
            code: -32601,
            message: format!("Method not found: {name}"),
        }),
    }
}

fn handle_search(server: &McpServer, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let query = param_str(&params, "query").ok_or_else(|| missing_param("query"))?;
    let mode = param_str(&params, "mode").unwrap_or_default();
    let opts = SearchOptions {
        limit: param_usize(&params, "limit").unwrap_or(10),
        semantic_only: mode == "semantic",
        text_only: mode == "text",
        rewrite: param_bool(&params, "rewrite"),
    };

    let store = server.lock_store()?;
    let engine = SearchEngine::new(&store)
        .with_embedder(server.embedder.as_ref().map(|e| e as &dyn Embedder))
        .with_rewriter(server.rewriter.as_ref().map(|r| r as &dyn Rewriter));
    let results = engine.search(&query, &opts).map_err(internal_err)?;
    serde_json::to_value(results).map_err(internal_err)
}

fn handle_lookup(server: &McpServer, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let name = param_str(&params, "name").ok_or_else(|| missing_param("name"))?;
    let store = server.lock_store()?;
    let symbols = store.find_symbols(&name).map_err(internal_err)?;
    serde_json::to_value(symbols).map_err(internal_err)
}

fn handle_list(server: &McpServer, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let kind = param_str(&params, "kind").and_then(|k| SymbolKind::parse(&k));
    let path = param_str(&params, "path");
    let name = param_str(&params, "name");
    let limit = param_usize(&params, "limit").unwrap_or(50);

    let store = server.lock_store()?;
    let symbols = store
        .list_symbols(kind, path.as_deref(), name.as_deref(), limit)
        .map_err(internal_err)?;
    serde_json::to_value(symbols).map_err(internal_err)
}

fn handle_call_graph(
    server: &McpServer,
    params: Option<Value>,
    callers: bool,
) -> Result<Value, JsonRpcError> {
    let qname = param_str(&params, "qname").ok_or_else(|| missing_param("qname"))?;
    let depth = param_usize(&params, "depth").unwrap_or(1) as u32;
    let store = server.lock_store()?;
    let symbols = if callers {
        store.get_callers(&qname, depth)
    } else {
        store.get_callees(&qname, depth)
    }
    .map_err(internal_err)?;
    serde_json::to_value(symbols).map_err(internal_err)
}

fn handle_call_count(
    server: &McpServer,
    params: Option<Value>,
    callers: bool,
) -> Result<Value, JsonRpcError> {
    let qname = param_str(&params, "qname").ok_or_else(|| missing_param("qname"))?;
    let store = server.lock_store()?;
    let symbols = if callers {
        store.get_callers(&qname, 1)
    } else {
        store.get_callees(&qname, 1)
    }
    .map_err(internal_err)?;
    Ok(serde_json::json!({ "qname": qname, "count": symbols.len() }))
}

fn handle_hierarchy(server: &McpServer, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let name = param_str(&params, "name").ok_or_else(|| missing_param("name"))?;
    let depth = param_usize(&params, "depth").unwrap_or(3) as u32;
    let store = server.lock_store()?;
    let hierarchy = store.get_class_hierarchy(&name, depth).map_err(internal_err)?;
    serde_json::to_value(hierarchy).map_err(internal_err)
}

fn handle_imports(server: &McpServer, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let path = param_str(&params, "path").ok_or_else(|| missing_param("path"))?;
    let store = server.lock_store()?;
    let imports = store.file_imports(&path).map_err(internal_err)?;
    serde_json::to_value(imports).map_err(internal_err)
}

fn handle_diagram(
    server: &McpServer,
    params: Option<Value>,
    calls: bool,
) -> Result<Value, JsonRpcError> {
    let limit = param_usize(&params, "limit").unwrap_or(200);
    let store = server.lock_store()?;
    let edges = if calls {
        store.get_call_edges(limit)
    } else {
        store.get_import_edges(limit)
    }
    .map_err(internal_err)?;
    Ok(serde_json::json!({ "mermaid": mermaid_graph(&edges) }))
}

// ---------------------------------------------------------------------------
// Plumbing
// ---------------------------------------------------------------------------

fn param_str(params: &Option<Value>, key: &str) -> Option<String> {
    params
        .as_ref()?
        .get(key)?
        .as_str()
        .map(|s| s.to_string())
}

fn param_usize(params: &Option<Value>, key: &str) -> Option<usize> {
    params.as_ref()?.get(key)?.as_u64().map(|n| n as usize)
}

fn param_bool(params: &Option<Value>, key: &str) -> bool {
    params
        .as_ref()
        .and_then(|p| p.get(key))
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

pub(crate) fn internal_err(e: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError {
        code: -32603,
        message: e.to_string(),
    }
}

fn missing_param(name: &str) -> JsonRpcError {
    JsonRpcError {
        code: -32602,
        message: format!("Missing '{name}' parameter"),
    }
}

/// Process a single JSON-RPC line and return the response JSON string.
pub fn process_line(server: &McpServer, line: &str) -> String {
    if line.trim().is_empty() {
        return String::new();
    }

    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            let response = JsonRpcResponse {
                jsonrpc: "2.0".into(),
                result: None,
                error: Some(JsonRpcError {
                    code: -32700,
                    message: format!("Parse error: {e}"),
                }),
                id: Value::Null,
            };
            return serde_json::to_string(&response).unwrap_or_default();
        }
    };

    // Notifications get no reply.
    if request.id.is_none() && request.method.starts_with("notifications/") {
        return String::new();
    }

    let id = request.id.clone().unwrap_or(Value::Null);
    let response = match dispatch(server, &request.method, request.params) {
        Ok(result) => JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        },
        Err(error) => JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        },
    };
    serde_json::to_string(&response).unwrap_or_default()
}

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod tests;
