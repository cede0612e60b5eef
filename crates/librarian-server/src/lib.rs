//! MCP (Model Context Protocol) server for codelibrarian.
//!
//! JSON-RPC 2.0 over stdin/stdout. Tool calls are serialised onto one
//! store handle; missing targets come back as empty arrays, never errors.

pub mod diagram;
pub mod mcp;
pub mod mcp_stdio;

pub use mcp::McpServer;
pub use mcp_stdio::run_stdio;
