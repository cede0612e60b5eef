//! The stdio loop: JSON-RPC requests in on stdin, one response per line on
//! stdout. The process runs until stdin closes.

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::mcp::{process_line, McpServer};

/// Run the MCP server loop, reading JSON-RPC from stdin and writing to
/// stdout.
pub fn run_stdio(server: &McpServer) -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let response = process_line(server, &line);
        if response.is_empty() {
            continue;
        }
        let mut out = stdout.lock();
        writeln!(out, "{response}")?;
        out.flush()?;
    }

    debug!("stdin closed, MCP session over");
    Ok(())
}
