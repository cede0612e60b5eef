use librarian_server::{run_stdio, McpServer};

use super::context_and_store;

pub(crate) fn run() -> i32 {
    let (ctx, store) = match context_and_store() {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    let server = McpServer::new(store, &ctx.config);
    match run_stdio(&server) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("codelibrarian: MCP server terminated: {e}");
            1
        }
    }
}
