use librarian_server::diagram::mermaid_graph;

use super::context_and_store;

pub(crate) fn run(kind: &str, limit: usize) -> i32 {
    let (_ctx, store) = match context_and_store() {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    let edges = match kind {
        "imports" => store.get_import_edges(limit),
        _ => store.get_call_edges(limit),
    };
    match edges {
        Ok(edges) => {
            println!("{}", mermaid_graph(&edges));
            0
        }
        Err(e) => {
            eprintln!("codelibrarian: diagram query failed: {e}");
            1
        }
    }
}
