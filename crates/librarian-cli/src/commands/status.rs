use serde_json::json;

use super::{context_and_store, print_json};

pub(crate) fn run(json: bool) -> i32 {
    let (ctx, store) = match context_and_store() {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    let counts = (|| -> Result<_, librarian_core::types::StoreError> {
        Ok((
            store.file_count()?,
            store.symbol_count()?,
            store.embedded_count()?,
            store.call_count()?,
            store.resolved_call_count()?,
            store.import_count()?,
            store.inherit_count()?,
        ))
    })();
    let (files, symbols, embedded, calls, resolved_calls, imports, inherits) = match counts {
        Ok(c) => c,
        Err(e) => {
            eprintln!("codelibrarian: status query failed: {e}");
            return 1;
        }
    };

    let last = |key: &str| {
        store
            .get_meta(key)
            .ok()
            .flatten()
            .unwrap_or_else(|| "0".to_string())
    };
    let (last_indexed, last_skipped, last_deleted) = (
        last("last_indexed"),
        last("last_skipped"),
        last("last_deleted"),
    );

    if json {
        print_json(&json!({
            "project_root": ctx.project_root,
            "files": files,
            "symbols": symbols,
            "embedded": embedded,
            "calls": calls,
            "resolved_calls": resolved_calls,
            "imports": imports,
            "inherits": inherits,
            "last_pass": {
                "indexed": last_indexed,
                "skipped": last_skipped,
                "deleted": last_deleted,
            }
        }));
        return 0;
    }

    println!("project: {}", ctx.project_root.display());
    println!("files: {files}   symbols: {symbols}   embedded: {embedded}");
    println!("calls: {calls} ({resolved_calls} resolved)   imports: {imports}   inherits: {inherits}");
    println!("last pass: {last_indexed} indexed, {last_skipped} skipped, {last_deleted} deleted");
    0
}
