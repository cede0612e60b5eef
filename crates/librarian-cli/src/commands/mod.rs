//! Command implementations. Each `run` returns the process exit code:
//! 0 on success, 1 for configuration errors and for lookups the user
//! expected to hit.

use std::path::PathBuf;

use librarian_core::config::{discover_project_root, ConfigError, LibrarianConfig};
use librarian_core::sqlite::SqliteStore;
use librarian_core::types::StoreError;

pub mod diagram;
pub mod graph;
pub mod hierarchy;
pub mod imports;
pub mod index;
pub mod init;
pub mod lookup;
pub mod search;
pub mod serve;
pub mod status;
pub mod symbols;

pub(crate) struct Context {
    pub project_root: PathBuf,
    pub config: LibrarianConfig,
}

/// Locate the project and load its configuration, or explain how to start.
pub(crate) fn load_context() -> Result<Context, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::Io {
        path: PathBuf::from("."),
        source: e,
    })?;
    let project_root = discover_project_root(&cwd)?;
    let config = LibrarianConfig::load(&project_root)?;
    Ok(Context {
        project_root,
        config,
    })
}

pub(crate) fn open_store(ctx: &Context) -> Result<SqliteStore, StoreError> {
    SqliteStore::open(&ctx.config.db_path(&ctx.project_root))
}

/// Shared preamble: context + store, with user-visible failures reported.
pub(crate) fn context_and_store() -> Result<(Context, SqliteStore), i32> {
    let ctx = match load_context() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("codelibrarian: {e}");
            return Err(1);
        }
    };
    let store = match open_store(&ctx) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("codelibrarian: cannot open index database: {e}");
            return Err(1);
        }
    };
    Ok((ctx, store))
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("codelibrarian: JSON encoding failed: {e}"),
    }
}

pub(crate) fn symbol_line(symbol: &librarian_core::types::Symbol) -> String {
    format!(
        "{:<10} {}  {}:{}",
        symbol.kind, symbol.qualified_name, symbol.file_path, symbol.line_start
    )
}
