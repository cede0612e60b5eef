use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::sqlite_helpers::{self, encode_json_list, encode_params};
use crate::types::{ParseResult, StoreError};

const SCHEMA_VERSION: u32 = 1;

/// SQLite-backed index store.
///
/// One instance owns the process's write access; concurrent readers may
/// open their own connections. All per-file mutation happens inside a
/// single transaction so an interrupted pass leaves the cache retryable.
pub struct SqliteStore {
    pub(crate) conn: Connection,
}

impl SqliteStore {
    /// Open or create an index database at the given path.
    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        let store = SqliteStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory index database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let store = SqliteStore { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            -- Schema version and last-pass statistics
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Source files; hash is the incremental cache key
            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY,
                path TEXT NOT NULL UNIQUE,
                rel_path TEXT NOT NULL,
                module_path TEXT NOT NULL,
                language TEXT NOT NULL,
                mtime INTEGER NOT NULL,
                hash TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_files_module ON files(module_path);

            -- Symbols; rewritten atomically per file
            CREATE TABLE IF NOT EXISTS symbols (
                id INTEGER PRIMARY KEY,
                file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
                parent_id INTEGER REFERENCES symbols(id) ON DELETE CASCADE,
                kind TEXT NOT NULL CHECK (kind IN ('function', 'method', 'class', 'module')),
                name TEXT NOT NULL,
                qualified_name TEXT NOT NULL,
                file_path TEXT NOT NULL,
                line_start INTEGER NOT NULL,
                line_end INTEGER NOT NULL,
                signature TEXT NOT NULL DEFAULT '',
                doc TEXT,
                params TEXT NOT NULL DEFAULT '[]',
                return_type TEXT,
                decorators TEXT NOT NULL DEFAULT '[]'
            );
            CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file_id);
            CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
            CREATE INDEX IF NOT EXISTS idx_symbols_qname ON symbols(qualified_name);
            CREATE INDEX IF NOT EXISTS idx_symbols_kind ON symbols(kind);

            -- Import edges (file -> module string -> file)
            CREATE TABLE IF NOT EXISTS imports (
                id INTEGER PRIMARY KEY,
                file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
                to_module TEXT NOT NULL,
                import_name TEXT,
                line INTEGER NOT NULL DEFAULT 0,
                resolved_file_id INTEGER REFERENCES files(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_imports_file ON imports(file_id);

            -- Call edges (symbol -> qualified name -> symbol)
            CREATE TABLE IF NOT EXISTS calls (
                id INTEGER PRIMARY KEY,
                file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
                caller_id INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
                target_qname TEXT NOT NULL,
                line INTEGER NOT NULL,
                resolved_id INTEGER REFERENCES symbols(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_calls_caller ON calls(caller_id);
            CREATE INDEX IF NOT EXISTS idx_calls_resolved ON calls(resolved_id);

            -- Inheritance edges (class -> qualified name -> class)
            CREATE TABLE IF NOT EXISTS inherits (
                id INTEGER PRIMARY KEY,
                file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
                child_id INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
                parent_qname TEXT NOT NULL,
                resolved_id INTEGER REFERENCES symbols(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_inherits_child ON inherits(child_id);
            CREATE INDEX IF NOT EXISTS idx_inherits_resolved ON inherits(resolved_id);

            -- Dense vectors, little-endian f32 blobs keyed by symbol
            CREATE TABLE IF NOT EXISTS embeddings (
                symbol_id INTEGER PRIMARY KEY REFERENCES symbols(id) ON DELETE CASCADE,
                vector BLOB NOT NULL,
                dims INTEGER NOT NULL
            );

            -- Full-text mirror of symbols, synchronised by trigger
            CREATE VIRTUAL TABLE IF NOT EXISTS symbols_fts USING fts5(
                name, qualified_name, signature, doc, file_path,
                content='symbols', content_rowid='id'
            );
            CREATE TRIGGER IF NOT EXISTS symbols_fts_insert AFTER INSERT ON symbols BEGIN
                INSERT INTO symbols_fts(rowid, name, qualified_name, signature, doc, file_path)
                VALUES (new.id, new.name, new.qualified_name, new.signature, new.doc, new.file_path);
            END;
            CREATE TRIGGER IF NOT EXISTS symbols_fts_delete AFTER DELETE ON symbols BEGIN
                INSERT INTO symbols_fts(symbols_fts, rowid, name, qualified_name, signature, doc, file_path)
                VALUES ('delete', old.id, old.name, old.qualified_name, old.signature, old.doc, old.file_path);
            END;
            ",
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;

        let found = self.schema_version()?;
        if found != SCHEMA_VERSION {
            return Err(StoreError::SchemaVersion {
                found,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(())
    }

    /// Get the current schema version.
    pub fn schema_version(&self) -> Result<u32, StoreError> {
        let version: String = self.conn.query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )?;
        version
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("invalid schema version: {e}")))
    }

    /// Store an arbitrary metadata value (pass statistics, tool state).
    pub fn set_meta(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read back a metadata value.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Insert or refresh a file row.
    ///
    /// Returns `(file_id, unchanged)`. `unchanged` is true when the stored
    /// content hash already equals `hash`; callers use it to skip parsing.
    #[allow(clippy::too_many_arguments)]
    pub fn upsert_file(
        &self,
        path: &str,
        rel_path: &str,
        module_path: &str,
        language: &str,
        mtime: i64,
        hash: &str,
    ) -> Result<(i64, bool), StoreError> {
        let existing: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT id, hash FROM files WHERE path = ?1",
                params![path],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            Some((id, old_hash)) if old_hash == hash => Ok((id, true)),
            Some((id, _)) => {
                self.conn.execute(
                    "UPDATE files SET rel_path = ?1, module_path = ?2, language = ?3,
                     mtime = ?4, hash = ?5 WHERE id = ?6",
                    params![rel_path, module_path, language, mtime, hash, id],
                )?;
                Ok((id, false))
            }
            None => {
                self.conn.execute(
                    "INSERT INTO files (path, rel_path, module_path, language, mtime, hash)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![path, rel_path, module_path, language, mtime, hash],
                )?;
                Ok((self.conn.last_insert_rowid(), false))
            }
        }
    }

    /// Replace the entire indexed population of one file in a single
    /// transaction: wipe its embeddings, outbound edges, and symbols, then
    /// insert the new parse output.
    ///
    /// Parent linkage and caller/child edge endpoints are resolved against
    /// the freshly inserted symbols by qualified name; an edge naming a
    /// caller that does not exist in this file is dropped.
    pub fn replace_file_index(
        &mut self,
        file_id: i64,
        file_path: &str,
        result: &ParseResult,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;

        // Wipe in dependency order; the symbols delete fires the FTS trigger.
        tx.execute(
            "DELETE FROM embeddings WHERE symbol_id IN (SELECT id FROM symbols WHERE file_id = ?1)",
            params![file_id],
        )?;
        tx.execute("DELETE FROM calls WHERE file_id = ?1", params![file_id])?;
        tx.execute("DELETE FROM inherits WHERE file_id = ?1", params![file_id])?;
        tx.execute("DELETE FROM imports WHERE file_id = ?1", params![file_id])?;
        tx.execute("DELETE FROM symbols WHERE file_id = ?1", params![file_id])?;

        let mut ids: HashMap<&str, i64> = HashMap::with_capacity(result.symbols.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO symbols (file_id, kind, name, qualified_name, file_path,
                 line_start, line_end, signature, doc, params, return_type, decorators)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for sym in &result.symbols {
                stmt.execute(params![
                    file_id,
                    sym.kind.as_str(),
                    sym.name,
                    sym.qualified_name,
                    file_path,
                    sym.line_start,
                    sym.line_end,
                    sym.signature,
                    sym.doc,
                    encode_params(&sym.params),
                    sym.return_type,
                    encode_json_list(&sym.decorators),
                ])?;
                ids.insert(sym.qualified_name.as_str(), tx.last_insert_rowid());
            }
        }

        // Second pass: link nested symbols to their parent row.
        {
            let mut stmt = tx.prepare("UPDATE symbols SET parent_id = ?1 WHERE id = ?2")?;
            for sym in &result.symbols {
                if let Some(parent_qname) = &sym.parent_qname {
                    if let (Some(&pid), Some(&sid)) = (
                        ids.get(parent_qname.as_str()),
                        ids.get(sym.qualified_name.as_str()),
                    ) {
                        if pid != sid {
                            stmt.execute(params![pid, sid])?;
                        }
                    }
                }
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO imports (file_id, to_module, import_name, line)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for imp in &result.imports {
                stmt.execute(params![file_id, imp.module, imp.name, imp.line])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO calls (file_id, caller_id, target_qname, line)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for call in &result.calls {
                match ids.get(call.caller_qname.as_str()) {
                    Some(&caller_id) => {
                        stmt.execute(params![file_id, caller_id, call.target, call.line])?;
                    }
                    None => debug!(
                        caller = %call.caller_qname,
                        "dropping call edge with unknown caller"
                    ),
                }
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO inherits (file_id, child_id, parent_qname)
                 VALUES (?1, ?2, ?3)",
            )?;
            for inherit in &result.inherits {
                match ids.get(inherit.child_qname.as_str()) {
                    Some(&child_id) => {
                        stmt.execute(params![file_id, child_id, inherit.parent])?;
                    }
                    None => debug!(
                        child = %inherit.child_qname,
                        "dropping inherit edge with unknown child"
                    ),
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Delete one file and everything it owns. Inbound edges from other
    /// files keep their rows with null resolution.
    pub fn delete_file(&mut self, file_id: i64) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM embeddings WHERE symbol_id IN (SELECT id FROM symbols WHERE file_id = ?1)",
            params![file_id],
        )?;
        tx.execute("DELETE FROM calls WHERE file_id = ?1", params![file_id])?;
        tx.execute("DELETE FROM inherits WHERE file_id = ?1", params![file_id])?;
        tx.execute("DELETE FROM imports WHERE file_id = ?1", params![file_id])?;
        tx.execute("DELETE FROM symbols WHERE file_id = ?1", params![file_id])?;
        tx.execute("DELETE FROM files WHERE id = ?1", params![file_id])?;
        tx.commit()?;
        Ok(())
    }

    /// Remove files no longer present on disk (full-index pruning).
    /// Returns the absolute paths that were deleted.
    pub fn delete_files_not_in(
        &mut self,
        present: &std::collections::HashSet<String>,
    ) -> Result<Vec<String>, StoreError> {
        let stale: Vec<(i64, String)> = {
            let mut stmt = self.conn.prepare("SELECT id, path FROM files")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.filter_map(|r| r.ok())
                .filter(|(_, path): &(i64, String)| !present.contains(path))
                .collect()
        };
        let mut deleted = Vec::with_capacity(stale.len());
        for (id, path) in stale {
            self.delete_file(id)?;
            debug!(path = %path, "pruned vanished file");
            deleted.push(path);
        }
        Ok(deleted)
    }

    /// Link unresolved call, inherit, and import edges to concrete symbol
    /// and file ids by name matching. Runs once after all files of a pass
    /// are written; idempotent, so re-running is safe and links nothing new.
    ///
    /// Call/inherit targets try an exact qualified-name match first, then
    /// the unqualified tail. Ties prefer a symbol in the same file, then the
    /// longest shared module prefix, then the lowest id.
    pub fn resolve_graph_edges(&mut self) -> Result<u64, StoreError> {
        let file_modules: HashMap<i64, String> = {
            let mut stmt = self.conn.prepare("SELECT id, module_path FROM files")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.filter_map(|r| r.ok()).collect()
        };

        let mut resolved = 0u64;
        resolved += self.resolve_symbol_edges("calls", "target_qname", false, &file_modules)?;
        resolved += self.resolve_symbol_edges("inherits", "parent_qname", true, &file_modules)?;
        resolved += self.resolve_import_edges(&file_modules)?;
        Ok(resolved)
    }

    fn resolve_symbol_edges(
        &mut self,
        table: &str,
        target_col: &str,
        classes_only: bool,
        file_modules: &HashMap<i64, String>,
    ) -> Result<u64, StoreError> {
        let pending: Vec<(i64, i64, String)> = {
            let sql = format!(
                "SELECT id, file_id, {target_col} FROM {table} WHERE resolved_id IS NULL"
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows =
                stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
            rows.filter_map(|r| r.ok()).collect()
        };
        if pending.is_empty() {
            return Ok(0);
        }

        let kind_filter = if classes_only {
            "kind = 'class'"
        } else {
            "kind != 'module'"
        };
        let mut updates: Vec<(i64, i64)> = Vec::new();
        {
            let exact_sql = format!(
                "SELECT id, file_id FROM symbols WHERE qualified_name = ?1 AND {kind_filter}"
            );
            let tail_sql =
                format!("SELECT id, file_id FROM symbols WHERE name = ?1 AND {kind_filter}");
            let mut exact = self.conn.prepare(&exact_sql)?;
            let mut tail = self.conn.prepare(&tail_sql)?;

            for (edge_id, edge_file, target) in &pending {
                let mut candidates: Vec<(i64, i64)> = exact
                    .query_map(params![target], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .filter_map(|r| r.ok())
                    .collect();
                if candidates.is_empty() {
                    let short = sqlite_helpers::qname_tail(target);
                    candidates = tail
                        .query_map(params![short], |row| Ok((row.get(0)?, row.get(1)?)))?
                        .filter_map(|r| r.ok())
                        .collect();
                }
                if let Some(symbol_id) =
                    sqlite_helpers::best_candidate(&candidates, *edge_file, file_modules)
                {
                    updates.push((*edge_id, symbol_id));
                }
            }
        }

        let count = updates.len() as u64;
        let tx = self.conn.transaction()?;
        {
            let sql = format!("UPDATE {table} SET resolved_id = ?1 WHERE id = ?2");
            let mut stmt = tx.prepare(&sql)?;
            for (edge_id, symbol_id) in updates {
                stmt.execute(params![symbol_id, edge_id])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    fn resolve_import_edges(
        &mut self,
        file_modules: &HashMap<i64, String>,
    ) -> Result<u64, StoreError> {
        let pending: Vec<(i64, i64, String)> = {
            let mut stmt = self.conn.prepare(
                "SELECT id, file_id, to_module FROM imports WHERE resolved_file_id IS NULL",
            )?;
            let rows =
                stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
            rows.filter_map(|r| r.ok()).collect()
        };
        if pending.is_empty() {
            return Ok(0);
        }

        // Lowest file id wins when two files share a module path.
        let mut by_module: HashMap<&str, i64> = HashMap::new();
        for (id, module) in file_modules {
            by_module
                .entry(module.as_str())
                .and_modify(|existing| {
                    if *id < *existing {
                        *existing = *id;
                    }
                })
                .or_insert(*id);
        }

        let mut updates: Vec<(i64, i64)> = Vec::new();
        for (edge_id, edge_file, raw_module) in &pending {
            let importer = file_modules
                .get(edge_file)
                .map(String::as_str)
                .unwrap_or_default();
            let Some(wanted) = sqlite_helpers::normalize_module(raw_module, importer) else {
                continue;
            };
            let hit = by_module.get(wanted.as_str()).copied().or_else(|| {
                let suffix = format!(".{wanted}");
                let mut best: Option<(usize, i64)> = None;
                for (module, id) in &by_module {
                    if module.ends_with(&suffix) {
                        let key = (module.len(), *id);
                        if best.map(|b| key < b).unwrap_or(true) {
                            best = Some(key);
                        }
                    }
                }
                best.map(|(_, id)| id)
            });
            if let Some(file_id) = hit {
                updates.push((*edge_id, file_id));
            }
        }

        let count = updates.len() as u64;
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("UPDATE imports SET resolved_file_id = ?1 WHERE id = ?2")?;
            for (edge_id, file_id) in updates {
                stmt.execute(params![file_id, edge_id])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
