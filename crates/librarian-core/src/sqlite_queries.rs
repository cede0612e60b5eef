//! Read-side store operations: full-text and vector search, bounded graph
//! traversal, symbol lookup, and the embedding work queue.
//!
//! Every lookup treats "not found" as an empty sequence, never an error.

use rusqlite::{params, params_from_iter, OptionalExtension};
use tracing::debug;

use crate::sqlite::SqliteStore;
use crate::sqlite_helpers::{
    cosine_distance, decode_vector, encode_vector, fts_match_expr, row_to_symbol,
};
use crate::types::{ClassHierarchy, FileRecord, ImportEdge, StoreError, Symbol, SymbolKind};

/// Direction of a transitive call-graph walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallDirection {
    Callers,
    Callees,
}

impl SqliteStore {
    // -----------------------------------------------------------------------
    // Search primitives
    // -----------------------------------------------------------------------

    /// Lexical search over the full-text mirror.
    ///
    /// Returns `(symbol_id, raw_score)` best-first, where `raw_score` is the
    /// positive BM25 relevance. The AND form of the query runs first; an OR
    /// retry kicks in only when AND finds nothing. Degenerate queries
    /// (empty, punctuation-only) return empty without touching the index.
    pub fn fts_search(&self, query: &str, limit: usize) -> Result<Vec<(i64, f64)>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let Some(and_expr) = fts_match_expr(query, false) else {
            return Ok(Vec::new());
        };
        let hits = self.fts_match(&and_expr, limit);
        if !hits.is_empty() {
            return Ok(hits);
        }
        match fts_match_expr(query, true) {
            Some(or_expr) if or_expr != and_expr => Ok(self.fts_match(&or_expr, limit)),
            _ => Ok(Vec::new()),
        }
    }

    /// OR-mode lexical search, used when rerunning with rewriter terms.
    pub fn fts_search_or(&self, query: &str, limit: usize) -> Result<Vec<(i64, f64)>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        match fts_match_expr(query, true) {
            Some(expr) => Ok(self.fts_match(&expr, limit)),
            None => Ok(Vec::new()),
        }
    }

    fn fts_match(&self, expr: &str, limit: usize) -> Vec<(i64, f64)> {
        let mut stmt = match self.conn.prepare(
            "SELECT rowid, bm25(symbols_fts) FROM symbols_fts
             WHERE symbols_fts MATCH ?1
             ORDER BY bm25(symbols_fts) LIMIT ?2",
        ) {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, "fts prepare failed");
                return Vec::new();
            }
        };
        let rows = stmt.query_map(params![expr, limit as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
        });
        match rows.and_then(|r| r.collect::<Result<Vec<_>, _>>()) {
            // fts5 bm25() is negated (smaller is better); flip it positive.
            Ok(pairs) => pairs.into_iter().map(|(id, rank)| (id, -rank)).collect(),
            Err(e) => {
                debug!(error = %e, expr, "fts match failed");
                Vec::new()
            }
        }
    }

    /// Nearest-neighbour scan over stored embeddings.
    ///
    /// Returns `(symbol_id, cosine_distance)` nearest-first. Symbols without
    /// an embedding row, or with a different dimension, never appear.
    pub fn vector_search(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<(i64, f32)>, StoreError> {
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn
            .prepare("SELECT symbol_id, vector FROM embeddings WHERE dims = ?1")?;
        let rows = stmt.query_map(params![query.len() as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut scored: Vec<(i64, f32)> = rows
            .filter_map(|r| r.ok())
            .map(|(id, blob)| (id, cosine_distance(query, &decode_vector(&blob))))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    // -----------------------------------------------------------------------
    // Graph traversal
    // -----------------------------------------------------------------------

    /// Transitive callers of any symbol matching `name`, up to `depth` hops
    /// (inclusive, starting at 1). Distinct by symbol id; cycle-safe.
    pub fn get_callers(&self, name: &str, depth: u32) -> Result<Vec<Symbol>, StoreError> {
        self.walk_calls(name, depth, CallDirection::Callers)
    }

    /// Transitive callees, same bounds as [`get_callers`](Self::get_callers).
    pub fn get_callees(&self, name: &str, depth: u32) -> Result<Vec<Symbol>, StoreError> {
        self.walk_calls(name, depth, CallDirection::Callees)
    }

    fn walk_calls(
        &self,
        name: &str,
        depth: u32,
        direction: CallDirection,
    ) -> Result<Vec<Symbol>, StoreError> {
        if depth == 0 {
            return Ok(Vec::new());
        }
        let seeds = self.match_symbol_ids(name, None)?;
        if seeds.is_empty() {
            return Ok(Vec::new());
        }

        let sql = match direction {
            CallDirection::Callers => {
                "WITH RECURSIVE walk(id, depth) AS (
                     VALUES (?1, 0)
                     UNION
                     SELECT c.caller_id, walk.depth + 1
                     FROM calls c JOIN walk ON c.resolved_id = walk.id
                     WHERE walk.depth < ?2
                 )
                 SELECT DISTINCT id FROM walk"
            }
            CallDirection::Callees => {
                "WITH RECURSIVE walk(id, depth) AS (
                     VALUES (?1, 0)
                     UNION
                     SELECT c.resolved_id, walk.depth + 1
                     FROM calls c JOIN walk ON c.caller_id = walk.id
                     WHERE walk.depth < ?2 AND c.resolved_id IS NOT NULL
                 )
                 SELECT DISTINCT id FROM walk"
            }
        };

        let mut found: std::collections::BTreeSet<i64> = std::collections::BTreeSet::new();
        let mut stmt = self.conn.prepare(sql)?;
        for seed in &seeds {
            let ids = stmt.query_map(params![seed, depth as i64], |row| row.get::<_, i64>(0))?;
            for id in ids.filter_map(|r| r.ok()) {
                found.insert(id);
            }
        }
        for seed in &seeds {
            found.remove(seed);
        }
        self.hydrate_symbols(found)
    }

    /// Parent and child classes of any class matching `name`, bounded by
    /// `depth` in both directions.
    pub fn get_class_hierarchy(
        &self,
        name: &str,
        depth: u32,
    ) -> Result<ClassHierarchy, StoreError> {
        if depth == 0 {
            return Ok(ClassHierarchy::default());
        }
        let seeds = self.match_symbol_ids(name, Some(SymbolKind::Class))?;
        if seeds.is_empty() {
            return Ok(ClassHierarchy::default());
        }

        let up_sql = "WITH RECURSIVE walk(id, depth) AS (
                          VALUES (?1, 0)
                          UNION
                          SELECT i.resolved_id, walk.depth + 1
                          FROM inherits i JOIN walk ON i.child_id = walk.id
                          WHERE walk.depth < ?2 AND i.resolved_id IS NOT NULL
                      )
                      SELECT DISTINCT id FROM walk";
        let down_sql = "WITH RECURSIVE walk(id, depth) AS (
                            VALUES (?1, 0)
                            UNION
                            SELECT i.child_id, walk.depth + 1
                            FROM inherits i JOIN walk ON i.resolved_id = walk.id
                            WHERE walk.depth < ?2
                        )
                        SELECT DISTINCT id FROM walk";

        let collect = |sql: &str| -> Result<Vec<Symbol>, StoreError> {
            let mut found: std::collections::BTreeSet<i64> = std::collections::BTreeSet::new();
            let mut stmt = self.conn.prepare(sql)?;
            for seed in &seeds {
                let ids =
                    stmt.query_map(params![seed, depth as i64], |row| row.get::<_, i64>(0))?;
                for id in ids.filter_map(|r| r.ok()) {
                    found.insert(id);
                }
            }
            for seed in &seeds {
                found.remove(seed);
            }
            self.hydrate_symbols(found)
        };

        Ok(ClassHierarchy {
            parents: collect(up_sql)?,
            children: collect(down_sql)?,
        })
    }

    /// Symbol ids matching a name: exact qualified-name hits preferred,
    /// simple-name hits as fallback, optionally restricted by kind.
    fn match_symbol_ids(
        &self,
        name: &str,
        kind: Option<SymbolKind>,
    ) -> Result<Vec<i64>, StoreError> {
        let kind_cond = match kind {
            Some(k) => format!(" AND kind = '{}'", k.as_str()),
            None => String::new(),
        };
        for column in ["qualified_name", "name"] {
            let sql =
                format!("SELECT id FROM symbols WHERE {column} = ?1{kind_cond} ORDER BY id");
            let mut stmt = self.conn.prepare(&sql)?;
            let ids: Vec<i64> = stmt
                .query_map(params![name], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();
            if !ids.is_empty() {
                return Ok(ids);
            }
        }
        Ok(Vec::new())
    }

    fn hydrate_symbols(
        &self,
        ids: std::collections::BTreeSet<i64>,
    ) -> Result<Vec<Symbol>, StoreError> {
        let mut symbols = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(sym) = self.get_symbol(id)? {
                symbols.push(sym);
            }
        }
        symbols.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        Ok(symbols)
    }

    // -----------------------------------------------------------------------
    // Lookup surface
    // -----------------------------------------------------------------------

    /// Fetch one symbol by id.
    pub fn get_symbol(&self, id: i64) -> Result<Option<Symbol>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT * FROM symbols WHERE id = ?1")?;
        Ok(stmt.query_row(params![id], row_to_symbol).optional()?)
    }

    /// All symbols matching a name, exact qualified-name hits preferred.
    pub fn find_symbols(&self, name: &str) -> Result<Vec<Symbol>, StoreError> {
        for column in ["qualified_name", "name"] {
            let sql = format!("SELECT * FROM symbols WHERE {column} = ?1 ORDER BY id");
            let mut stmt = self.conn.prepare(&sql)?;
            let symbols: Vec<Symbol> = stmt
                .query_map(params![name], row_to_symbol)?
                .filter_map(|r| r.ok())
                .collect();
            if !symbols.is_empty() {
                return Ok(symbols);
            }
        }
        Ok(Vec::new())
    }

    /// Filtered symbol listing for browsing and the MCP `list_symbols` tool.
    pub fn list_symbols(
        &self,
        kind: Option<SymbolKind>,
        path_contains: Option<&str>,
        name_contains: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Symbol>, StoreError> {
        let mut conds: Vec<&str> = Vec::new();
        let mut args: Vec<String> = Vec::new();
        if let Some(k) = kind {
            conds.push("kind = ?");
            args.push(k.as_str().to_string());
        }
        if let Some(p) = path_contains {
            conds.push("file_path LIKE ?");
            args.push(format!("%{p}%"));
        }
        if let Some(n) = name_contains {
            conds.push("(name LIKE ? OR qualified_name LIKE ?)");
            args.push(format!("%{n}%"));
            args.push(format!("%{n}%"));
        }
        let where_clause = if conds.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conds.join(" AND "))
        };
        let sql = format!(
            "SELECT * FROM symbols{where_clause} ORDER BY qualified_name LIMIT {}",
            limit as i64
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let symbols = stmt
            .query_map(params_from_iter(args.iter()), row_to_symbol)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(symbols)
    }

    /// Fetch a file record by absolute or project-relative path.
    pub fn get_file(&self, path: &str) -> Result<Option<FileRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM files WHERE path = ?1 OR rel_path = ?1")?;
        Ok(stmt.query_row(params![path], row_to_file).optional()?)
    }

    /// All indexed files, ordered by path.
    pub fn all_files(&self) -> Result<Vec<FileRecord>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT * FROM files ORDER BY path")?;
        let files = stmt
            .query_map([], row_to_file)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(files)
    }

    /// Import edges recorded for a file (by absolute or relative path).
    pub fn file_imports(&self, path: &str) -> Result<Vec<ImportEdge>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT i.id, i.file_id, i.to_module, i.import_name, i.line, i.resolved_file_id
             FROM imports i JOIN files f ON i.file_id = f.id
             WHERE f.path = ?1 OR f.rel_path = ?1
             ORDER BY i.line, i.id",
        )?;
        let imports = stmt
            .query_map(params![path], |row| {
                Ok(ImportEdge {
                    id: row.get(0)?,
                    file_id: row.get(1)?,
                    to_module: row.get(2)?,
                    import_name: row.get(3)?,
                    line: row.get(4)?,
                    resolved_file_id: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(imports)
    }

    /// Resolved call edges as `(caller_qname, callee_qname)` pairs for
    /// diagram generation.
    pub fn get_call_edges(&self, limit: usize) -> Result<Vec<(String, String)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT s1.qualified_name, s2.qualified_name
             FROM calls c
             JOIN symbols s1 ON c.caller_id = s1.id
             JOIN symbols s2 ON c.resolved_id = s2.id
             ORDER BY 1, 2 LIMIT ?1",
        )?;
        let edges = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(edges)
    }

    /// Resolved import edges as `(from_module, to_module)` pairs.
    pub fn get_import_edges(&self, limit: usize) -> Result<Vec<(String, String)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT f1.module_path, f2.module_path
             FROM imports i
             JOIN files f1 ON i.file_id = f1.id
             JOIN files f2 ON i.resolved_file_id = f2.id
             ORDER BY 1, 2 LIMIT ?1",
        )?;
        let edges = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(edges)
    }

    // -----------------------------------------------------------------------
    // Embedding queue
    // -----------------------------------------------------------------------

    /// Next batch of symbols that have no embedding row yet.
    pub fn unembedded_symbols(&self, limit: usize) -> Result<Vec<Symbol>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT s.* FROM symbols s
             LEFT JOIN embeddings e ON e.symbol_id = s.id
             WHERE e.symbol_id IS NULL
             ORDER BY s.id LIMIT ?1",
        )?;
        let symbols = stmt
            .query_map(params![limit as i64], row_to_symbol)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(symbols)
    }

    /// Write (or overwrite) one symbol's embedding.
    pub fn write_embedding(&self, symbol_id: i64, vector: &[f32]) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO embeddings (symbol_id, vector, dims) VALUES (?1, ?2, ?3)",
            params![symbol_id, encode_vector(vector), vector.len() as i64],
        )?;
        Ok(())
    }

    /// Drop every embedding row (the `--reembed` path).
    pub fn clear_embeddings(&self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM embeddings", [])?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Counts
    // -----------------------------------------------------------------------

    pub fn file_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM files")
    }

    pub fn symbol_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM symbols")
    }

    pub fn embedded_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM embeddings")
    }

    pub fn resolved_call_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM calls WHERE resolved_id IS NOT NULL")
    }

    pub fn call_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM calls")
    }

    pub fn import_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM imports")
    }

    pub fn inherit_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM inherits")
    }

    fn count(&self, sql: &str) -> Result<u64, StoreError> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

pub(crate) fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get("id")?,
        path: row.get("path")?,
        rel_path: row.get("rel_path")?,
        module_path: row.get("module_path")?,
        language: row.get("language")?,
        mtime: row.get("mtime")?,
        hash: row.get("hash")?,
    })
}
