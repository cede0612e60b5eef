//! One end-to-end index pass: discovery, hash-gated parsing, serialized
//! store writes, edge resolution, and the embedding phase.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use librarian_core::config::LibrarianConfig;
use librarian_core::embed::Embedder;
use librarian_core::hash::content_hash;
use librarian_core::sqlite::SqliteStore;
use librarian_core::types::{ParseResult, StoreError};
use librarian_parsers::extractor::ExtractorRegistry;

use crate::discovery::FileWalker;
use crate::embedder::embedding_text;

/// Incremental passes skip unchanged files and never delete; full passes
/// re-parse everything and prune files that vanished from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    Incremental,
    Full,
}

/// Outcome of one pass, also persisted to store metadata for `status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub indexed: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub embedded: usize,
    pub errors: usize,
}

struct PendingFile {
    file_id: i64,
    rel_path: String,
    language: &'static str,
    module_path: String,
    source: String,
}

pub struct Indexer<'a> {
    store: &'a mut SqliteStore,
    config: &'a LibrarianConfig,
    root: PathBuf,
    registry: ExtractorRegistry,
}

impl<'a> Indexer<'a> {
    pub fn new(store: &'a mut SqliteStore, config: &'a LibrarianConfig, project_root: &Path) -> Self {
        let root = config.index_root(project_root);
        Self {
            store,
            config,
            root,
            registry: ExtractorRegistry::with_defaults(),
        }
    }

    /// Run one pass. Parsing fans out across rayon workers; all store
    /// writes stay on this thread. `resolve_graph_edges` runs exactly once
    /// after the write phase, and the embedding phase runs last.
    pub fn run(
        &mut self,
        mode: IndexMode,
        reembed: bool,
        embedder: Option<&dyn Embedder>,
    ) -> Result<IndexStats, StoreError> {
        let mut stats = IndexStats::default();

        let walker = FileWalker::new(
            &self.root,
            &self.config.index.exclude,
            &self.config.index.languages,
        );
        let discovered = walker.walk();

        // Phase 1: hash every file and decide what needs parsing.
        let mut present: HashSet<String> = HashSet::with_capacity(discovered.len());
        let mut pending: Vec<PendingFile> = Vec::new();
        for file in &discovered {
            let bytes = match std::fs::read(&file.path) {
                Ok(b) => b,
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "skipping unreadable file");
                    stats.errors += 1;
                    continue;
                }
            };
            let path_str = file.path.to_string_lossy().to_string();
            let rel_str = file.rel_path.to_string_lossy().to_string();
            present.insert(path_str.clone());

            let hash = content_hash(&bytes);
            let mtime = std::fs::metadata(&file.path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            let (file_id, unchanged) = self.store.upsert_file(
                &path_str,
                &rel_str,
                &file.module_path,
                file.language,
                mtime,
                &hash,
            )?;
            if unchanged && mode == IndexMode::Incremental {
                stats.skipped += 1;
                continue;
            }

            pending.push(PendingFile {
                file_id,
                rel_path: rel_str,
                language: file.language,
                module_path: file.module_path.clone(),
                source: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        // Phase 2: parse in parallel. Extractors build a fresh tree-sitter
        // parser per file, so workers share nothing but the registry.
        let registry = &self.registry;
        let parsed: Vec<(PendingFile, ParseResult)> = pending
            .into_par_iter()
            .map(|file| {
                let result = registry
                    .get(file.language)
                    .map(|e| e.parse(&file.module_path, &file.source))
                    .unwrap_or_default();
                (file, result)
            })
            .collect();

        // Phase 3: serialized writes, one transaction per file. A failed
        // file logs and leaves the rest of the pass running.
        for (file, result) in parsed {
            match self
                .store
                .replace_file_index(file.file_id, &file.rel_path, &result)
            {
                Ok(()) => {
                    debug!(path = %file.rel_path, symbols = result.symbols.len(), "indexed");
                    stats.indexed += 1;
                }
                Err(e) => {
                    warn!(path = %file.rel_path, error = %e, "write failed, continuing pass");
                    stats.errors += 1;
                }
            }
        }

        if mode == IndexMode::Full {
            stats.deleted = self.store.delete_files_not_in(&present)?.len();
        }

        self.store.resolve_graph_edges()?;

        if let Some(embedder) = embedder {
            if self.config.embeddings.enabled {
                if reembed {
                    self.store.clear_embeddings()?;
                }
                stats.embedded = self.embedding_phase(embedder)?;
            }
        }

        self.store.set_meta("last_indexed", &stats.indexed.to_string())?;
        self.store.set_meta("last_skipped", &stats.skipped.to_string())?;
        self.store.set_meta("last_deleted", &stats.deleted.to_string())?;
        Ok(stats)
    }

    /// Batch unembedded symbols through the service. The first failure
    /// aborts the phase; the pass still succeeds with whatever was written.
    fn embedding_phase(&mut self, embedder: &dyn Embedder) -> Result<usize, StoreError> {
        let batch_size = self.config.embeddings.batch_size.max(1);
        let max_chars = self.config.embeddings.max_chars;
        let mut total = 0usize;

        loop {
            let batch = self.store.unembedded_symbols(batch_size)?;
            if batch.is_empty() {
                break;
            }
            let texts: Vec<String> = batch
                .iter()
                .map(|s| embedding_text(s, max_chars))
                .collect();
            let vectors = match embedder.embed(&texts) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "embedding phase aborted; search degrades to lexical");
                    break;
                }
            };
            if vectors.len() != batch.len() {
                warn!(
                    expected = batch.len(),
                    got = vectors.len(),
                    "embedding batch size mismatch; aborting phase"
                );
                break;
            }
            for (symbol, vector) in batch.iter().zip(vectors) {
                self.store.write_embedding(symbol.id, &vector)?;
                total += 1;
            }
        }
        Ok(total)
    }
}
