//! Hybrid search: BM25 full-text fused with vector nearest-neighbour,
//! graph-intent routing ahead of both, rewrite merging behind them.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use librarian_core::embed::Embedder;
use librarian_core::sqlite::SqliteStore;
use librarian_core::types::{StoreError, Symbol};

use crate::intent::{self, GraphIntent};
use crate::rewrite::{Focus, Rewriter};

/// FTS raw BM25 scores are divided by this before clamping to [0, 1].
const FTS_SCORE_SCALE: f64 = 10.0;
/// Score multiplier for results on the wrong side of a focus hint.
const FOCUS_MULTIPLIER: f32 = 0.5;
/// Hop bound for intent-routed call-graph queries.
const INTENT_CALL_DEPTH: u32 = 1;
/// Hop bound for intent-routed hierarchy queries.
const INTENT_HIERARCHY_DEPTH: u32 = 3;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub semantic_only: bool,
    pub text_only: bool,
    pub rewrite: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            semantic_only: false,
            text_only: false,
            rewrite: false,
        }
    }
}

/// How a result earned its place in the ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Fulltext,
    Semantic,
    Hybrid,
    Graph,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub symbol: Symbol,
    pub score: f32,
    pub match_type: MatchType,
}

pub struct SearchEngine<'a> {
    store: &'a SqliteStore,
    embedder: Option<&'a dyn Embedder>,
    rewriter: Option<&'a dyn Rewriter>,
}

impl<'a> SearchEngine<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self {
            store,
            embedder: None,
            rewriter: None,
        }
    }

    pub fn with_embedder(mut self, embedder: Option<&'a dyn Embedder>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn with_rewriter(mut self, rewriter: Option<&'a dyn Rewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    /// Run one query end to end: intent routing, hybrid ranking, optional
    /// rewrite merge, zero-result fallback.
    pub fn search(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let query = query.trim();
        if query.is_empty() || opts.limit == 0 {
            return Ok(Vec::new());
        }

        if let Some(graph_intent) = intent::classify(query) {
            return self.graph_results(graph_intent, opts.limit);
        }

        let mut results = self.hybrid(query, opts, false)?;
        let mut consulted = false;

        if let Some(rewriter) = self.rewriter {
            if opts.rewrite || crate::rewrite::should_rewrite(query) {
                consulted = true;
                match rewriter.rewrite(query) {
                    Ok(rewrite) => {
                        results = self.merge_rewrite(results, &rewrite, opts)?;
                    }
                    Err(e) => debug!(error = %e, "rewrite failed, keeping original results"),
                }
            }
        }

        if results.is_empty() && !consulted {
            if let Some(rewriter) = self.rewriter {
                match rewriter.rewrite(query) {
                    Ok(rewrite) => {
                        results = self.merge_rewrite(Vec::new(), &rewrite, opts)?;
                    }
                    Err(e) => debug!(error = %e, "fallback rewrite failed"),
                }
            }
        }

        sort_by_score(&mut results);
        results.truncate(opts.limit);
        Ok(results)
    }

    fn graph_results(
        &self,
        graph_intent: GraphIntent,
        limit: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let symbols = match graph_intent {
            GraphIntent::Callers(name) => self.store.get_callers(&name, INTENT_CALL_DEPTH)?,
            GraphIntent::Callees(name) => self.store.get_callees(&name, INTENT_CALL_DEPTH)?,
            GraphIntent::Hierarchy(name) => {
                let hierarchy = self
                    .store
                    .get_class_hierarchy(&name, INTENT_HIERARCHY_DEPTH)?;
                let mut combined = hierarchy.parents;
                combined.extend(hierarchy.children);
                combined
            }
        };
        Ok(symbols
            .into_iter()
            .take(limit)
            .map(|symbol| SearchResult {
                symbol,
                score: 1.0,
                match_type: MatchType::Graph,
            })
            .collect())
    }

    /// One fused FTS + vector pass. `or_mode` switches the lexical side to
    /// OR semantics for rewriter-term reruns.
    fn hybrid(
        &self,
        query: &str,
        opts: &SearchOptions,
        or_mode: bool,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let fetch = opts.limit.saturating_mul(2).max(1);
        let mut components: HashMap<i64, (Option<f32>, Option<f32>)> = HashMap::new();

        if !opts.semantic_only {
            let hits = if or_mode {
                self.store.fts_search_or(query, fetch)?
            } else {
                self.store.fts_search(query, fetch)?
            };
            for (id, raw) in hits {
                let score = (raw / FTS_SCORE_SCALE).clamp(0.0, 1.0) as f32;
                components.entry(id).or_default().0 = Some(score);
            }
        }

        if !opts.text_only {
            if let Some(embedder) = self.embedder {
                match embedder.embed(&[query.to_string()]) {
                    Ok(vectors) => {
                        if let Some(query_vector) = vectors.first() {
                            for (id, distance) in
                                self.store.vector_search(query_vector, fetch)?
                            {
                                let score = (1.0 - distance / 2.0).max(0.0);
                                components.entry(id).or_default().1 = Some(score);
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "query embedding failed, lexical only"),
                }
            }
        }

        let mut results = Vec::with_capacity(components.len());
        for (id, (fts, vector)) in components {
            let Some(symbol) = self.store.get_symbol(id)? else {
                continue;
            };
            let (score, match_type) = match (fts, vector) {
                (Some(f), Some(v)) => ((f + v) / 2.0, MatchType::Hybrid),
                (Some(f), None) => (f, MatchType::Fulltext),
                (None, Some(v)) => (v, MatchType::Semantic),
                (None, None) => continue,
            };
            results.push(SearchResult {
                symbol,
                score,
                match_type,
            });
        }
        sort_by_score(&mut results);
        Ok(results)
    }

    /// Rerun with rewriter terms in OR mode, merge keeping the maximum
    /// score per symbol, then apply the focus multiplier.
    fn merge_rewrite(
        &self,
        original: Vec<SearchResult>,
        rewrite: &crate::rewrite::Rewrite,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let terms: Vec<&str> = rewrite
            .terms
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return Ok(original);
        }
        let rewritten = self.hybrid(&terms.join(" "), opts, true)?;

        let mut merged: HashMap<i64, SearchResult> = HashMap::new();
        for result in original.into_iter().chain(rewritten) {
            match merged.entry(result.symbol.id) {
                std::collections::hash_map::Entry::Occupied(mut existing) => {
                    if result.score > existing.get().score {
                        existing.insert(result);
                    }
                }
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(result);
                }
            }
        }

        let mut results: Vec<SearchResult> = merged.into_values().collect();
        for result in &mut results {
            let is_test = is_test_path(&result.symbol.file_path);
            let penalised = match rewrite.focus {
                Focus::Implementation => is_test,
                Focus::Tests => !is_test,
                Focus::All => false,
            };
            if penalised {
                result.score *= FOCUS_MULTIPLIER;
            }
        }
        Ok(results)
    }
}

fn sort_by_score(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.symbol.qualified_name.cmp(&b.symbol.qualified_name))
    });
}

/// Test-file convention shared by the focus multiplier: a `test`/`tests`
/// path component, a `test_` name prefix, or a `_test`/`.test`/`.spec`
/// suffix before the extension.
pub fn is_test_path(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    let mut components = normalized.split('/').peekable();
    let mut file_name = "";
    while let Some(part) = components.next() {
        if components.peek().is_none() {
            file_name = part;
        } else if part == "test" || part == "tests" || part == "__tests__" {
            return true;
        }
    }
    let stem = file_name.split('.').next().unwrap_or(file_name);
    file_name.starts_with("test_")
        || stem.ends_with("_test")
        || file_name.contains(".test.")
        || file_name.contains(".spec.")
}
