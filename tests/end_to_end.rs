//! End-to-end scenarios: index a real temporary source tree through the
//! full pipeline, then interrogate it through search, graph queries, and
//! the MCP surface.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use librarian_core::config::LibrarianConfig;
use librarian_core::embed::{EmbedError, Embedder};
use librarian_core::sqlite::SqliteStore;
use librarian_index::indexer::{IndexMode, Indexer};
use librarian_search::{MatchType, SearchEngine, SearchOptions};
use librarian_server::mcp::{process_line, McpServer};

/// Deterministic local embedder so semantic search works without a service.
struct HashEmbedder;

impl Embedder for HashEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 16];
                for (i, b) in t.bytes().enumerate() {
                    v[i % 16] += (b % 23) as f32 / 23.0;
                }
                v
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        16
    }
}

fn write_fixture(root: &Path) {
    fs::create_dir_all(root.join("shelter")).unwrap();
    fs::write(root.join("shelter/__init__.py"), "").unwrap();
    fs::write(
        root.join("shelter/animals.py"),
        r#""""Animal definitions."""


class Animal:
    """A creature with an age."""

    def __init__(self, name, age):
        self.name = name
        self.age = age

    def speak(self):
        """Make a noise."""
        return "..."


def find_oldest(animals):
    """Return the oldest animal in the shelter."""
    return max(animals, key=lambda a: a.age)
"#,
    )
    .unwrap();
    fs::write(
        root.join("shelter/dogs.py"),
        r#"from shelter.animals import Animal, find_oldest


class Dog(Animal):
    """A dog."""

    def fetch(self, item):
        self.speak()
        return item


def oldest_dog(dogs):
    return find_oldest(dogs)
"#,
    )
    .unwrap();
    fs::write(
        root.join("chain.py"),
        "def a():\n    b()\n\n\ndef b():\n    c()\n\n\ndef c():\n    pass\n",
    )
    .unwrap();
}

fn index_fixture(
    store: &mut SqliteStore,
    config: &LibrarianConfig,
    root: &Path,
    mode: IndexMode,
    embedder: Option<&dyn Embedder>,
) -> librarian_index::indexer::IndexStats {
    Indexer::new(store, config, root)
        .run(mode, false, embedder)
        .unwrap()
}

#[test]
fn scenario_class_hierarchy() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let mut store = SqliteStore::in_memory().unwrap();
    let config = LibrarianConfig::default();
    index_fixture(&mut store, &config, dir.path(), IndexMode::Incremental, None);

    let animal = store.get_class_hierarchy("Animal", 5).unwrap();
    assert!(animal.parents.is_empty());
    assert_eq!(animal.children.len(), 1);
    assert!(animal.children[0].qualified_name.ends_with("Dog"));

    let dog = store.get_class_hierarchy("Dog", 5).unwrap();
    assert_eq!(dog.parents.len(), 1);
    assert!(dog.parents[0].qualified_name.ends_with("Animal"));
    assert!(dog.children.is_empty());
}

#[test]
fn scenario_call_chain_depths() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let mut store = SqliteStore::in_memory().unwrap();
    let config = LibrarianConfig::default();
    index_fixture(&mut store, &config, dir.path(), IndexMode::Incremental, None);

    let names = |symbols: Vec<librarian_core::types::Symbol>| -> Vec<String> {
        symbols.into_iter().map(|s| s.qualified_name).collect()
    };

    assert_eq!(names(store.get_callees("a", 1).unwrap()), vec!["chain.b"]);
    assert_eq!(
        names(store.get_callees("a", 2).unwrap()),
        vec!["chain.b", "chain.c"]
    );
    assert_eq!(
        names(store.get_callers("c", 2).unwrap()),
        vec!["chain.a", "chain.b"]
    );
    assert!(store.get_callees("a", 0).unwrap().is_empty());
}

#[test]
fn scenario_search_oldest_animal() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let mut store = SqliteStore::in_memory().unwrap();
    let config = LibrarianConfig::default();
    let embedder = HashEmbedder;
    index_fixture(
        &mut store,
        &config,
        dir.path(),
        IndexMode::Incremental,
        Some(&embedder),
    );

    let engine = SearchEngine::new(&store).with_embedder(Some(&embedder));
    let results = engine
        .search("oldest animal", &SearchOptions::default())
        .unwrap();
    let hit = results
        .iter()
        .find(|r| r.symbol.qualified_name.ends_with("find_oldest"))
        .expect("find_oldest should rank");
    assert!(matches!(
        hit.match_type,
        MatchType::Fulltext | MatchType::Hybrid
    ));
    assert!(hit.score > 0.0 && hit.score <= 1.0);
}

#[test]
fn scenario_disabled_embeddings_stay_lexical() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let mut store = SqliteStore::in_memory().unwrap();
    let mut config = LibrarianConfig::default();
    config.embeddings.enabled = false;

    let embedder = HashEmbedder;
    index_fixture(
        &mut store,
        &config,
        dir.path(),
        IndexMode::Incremental,
        Some(&embedder),
    );
    assert_eq!(store.embedded_count().unwrap(), 0);

    // No embedder wired into the engine either: pure lexical search.
    let engine = SearchEngine::new(&store);
    for query in ["oldest animal", "dog fetch", "speak"] {
        for result in engine.search(query, &SearchOptions::default()).unwrap() {
            assert_eq!(result.match_type, MatchType::Fulltext);
        }
    }
}

#[test]
fn scenario_single_file_change() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let mut store = SqliteStore::in_memory().unwrap();
    let config = LibrarianConfig::default();
    index_fixture(&mut store, &config, dir.path(), IndexMode::Incremental, None);

    let other_ids: Vec<i64> = store
        .list_symbols(None, Some("animals.py"), None, 100)
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();

    fs::write(
        dir.path().join("chain.py"),
        "def a():\n    c()\n\n\ndef c():\n    pass\n",
    )
    .unwrap();
    let stats = index_fixture(&mut store, &config, dir.path(), IndexMode::Incremental, None);
    assert_eq!(stats.indexed, 1);
    assert_eq!(store.get_meta("last_indexed").unwrap().as_deref(), Some("1"));

    // The changed file has updated symbols; everyone else kept their ids.
    assert!(store.find_symbols("chain.b").unwrap().is_empty());
    assert_eq!(store.find_symbols("chain.a").unwrap().len(), 1);
    let after: Vec<i64> = store
        .list_symbols(None, Some("animals.py"), None, 100)
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(other_ids, after);
}

#[test]
fn scenario_mcp_search_missing_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let mut store = SqliteStore::in_memory().unwrap();
    let mut config = LibrarianConfig::default();
    config.embeddings.enabled = false;
    index_fixture(&mut store, &config, dir.path(), IndexMode::Incremental, None);

    let server = McpServer::new(store, &config);
    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "search_code",
        "params": { "query": "entirely absent nonsense zqx" }
    });
    let response: serde_json::Value =
        serde_json::from_str(&process_line(&server, &request.to_string())).unwrap();
    assert!(response.get("error").is_none());
    assert_eq!(response["result"], serde_json::json!([]));
}

#[test]
fn full_reindex_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let db = dir.path().join("index.db");

    let snapshot = |store: &SqliteStore| -> (BTreeSet<String>, usize, u64, u64) {
        let qnames: BTreeSet<String> = store
            .list_symbols(None, None, None, 1000)
            .unwrap()
            .into_iter()
            .map(|s| s.qualified_name)
            .collect();
        let edges = store.get_call_edges(1000).unwrap().len();
        (
            qnames,
            edges,
            store.import_count().unwrap(),
            store.inherit_count().unwrap(),
        )
    };

    let config = LibrarianConfig::default();
    let mut store = SqliteStore::open(&db).unwrap();
    index_fixture(&mut store, &config, dir.path(), IndexMode::Incremental, None);
    let first = snapshot(&store);

    index_fixture(&mut store, &config, dir.path(), IndexMode::Full, None);
    let second = snapshot(&store);
    assert_eq!(first, second);

    index_fixture(&mut store, &config, dir.path(), IndexMode::Incremental, None);
    assert_eq!(snapshot(&store), second);
}

#[test]
fn unembedded_symbols_invisible_to_vector_search() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let mut store = SqliteStore::in_memory().unwrap();
    let config = LibrarianConfig::default();
    index_fixture(&mut store, &config, dir.path(), IndexMode::Incremental, None);

    // Nothing was embedded, so vector search is empty while lexical works.
    let probe = HashEmbedder.embed(&["speak".to_string()]).unwrap();
    assert!(store.vector_search(&probe[0], 10).unwrap().is_empty());
    assert!(!store.fts_search("speak", 10).unwrap().is_empty());
}

#[test]
fn resolution_is_stable_across_reruns() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let mut store = SqliteStore::in_memory().unwrap();
    let config = LibrarianConfig::default();
    index_fixture(&mut store, &config, dir.path(), IndexMode::Incremental, None);

    // Every resolvable edge resolved during the pass: nothing new links.
    assert_eq!(store.resolve_graph_edges().unwrap(), 0);
}
