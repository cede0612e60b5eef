use std::collections::HashSet;

use super::SqliteStore;
use crate::types::{
    Parameter, ParseResult, ParsedCall, ParsedImport, ParsedInherit, ParsedSymbol, SymbolKind,
};

fn sym(kind: SymbolKind, name: &str, qname: &str, parent: Option<&str>) -> ParsedSymbol {
    ParsedSymbol {
        kind,
        name: name.to_string(),
        qualified_name: qname.to_string(),
        parent_qname: parent.map(String::from),
        line_start: 1,
        line_end: 5,
        signature: format!("def {name}()"),
        doc: None,
        params: Vec::new(),
        return_type: None,
        decorators: Vec::new(),
    }
}

fn add_file(store: &SqliteStore, path: &str, module: &str, hash: &str) -> i64 {
    let rel = path.trim_start_matches('/');
    let (id, unchanged) = store
        .upsert_file(path, rel, module, "python", 1000, hash)
        .unwrap();
    assert!(!unchanged);
    id
}

#[test]
fn test_upsert_file_unchanged_flag() {
    let store = SqliteStore::in_memory().unwrap();
    let (id, unchanged) = store
        .upsert_file("/p/a.py", "a.py", "a", "python", 1, "h1")
        .unwrap();
    assert!(!unchanged);

    let (id2, unchanged) = store
        .upsert_file("/p/a.py", "a.py", "a", "python", 2, "h1")
        .unwrap();
    assert_eq!(id, id2);
    assert!(unchanged);

    let (id3, unchanged) = store
        .upsert_file("/p/a.py", "a.py", "a", "python", 3, "h2")
        .unwrap();
    assert_eq!(id, id3);
    assert!(!unchanged);
}

#[test]
fn test_replace_file_index_and_fts() {
    let mut store = SqliteStore::in_memory().unwrap();
    let fid = add_file(&store, "/p/zoo.py", "zoo", "h1");

    let result = ParseResult {
        symbols: vec![ParsedSymbol {
            doc: Some("Find the oldest animal in the list.".into()),
            ..sym(SymbolKind::Function, "find_oldest", "zoo.find_oldest", None)
        }],
        ..Default::default()
    };
    store.replace_file_index(fid, "zoo.py", &result).unwrap();

    let hits = store.fts_search("oldest animal", 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].1 > 0.0);
    let found = store.get_symbol(hits[0].0).unwrap().unwrap();
    assert_eq!(found.qualified_name, "zoo.find_oldest");
}

#[test]
fn test_reparse_wipes_old_rows() {
    let mut store = SqliteStore::in_memory().unwrap();
    let fid = add_file(&store, "/p/m.py", "m", "h1");

    let v1 = ParseResult {
        symbols: vec![sym(SymbolKind::Function, "old_fn", "m.old_fn", None)],
        ..Default::default()
    };
    store.replace_file_index(fid, "m.py", &v1).unwrap();
    let old_id = store.find_symbols("m.old_fn").unwrap()[0].id;
    store.write_embedding(old_id, &[1.0, 0.0]).unwrap();
    assert_eq!(store.embedded_count().unwrap(), 1);

    let v2 = ParseResult {
        symbols: vec![sym(SymbolKind::Function, "new_fn", "m.new_fn", None)],
        ..Default::default()
    };
    store.replace_file_index(fid, "m.py", &v2).unwrap();

    assert!(store.find_symbols("m.old_fn").unwrap().is_empty());
    assert_eq!(store.find_symbols("m.new_fn").unwrap().len(), 1);
    // Embeddings and FTS rows go with the symbols.
    assert_eq!(store.embedded_count().unwrap(), 0);
    assert!(store.fts_search("old_fn", 10).unwrap().is_empty());
    assert_eq!(store.fts_search("new_fn", 10).unwrap().len(), 1);
}

#[test]
fn test_parent_linkage() {
    let mut store = SqliteStore::in_memory().unwrap();
    let fid = add_file(&store, "/p/animals.py", "animals", "h1");

    let result = ParseResult {
        symbols: vec![
            sym(SymbolKind::Class, "Animal", "animals.Animal", None),
            sym(
                SymbolKind::Method,
                "speak",
                "animals.Animal.speak",
                Some("animals.Animal"),
            ),
        ],
        ..Default::default()
    };
    store.replace_file_index(fid, "animals.py", &result).unwrap();

    let class = &store.find_symbols("animals.Animal").unwrap()[0];
    let method = &store.find_symbols("animals.Animal.speak").unwrap()[0];
    assert_eq!(method.parent_id, Some(class.id));
    assert_eq!(class.parent_id, None);
}

#[test]
fn test_delete_file_keeps_inbound_edges_unresolved() {
    let mut store = SqliteStore::in_memory().unwrap();
    let lib = add_file(&store, "/p/lib.py", "lib", "h1");
    let app = add_file(&store, "/p/app.py", "app", "h2");

    store
        .replace_file_index(
            lib,
            "lib.py",
            &ParseResult {
                symbols: vec![sym(SymbolKind::Function, "helper", "lib.helper", None)],
                ..Default::default()
            },
        )
        .unwrap();
    store
        .replace_file_index(
            app,
            "app.py",
            &ParseResult {
                symbols: vec![sym(SymbolKind::Function, "main", "app.main", None)],
                calls: vec![ParsedCall {
                    caller_qname: "app.main".into(),
                    target: "lib.helper".into(),
                    line: 3,
                }],
                ..Default::default()
            },
        )
        .unwrap();
    store.resolve_graph_edges().unwrap();
    assert_eq!(store.resolved_call_count().unwrap(), 1);

    store.delete_file(lib).unwrap();

    // The app's outbound edge survives with null resolution.
    assert_eq!(store.call_count().unwrap(), 1);
    assert_eq!(store.resolved_call_count().unwrap(), 0);
    assert!(store.find_symbols("lib.helper").unwrap().is_empty());
    assert!(store.fts_search("helper", 10).unwrap().is_empty());

    // The file comes back under the same name: resolution relinks.
    let lib2 = add_file(&store, "/p/lib.py", "lib", "h3");
    store
        .replace_file_index(
            lib2,
            "lib.py",
            &ParseResult {
                symbols: vec![sym(SymbolKind::Function, "helper", "lib.helper", None)],
                ..Default::default()
            },
        )
        .unwrap();
    store.resolve_graph_edges().unwrap();
    assert_eq!(store.resolved_call_count().unwrap(), 1);
}

#[test]
fn test_delete_files_not_in() {
    let mut store = SqliteStore::in_memory().unwrap();
    add_file(&store, "/p/keep.py", "keep", "h1");
    add_file(&store, "/p/gone.py", "gone", "h2");

    let mut present = HashSet::new();
    present.insert("/p/keep.py".to_string());
    let deleted = store.delete_files_not_in(&present).unwrap();
    assert_eq!(deleted, vec!["/p/gone.py".to_string()]);
    assert_eq!(store.file_count().unwrap(), 1);
}

#[test]
fn test_resolution_prefers_exact_then_tail() {
    let mut store = SqliteStore::in_memory().unwrap();
    let a = add_file(&store, "/p/a.py", "a", "h1");
    let b = add_file(&store, "/p/b.py", "b", "h2");

    store
        .replace_file_index(
            a,
            "a.py",
            &ParseResult {
                symbols: vec![
                    sym(SymbolKind::Function, "run", "a.run", None),
                    sym(SymbolKind::Function, "go", "a.go", None),
                ],
                calls: vec![
                    // Exact qualified hit.
                    ParsedCall {
                        caller_qname: "a.run".into(),
                        target: "b.target".into(),
                        line: 2,
                    },
                    // Only the unqualified tail matches.
                    ParsedCall {
                        caller_qname: "a.go".into(),
                        target: "unknown.target".into(),
                        line: 3,
                    },
                    // Never resolves; stays null and hidden.
                    ParsedCall {
                        caller_qname: "a.go".into(),
                        target: "definitely.missing".into(),
                        line: 4,
                    },
                ],
                ..Default::default()
            },
        )
        .unwrap();
    store
        .replace_file_index(
            b,
            "b.py",
            &ParseResult {
                symbols: vec![sym(SymbolKind::Function, "target", "b.target", None)],
                ..Default::default()
            },
        )
        .unwrap();

    let first = store.resolve_graph_edges().unwrap();
    assert_eq!(store.resolved_call_count().unwrap(), 2);
    assert!(first >= 2);

    // Idempotent: a second pass links nothing new.
    let second = store.resolve_graph_edges().unwrap();
    assert_eq!(second, 0);
}

#[test]
fn test_call_traversal_depths() {
    let mut store = SqliteStore::in_memory().unwrap();
    let fid = add_file(&store, "/p/chain.py", "chain", "h1");

    store
        .replace_file_index(
            fid,
            "chain.py",
            &ParseResult {
                symbols: vec![
                    sym(SymbolKind::Function, "a", "chain.a", None),
                    sym(SymbolKind::Function, "b", "chain.b", None),
                    sym(SymbolKind::Function, "c", "chain.c", None),
                ],
                calls: vec![
                    ParsedCall {
                        caller_qname: "chain.a".into(),
                        target: "b".into(),
                        line: 1,
                    },
                    ParsedCall {
                        caller_qname: "chain.b".into(),
                        target: "c".into(),
                        line: 2,
                    },
                ],
                ..Default::default()
            },
        )
        .unwrap();
    store.resolve_graph_edges().unwrap();

    let names = |syms: Vec<crate::types::Symbol>| -> Vec<String> {
        syms.into_iter().map(|s| s.qualified_name).collect()
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
    assert!(store.get_callers("c", 0).unwrap().is_empty());
    assert!(store.get_callees("missing", 3).unwrap().is_empty());
}

#[test]
fn test_call_traversal_terminates_on_cycles() {
    let mut store = SqliteStore::in_memory().unwrap();
    let fid = add_file(&store, "/p/loop.py", "loop", "h1");

    store
        .replace_file_index(
            fid,
            "loop.py",
            &ParseResult {
                symbols: vec![
                    sym(SymbolKind::Function, "ping", "loop.ping", None),
                    sym(SymbolKind::Function, "pong", "loop.pong", None),
                ],
                calls: vec![
                    ParsedCall {
                        caller_qname: "loop.ping".into(),
                        target: "pong".into(),
                        line: 1,
                    },
                    ParsedCall {
                        caller_qname: "loop.pong".into(),
                        target: "ping".into(),
                        line: 2,
                    },
                ],
                ..Default::default()
            },
        )
        .unwrap();
    store.resolve_graph_edges().unwrap();

    let callees = store.get_callees("ping", 50).unwrap();
    let names: Vec<_> = callees.iter().map(|s| s.qualified_name.as_str()).collect();
    assert_eq!(names, vec!["loop.pong"]);
}

#[test]
fn test_class_hierarchy() {
    let mut store = SqliteStore::in_memory().unwrap();
    let base = add_file(&store, "/p/animals.py", "animals", "h1");
    let derived = add_file(&store, "/p/dogs.py", "dogs", "h2");

    store
        .replace_file_index(
            base,
            "animals.py",
            &ParseResult {
                symbols: vec![
                    sym(SymbolKind::Class, "Animal", "animals.Animal", None),
                    sym(
                        SymbolKind::Method,
                        "speak",
                        "animals.Animal.speak",
                        Some("animals.Animal"),
                    ),
                ],
                ..Default::default()
            },
        )
        .unwrap();
    store
        .replace_file_index(
            derived,
            "dogs.py",
            &ParseResult {
                symbols: vec![
                    sym(SymbolKind::Class, "Dog", "dogs.Dog", None),
                    sym(
                        SymbolKind::Method,
                        "fetch",
                        "dogs.Dog.fetch",
                        Some("dogs.Dog"),
                    ),
                ],
                inherits: vec![ParsedInherit {
                    child_qname: "dogs.Dog".into(),
                    parent: "Animal".into(),
                }],
                ..Default::default()
            },
        )
        .unwrap();
    store.resolve_graph_edges().unwrap();

    let animal = store.get_class_hierarchy("Animal", 5).unwrap();
    assert!(animal.parents.is_empty());
    assert_eq!(animal.children.len(), 1);
    assert_eq!(animal.children[0].qualified_name, "dogs.Dog");

    let dog = store.get_class_hierarchy("Dog", 5).unwrap();
    assert_eq!(dog.parents.len(), 1);
    assert_eq!(dog.parents[0].qualified_name, "animals.Animal");
    assert!(dog.children.is_empty());
}

#[test]
fn test_import_resolution() {
    let mut store = SqliteStore::in_memory().unwrap();
    let app = add_file(&store, "/p/pkg/app.py", "pkg.app", "h1");
    add_file(&store, "/p/pkg/util.py", "pkg.util", "h2");

    store
        .replace_file_index(
            app,
            "pkg/app.py",
            &ParseResult {
                imports: vec![
                    ParsedImport {
                        module: "pkg.util".into(),
                        name: Some("helper".into()),
                        line: 1,
                    },
                    ParsedImport {
                        module: ".util".into(),
                        name: None,
                        line: 2,
                    },
                    ParsedImport {
                        module: "os".into(),
                        name: None,
                        line: 3,
                    },
                ],
                ..Default::default()
            },
        )
        .unwrap();
    store.resolve_graph_edges().unwrap();

    let imports = store.file_imports("/p/pkg/app.py").unwrap();
    assert_eq!(imports.len(), 3);
    assert!(imports[0].resolved_file_id.is_some());
    assert!(imports[1].resolved_file_id.is_some());
    assert!(imports[2].resolved_file_id.is_none(), "external stays null");
}

#[test]
fn test_vector_search_excludes_unembedded() {
    let mut store = SqliteStore::in_memory().unwrap();
    let fid = add_file(&store, "/p/v.py", "v", "h1");
    store
        .replace_file_index(
            fid,
            "v.py",
            &ParseResult {
                symbols: vec![
                    sym(SymbolKind::Function, "near", "v.near", None),
                    sym(SymbolKind::Function, "far", "v.far", None),
                    sym(SymbolKind::Function, "naked", "v.naked", None),
                ],
                ..Default::default()
            },
        )
        .unwrap();

    let near = store.find_symbols("v.near").unwrap()[0].id;
    let far = store.find_symbols("v.far").unwrap()[0].id;
    let naked = store.find_symbols("v.naked").unwrap()[0].id;
    store.write_embedding(near, &[1.0, 0.0]).unwrap();
    store.write_embedding(far, &[0.0, 1.0]).unwrap();

    let hits = store.vector_search(&[1.0, 0.1], 10).unwrap();
    let ids: Vec<i64> = hits.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids[0], near);
    assert!(ids.contains(&far));
    assert!(!ids.contains(&naked), "unembedded symbols never appear");
    assert!(hits[0].1 < hits[1].1);

    // The unembedded symbol still shows up in lexical search and lookup.
    assert_eq!(store.fts_search("naked", 10).unwrap().len(), 1);
    assert_eq!(store.find_symbols("naked").unwrap().len(), 1);

    // Degenerate queries return empty.
    assert!(store.vector_search(&[], 10).unwrap().is_empty());
    // Dimension-mismatched rows are excluded rather than mis-scored.
    assert!(store.vector_search(&[1.0, 0.0, 0.0], 10).unwrap().is_empty());
}

#[test]
fn test_fts_degenerate_queries() {
    let store = SqliteStore::in_memory().unwrap();
    assert!(store.fts_search("", 10).unwrap().is_empty());
    assert!(store.fts_search("-- :: **", 10).unwrap().is_empty());
}

#[test]
fn test_fts_or_fallback() {
    let mut store = SqliteStore::in_memory().unwrap();
    let fid = add_file(&store, "/p/f.py", "f", "h1");
    store
        .replace_file_index(
            fid,
            "f.py",
            &ParseResult {
                symbols: vec![ParsedSymbol {
                    doc: Some("Parses configuration files.".into()),
                    ..sym(SymbolKind::Function, "parse_config", "f.parse_config", None)
                }],
                ..Default::default()
            },
        )
        .unwrap();

    // AND over both terms fails (no "nonexistent"), OR retry still hits.
    let hits = store.fts_search("configuration nonexistent", 10).unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn test_unembedded_queue_and_clear() {
    let mut store = SqliteStore::in_memory().unwrap();
    let fid = add_file(&store, "/p/q.py", "q", "h1");
    store
        .replace_file_index(
            fid,
            "q.py",
            &ParseResult {
                symbols: vec![
                    sym(SymbolKind::Function, "one", "q.one", None),
                    sym(SymbolKind::Function, "two", "q.two", None),
                ],
                ..Default::default()
            },
        )
        .unwrap();

    let batch = store.unembedded_symbols(10).unwrap();
    assert_eq!(batch.len(), 2);

    store.write_embedding(batch[0].id, &[0.1, 0.2]).unwrap();
    assert_eq!(store.unembedded_symbols(10).unwrap().len(), 1);

    store.clear_embeddings().unwrap();
    assert_eq!(store.unembedded_symbols(10).unwrap().len(), 2);
}

#[test]
fn test_list_symbols_filters() {
    let mut store = SqliteStore::in_memory().unwrap();
    let fid = add_file(&store, "/p/list.py", "list", "h1");
    store
        .replace_file_index(
            fid,
            "list.py",
            &ParseResult {
                symbols: vec![
                    sym(SymbolKind::Class, "Widget", "list.Widget", None),
                    sym(SymbolKind::Function, "make_widget", "list.make_widget", None),
                ],
                ..Default::default()
            },
        )
        .unwrap();

    let classes = store
        .list_symbols(Some(SymbolKind::Class), None, None, 50)
        .unwrap();
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].name, "Widget");

    let named = store.list_symbols(None, None, Some("widget"), 50).unwrap();
    assert_eq!(named.len(), 2);

    let scoped = store
        .list_symbols(None, Some("list.py"), None, 50)
        .unwrap();
    assert_eq!(scoped.len(), 2);

    assert!(store
        .list_symbols(Some(SymbolKind::Module), None, None, 50)
        .unwrap()
        .is_empty());
}

#[test]
fn test_symbol_params_roundtrip() {
    let mut store = SqliteStore::in_memory().unwrap();
    let fid = add_file(&store, "/p/sig.py", "sig", "h1");
    store
        .replace_file_index(
            fid,
            "sig.py",
            &ParseResult {
                symbols: vec![ParsedSymbol {
                    params: vec![
                        Parameter {
                            name: "name".into(),
                            type_annotation: Some("str".into()),
                            default_value: None,
                        },
                        Parameter {
                            name: "count".into(),
                            type_annotation: Some("int".into()),
                            default_value: Some("1".into()),
                        },
                    ],
                    return_type: Some("str".into()),
                    decorators: vec!["@cached".into()],
                    ..sym(SymbolKind::Function, "greet", "sig.greet", None)
                }],
                ..Default::default()
            },
        )
        .unwrap();

    let found = &store.find_symbols("sig.greet").unwrap()[0];
    assert_eq!(found.params.len(), 2);
    assert_eq!(found.params[1].default_value.as_deref(), Some("1"));
    assert_eq!(found.return_type.as_deref(), Some("str"));
    assert_eq!(found.decorators, vec!["@cached"]);
}

#[test]
fn test_meta_roundtrip() {
    let store = SqliteStore::in_memory().unwrap();
    assert!(store.get_meta("last_indexed").unwrap().is_none());
    store.set_meta("last_indexed", "7").unwrap();
    assert_eq!(store.get_meta("last_indexed").unwrap().as_deref(), Some("7"));
    store.set_meta("last_indexed", "1").unwrap();
    assert_eq!(store.get_meta("last_indexed").unwrap().as_deref(), Some("1"));
}

#[test]
fn test_open_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("index.db");
    {
        let store = SqliteStore::open(&db).unwrap();
        store
            .upsert_file("/p/a.py", "a.py", "a", "python", 1, "h1")
            .unwrap();
    }
    let store = SqliteStore::open(&db).unwrap();
    assert_eq!(store.file_count().unwrap(), 1);
    assert_eq!(store.schema_version().unwrap(), 1);
}
