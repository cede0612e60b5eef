//! Row mapping, JSON column codecs, vector codecs, and name-matching
//! helpers shared by the store modules.

use std::collections::HashMap;

use crate::types::{Parameter, Symbol, SymbolKind};

/// Map a `SELECT *`-shaped symbols row into a [`Symbol`].
pub(crate) fn row_to_symbol(row: &rusqlite::Row) -> rusqlite::Result<Symbol> {
    let kind_str: String = row.get("kind")?;
    let params_json: String = row.get("params")?;
    let decorators_json: String = row.get("decorators")?;
    Ok(Symbol {
        id: row.get("id")?,
        file_id: row.get("file_id")?,
        parent_id: row.get("parent_id")?,
        kind: SymbolKind::parse(&kind_str).unwrap_or(SymbolKind::Function),
        name: row.get("name")?,
        qualified_name: row.get("qualified_name")?,
        file_path: row.get("file_path")?,
        line_start: row.get("line_start")?,
        line_end: row.get("line_end")?,
        signature: row.get("signature")?,
        doc: row.get("doc")?,
        params: decode_params(&params_json),
        return_type: row.get("return_type")?,
        decorators: decode_json_list(&decorators_json),
    })
}

pub(crate) fn encode_params(params: &[Parameter]) -> String {
    serde_json::to_string(params).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn decode_params(json: &str) -> Vec<Parameter> {
    serde_json::from_str(json).unwrap_or_default()
}

pub(crate) fn encode_json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn decode_json_list(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

/// Encode a dense vector as a little-endian f32 blob.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a little-endian f32 blob back into a vector.
pub fn decode_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine distance in [0, 2]; degenerate (zero-norm) inputs score worst.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 2.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 2.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Build an FTS5 MATCH expression from free text.
///
/// Tokens containing anything beyond identifier characters are quoted so
/// reserved FTS5 syntax (`-`, `:`, `*`, `"`) cannot break the query. Tokens
/// with no alphanumeric content are dropped. Returns `None` when nothing
/// searchable remains.
pub fn fts_match_expr(query: &str, or_mode: bool) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for token in query.split_whitespace() {
        if !token.chars().any(|c| c.is_alphanumeric()) {
            continue;
        }
        if token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            parts.push(token.to_string());
        } else {
            parts.push(format!("\"{}\"", token.replace('"', "\"\"")));
        }
    }
    if parts.is_empty() {
        return None;
    }
    let joiner = if or_mode { " OR " } else { " AND " };
    Some(parts.join(joiner))
}

/// Last dotted segment of a qualified name (`pkg.mod.Class.m` → `m`).
pub fn qname_tail(qname: &str) -> &str {
    qname.rsplit('.').next().unwrap_or(qname)
}

/// Number of leading dotted segments two module paths share.
fn module_prefix_len(a: &str, b: &str) -> usize {
    a.split('.')
        .zip(b.split('.'))
        .take_while(|(x, y)| x == y)
        .count()
}

/// Pick the best resolution candidate for an edge written in `edge_file`.
/// Preference: same file, then longest shared module prefix, then lowest id.
pub(crate) fn best_candidate(
    candidates: &[(i64, i64)],
    edge_file: i64,
    file_modules: &HashMap<i64, String>,
) -> Option<i64> {
    let edge_module = file_modules
        .get(&edge_file)
        .map(String::as_str)
        .unwrap_or_default();
    candidates
        .iter()
        .min_by_key(|(symbol_id, file_id)| {
            let same_file = *file_id == edge_file;
            let shared = file_modules
                .get(file_id)
                .map(|m| module_prefix_len(edge_module, m))
                .unwrap_or(0);
            // min_by_key: false sorts before true, so invert the preferences.
            (!same_file, usize::MAX - shared, *symbol_id)
        })
        .map(|(symbol_id, _)| *symbol_id)
}

/// Normalise a module specifier as written into a dotted module path,
/// resolving leading-dot relative forms against the importing module.
///
/// `./util` and `.util` from `pkg.mod` both become `pkg.util`; `..sibling`
/// climbs one package further. Absolute specifiers just swap slashes for
/// dots. Returns `None` when nothing remains (e.g. a bare `.`).
pub fn normalize_module(raw: &str, importer_module: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (ups, rest) = if let Some(stripped) = raw.strip_prefix("./") {
        (0usize, stripped.to_string())
    } else if raw.starts_with("../") {
        let mut ups = 0;
        let mut rest = raw;
        while let Some(stripped) = rest.strip_prefix("../") {
            ups += 1;
            rest = stripped;
        }
        (ups, rest.to_string())
    } else if raw.starts_with('.') {
        // Python-style: one dot is the current package, each extra dot climbs.
        let dots = raw.chars().take_while(|c| *c == '.').count();
        (dots - 1, raw[dots..].to_string())
    } else {
        let cleaned = raw.replace('/', ".");
        let cleaned = cleaned.trim_matches('.');
        return if cleaned.is_empty() {
            None
        } else {
            Some(cleaned.to_string())
        };
    };

    let mut base: Vec<&str> = importer_module.split('.').filter(|s| !s.is_empty()).collect();
    // Drop the importing module itself, then climb.
    if !base.is_empty() {
        base.pop();
    }
    for _ in 0..ups {
        base.pop();
    }

    let rest = rest.replace('/', ".");
    for segment in rest.split('.').filter(|s| !s.is_empty()) {
        base.push(segment);
    }
    if base.is_empty() {
        None
    } else {
        Some(base.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_roundtrip() {
        let v = vec![0.5f32, -1.25, 3.0];
        assert_eq!(decode_vector(&encode_vector(&v)), v);
    }

    #[test]
    fn test_cosine_distance_bounds() {
        let a = [1.0f32, 0.0];
        assert!(cosine_distance(&a, &[1.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&a, &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert!((cosine_distance(&a, &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&a, &[0.0, 0.0]), 2.0);
        assert_eq!(cosine_distance(&a, &[1.0]), 2.0);
    }

    #[test]
    fn test_fts_expr_plain_tokens() {
        assert_eq!(
            fts_match_expr("find oldest animal", false).as_deref(),
            Some("find AND oldest AND animal")
        );
        assert_eq!(
            fts_match_expr("find oldest", true).as_deref(),
            Some("find OR oldest")
        );
    }

    #[test]
    fn test_fts_expr_quotes_reserved() {
        let expr = fts_match_expr("foo-bar baz:qux", false).unwrap();
        assert_eq!(expr, "\"foo-bar\" AND \"baz:qux\"");
    }

    #[test]
    fn test_fts_expr_drops_pure_punctuation() {
        assert_eq!(fts_match_expr("-- ** ::", false), None);
        assert_eq!(fts_match_expr("", false), None);
        assert_eq!(
            fts_match_expr("** real **", false).as_deref(),
            Some("real")
        );
    }

    #[test]
    fn test_qname_tail() {
        assert_eq!(qname_tail("pkg.mod.Class.method"), "method");
        assert_eq!(qname_tail("plain"), "plain");
    }

    #[test]
    fn test_best_candidate_prefers_same_file() {
        let mut modules = HashMap::new();
        modules.insert(1, "pkg.a".to_string());
        modules.insert(2, "pkg.b".to_string());
        let cands = vec![(10, 2), (11, 1)];
        assert_eq!(best_candidate(&cands, 1, &modules), Some(11));
    }

    #[test]
    fn test_best_candidate_prefers_module_prefix() {
        let mut modules = HashMap::new();
        modules.insert(1, "pkg.sub.a".to_string());
        modules.insert(2, "pkg.sub.b".to_string());
        modules.insert(3, "other.c".to_string());
        let cands = vec![(20, 3), (21, 2)];
        assert_eq!(best_candidate(&cands, 1, &modules), Some(21));
    }

    #[test]
    fn test_best_candidate_falls_back_to_lowest_id() {
        let modules = HashMap::new();
        let cands = vec![(30, 5), (29, 6)];
        assert_eq!(best_candidate(&cands, 1, &modules), Some(29));
        assert_eq!(best_candidate(&[], 1, &modules), None);
    }

    #[test]
    fn test_normalize_absolute_modules() {
        assert_eq!(normalize_module("os.path", "pkg.mod").as_deref(), Some("os.path"));
        assert_eq!(normalize_module("a/b/c", "x").as_deref(), Some("a.b.c"));
        assert_eq!(normalize_module("", "x"), None);
    }

    #[test]
    fn test_normalize_relative_modules() {
        assert_eq!(normalize_module("./util", "pkg.mod").as_deref(), Some("pkg.util"));
        assert_eq!(normalize_module(".util", "pkg.mod").as_deref(), Some("pkg.util"));
        assert_eq!(
            normalize_module("..shared", "pkg.sub.mod").as_deref(),
            Some("pkg.shared")
        );
        assert_eq!(
            normalize_module("../shared/helpers", "pkg.sub.mod").as_deref(),
            Some("pkg.shared.helpers")
        );
        assert_eq!(normalize_module(".", "pkg.mod").as_deref(), Some("pkg"));
    }
}
