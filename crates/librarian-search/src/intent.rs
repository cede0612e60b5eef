//! Pattern-based classification of graph-relationship queries.
//!
//! "who calls render" should traverse the call graph, not rank documents.
//! Classification runs before the hybrid path and is deliberately literal:
//! only queries that clearly name a relationship are routed.

/// A recognised graph question and its extracted target name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIntent {
    Callers(String),
    Callees(String),
    Hierarchy(String),
}

const CALLER_PREFIXES: &[&str] = &["callers of ", "who calls ", "what calls "];
const CALLEE_PREFIXES: &[&str] = &["callees of ", "what is called by "];
const HIERARCHY_PREFIXES: &[&str] = &[
    "hierarchy of ",
    "class hierarchy of ",
    "class hierarchy for ",
    "subclasses of ",
    "superclasses of ",
    "parents of ",
];

/// Classify a query, returning `None` for anything that should take the
/// hybrid search path.
pub fn classify(query: &str) -> Option<GraphIntent> {
    let trimmed = query.trim();
    let lower = trimmed.to_lowercase();

    for prefix in CALLER_PREFIXES {
        if lower.starts_with(prefix) {
            return target(&trimmed[prefix.len()..]).map(GraphIntent::Callers);
        }
    }
    for prefix in CALLEE_PREFIXES {
        if lower.starts_with(prefix) {
            return target(&trimmed[prefix.len()..]).map(GraphIntent::Callees);
        }
    }
    for prefix in HIERARCHY_PREFIXES {
        if lower.starts_with(prefix) {
            return target(&trimmed[prefix.len()..]).map(GraphIntent::Hierarchy);
        }
    }

    // "what does X call" puts the target in the middle.
    if let Some(rest) = lower.strip_prefix("what does ") {
        if let Some(end) = rest.strip_suffix(" call").or_else(|| rest.strip_suffix(" call?")) {
            let start = "what does ".len();
            return target(&trimmed[start..start + end.len()]).map(GraphIntent::Callees);
        }
    }
    None
}

/// Strip quoting, trailing punctuation, and call parens from a target name.
fn target(raw: &str) -> Option<String> {
    let mut t = raw.trim();
    t = t.trim_matches(|c| matches!(c, '?' | '"' | '\'' | '`' | ',' | '.'));
    t = t.strip_suffix("()").unwrap_or(t);
    let t = t.trim();
    if t.is_empty() || t.contains(char::is_whitespace) {
        return None;
    }
    Some(t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_patterns() {
        assert_eq!(
            classify("callers of process_file"),
            Some(GraphIntent::Callers("process_file".into()))
        );
        assert_eq!(
            classify("who calls render?"),
            Some(GraphIntent::Callers("render".into()))
        );
        assert_eq!(
            classify("Who calls `save()`"),
            Some(GraphIntent::Callers("save".into()))
        );
    }

    #[test]
    fn test_callee_patterns() {
        assert_eq!(
            classify("callees of main"),
            Some(GraphIntent::Callees("main".into()))
        );
        assert_eq!(
            classify("what does handler call"),
            Some(GraphIntent::Callees("handler".into()))
        );
    }

    #[test]
    fn test_hierarchy_patterns() {
        assert_eq!(
            classify("hierarchy of Animal"),
            Some(GraphIntent::Hierarchy("Animal".into()))
        );
        assert_eq!(
            classify("subclasses of BaseModel"),
            Some(GraphIntent::Hierarchy("BaseModel".into()))
        );
    }

    #[test]
    fn test_plain_queries_not_classified() {
        assert_eq!(classify("find the oldest animal"), None);
        assert_eq!(classify("parse config file"), None);
        assert_eq!(classify(""), None);
        // Multi-word targets are ambiguous; fall through to hybrid search.
        assert_eq!(classify("callers of the main function"), None);
    }
}
