use serde::{Deserialize, Serialize};

/// Symbol kinds recorded in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Module,
}

impl SymbolKind {
    /// Returns the lowercase string representation of this symbol kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Module => "module",
        }
    }

    /// Parse a stored kind string back into the enum.
    pub fn parse(s: &str) -> Option<SymbolKind> {
        match s {
            "function" => Some(SymbolKind::Function),
            "method" => Some(SymbolKind::Method),
            "class" => Some(SymbolKind::Class),
            "module" => Some(SymbolKind::Module),
            _ => None,
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parameter of a function or method, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// A symbol row as stored in and hydrated from the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub id: i64,
    pub file_id: i64,
    pub parent_id: Option<i64>,
    pub kind: SymbolKind,
    pub name: String,
    pub qualified_name: String,
    pub file_path: String,
    pub line_start: u32,
    pub line_end: u32,
    pub signature: String,
    pub doc: Option<String>,
    pub params: Vec<Parameter>,
    pub return_type: Option<String>,
    pub decorators: Vec<String>,
}

/// A source file row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    pub rel_path: String,
    pub module_path: String,
    pub language: String,
    pub mtime: i64,
    pub hash: String,
}

/// A file-level import edge. `resolved_file_id` stays null for external modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEdge {
    pub id: i64,
    pub file_id: i64,
    pub to_module: String,
    pub import_name: Option<String>,
    pub line: u32,
    pub resolved_file_id: Option<i64>,
}

/// A call edge from a symbol to a target named as written at the call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEdge {
    pub id: i64,
    pub file_id: i64,
    pub caller_id: i64,
    pub target_qname: String,
    pub line: u32,
    pub resolved_id: Option<i64>,
}

/// An inheritance edge from a class to a base named as written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InheritEdge {
    pub id: i64,
    pub file_id: i64,
    pub child_id: i64,
    pub parent_qname: String,
    pub resolved_id: Option<i64>,
}

/// Parents and children of a class, bounded by traversal depth.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassHierarchy {
    pub parents: Vec<Symbol>,
    pub children: Vec<Symbol>,
}

// ---------------------------------------------------------------------------
// Parse output: the contract between extractors and the store
// ---------------------------------------------------------------------------

/// A symbol extracted from source, before it has a database id.
///
/// `parent_qname` carries nesting (methods name their class) as a string;
/// the store links it to a concrete parent id after the file's rows are
/// inserted in the same transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedSymbol {
    pub kind: SymbolKind,
    pub name: String,
    pub qualified_name: String,
    pub parent_qname: Option<String>,
    pub line_start: u32,
    pub line_end: u32,
    pub signature: String,
    pub doc: Option<String>,
    pub params: Vec<Parameter>,
    pub return_type: Option<String>,
    pub decorators: Vec<String>,
}

/// An import statement: module specifier as written plus an optional binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedImport {
    pub module: String,
    pub name: Option<String>,
    pub line: u32,
}

/// A call site inside a function or method body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCall {
    pub caller_qname: String,
    pub target: String,
    pub line: u32,
}

/// A base-class reference on a class-like definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedInherit {
    pub child_qname: String,
    pub parent: String,
}

/// Complete parse output for a single source file.
///
/// Extractors never fail: unparseable input yields `ParseResult::default()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub symbols: Vec<ParsedSymbol>,
    pub imports: Vec<ParsedImport>,
    pub calls: Vec<ParsedCall>,
    pub inherits: Vec<ParsedInherit>,
}

impl ParseResult {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
            && self.imports.is_empty()
            && self.calls.is_empty()
            && self.inherits.is_empty()
    }
}

/// Errors raised by the index store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("schema version mismatch: found v{found}, expected v{expected}")]
    SchemaVersion { found: u32, expected: u32 },

    #[error("invalid stored row: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            SymbolKind::Function,
            SymbolKind::Method,
            SymbolKind::Class,
            SymbolKind::Module,
        ] {
            assert_eq!(SymbolKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SymbolKind::parse("struct"), None);
    }

    #[test]
    fn test_kind_serde_snake_case() {
        let json = serde_json::to_string(&SymbolKind::Method).unwrap();
        assert_eq!(json, "\"method\"");
        let parsed: SymbolKind = serde_json::from_str("\"class\"").unwrap();
        assert_eq!(parsed, SymbolKind::Class);
    }

    #[test]
    fn test_empty_parse_result() {
        assert!(ParseResult::default().is_empty());
        let non_empty = ParseResult {
            imports: vec![ParsedImport {
                module: "os".into(),
                name: None,
                line: 1,
            }],
            ..Default::default()
        };
        assert!(!non_empty.is_empty());
    }
}
