//! Shared tree-sitter plumbing: language lookup, extension detection, and
//! module-path derivation.

use std::path::Path;

use tree_sitter::Language;

/// Resolve a language tag to its tree-sitter grammar.
pub fn language_for_name(name: &str) -> Option<Language> {
    match name {
        "python" => Some(tree_sitter_python::LANGUAGE.into()),
        "rust" => Some(tree_sitter_rust::LANGUAGE.into()),
        "go" => Some(tree_sitter_go::LANGUAGE.into()),
        "typescript" | "javascript" => {
            Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
        }
        "tsx" => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
        _ => None,
    }
}

/// Detect a language tag from a file extension. Unknown extensions are
/// skipped by discovery.
pub fn detect_language(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()? {
        "py" | "pyi" => Some("python"),
        "rs" => Some("rust"),
        "go" => Some("go"),
        "ts" | "mts" | "cts" => Some("typescript"),
        "tsx" | "jsx" => Some("tsx"),
        "js" | "mjs" | "cjs" => Some("javascript"),
        _ => None,
    }
}

/// Derive the dotted module path for a file, relative to the index root.
///
/// `pkg/mod.py` → `pkg.mod`; filesystem wrapper files collapse onto their
/// directory (`pkg/__init__.py` → `pkg`, `src/util/mod.rs` → `src.util`,
/// `lib/index.ts` → `lib`). The same file always yields the same path, which
/// is what import resolution matches against.
pub fn module_path_from_rel(rel_path: &Path, language: &str) -> String {
    let stripped = rel_path.with_extension("");
    let mut parts: Vec<String> = stripped
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(os) => Some(os.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    let wrapper = match language {
        "python" => Some("__init__"),
        "rust" => Some("mod"),
        "typescript" | "tsx" | "javascript" => Some("index"),
        _ => None,
    };
    if let Some(w) = wrapper {
        if parts.len() > 1 && parts.last().map(String::as_str) == Some(w) {
            parts.pop();
        }
    }
    if parts.is_empty() {
        parts.push("root".to_string());
    }
    parts.join(".")
}

/// UTF-8 text of a node, empty on malformed input.
pub(crate) fn node_text<'a>(node: tree_sitter::Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// Collapse a multi-line source span into a single-line signature fragment.
pub(crate) fn single_line(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_space && !out.is_empty() {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language(Path::new("a/b.py")), Some("python"));
        assert_eq!(detect_language(Path::new("x.rs")), Some("rust"));
        assert_eq!(detect_language(Path::new("x.tsx")), Some("tsx"));
        assert_eq!(detect_language(Path::new("x.mjs")), Some("javascript"));
        assert_eq!(detect_language(Path::new("x.txt")), None);
        assert_eq!(detect_language(Path::new("Makefile")), None);
    }

    #[test]
    fn test_module_path_basic() {
        assert_eq!(module_path_from_rel(Path::new("pkg/mod.py"), "python"), "pkg.mod");
        assert_eq!(module_path_from_rel(Path::new("main.go"), "go"), "main");
    }

    #[test]
    fn test_module_path_wrappers() {
        assert_eq!(
            module_path_from_rel(Path::new("pkg/__init__.py"), "python"),
            "pkg"
        );
        assert_eq!(
            module_path_from_rel(Path::new("src/util/mod.rs"), "rust"),
            "src.util"
        );
        assert_eq!(
            module_path_from_rel(Path::new("lib/index.ts"), "typescript"),
            "lib"
        );
        // A top-level wrapper file keeps its own name.
        assert_eq!(
            module_path_from_rel(Path::new("__init__.py"), "python"),
            "__init__"
        );
    }

    #[test]
    fn test_single_line() {
        assert_eq!(
            single_line("def f(\n    a: int,\n    b: str\n)"),
            "def f( a: int, b: str )"
        );
        assert_eq!(single_line("plain"), "plain");
    }

    #[test]
    fn test_language_lookup() {
        for lang in ["python", "rust", "go", "typescript", "tsx", "javascript"] {
            assert!(language_for_name(lang).is_some(), "{lang} grammar missing");
        }
        assert!(language_for_name("cobol").is_none());
    }
}
