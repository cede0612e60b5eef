//! The deep extractor: a full tree walk of the Python grammar.
//!
//! This is the reference for field coverage: parameters with annotations and
//! defaults, decorators, return types, docstrings, call edges (with
//! `self.method` receivers rewritten onto the enclosing class), inheritance,
//! and dotted/relative imports.

use librarian_core::types::{
    Parameter, ParseResult, ParsedCall, ParsedImport, ParsedInherit, ParsedSymbol, SymbolKind,
};
use tracing::warn;
use tree_sitter::{Node, Parser};

use crate::extractor::SymbolExtractor;
use crate::treesitter::{node_text, single_line};

/// Builtin callables dropped at extraction time. Calls to these would never
/// resolve inside the index and only add noise to the graph.
const PYTHON_BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "bytes", "callable", "dict", "dir", "enumerate", "filter",
    "float", "format", "frozenset", "getattr", "hasattr", "hash", "id", "int", "isinstance",
    "issubclass", "iter", "len", "list", "map", "max", "min", "next", "object", "open", "print",
    "range", "repr", "reversed", "round", "set", "setattr", "sorted", "str", "sum", "super",
    "tuple", "type", "vars", "zip",
];

pub struct PythonExtractor;

impl PythonExtractor {
    pub fn new() -> Self {
        PythonExtractor
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolExtractor for PythonExtractor {
    fn language(&self) -> &'static str {
        "python"
    }

    fn parse(&self, module_path: &str, source: &str) -> ParseResult {
        let mut parser = Parser::new();
        if parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .is_err()
        {
            warn!("python grammar failed to load");
            return ParseResult::default();
        }
        let Some(tree) = parser.parse(source.as_bytes(), None) else {
            warn!(module = module_path, "python parse produced no tree");
            return ParseResult::default();
        };

        let root = tree.root_node();
        let mut walker = Walker {
            src: source.as_bytes(),
            module: module_path,
            out: ParseResult::default(),
        };

        let module_name = module_path.rsplit('.').next().unwrap_or(module_path);
        walker.out.symbols.push(ParsedSymbol {
            kind: SymbolKind::Module,
            name: module_name.to_string(),
            qualified_name: module_path.to_string(),
            parent_qname: None,
            line_start: 1,
            line_end: source.lines().count().max(1) as u32,
            signature: String::new(),
            doc: walker.docstring_of(root),
            params: Vec::new(),
            return_type: None,
            decorators: Vec::new(),
        });

        walker.walk(root, module_path, None, false);
        walker.out
    }
}

struct Walker<'a> {
    src: &'a [u8],
    module: &'a str,
    out: ParseResult,
}

impl<'a> Walker<'a> {
    fn walk(&mut self, node: Node<'_>, owner: &str, class: Option<&str>, in_class: bool) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child, owner, class, in_class);
        }
    }

    fn visit(&mut self, node: Node<'_>, owner: &str, class: Option<&str>, in_class: bool) {
        match node.kind() {
            "function_definition" => {
                self.handle_function(node, Vec::new(), owner, class, in_class);
            }
            "class_definition" => {
                self.handle_class(node, Vec::new(), owner);
            }
            "decorated_definition" => {
                let mut decorators = Vec::new();
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if child.kind() == "decorator" {
                        decorators.push(single_line(node_text(child, self.src)));
                    }
                }
                if let Some(def) = node.child_by_field_name("definition") {
                    match def.kind() {
                        "function_definition" => {
                            self.handle_function(def, decorators, owner, class, in_class);
                        }
                        "class_definition" => self.handle_class(def, decorators, owner),
                        _ => {}
                    }
                }
            }
            "import_statement" => self.handle_import(node),
            "import_from_statement" => self.handle_import_from(node),
            "call" => {
                self.handle_call(node, owner, class);
                self.walk(node, owner, class, false);
            }
            "comment" => {}
            _ => self.walk(node, owner, class, in_class),
        }
    }

    fn handle_function(
        &mut self,
        node: Node<'_>,
        decorators: Vec<String>,
        owner: &str,
        class: Option<&str>,
        in_class: bool,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let qname = format!("{owner}.{name}");
        let params_node = node.child_by_field_name("parameters");
        let params_text = params_node
            .map(|p| single_line(node_text(p, self.src)))
            .unwrap_or_else(|| "()".to_string());
        let return_type = node
            .child_by_field_name("return_type")
            .map(|r| single_line(node_text(r, self.src)));

        let is_async = node.child(0).map(|c| c.kind() == "async").unwrap_or(false);
        let keyword = if is_async { "async def" } else { "def" };
        let signature = match &return_type {
            Some(ret) => format!("{keyword} {name}{params_text} -> {ret}"),
            None => format!("{keyword} {name}{params_text}"),
        };

        self.out.symbols.push(ParsedSymbol {
            kind: if in_class {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            },
            name,
            qualified_name: qname.clone(),
            parent_qname: (owner != self.module).then(|| owner.to_string()),
            line_start: node.start_position().row as u32 + 1,
            line_end: node.end_position().row as u32 + 1,
            signature,
            doc: self.docstring_of(node),
            params: params_node.map(|p| self.parse_params(p)).unwrap_or_default(),
            return_type,
            decorators,
        });

        // Methods keep their class in scope so `self.x()` can be rewritten.
        let inner_class = if in_class { Some(owner) } else { class };
        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body, &qname, inner_class, false);
        }
    }

    fn handle_class(&mut self, node: Node<'_>, decorators: Vec<String>, owner: &str) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let qname = format!("{owner}.{name}");

        let mut bases = Vec::new();
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            for base in superclasses.named_children(&mut cursor) {
                let parent = match base.kind() {
                    "identifier" | "attribute" => Some(node_text(base, self.src).to_string()),
                    // Generic[T] and friends: inherit from the subscripted value.
                    "subscript" => base
                        .child_by_field_name("value")
                        .map(|v| node_text(v, self.src).to_string()),
                    _ => None,
                };
                if let Some(parent) = parent {
                    bases.push(parent);
                }
            }
        }

        let signature = if bases.is_empty() {
            format!("class {name}")
        } else {
            format!("class {name}({})", bases.join(", "))
        };
        for parent in &bases {
            self.out.inherits.push(ParsedInherit {
                child_qname: qname.clone(),
                parent: parent.clone(),
            });
        }

        self.out.symbols.push(ParsedSymbol {
            kind: SymbolKind::Class,
            name,
            qualified_name: qname.clone(),
            parent_qname: (owner != self.module).then(|| owner.to_string()),
            line_start: node.start_position().row as u32 + 1,
            line_end: node.end_position().row as u32 + 1,
            signature,
            doc: self.docstring_of(node),
            params: Vec::new(),
            return_type: None,
            decorators,
        });

        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body, &qname, Some(&qname), true);
        }
    }

    fn handle_call(&mut self, node: Node<'_>, owner: &str, class: Option<&str>) {
        let Some(func) = node.child_by_field_name("function") else {
            return;
        };
        let target = match func.kind() {
            "identifier" => {
                let name = node_text(func, self.src);
                if PYTHON_BUILTINS.contains(&name) {
                    None
                } else {
                    Some(name.to_string())
                }
            }
            "attribute" => {
                let attr = func
                    .child_by_field_name("attribute")
                    .map(|a| node_text(a, self.src))
                    .unwrap_or("");
                if attr.is_empty() {
                    None
                } else {
                    match func.child_by_field_name("object") {
                        Some(obj)
                            if obj.kind() == "identifier"
                                && node_text(obj, self.src) == "self" =>
                        {
                            class.map(|c| format!("{c}.{attr}"))
                        }
                        Some(obj) if matches!(obj.kind(), "identifier" | "attribute") => {
                            Some(format!("{}.{attr}", node_text(obj, self.src)))
                        }
                        _ => Some(attr.to_string()),
                    }
                }
            }
            _ => None,
        };
        if let Some(target) = target {
            self.out.calls.push(ParsedCall {
                caller_qname: owner.to_string(),
                target,
                line: node.start_position().row as u32 + 1,
            });
        }
    }

    fn handle_import(&mut self, node: Node<'_>) {
        let line = node.start_position().row as u32 + 1;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "dotted_name" => self.out.imports.push(ParsedImport {
                    module: node_text(child, self.src).to_string(),
                    name: None,
                    line,
                }),
                "aliased_import" => {
                    let module = child
                        .child_by_field_name("name")
                        .map(|n| node_text(n, self.src).to_string())
                        .unwrap_or_default();
                    let alias = child
                        .child_by_field_name("alias")
                        .map(|a| node_text(a, self.src).to_string());
                    if !module.is_empty() {
                        self.out.imports.push(ParsedImport {
                            module,
                            name: alias,
                            line,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn handle_import_from(&mut self, node: Node<'_>) {
        let line = node.start_position().row as u32 + 1;
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };
        // Relative imports keep their leading dots as written.
        let module = node_text(module_node, self.src).to_string();

        let mut names = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.id() == module_node.id() {
                continue;
            }
            match child.kind() {
                "dotted_name" | "identifier" => {
                    names.push(Some(node_text(child, self.src).to_string()));
                }
                "aliased_import" => {
                    let alias = child
                        .child_by_field_name("alias")
                        .map(|a| node_text(a, self.src).to_string());
                    names.push(alias);
                }
                "wildcard_import" => names.push(Some("*".to_string())),
                _ => {}
            }
        }
        if names.is_empty() {
            names.push(None);
        }
        for name in names {
            self.out.imports.push(ParsedImport {
                module: module.clone(),
                name,
                line,
            });
        }
    }

    fn parse_params(&self, params_node: Node<'_>) -> Vec<Parameter> {
        let mut params = Vec::new();
        let mut cursor = params_node.walk();
        for child in params_node.named_children(&mut cursor) {
            let param = match child.kind() {
                "identifier" | "list_splat_pattern" | "dictionary_splat_pattern"
                | "tuple_pattern" => Some(Parameter {
                    name: node_text(child, self.src).to_string(),
                    type_annotation: None,
                    default_value: None,
                }),
                "typed_parameter" => {
                    let name = child
                        .named_child(0)
                        .map(|n| node_text(n, self.src).to_string())
                        .unwrap_or_default();
                    (!name.is_empty()).then(|| Parameter {
                        name,
                        type_annotation: child
                            .child_by_field_name("type")
                            .map(|t| single_line(node_text(t, self.src))),
                        default_value: None,
                    })
                }
                "default_parameter" | "typed_default_parameter" => {
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| node_text(n, self.src).to_string())
                        .unwrap_or_default();
                    (!name.is_empty()).then(|| Parameter {
                        name,
                        type_annotation: child
                            .child_by_field_name("type")
                            .map(|t| single_line(node_text(t, self.src))),
                        default_value: child
                            .child_by_field_name("value")
                            .map(|v| single_line(node_text(v, self.src))),
                    })
                }
                _ => None,
            };
            if let Some(param) = param {
                params.push(param);
            }
        }
        params
    }

    /// Leading string literal of a definition body (or of the module itself).
    fn docstring_of(&self, node: Node<'_>) -> Option<String> {
        let body = if node.kind() == "module" {
            node
        } else {
            node.child_by_field_name("body")?
        };
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let expr = first.named_child(0)?;
        if expr.kind() != "string" {
            return None;
        }
        let text = strip_string_quotes(node_text(expr, self.src));
        (!text.is_empty()).then_some(text)
    }
}

fn strip_string_quotes(raw: &str) -> String {
    let text = raw
        .trim()
        .trim_start_matches(|c| matches!(c, 'r' | 'R' | 'b' | 'B' | 'f' | 'F' | 'u' | 'U'));
    for quote in ["\"\"\"", "'''"] {
        if text.len() >= 6 && text.starts_with(quote) && text.ends_with(quote) {
            return text[3..text.len() - 3].trim().to_string();
        }
    }
    for quote in ["\"", "'"] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return text[1..text.len() - 1].trim().to_string();
        }
    }
    text.to_string()
}
