//! The grammar-driven extractor.
//!
//! One walker covers every non-Python language through the node-type maps
//! in [`langs`]. It guarantees the baseline of the extraction contract
//! (kind, name, qualified name, line range, signature, best-effort
//! parameters, adjacent documentation) and adds call, import, and
//! inheritance edges where the grammar expresses them unambiguously.

pub mod langs;

use librarian_core::types::{
    Parameter, ParseResult, ParsedCall, ParsedImport, ParsedInherit, ParsedSymbol, SymbolKind,
};
use tracing::warn;
use tree_sitter::{Node, Parser};

use crate::extractor::SymbolExtractor;
use crate::treesitter::{language_for_name, node_text, single_line};
use self::langs::LanguageSpec;

pub struct GenericExtractor {
    spec: &'static LanguageSpec,
}

impl GenericExtractor {
    pub fn new(spec: &'static LanguageSpec) -> Self {
        GenericExtractor { spec }
    }
}

impl SymbolExtractor for GenericExtractor {
    fn language(&self) -> &'static str {
        self.spec.name
    }

    fn parse(&self, module_path: &str, source: &str) -> ParseResult {
        let Some(lang) = language_for_name(self.spec.name) else {
            warn!(language = self.spec.name, "grammar not available");
            return ParseResult::default();
        };
        let mut parser = Parser::new();
        if parser.set_language(&lang).is_err() {
            warn!(language = self.spec.name, "grammar failed to load");
            return ParseResult::default();
        }
        let Some(tree) = parser.parse(source.as_bytes(), None) else {
            warn!(language = self.spec.name, module = module_path, "parse produced no tree");
            return ParseResult::default();
        };

        let mut walker = Walker {
            spec: self.spec,
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
            doc: None,
            params: Vec::new(),
            return_type: None,
            decorators: Vec::new(),
        });

        walker.walk(tree.root_node(), module_path, Container::Module);
        walker.out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Module,
    Class,
}

struct Walker<'a> {
    spec: &'static LanguageSpec,
    src: &'a [u8],
    module: &'a str,
    out: ParseResult,
}

impl<'a> Walker<'a> {
    fn walk(&mut self, node: Node<'_>, owner: &str, container: Container) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child, owner, container);
        }
    }

    fn visit(&mut self, node: Node<'_>, owner: &str, container: Container) {
        let kind = node.kind();
        if self.spec.comment_kinds.contains(&kind) {
            return;
        }
        if self.spec.import_kinds.contains(&kind) {
            self.handle_import(node);
            return;
        }
        if self.spec.call_kinds.contains(&kind) {
            self.handle_call(node, owner);
            self.walk(node, owner, container);
            return;
        }
        if self.spec.name == "rust" && kind == "impl_item" {
            self.handle_impl(node, owner);
            return;
        }
        if matches!(kind, "lexical_declaration" | "variable_declaration")
            && matches!(self.spec.name, "typescript" | "tsx" | "javascript")
        {
            self.handle_var_functions(node, owner, container);
            return;
        }
        if self.spec.namespace_kinds.contains(&kind) {
            self.handle_namespace(node, owner);
            return;
        }
        if self.spec.class_kinds.contains(&kind) {
            self.handle_class(node, owner);
            return;
        }
        if self.spec.function_kinds.contains(&kind) || self.spec.method_kinds.contains(&kind) {
            self.handle_function(node, owner, container);
            return;
        }
        self.walk(node, owner, container);
    }

    fn handle_function(&mut self, node: Node<'_>, owner: &str, container: Container) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();

        // Go methods hang off their receiver type, not the lexical scope.
        let (owner_qname, is_method) =
            if self.spec.name == "go" && node.kind() == "method_declaration" {
                match self.receiver_type(node) {
                    Some(recv) => (format!("{}.{recv}", self.module), true),
                    None => (owner.to_string(), false),
                }
            } else {
                (owner.to_string(), container == Container::Class)
            };
        let qname = format!("{owner_qname}.{name}");

        self.out.symbols.push(ParsedSymbol {
            kind: if is_method {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            },
            name,
            qualified_name: qname.clone(),
            parent_qname: (owner_qname != self.module).then(|| owner_qname.clone()),
            line_start: node.start_position().row as u32 + 1,
            line_end: node.end_position().row as u32 + 1,
            signature: self.header_signature(node),
            doc: self.leading_doc(node),
            params: node
                .child_by_field_name("parameters")
                .map(|p| self.parse_params(p))
                .unwrap_or_default(),
            return_type: self.return_type_of(node),
            decorators: self.leading_attributes(node),
        });

        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body, &qname, Container::Module);
        }
    }

    fn handle_class(&mut self, node: Node<'_>, owner: &str) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        // Go type aliases are not class-like; only struct and interface are.
        let go_type_kind = if self.spec.name == "go" {
            let kind = node
                .child_by_field_name("type")
                .map(|t| t.kind())
                .unwrap_or("");
            match kind {
                "struct_type" => Some("struct"),
                "interface_type" => Some("interface"),
                _ => return,
            }
        } else {
            None
        };

        let name = node_text(name_node, self.src).to_string();
        let qname = format!("{owner}.{name}");

        let signature = match go_type_kind {
            Some(kw) => format!("type {name} {kw}"),
            None => self.header_signature(node),
        };

        for parent in self.base_classes(node) {
            self.out.inherits.push(ParsedInherit {
                child_qname: qname.clone(),
                parent,
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
            doc: self.leading_doc(node),
            params: Vec::new(),
            return_type: None,
            decorators: self.leading_attributes(node),
        });

        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body, &qname, Container::Class);
        }
    }

    /// Rust `impl` blocks scope their functions onto the implemented type
    /// without producing a symbol of their own.
    fn handle_impl(&mut self, node: Node<'_>, owner: &str) {
        let Some(ty) = node.child_by_field_name("type") else {
            return;
        };
        let raw = node_text(ty, self.src);
        let base = raw.split('<').next().unwrap_or(raw);
        let type_name = base.rsplit("::").next().unwrap_or(base).trim();
        if type_name.is_empty() {
            return;
        }
        let impl_owner = format!("{owner}.{type_name}");
        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body, &impl_owner, Container::Class);
        }
    }

    fn handle_namespace(&mut self, node: Node<'_>, owner: &str) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.src).to_string();
        let qname = format!("{owner}.{name}");
        self.out.symbols.push(ParsedSymbol {
            kind: SymbolKind::Module,
            name,
            qualified_name: qname.clone(),
            parent_qname: (owner != self.module).then(|| owner.to_string()),
            line_start: node.start_position().row as u32 + 1,
            line_end: node.end_position().row as u32 + 1,
            signature: self.header_signature(node),
            doc: self.leading_doc(node),
            params: Vec::new(),
            return_type: None,
            decorators: Vec::new(),
        });
        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body, &qname, Container::Module);
        }
    }

    /// `const f = (a) => ...` and friends: the declarator becomes a function
    /// symbol when its initializer is function-shaped.
    fn handle_var_functions(&mut self, node: Node<'_>, owner: &str, container: Container) {
        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "variable_declarator")
            .collect();

        let mut handled_any = false;
        for declarator in &declarators {
            let (Some(name_node), Some(value)) = (
                declarator.child_by_field_name("name"),
                declarator.child_by_field_name("value"),
            ) else {
                continue;
            };
            if !matches!(
                value.kind(),
                "arrow_function" | "function_expression" | "function" | "generator_function"
            ) {
                continue;
            }
            handled_any = true;
            let name = node_text(name_node, self.src).to_string();
            let qname = format!("{owner}.{name}");

            let header_end = value
                .child_by_field_name("body")
                .map(|b| b.start_byte())
                .unwrap_or(value.end_byte());
            let header = std::str::from_utf8(&self.src[node.start_byte()..header_end])
                .unwrap_or("")
                .trim_end_matches(|c: char| c.is_whitespace() || c == '{' || c == '>' || c == '=');
            self.out.symbols.push(ParsedSymbol {
                kind: SymbolKind::Function,
                name,
                qualified_name: qname.clone(),
                parent_qname: (owner != self.module).then(|| owner.to_string()),
                line_start: node.start_position().row as u32 + 1,
                line_end: node.end_position().row as u32 + 1,
                signature: single_line(header),
                doc: self.leading_doc(node),
                params: value
                    .child_by_field_name("parameters")
                    .map(|p| self.parse_params(p))
                    .unwrap_or_default(),
                return_type: self.return_type_of(value),
                decorators: Vec::new(),
            });
            if let Some(body) = value.child_by_field_name("body") {
                self.walk(body, &qname, Container::Module);
            }
        }

        if !handled_any {
            self.walk(node, owner, container);
        }
    }

    fn handle_call(&mut self, node: Node<'_>, owner: &str) {
        let target = match self.spec.name {
            "rust" => self.rust_call_target(node),
            "go" => self.go_call_target(node),
            _ => self.ecmascript_call_target(node),
        };
        if let Some(target) = target {
            self.out.calls.push(ParsedCall {
                caller_qname: owner.to_string(),
                target,
                line: node.start_position().row as u32 + 1,
            });
        }
    }

    fn rust_call_target(&self, node: Node<'_>) -> Option<String> {
        let func = node.child_by_field_name("function")?;
        match func.kind() {
            "identifier" => {
                let name = node_text(func, self.src);
                (!self.spec.builtins.contains(&name)).then(|| name.to_string())
            }
            "scoped_identifier" => Some(node_text(func, self.src).replace("::", ".")),
            "field_expression" => func
                .child_by_field_name("field")
                .map(|f| node_text(f, self.src).to_string()),
            "generic_function" => {
                let inner = func.child_by_field_name("function")?;
                match inner.kind() {
                    "identifier" => Some(node_text(inner, self.src).to_string()),
                    "scoped_identifier" => {
                        Some(node_text(inner, self.src).replace("::", "."))
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn go_call_target(&self, node: Node<'_>) -> Option<String> {
        let func = node.child_by_field_name("function")?;
        match func.kind() {
            "identifier" => {
                let name = node_text(func, self.src);
                (!self.spec.builtins.contains(&name)).then(|| name.to_string())
            }
            "selector_expression" => {
                let field = func
                    .child_by_field_name("field")
                    .map(|f| node_text(f, self.src))?;
                match func.child_by_field_name("operand") {
                    Some(op) if op.kind() == "identifier" => {
                        let recv = node_text(op, self.src);
                        if self.spec.builtin_receivers.contains(&recv) {
                            None
                        } else {
                            Some(format!("{recv}.{field}"))
                        }
                    }
                    _ => Some(field.to_string()),
                }
            }
            _ => None,
        }
    }

    fn ecmascript_call_target(&self, node: Node<'_>) -> Option<String> {
        let func = if node.kind() == "new_expression" {
            node.child_by_field_name("constructor")?
        } else {
            node.child_by_field_name("function")?
        };
        match func.kind() {
            "identifier" => {
                let name = node_text(func, self.src);
                (!self.spec.builtins.contains(&name)).then(|| name.to_string())
            }
            "member_expression" => {
                let prop = func
                    .child_by_field_name("property")
                    .map(|p| node_text(p, self.src))?;
                match func.child_by_field_name("object") {
                    Some(obj) if obj.kind() == "identifier" => {
                        let recv = node_text(obj, self.src);
                        if self.spec.builtin_receivers.contains(&recv) {
                            None
                        } else {
                            Some(format!("{recv}.{prop}"))
                        }
                    }
                    Some(obj) if obj.kind() == "this" => Some(prop.to_string()),
                    _ => Some(prop.to_string()),
                }
            }
            _ => None,
        }
    }

    fn handle_import(&mut self, node: Node<'_>) {
        match self.spec.name {
            "rust" => self.rust_import(node),
            "go" => self.go_import(node),
            _ => self.ecmascript_import(node),
        }
    }

    fn rust_import(&mut self, node: Node<'_>) {
        let line = node.start_position().row as u32 + 1;
        let Some(arg) = node.child_by_field_name("argument") else {
            return;
        };
        let mut push = |module: String, name: Option<String>| {
            if !module.is_empty() {
                self.out.imports.push(ParsedImport { module, name, line });
            }
        };
        match arg.kind() {
            "identifier" | "crate" => push(node_text(arg, self.src).to_string(), None),
            "scoped_identifier" => {
                let path = arg
                    .child_by_field_name("path")
                    .map(|p| node_text(p, self.src).replace("::", "."))
                    .unwrap_or_default();
                let name = arg
                    .child_by_field_name("name")
                    .map(|n| node_text(n, self.src).to_string());
                push(path, name);
            }
            "use_as_clause" => {
                let alias = arg
                    .child_by_field_name("alias")
                    .map(|a| node_text(a, self.src).to_string());
                let original = arg.named_child(0);
                let module = match original {
                    Some(orig) if orig.kind() == "scoped_identifier" => orig
                        .child_by_field_name("path")
                        .map(|p| node_text(p, self.src).replace("::", "."))
                        .unwrap_or_default(),
                    Some(orig) => node_text(orig, self.src).replace("::", "."),
                    None => String::new(),
                };
                push(module, alias);
            }
            "use_wildcard" => {
                let path = arg
                    .named_child(0)
                    .map(|p| node_text(p, self.src).replace("::", "."))
                    .unwrap_or_default();
                push(path, Some("*".to_string()));
            }
            "scoped_use_list" => {
                let path = arg
                    .child_by_field_name("path")
                    .map(|p| node_text(p, self.src).replace("::", "."))
                    .unwrap_or_default();
                let mut names = Vec::new();
                if let Some(list) = arg.child_by_field_name("list") {
                    let mut cursor = list.walk();
                    for item in list.named_children(&mut cursor) {
                        match item.kind() {
                            "identifier" => {
                                names.push(node_text(item, self.src).to_string());
                            }
                            "scoped_identifier" => {
                                if let Some(n) = item.child_by_field_name("name") {
                                    names.push(node_text(n, self.src).to_string());
                                }
                            }
                            "use_as_clause" => {
                                if let Some(a) = item.child_by_field_name("alias") {
                                    names.push(node_text(a, self.src).to_string());
                                }
                            }
                            "use_wildcard" => names.push("*".to_string()),
                            _ => {}
                        }
                    }
                }
                if names.is_empty() {
                    push(path, None);
                } else {
                    for name in names {
                        push(path.clone(), Some(name));
                    }
                }
            }
            _ => {}
        }
    }

    fn go_import(&mut self, node: Node<'_>) {
        let line = node.start_position().row as u32 + 1;
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current.kind() == "import_spec" {
                let module = current
                    .child_by_field_name("path")
                    .map(|p| node_text(p, self.src).trim_matches('"').to_string())
                    .unwrap_or_default();
                let name = current
                    .child_by_field_name("name")
                    .map(|n| node_text(n, self.src).to_string());
                if !module.is_empty() {
                    self.out.imports.push(ParsedImport { module, name, line });
                }
                continue;
            }
            let mut cursor = current.walk();
            for child in current.named_children(&mut cursor) {
                stack.push(child);
            }
        }
    }

    fn ecmascript_import(&mut self, node: Node<'_>) {
        let line = node.start_position().row as u32 + 1;
        let Some(source) = node.child_by_field_name("source") else {
            return;
        };
        let module = node_text(source, self.src)
            .trim_matches(|c| c == '"' || c == '\'' || c == '`')
            .to_string();
        if module.is_empty() {
            return;
        }

        let mut names: Vec<String> = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            match current.kind() {
                "import_specifier" => {
                    let bound = current
                        .child_by_field_name("alias")
                        .or_else(|| current.child_by_field_name("name"));
                    if let Some(b) = bound {
                        names.push(node_text(b, self.src).to_string());
                    }
                    continue;
                }
                "namespace_import" => {
                    if let Some(ident) = current.named_child(0) {
                        names.push(node_text(ident, self.src).to_string());
                    }
                    continue;
                }
                "import_clause" => {
                    // A bare identifier child is the default import binding.
                    let mut cursor = current.walk();
                    for child in current.named_children(&mut cursor) {
                        if child.kind() == "identifier" {
                            names.push(node_text(child, self.src).to_string());
                        } else {
                            stack.push(child);
                        }
                    }
                    continue;
                }
                _ => {}
            }
            if current.id() != source.id() {
                let mut cursor = current.walk();
                for child in current.named_children(&mut cursor) {
                    stack.push(child);
                }
            }
        }

        if names.is_empty() {
            self.out.imports.push(ParsedImport {
                module,
                name: None,
                line,
            });
        } else {
            names.sort();
            for name in names {
                self.out.imports.push(ParsedImport {
                    module: module.clone(),
                    name: Some(name),
                    line,
                });
            }
        }
    }

    /// Base classes where the grammar states them unambiguously: the
    /// `extends` clause of an ECMAScript class. Go embedding and Rust trait
    /// impls are deliberately not treated as inheritance.
    fn base_classes(&self, node: Node<'_>) -> Vec<String> {
        if !matches!(self.spec.name, "typescript" | "tsx" | "javascript") {
            return Vec::new();
        }
        let mut bases = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "class_heritage" => {
                    let mut heritage_cursor = child.walk();
                    for clause in child.named_children(&mut heritage_cursor) {
                        if clause.kind() == "extends_clause" {
                            if let Some(value) = clause.named_child(0) {
                                bases.push(node_text(value, self.src).to_string());
                            }
                        }
                    }
                }
                // Some grammar versions attach the clause directly.
                "extends_clause" => {
                    if let Some(value) = child.named_child(0) {
                        bases.push(node_text(value, self.src).to_string());
                    }
                }
                _ => {}
            }
        }
        bases
    }

    fn receiver_type(&self, node: Node<'_>) -> Option<String> {
        let receiver = node.child_by_field_name("receiver")?;
        let mut cursor = receiver.walk();
        let decl = receiver
            .named_children(&mut cursor)
            .find(|c| c.kind() == "parameter_declaration")?;
        let ty = decl.child_by_field_name("type")?;
        let raw = node_text(ty, self.src).trim_start_matches('*');
        let name = raw.rsplit('.').next().unwrap_or(raw).trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    fn return_type_of(&self, node: Node<'_>) -> Option<String> {
        let field = if self.spec.name == "go" {
            "result"
        } else {
            "return_type"
        };
        node.child_by_field_name(field).map(|r| {
            single_line(
                node_text(r, self.src)
                    .trim_start_matches(':')
                    .trim_start_matches("->")
                    .trim(),
            )
        })
    }

    /// Definition header up to the body, collapsed to one line.
    fn header_signature(&self, node: Node<'_>) -> String {
        let end = node
            .child_by_field_name("body")
            .map(|b| b.start_byte())
            .unwrap_or(node.end_byte());
        let text = std::str::from_utf8(&self.src[node.start_byte()..end]).unwrap_or("");
        single_line(text.trim_end_matches(|c: char| c.is_whitespace() || c == '{' || c == ';'))
    }

    /// Best-effort parameter split on the raw parameter list text.
    fn parse_params(&self, params_node: Node<'_>) -> Vec<Parameter> {
        let raw = node_text(params_node, self.src);
        let inner = raw
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(raw);

        let mut params = Vec::new();
        for part in split_top_level_commas(inner) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            params.push(self.parse_one_param(part));
        }
        params
    }

    fn parse_one_param(&self, part: &str) -> Parameter {
        if self.spec.name == "go" {
            // `name Type`, or just `Type` in result-style lists.
            let mut words = part.split_whitespace();
            let first = words.next().unwrap_or(part);
            let rest: Vec<&str> = words.collect();
            return Parameter {
                name: first.to_string(),
                type_annotation: (!rest.is_empty()).then(|| rest.join(" ")),
                default_value: None,
            };
        }

        // `name: Type = default` shapes (Rust and ECMAScript).
        let (head, default) = match part.split_once('=') {
            Some((h, d)) if !h.trim_end().ends_with(['<', '>', '!']) => {
                (h.trim(), Some(single_line(d.trim())))
            }
            _ => (part, None),
        };
        match head.split_once(':') {
            Some((name, ty)) => Parameter {
                name: name.trim().to_string(),
                type_annotation: Some(single_line(ty.trim())),
                default_value: default,
            },
            None => Parameter {
                name: head.trim().to_string(),
                type_annotation: None,
                default_value: default,
            },
        }
    }

    /// Documentation comment stack ending on the line directly above the
    /// definition (attributes and decorators may sit in between).
    fn leading_doc(&self, node: Node<'_>) -> Option<String> {
        // Comments precede the outermost wrapper, not the inner definition
        // (`type Server struct`, `export class Dog`).
        let mut anchor = node;
        while let Some(parent) = anchor.parent() {
            if matches!(parent.kind(), "type_declaration" | "export_statement") {
                anchor = parent;
            } else {
                break;
            }
        }

        let attr_kinds: &[&str] = &["attribute_item", "decorator"];
        let mut lines: Vec<String> = Vec::new();
        let mut expected_row = anchor.start_position().row;
        let mut prev = anchor.prev_sibling();
        while let Some(p) = prev {
            let kind = p.kind();
            if attr_kinds.contains(&kind) {
                expected_row = p.start_position().row;
                prev = p.prev_sibling();
                continue;
            }
            if !self.spec.comment_kinds.contains(&kind) {
                break;
            }
            if p.end_position().row + 1 < expected_row {
                break;
            }
            let text = node_text(p, self.src);
            if !self.spec.doc_prefixes.iter().any(|d| text.starts_with(d)) {
                break;
            }
            lines.push(clean_comment(text));
            expected_row = p.start_position().row;
            prev = p.prev_sibling();
        }
        if lines.is_empty() {
            return None;
        }
        lines.reverse();
        let doc = lines.join("\n").trim().to_string();
        (!doc.is_empty()).then_some(doc)
    }

    /// Rust attributes and ECMAScript decorators attached to a definition.
    fn leading_attributes(&self, node: Node<'_>) -> Vec<String> {
        let attr_kind = match self.spec.name {
            "rust" => "attribute_item",
            "typescript" | "tsx" | "javascript" => "decorator",
            _ => return Vec::new(),
        };
        let mut attrs = Vec::new();

        // Decorators may be children of the definition itself.
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == attr_kind {
                attrs.push(single_line(node_text(child, self.src)));
            }
        }

        let mut prev = node.prev_sibling();
        let mut leading = Vec::new();
        while let Some(p) = prev {
            if p.kind() == attr_kind {
                leading.push(single_line(node_text(p, self.src)));
                prev = p.prev_sibling();
            } else if self.spec.comment_kinds.contains(&p.kind()) {
                prev = p.prev_sibling();
            } else {
                break;
            }
        }
        leading.reverse();
        leading.extend(attrs);
        leading
    }
}

fn split_top_level_commas(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn clean_comment(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.lines() {
        let mut l = line.trim();
        for prefix in ["///", "//!", "//", "/**", "/*"] {
            if let Some(rest) = l.strip_prefix(prefix) {
                l = rest;
                break;
            }
        }
        l = l.trim_end_matches("*/").trim();
        let l = l.strip_prefix('*').map(str::trim).unwrap_or(l);
        lines.push(l.to_string());
    }
    lines.join("\n").trim().to_string()
}
