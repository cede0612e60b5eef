//! Per-language node-type maps for the generic extractor.
//!
//! Each map names the grammar node kinds that produce symbols, where
//! documentation sits relative to a definition, and which callables are
//! language builtins. Anything a grammar cannot express unambiguously
//! (e.g. Go embedded-interface inheritance) is simply left out of its map.

pub struct LanguageSpec {
    pub name: &'static str,
    /// Definition kinds that yield function symbols.
    pub function_kinds: &'static [&'static str],
    /// Definition kinds that yield methods when nested in a class-like body.
    pub method_kinds: &'static [&'static str],
    /// Class-like definition kinds.
    pub class_kinds: &'static [&'static str],
    /// Kinds that open a named module scope (e.g. Rust `mod`).
    pub namespace_kinds: &'static [&'static str],
    /// Import statement kinds.
    pub import_kinds: &'static [&'static str],
    /// Call-site kinds; empty disables call extraction for the language.
    pub call_kinds: &'static [&'static str],
    /// Comment node kinds eligible as adjacent documentation.
    pub comment_kinds: &'static [&'static str],
    /// Comment prefixes that count as documentation.
    pub doc_prefixes: &'static [&'static str],
    /// Builtin callables dropped from call edges.
    pub builtins: &'static [&'static str],
    /// Receivers whose member calls are standard-library noise.
    pub builtin_receivers: &'static [&'static str],
}

pub static RUST: LanguageSpec = LanguageSpec {
    name: "rust",
    function_kinds: &["function_item"],
    method_kinds: &["function_item", "function_signature_item"],
    class_kinds: &["struct_item", "enum_item", "trait_item", "union_item"],
    namespace_kinds: &["mod_item"],
    import_kinds: &["use_declaration"],
    call_kinds: &["call_expression"],
    comment_kinds: &["line_comment", "block_comment"],
    doc_prefixes: &["///", "//!", "/**"],
    builtins: &["Some", "Ok", "Err", "drop"],
    builtin_receivers: &[],
};

pub static GO: LanguageSpec = LanguageSpec {
    name: "go",
    function_kinds: &["function_declaration"],
    method_kinds: &["method_declaration"],
    class_kinds: &["type_spec"],
    namespace_kinds: &[],
    import_kinds: &["import_declaration"],
    call_kinds: &["call_expression"],
    comment_kinds: &["comment"],
    doc_prefixes: &["//", "/*"],
    builtins: &[
        "append", "cap", "clear", "close", "copy", "delete", "len", "make", "max", "min", "new",
        "panic", "print", "println", "recover",
    ],
    builtin_receivers: &[
        "bytes", "context", "errors", "fmt", "io", "log", "math", "os", "sort", "strconv",
        "strings", "sync", "time",
    ],
};

const TS_FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_signature",
];
const TS_METHOD_KINDS: &[&str] = &["method_definition", "method_signature"];
const TS_CLASS_KINDS: &[&str] = &[
    "class_declaration",
    "abstract_class_declaration",
    "interface_declaration",
    "enum_declaration",
];
const TS_IMPORT_KINDS: &[&str] = &["import_statement"];
const TS_CALL_KINDS: &[&str] = &["call_expression", "new_expression"];
const TS_COMMENT_KINDS: &[&str] = &["comment"];
const TS_DOC_PREFIXES: &[&str] = &["/**", "//"];
const TS_BUILTINS: &[&str] = &[
    "alert", "Array", "BigInt", "Boolean", "clearInterval", "clearTimeout", "fetch", "isFinite",
    "isNaN", "Number", "Object", "parseFloat", "parseInt", "require", "setInterval", "setTimeout",
    "String", "structuredClone", "Symbol",
];
const TS_BUILTIN_RECEIVERS: &[&str] = &[
    "Array", "console", "Date", "document", "JSON", "Math", "Number", "Object", "process",
    "Promise", "window",
];

/// The three ECMAScript flavours share one map; only the grammar differs.
const fn ecmascript_spec(name: &'static str) -> LanguageSpec {
    LanguageSpec {
        name,
        function_kinds: TS_FUNCTION_KINDS,
        method_kinds: TS_METHOD_KINDS,
        class_kinds: TS_CLASS_KINDS,
        namespace_kinds: &[],
        import_kinds: TS_IMPORT_KINDS,
        call_kinds: TS_CALL_KINDS,
        comment_kinds: TS_COMMENT_KINDS,
        doc_prefixes: TS_DOC_PREFIXES,
        builtins: TS_BUILTINS,
        builtin_receivers: TS_BUILTIN_RECEIVERS,
    }
}

pub static TYPESCRIPT: LanguageSpec = ecmascript_spec("typescript");
pub static TSX: LanguageSpec = ecmascript_spec("tsx");
pub static JAVASCRIPT: LanguageSpec = ecmascript_spec("javascript");

/// Every language the generic extractor covers.
pub static ALL_SPECS: &[&LanguageSpec] = &[&RUST, &GO, &TYPESCRIPT, &TSX, &JAVASCRIPT];
