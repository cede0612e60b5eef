//! Tree-sitter parsing for codelibrarian.
//!
//! Two extractor strategies implement the same [`extractor::SymbolExtractor`]
//! contract:
//! - [`python`] — the deep extractor, walking the full Python syntax tree for
//!   complete parameter, decorator, and call metadata
//! - [`generic`] — a grammar-driven extractor covering Rust, Go, TypeScript,
//!   TSX, and JavaScript through small per-language node-type maps

pub mod extractor;
pub mod generic;
pub mod python;
pub mod treesitter;
