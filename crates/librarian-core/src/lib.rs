//! Core types, storage, and configuration for codelibrarian.
//!
//! This crate provides the foundations shared by every other crate:
//! - [`types`] — Symbols, files, graph edges, parse output, and error types
//! - [`sqlite`] — The SQLite-backed index store (schema, CRUD, FTS, vectors)
//! - [`config`] — Configuration loading from `.codelibrarian/config.toml`
//! - [`hash`] — SHA-256 content hashing for incremental cache validity
//! - [`embed`] — The [`Embedder`](embed::Embedder) trait for vector providers

pub mod config;
pub mod embed;
pub mod hash;
pub mod sqlite;
pub mod sqlite_helpers;
pub mod sqlite_queries;
pub mod types;
