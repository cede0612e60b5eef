//! The embedding provider seam.
//!
//! The store and search engine only see this trait; the concrete
//! HTTP-backed client lives in `librarian-index`.

/// Errors surfaced by an embedding provider. All of them are non-fatal to
/// an index pass: the caller logs once and continues without vectors.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Http(String),

    #[error("embedding service returned status {0}")]
    Status(u16),

    #[error("embedding response malformed: {0}")]
    Parse(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    Dimensions { expected: usize, got: usize },
}

/// A provider of dense vectors for symbol texts.
///
/// Implementors must be `Send + Sync`; the indexer calls `embed` from its
/// sequential embedding phase and the search engine from query handling.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. The returned vectors are in input order and
    /// all have exactly `dimensions()` components.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// The fixed vector width this provider produces.
    fn dimensions(&self) -> usize;
}
