//! The embedding service client: any OpenAI-compatible `/v1/embeddings`
//! endpoint. Blocking HTTP over a pooled agent; every failure is non-fatal
//! to the caller.

use serde::{Deserialize, Serialize};

use librarian_core::config::EmbeddingsConfig;
use librarian_core::embed::{EmbedError, Embedder};
use librarian_core::types::Symbol;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

pub struct EmbeddingClient {
    agent: ureq::Agent,
    api_url: String,
    model: String,
    dimensions: usize,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingsConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(std::time::Duration::from_secs(config.timeout.max(1))))
            .build()
            .new_agent();
        Self {
            agent,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        }
    }

    /// A client, or `None` when embeddings are disabled in config.
    pub fn from_config(config: &EmbeddingsConfig) -> Option<Self> {
        config.enabled.then(|| Self::new(config))
    }
}

impl Embedder for EmbeddingClient {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let body =
            serde_json::to_string(&request).map_err(|e| EmbedError::Parse(e.to_string()))?;

        let mut response = self
            .agent
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .send(body.as_bytes())
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => EmbedError::Status(code),
                other => EmbedError::Http(other.to_string()),
            })?;

        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| EmbedError::Http(e.to_string()))?;
        let parsed: EmbeddingResponse =
            serde_json::from_str(&text).map_err(|e| EmbedError::Parse(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(EmbedError::Parse(format!(
                "expected {} vectors, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }
        let mut vectors = Vec::with_capacity(parsed.data.len());
        for row in parsed.data {
            if row.embedding.len() != self.dimensions {
                return Err(EmbedError::Dimensions {
                    expected: self.dimensions,
                    got: row.embedding.len(),
                });
            }
            vectors.push(row.embedding);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// The text submitted for one symbol: qualified name, signature, and
/// documentation, truncated to the configured character cap.
pub fn embedding_text(symbol: &Symbol, max_chars: usize) -> String {
    let mut text = symbol.qualified_name.clone();
    if !symbol.signature.is_empty() {
        text.push(' ');
        text.push_str(&symbol.signature);
    }
    if let Some(doc) = &symbol.doc {
        text.push(' ');
        text.push_str(doc);
    }
    if text.chars().count() > max_chars {
        text = text.chars().take(max_chars).collect();
    }
    text
}
