//! The optional query-rewrite collaborator: an OpenAI-compatible chat
//! endpoint that turns a natural-language question into searchable terms
//! plus a focus hint. Every failure silently falls back to the original
//! query.

use serde::{Deserialize, Serialize};
use tracing::debug;

use librarian_core::config::RewriteConfig;

/// Advisory bias from the rewriter toward implementation or test files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    Implementation,
    Tests,
    #[default]
    All,
}

/// A successful rewrite: OR-mode search terms and a focus hint.
#[derive(Debug, Clone, Deserialize)]
pub struct Rewrite {
    pub terms: Vec<String>,
    #[serde(default)]
    pub focus: Focus,
}

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("rewrite request failed: {0}")]
    Http(String),

    #[error("rewrite service returned status {0}")]
    Status(u16),

    #[error("rewrite response malformed: {0}")]
    Parse(String),
}

/// The rewrite seam; the engine only sees this trait.
pub trait Rewriter: Send + Sync {
    fn rewrite(&self, query: &str) -> Result<Rewrite, RewriteError>;
}

const SYSTEM_PROMPT: &str = "You turn natural-language questions about a codebase into search terms. \
Respond with JSON only: {\"terms\": [\"...\"], \"focus\": \"implementation\"|\"tests\"|\"all\"}. \
Prefer identifiers and domain words likely to appear in code or docstrings.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

pub struct HttpRewriter {
    agent: ureq::Agent,
    api_url: String,
    model: String,
}

impl HttpRewriter {
    pub fn new(config: &RewriteConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(std::time::Duration::from_secs(config.timeout.max(1))))
            .build()
            .new_agent();
        Self {
            agent,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
        }
    }

    /// A rewriter, or `None` when the section is absent or disabled.
    pub fn from_config(config: Option<&RewriteConfig>) -> Option<Self> {
        config.filter(|c| c.enabled).map(Self::new)
    }
}

impl Rewriter for HttpRewriter {
    fn rewrite(&self, query: &str) -> Result<Rewrite, RewriteError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: query,
                },
            ],
            temperature: 0.0,
        };
        let body =
            serde_json::to_string(&request).map_err(|e| RewriteError::Parse(e.to_string()))?;

        let mut response = self
            .agent
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .send(body.as_bytes())
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => RewriteError::Status(code),
                other => RewriteError::Http(other.to_string()),
            })?;
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| RewriteError::Http(e.to_string()))?;

        let chat: ChatResponse =
            serde_json::from_str(&text).map_err(|e| RewriteError::Parse(e.to_string()))?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| RewriteError::Parse("no choices in response".into()))?;

        parse_rewrite_payload(content)
    }
}

/// Extract the JSON object from a model reply, tolerating surrounding prose
/// and code fences.
pub fn parse_rewrite_payload(content: &str) -> Result<Rewrite, RewriteError> {
    let start = content
        .find('{')
        .ok_or_else(|| RewriteError::Parse("no JSON object in reply".into()))?;
    let end = content
        .rfind('}')
        .ok_or_else(|| RewriteError::Parse("no JSON object in reply".into()))?;
    if end < start {
        return Err(RewriteError::Parse("malformed JSON object in reply".into()));
    }
    let rewrite: Rewrite = serde_json::from_str(&content[start..=end])
        .map_err(|e| RewriteError::Parse(e.to_string()))?;
    debug!(terms = rewrite.terms.len(), "query rewritten");
    Ok(rewrite)
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "can", "do", "does", "for", "how", "i", "in", "is", "it", "me",
    "of", "on", "or", "that", "the", "this", "to", "what", "where", "which", "who", "why",
    "with", "you",
];

const QUESTION_WORDS: &[&str] = &["find", "how", "what", "where", "which", "who", "why", "show"];

/// Conservative trigger for unforced rewrites: natural-language shape,
/// enough substance, and nothing that already looks like an identifier.
pub fn should_rewrite(query: &str) -> bool {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.is_empty() {
        return false;
    }

    let has_identifier = tokens.iter().any(|t| looks_like_identifier(t));
    if has_identifier {
        return false;
    }

    let code_tokens = tokens
        .iter()
        .filter(|t| t.chars().any(|c| !c.is_alphanumeric()))
        .count();
    if code_tokens * 3 >= tokens.len().max(1) * 2 {
        return false;
    }

    let lower: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
    let has_question_word = lower.iter().any(|t| QUESTION_WORDS.contains(&t.as_str()));
    let non_stop = lower
        .iter()
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .count();

    has_question_word && non_stop >= 3
}

fn looks_like_identifier(token: &str) -> bool {
    if token.contains('_') || token.contains("::") || token.contains('(') || token.contains('.') {
        return true;
    }
    // camelCase or PascalCase beyond a leading capital.
    let mut prev_lower = false;
    for c in token.chars() {
        if c.is_uppercase() && prev_lower {
            return true;
        }
        prev_lower = c.is_lowercase();
    }
    false
}
