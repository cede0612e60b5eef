//! The search engine: graph-intent routing, hybrid lexical/semantic
//! ranking, and the optional LLM query-rewrite hook.

pub mod engine;
pub mod intent;
pub mod rewrite;

pub use engine::{MatchType, SearchEngine, SearchOptions, SearchResult};
