use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "codelibrarian",
    version,
    about = "Local code index for developers and LLM agents"
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as structured JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Create .codelibrarian/ with a default config.toml
    Init,

    /// Index the tree (incremental by default)
    Index {
        /// Re-parse every file and prune files deleted from disk
        #[arg(long)]
        full: bool,
        /// Wipe and re-request all embeddings after the pass
        #[arg(long)]
        reembed: bool,
    },

    /// Search symbols by text, meaning, or graph relationship
    Search {
        /// The query; multiple words are joined
        #[arg(required = true)]
        query: Vec<String>,
        /// Maximum number of results
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Vector search only
        #[arg(long)]
        semantic: bool,
        /// Full-text search only
        #[arg(long)]
        text: bool,
        /// Force the LLM query rewriter
        #[arg(long)]
        rewrite: bool,
    },

    /// Look up symbols by exact name or qualified name
    Lookup { name: String },

    /// List indexed symbols with optional filters
    Symbols {
        /// function, method, class, or module
        #[arg(long)]
        kind: Option<String>,
        /// Substring of the file path
        #[arg(long)]
        path: Option<String>,
        /// Substring of the symbol name
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Who calls this symbol (transitively up to --depth)
    Callers {
        qname: String,
        #[arg(long, default_value = "1")]
        depth: u32,
    },

    /// What this symbol calls (transitively up to --depth)
    Callees {
        qname: String,
        #[arg(long, default_value = "1")]
        depth: u32,
    },

    /// Parent and child classes of a class
    Hierarchy {
        name: String,
        #[arg(long, default_value = "3")]
        depth: u32,
    },

    /// Imports recorded for a file
    Imports { path: String },

    /// Mermaid diagram of the call or import graph
    Diagram {
        /// "calls" or "imports"
        #[arg(value_parser = ["calls", "imports"])]
        kind: String,
        #[arg(long, default_value = "200")]
        limit: usize,
    },

    /// Index statistics and last-pass summary
    Status,

    /// Run the MCP stdio server
    Serve,
}
