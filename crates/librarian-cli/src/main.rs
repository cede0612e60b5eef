//! codelibrarian CLI — a local, self-maintaining code index.
//!
//! This binary provides the `codelibrarian` command with subcommands for
//! initialization, indexing, search, graph queries, diagrams, and the MCP
//! stdio server. See `codelibrarian --help` for usage.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli_args;
mod commands;

use cli_args::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Index { full, reembed } => commands::index::run(cli.json, full, reembed),
        Commands::Search {
            query,
            limit,
            semantic,
            text,
            rewrite,
        } => commands::search::run(cli.json, &query.join(" "), limit, semantic, text, rewrite),
        Commands::Lookup { name } => commands::lookup::run(cli.json, &name),
        Commands::Symbols {
            kind,
            path,
            name,
            limit,
        } => commands::symbols::run(cli.json, kind.as_deref(), path.as_deref(), name.as_deref(), limit),
        Commands::Callers { qname, depth } => {
            commands::graph::run(cli.json, commands::graph::Direction::Callers, &qname, depth)
        }
        Commands::Callees { qname, depth } => {
            commands::graph::run(cli.json, commands::graph::Direction::Callees, &qname, depth)
        }
        Commands::Hierarchy { name, depth } => commands::hierarchy::run(cli.json, &name, depth),
        Commands::Imports { path } => commands::imports::run(cli.json, &path),
        Commands::Diagram { kind, limit } => commands::diagram::run(&kind, limit),
        Commands::Status => commands::status::run(cli.json),
        Commands::Serve => commands::serve::run(),
    };
    std::process::exit(exit_code);
}
