use librarian_core::embed::Embedder;
use librarian_index::embedder::EmbeddingClient;
use librarian_index::indexer::{IndexMode, Indexer};

use super::{context_and_store, print_json};

pub(crate) fn run(json: bool, full: bool, reembed: bool) -> i32 {
    let (ctx, mut store) = match context_and_store() {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    let mode = if full {
        IndexMode::Full
    } else {
        IndexMode::Incremental
    };
    let embedder = EmbeddingClient::from_config(&ctx.config.embeddings);

    let stats = match Indexer::new(&mut store, &ctx.config, &ctx.project_root).run(
        mode,
        reembed,
        embedder.as_ref().map(|e| e as &dyn Embedder),
    ) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("codelibrarian: index pass failed: {e}");
            return 1;
        }
    };

    if json {
        print_json(&stats);
    } else {
        println!(
            "{} indexed, {} skipped, {} deleted, {} embedded, {} errors",
            stats.indexed, stats.skipped, stats.deleted, stats.embedded, stats.errors
        );
    }
    0
}
