use librarian_core::embed::Embedder;
use librarian_index::embedder::EmbeddingClient;
use librarian_search::rewrite::{HttpRewriter, Rewriter};
use librarian_search::{SearchEngine, SearchOptions};

use super::{context_and_store, print_json, symbol_line};

pub(crate) fn run(
    json: bool,
    query: &str,
    limit: usize,
    semantic: bool,
    text: bool,
    rewrite: bool,
) -> i32 {
    let (ctx, store) = match context_and_store() {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    let embedder = EmbeddingClient::from_config(&ctx.config.embeddings);
    let rewriter = HttpRewriter::from_config(ctx.config.query_rewrite.as_ref());
    let engine = SearchEngine::new(&store)
        .with_embedder(embedder.as_ref().map(|e| e as &dyn Embedder))
        .with_rewriter(rewriter.as_ref().map(|r| r as &dyn Rewriter));

    let opts = SearchOptions {
        limit,
        semantic_only: semantic,
        text_only: text,
        rewrite,
    };
    let results = match engine.search(query, &opts) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("codelibrarian: search failed: {e}");
            return 1;
        }
    };

    if json {
        print_json(&results);
    } else if results.is_empty() {
        println!("no results");
    } else {
        for result in &results {
            println!(
                "{:.2} [{:>8}] {}",
                result.score,
                format!("{:?}", result.match_type).to_lowercase(),
                symbol_line(&result.symbol)
            );
        }
    }
    0
}
