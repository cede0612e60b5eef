use librarian_core::types::SymbolKind;

use super::{context_and_store, print_json, symbol_line};

pub(crate) fn run(
    json: bool,
    kind: Option<&str>,
    path: Option<&str>,
    name: Option<&str>,
    limit: usize,
) -> i32 {
    let kind = match kind {
        Some(raw) => match SymbolKind::parse(raw) {
            Some(k) => Some(k),
            None => {
                eprintln!("codelibrarian: unknown kind '{raw}' (function, method, class, module)");
                return 1;
            }
        },
        None => None,
    };

    let (_ctx, store) = match context_and_store() {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    let symbols = match store.list_symbols(kind, path, name, limit) {
        Ok(symbols) => symbols,
        Err(e) => {
            eprintln!("codelibrarian: listing failed: {e}");
            return 1;
        }
    };

    if json {
        print_json(&symbols);
    } else if symbols.is_empty() {
        println!("no symbols");
    } else {
        for symbol in &symbols {
            println!("{}", symbol_line(symbol));
        }
    }
    0
}
