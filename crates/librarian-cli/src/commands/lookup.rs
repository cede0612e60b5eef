use super::{context_and_store, print_json, symbol_line};

pub(crate) fn run(json: bool, name: &str) -> i32 {
    let (_ctx, store) = match context_and_store() {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    let symbols = match store.find_symbols(name) {
        Ok(symbols) => symbols,
        Err(e) => {
            eprintln!("codelibrarian: lookup failed: {e}");
            return 1;
        }
    };

    if json {
        print_json(&symbols);
    } else {
        for symbol in &symbols {
            println!("{}", symbol_line(symbol));
            if !symbol.signature.is_empty() {
                println!("           {}", symbol.signature);
            }
        }
    }
    if symbols.is_empty() {
        if !json {
            eprintln!("not found: {name}");
        }
        return 1;
    }
    0
}
