use super::{context_and_store, print_json, symbol_line};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Direction {
    Callers,
    Callees,
}

pub(crate) fn run(json: bool, direction: Direction, qname: &str, depth: u32) -> i32 {
    let (_ctx, store) = match context_and_store() {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    // The target itself must exist; an unknown name is a user-visible miss.
    match store.find_symbols(qname) {
        Ok(matches) if matches.is_empty() => {
            eprintln!("not found: {qname}");
            return 1;
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("codelibrarian: lookup failed: {e}");
            return 1;
        }
    }

    let result = match direction {
        Direction::Callers => store.get_callers(qname, depth),
        Direction::Callees => store.get_callees(qname, depth),
    };
    let symbols = match result {
        Ok(symbols) => symbols,
        Err(e) => {
            eprintln!("codelibrarian: graph query failed: {e}");
            return 1;
        }
    };

    if json {
        print_json(&symbols);
    } else if symbols.is_empty() {
        println!("none");
    } else {
        for symbol in &symbols {
            println!("{}", symbol_line(symbol));
        }
    }
    0
}
