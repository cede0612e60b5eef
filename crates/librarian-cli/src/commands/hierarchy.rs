use super::{context_and_store, print_json, symbol_line};

pub(crate) fn run(json: bool, name: &str, depth: u32) -> i32 {
    let (_ctx, store) = match context_and_store() {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    match store.find_symbols(name) {
        Ok(matches) if matches.is_empty() => {
            eprintln!("not found: {name}");
            return 1;
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("codelibrarian: lookup failed: {e}");
            return 1;
        }
    }

    let hierarchy = match store.get_class_hierarchy(name, depth) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("codelibrarian: hierarchy query failed: {e}");
            return 1;
        }
    };

    if json {
        print_json(&hierarchy);
        return 0;
    }
    println!("parents:");
    if hierarchy.parents.is_empty() {
        println!("  (none)");
    }
    for symbol in &hierarchy.parents {
        println!("  {}", symbol_line(symbol));
    }
    println!("children:");
    if hierarchy.children.is_empty() {
        println!("  (none)");
    }
    for symbol in &hierarchy.children {
        println!("  {}", symbol_line(symbol));
    }
    0
}
