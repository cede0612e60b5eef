use super::{context_and_store, print_json};

pub(crate) fn run(json: bool, path: &str) -> i32 {
    let (_ctx, store) = match context_and_store() {
        Ok(pair) => pair,
        Err(code) => return code,
    };

    match store.get_file(path) {
        Ok(None) => {
            eprintln!("not found: {path}");
            return 1;
        }
        Ok(Some(_)) => {}
        Err(e) => {
            eprintln!("codelibrarian: file lookup failed: {e}");
            return 1;
        }
    }

    let imports = match store.file_imports(path) {
        Ok(imports) => imports,
        Err(e) => {
            eprintln!("codelibrarian: import query failed: {e}");
            return 1;
        }
    };

    if json {
        print_json(&imports);
    } else if imports.is_empty() {
        println!("no imports");
    } else {
        for import in &imports {
            let resolved = if import.resolved_file_id.is_some() {
                "resolved"
            } else {
                "external"
            };
            match &import.import_name {
                Some(name) => {
                    println!("{:>4}  {} ({name})  [{resolved}]", import.line, import.to_module)
                }
                None => println!("{:>4}  {}  [{resolved}]", import.line, import.to_module),
            }
        }
    }
    0
}
