use std::path::Path;

use librarian_core::config::{LibrarianConfig, CONFIG_FILE, PROJECT_DIR};

pub(crate) fn run() -> i32 {
    let cwd = match std::env::current_dir() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("codelibrarian: cannot determine working directory: {e}");
            return 1;
        }
    };

    let config_path = cwd.join(PROJECT_DIR).join(CONFIG_FILE);
    if config_path.exists() {
        println!("already initialized: {}", display_rel(&config_path, &cwd));
        return 0;
    }

    if let Err(e) = LibrarianConfig::default().save(&cwd) {
        eprintln!("codelibrarian: init failed: {e}");
        return 1;
    }
    println!("created {}", display_rel(&config_path, &cwd));
    println!("next: run `codelibrarian index`");
    0
}

fn display_rel(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
