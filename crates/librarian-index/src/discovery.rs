//! File discovery: walk the index root, apply exclude globs, detect
//! languages, and derive module paths.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::{debug, warn};

use librarian_parsers::treesitter::{detect_language, module_path_from_rel};

/// One file selected for indexing.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub rel_path: PathBuf,
    pub language: &'static str,
    pub module_path: String,
}

pub struct FileWalker {
    root: PathBuf,
    exclude: GlobSet,
    languages: HashSet<String>,
}

impl FileWalker {
    /// Creates a walker rooted at `root`, skipping paths matching any of
    /// `exclude` (as a bare component or anywhere in the relative path) and
    /// keeping only files of the enabled `languages`.
    pub fn new(root: &Path, exclude: &[String], languages: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude {
            for candidate in [
                pattern.clone(),
                format!("**/{pattern}"),
                format!("**/{pattern}/**"),
            ] {
                match Glob::new(&candidate) {
                    Ok(glob) => {
                        builder.add(glob);
                    }
                    Err(e) => warn!(pattern = %candidate, error = %e, "invalid exclude glob"),
                }
            }
        }
        let exclude = builder.build().unwrap_or_else(|e| {
            warn!(error = %e, "exclude globs disabled");
            GlobSet::empty()
        });

        Self {
            root: root.to_path_buf(),
            exclude,
            languages: languages.iter().cloned().collect(),
        }
    }

    /// Walks the root and returns all indexable files, respecting
    /// `.gitignore`. Symlinks are followed; cycles are broken by tracking
    /// visited canonical paths.
    pub fn walk(&self) -> Vec<DiscoveredFile> {
        let mut entries = Vec::new();
        let mut visited: HashSet<PathBuf> = HashSet::new();

        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .follow_links(true)
            .build();

        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(e) => {
                    debug!(error = %e, "walk entry error");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.into_path();
            let rel = path
                .strip_prefix(&self.root)
                .unwrap_or(&path)
                .to_path_buf();
            if self.is_excluded(&rel) {
                continue;
            }
            let Some(language) = detect_language(&path) else {
                continue;
            };
            if !self.languages.contains(language) {
                continue;
            }

            // The same file can be reachable through a symlinked directory;
            // only its first appearance counts.
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !visited.insert(canonical) {
                continue;
            }

            let module_path = module_path_from_rel(&rel, language);
            entries.push(DiscoveredFile {
                path,
                rel_path: rel,
                language,
                module_path,
            });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    fn is_excluded(&self, rel: &Path) -> bool {
        if self.exclude.is_match(rel) {
            return true;
        }
        rel.components().any(|c| match c {
            std::path::Component::Normal(os) => self.exclude.is_match(Path::new(os)),
            _ => false,
        })
    }
}
