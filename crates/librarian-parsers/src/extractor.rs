//! The extraction contract shared by both parser strategies.

use librarian_core::types::ParseResult;

/// A language-specific symbol and edge extractor.
///
/// Extractors never propagate errors: unreadable bytes or syntax failures
/// yield an empty [`ParseResult`] (with a logged diagnostic) so the file's
/// hash is still recorded and not re-attempted until it changes.
///
/// Implementors must be `Send + Sync`; the indexer calls `parse` from rayon
/// worker threads and constructs a fresh tree-sitter parser per invocation.
pub trait SymbolExtractor: Send + Sync {
    /// Canonical language tag (e.g. "python", "rust").
    fn language(&self) -> &'static str;

    /// Parse one file. `module_path` is the dotted module identifier the
    /// file's qualified names are rooted at.
    fn parse(&self, module_path: &str, source: &str) -> ParseResult;
}

/// The full extractor set: the deep Python extractor plus one generic
/// extractor per remaining supported language.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn SymbolExtractor>>,
}

impl ExtractorRegistry {
    /// Build the default registry covering every supported language.
    pub fn with_defaults() -> Self {
        let mut extractors: Vec<Box<dyn SymbolExtractor>> =
            vec![Box::new(crate::python::PythonExtractor::new())];
        for spec in crate::generic::langs::ALL_SPECS {
            extractors.push(Box::new(crate::generic::GenericExtractor::new(*spec)));
        }
        ExtractorRegistry { extractors }
    }

    /// Look up the extractor for a language tag.
    pub fn get(&self, language: &str) -> Option<&dyn SymbolExtractor> {
        self.extractors
            .iter()
            .find(|e| e.language() == language)
            .map(|e| e.as_ref())
    }

    /// Language tags this registry can parse.
    pub fn languages(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.language()).collect()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
