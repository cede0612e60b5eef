//! Configuration loading for codelibrarian.
//!
//! Reads `.codelibrarian/config.toml` and provides typed access to all
//! settings. Missing sections fall back to defaults; a malformed file is a
//! user-visible error rather than a silent fallback, because a typo in the
//! embedding dimension would otherwise corrupt the vector index.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the per-project state directory.
pub const PROJECT_DIR: &str = ".codelibrarian";
/// Config file name inside [`PROJECT_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Top-level codelibrarian configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibrarianConfig {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_rewrite: Option<RewriteConfig>,
}

/// Discovery and language selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

/// Embedding service settings. `dimensions` must match the vector rows
/// already in the database; changing it calls for a `--reembed` pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embed_url")]
    pub api_url: String,
    #[serde(default = "default_embed_model")]
    pub model: String,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Request timeout in seconds.
    #[serde(default = "default_embed_timeout")]
    pub timeout: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Database location, relative to the project root unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

/// Optional LLM query-rewrite collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_rewrite_url")]
    pub api_url: String,
    #[serde(default = "default_rewrite_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_rewrite_timeout")]
    pub timeout: u64,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_exclude() -> Vec<String> {
    [
        ".git",
        ".codelibrarian",
        "node_modules",
        "target",
        "dist",
        "build",
        "__pycache__",
        ".venv",
        "venv",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_languages() -> Vec<String> {
    ["python", "rust", "go", "typescript", "tsx", "javascript"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_embed_url() -> String {
    "http://localhost:11434/v1/embeddings".to_string()
}
fn default_embed_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_dimensions() -> usize {
    768
}
fn default_batch_size() -> usize {
    32
}
fn default_max_chars() -> usize {
    2000
}
fn default_embed_timeout() -> u64 {
    30
}
fn default_db_path() -> PathBuf {
    PathBuf::from(PROJECT_DIR).join("index.db")
}
fn default_rewrite_url() -> String {
    "http://localhost:11434/v1/chat/completions".to_string()
}
fn default_rewrite_model() -> String {
    "qwen2.5-coder".to_string()
}
fn default_rewrite_timeout() -> u64 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            exclude: default_exclude(),
            languages: default_languages(),
        }
    }
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            api_url: default_embed_url(),
            model: default_embed_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            max_chars: default_max_chars(),
            timeout: default_embed_timeout(),
            enabled: true,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Errors loading or writing configuration. These are user-visible.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("no {PROJECT_DIR}/ directory found above {} (run `codelibrarian init`)", .0.display())]
    NotInitialized(PathBuf),
}

impl LibrarianConfig {
    /// Load configuration from `<project_root>/.codelibrarian/config.toml`.
    /// A missing file yields defaults; a malformed file is an error.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(PROJECT_DIR).join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io { path, source: e }),
        };
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path,
            message: e.to_string(),
        })
    }

    /// Write this configuration to `<project_root>/.codelibrarian/config.toml`,
    /// creating the directory if needed.
    pub fn save(&self, project_root: &Path) -> Result<(), ConfigError> {
        let dir = project_root.join(PROJECT_DIR);
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::Io {
            path: dir.clone(),
            source: e,
        })?;
        let path = dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::Io { path, source: e })
    }

    /// Absolute database path for a given project root.
    pub fn db_path(&self, project_root: &Path) -> PathBuf {
        if self.database.path.is_absolute() {
            self.database.path.clone()
        } else {
            project_root.join(&self.database.path)
        }
    }

    /// Absolute index root for a given project root.
    pub fn index_root(&self, project_root: &Path) -> PathBuf {
        if self.index.root.is_absolute() {
            self.index.root.clone()
        } else {
            project_root.join(&self.index.root)
        }
    }
}

/// Walk upward from `start` looking for a `.codelibrarian/` directory.
/// Returns the project root that contains it.
pub fn discover_project_root(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(PROJECT_DIR).is_dir() {
            return Ok(dir);
        }
        if !dir.pop() {
            return Err(ConfigError::NotInitialized(start.to_path_buf()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let cfg = LibrarianConfig::default();
        assert_eq!(cfg.index.root, PathBuf::from("."));
        assert!(cfg.index.exclude.iter().any(|p| p == "node_modules"));
        assert!(cfg.index.languages.iter().any(|l| l == "python"));
        assert_eq!(cfg.embeddings.dimensions, 768);
        assert_eq!(cfg.embeddings.batch_size, 32);
        assert_eq!(cfg.embeddings.timeout, 30);
        assert!(cfg.embeddings.enabled);
        assert_eq!(cfg.database.path, PathBuf::from(".codelibrarian/index.db"));
        assert!(cfg.query_rewrite.is_none());
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LibrarianConfig::load(dir.path()).unwrap();
        assert_eq!(cfg, LibrarianConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();
        fs::write(
            dir.path().join(PROJECT_DIR).join(CONFIG_FILE),
            r#"
[index]
exclude = ["vendor"]

[embeddings]
enabled = false
dimensions = 384
timeout = 120
"#,
        )
        .unwrap();
        let cfg = LibrarianConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.index.exclude, vec!["vendor"]);
        assert!(!cfg.index.languages.is_empty());
        assert!(!cfg.embeddings.enabled);
        assert_eq!(cfg.embeddings.dimensions, 384);
        assert_eq!(cfg.embeddings.batch_size, 32);
        assert_eq!(cfg.embeddings.timeout, 120);
    }

    #[test]
    fn test_load_rewrite_section() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();
        fs::write(
            dir.path().join(PROJECT_DIR).join(CONFIG_FILE),
            r#"
[query_rewrite]
enabled = true
model = "llama3"
"#,
        )
        .unwrap();
        let cfg = LibrarianConfig::load(dir.path()).unwrap();
        let rw = cfg.query_rewrite.expect("rewrite section present");
        assert!(rw.enabled);
        assert_eq!(rw.model, "llama3");
        assert_eq!(rw.timeout, 5);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();
        fs::write(
            dir.path().join(PROJECT_DIR).join(CONFIG_FILE),
            "[embeddings]\ndimensions = \"not a number\"\n",
        )
        .unwrap();
        assert!(matches!(
            LibrarianConfig::load(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = LibrarianConfig::default();
        cfg.index.languages = vec!["python".into()];
        cfg.embeddings.enabled = false;
        cfg.query_rewrite = Some(RewriteConfig {
            enabled: true,
            api_url: "http://localhost:8080/v1/chat/completions".into(),
            model: "test-model".into(),
            timeout: 10,
        });
        cfg.save(dir.path()).unwrap();
        let loaded = LibrarianConfig::load(dir.path()).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();
        let nested = dir.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();
        let root = discover_project_root(&nested).unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_discover_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_project_root(dir.path()),
            Err(ConfigError::NotInitialized(_))
        ));
    }

    #[test]
    fn test_db_path_resolution() {
        let cfg = LibrarianConfig::default();
        let abs = cfg.db_path(Path::new("/proj"));
        assert_eq!(abs, PathBuf::from("/proj/.codelibrarian/index.db"));
    }
}
