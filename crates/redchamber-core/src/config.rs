//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_RETRIEVAL__TOP_K`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(RagSettings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed settings, validated.
    pub fn settings(&self) -> Result<RagSettings> {
        let settings: RagSettings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub data: DataSettings,
    pub chunking: ChunkingConfig,
    pub index: IndexSettings,
    pub retrieval: RetrievalSettings,
    pub tokenizer: TokenizerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub base_dir: Option<String>,
    pub corpus_dir: String,
    pub cache_dir: String,
    pub extensions: Vec<String>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            base_dir: None,
            corpus_dir: "docs".to_string(),
            cache_dir: "cache".to_string(),
            extensions: vec!["txt".to_string()],
        }
    }
}

impl DataSettings {
    pub fn corpus_path(&self) -> PathBuf {
        self.resolve(&self.corpus_dir)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.resolve(&self.cache_dir)
    }

    fn resolve(&self, p: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) => resolve_with_base(&expand_path(base), p),
            None => expand_path(p),
        }
    }
}

/// Vocabulary and weighting parameters of the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub max_features: usize,
    pub ngram_range: (usize, usize),
    pub min_df: usize,
    pub max_df: f64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { max_features: 5000, ngram_range: (1, 2), min_df: 1, max_df: 0.95 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub min_similarity: f32,
    pub preview_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 10, min_similarity: 0.01, preview_chars: 100 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerSettings {
    pub stopwords_path: Option<String>,
}

impl TokenizerSettings {
    pub fn stopwords_file(&self, data: &DataSettings) -> Option<PathBuf> {
        self.stopwords_path.as_deref().map(|p| data.resolve(p))
    }
}

impl RagSettings {
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be positive".into()));
        }
        let (lo, hi) = self.index.ngram_range;
        if lo == 0 || lo > hi {
            return Err(Error::InvalidConfig(format!("index.ngram_range ({lo}, {hi}) is not a valid range")));
        }
        if self.index.max_features == 0 {
            return Err(Error::InvalidConfig("index.max_features must be positive".into()));
        }
        if !(self.index.max_df > 0.0 && self.index.max_df <= 1.0) {
            return Err(Error::InvalidConfig(format!("index.max_df {} must be in (0, 1]", self.index.max_df)));
        }
        let min_similarity = self.retrieval.min_similarity;
        if !min_similarity.is_finite() || min_similarity < 0.0 {
            return Err(Error::InvalidConfig(format!("retrieval.min_similarity {min_similarity} must be >= 0")));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
