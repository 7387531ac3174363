//! Configuration types for the resolution engine.

mod convention;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use convention::{Convention, SourceFormat};

/// Options accepted by [`Parser`](crate::parser::Parser).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParserOptions {
    /// Root directory holding one subdirectory per mocker
    pub base_path: PathBuf,

    /// Directory for build artifacts; when set the parsed tree is persisted
    /// as `db.json` inside it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_path: Option<PathBuf>,

    /// Rescan automatically when files under `base_path` change
    #[serde(default)]
    pub watch: bool,

    /// Quiet period before a burst of file events triggers a rescan
    #[serde(default = "default_watch_debounce_ms")]
    pub watch_debounce_ms: u64,

    /// Rehydrate from an existing snapshot instead of scanning on startup,
    /// provided the snapshot was written for the same base and build paths
    #[serde(default)]
    pub reuse_snapshot: bool,

    /// File naming convention for mocker directories
    #[serde(default)]
    pub convention: Convention,
}

fn default_watch_debounce_ms() -> u64 {
    200
}

impl ParserOptions {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            build_path: None,
            watch: false,
            watch_debounce_ms: default_watch_debounce_ms(),
            reuse_snapshot: false,
            convention: Convention::default(),
        }
    }

    pub fn with_build_path(mut self, build_path: impl Into<PathBuf>) -> Self {
        self.build_path = Some(build_path.into());
        self
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_reuse_snapshot(mut self, reuse: bool) -> Self {
        self.reuse_snapshot = reuse;
        self
    }

    pub fn with_convention(mut self, convention: Convention) -> Self {
        self.convention = convention;
        self
    }

    /// Load options from a YAML or JSON file.
    ///
    /// Relative `basePath`/`buildPath` values are resolved against the
    /// directory containing the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let mut options: ParserOptions = if is_json {
            serde_json::from_str(&contents)
                .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?
        };

        if let Some(root) = path.parent() {
            options.base_path = resolve_against(root, &options.base_path);
            options.build_path = options
                .build_path
                .as_ref()
                .map(|build| resolve_against(root, build));
        }

        options.validate()?;
        Ok(options)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("basePath must not be empty".to_string()));
        }

        if self.watch && self.watch_debounce_ms == 0 {
            return Err(ConfigError::Invalid(
                "watchDebounceMs must be greater than 0 when watch is enabled".to_string(),
            ));
        }

        if self.reuse_snapshot && self.build_path.is_none() {
            return Err(ConfigError::Invalid(
                "reuseSnapshot requires buildPath to be set".to_string(),
            ));
        }

        self.convention.validate()
    }
}

fn resolve_against(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
