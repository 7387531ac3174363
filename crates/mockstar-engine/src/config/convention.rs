//! File naming convention for mocker directories.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How a module source file is interpreted, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Yaml,
    Rhai,
}

/// Names and extensions the scanner looks for inside a mocker directory.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Convention {
    /// Optional per-mocker descriptor (name/route overrides)
    #[serde(default = "default_descriptor")]
    pub mocker_descriptor: String,

    /// Subdirectory of a mocker holding its modules
    #[serde(default = "default_modules_dir")]
    pub modules_dir: String,

    /// Optional descriptor inside a folder module
    #[serde(default = "default_descriptor")]
    pub module_descriptor: String,

    /// File stem of the entry file inside a folder module
    #[serde(default = "default_module_index")]
    pub module_index: String,

    /// Documentation sources, first existing file wins
    #[serde(default = "default_readme_files")]
    pub readme_files: Vec<String>,

    /// Pre-rendered documentation, used as is when present
    #[serde(default = "default_rendered_readme")]
    pub rendered_readme: String,

    /// Static asset directory referenced from documentation
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    #[serde(default = "default_json_extensions")]
    pub json_extensions: Vec<String>,

    #[serde(default = "default_yaml_extensions")]
    pub yaml_extensions: Vec<String>,

    #[serde(default = "default_script_extensions")]
    pub script_extensions: Vec<String>,
}

fn default_descriptor() -> String {
    "config.json".to_string()
}

fn default_modules_dir() -> String {
    "mock_modules".to_string()
}

fn default_module_index() -> String {
    "index".to_string()
}

fn default_readme_files() -> Vec<String> {
    vec!["README.md".to_string(), "readme.md".to_string()]
}

fn default_rendered_readme() -> String {
    "README.html".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_json_extensions() -> Vec<String> {
    vec!["json".to_string()]
}

fn default_yaml_extensions() -> Vec<String> {
    vec!["yaml".to_string(), "yml".to_string()]
}

fn default_script_extensions() -> Vec<String> {
    vec!["rhai".to_string()]
}

impl Default for Convention {
    fn default() -> Self {
        Self {
            mocker_descriptor: default_descriptor(),
            modules_dir: default_modules_dir(),
            module_descriptor: default_descriptor(),
            module_index: default_module_index(),
            readme_files: default_readme_files(),
            rendered_readme: default_rendered_readme(),
            static_dir: default_static_dir(),
            json_extensions: default_json_extensions(),
            yaml_extensions: default_yaml_extensions(),
            script_extensions: default_script_extensions(),
        }
    }
}

impl Convention {
    /// Classify a file extension, `None` when the file is not a module source.
    pub fn format_for(&self, extension: &str) -> Option<SourceFormat> {
        let matches = |list: &[String]| list.iter().any(|e| e.eq_ignore_ascii_case(extension));

        if matches(&self.json_extensions) {
            Some(SourceFormat::Json)
        } else if matches(&self.yaml_extensions) {
            Some(SourceFormat::Yaml)
        } else if matches(&self.script_extensions) {
            Some(SourceFormat::Rhai)
        } else {
            None
        }
    }

    /// Candidate entry file names for a folder module, in lookup order.
    pub fn index_candidates(&self) -> Vec<String> {
        self.json_extensions
            .iter()
            .chain(&self.yaml_extensions)
            .chain(&self.script_extensions)
            .map(|ext| format!("{}.{ext}", self.module_index))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.modules_dir.is_empty() {
            return Err(ConfigError::Invalid(
                "convention.modulesDir must not be empty".to_string(),
            ));
        }

        if self.module_index.is_empty() {
            return Err(ConfigError::Invalid(
                "convention.moduleIndex must not be empty".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for ext in self
            .json_extensions
            .iter()
            .chain(&self.yaml_extensions)
            .chain(&self.script_extensions)
        {
            if !seen.insert(ext.to_ascii_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "extension '{ext}' is assigned to more than one module format"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_for_defaults() {
        let convention = Convention::default();
        assert_eq!(convention.format_for("json"), Some(SourceFormat::Json));
        assert_eq!(convention.format_for("YML"), Some(SourceFormat::Yaml));
        assert_eq!(convention.format_for("rhai"), Some(SourceFormat::Rhai));
        assert_eq!(convention.format_for("md"), None);
    }

    #[test]
    fn test_index_candidates_order() {
        let convention = Convention::default();
        assert_eq!(
            convention.index_candidates(),
            vec!["index.json", "index.yaml", "index.yml", "index.rhai"]
        );
    }

    #[test]
    fn test_duplicate_extension_rejected() {
        let convention = Convention {
            yaml_extensions: vec!["json".to_string()],
            ..Convention::default()
        };
        assert!(convention.validate().is_err());
    }
}
