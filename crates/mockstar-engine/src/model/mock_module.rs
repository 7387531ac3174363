use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::definition::{DefinitionKind, ModuleDefinition};
use crate::error::EvaluationError;

/// One named response variant of a mocker.
#[derive(Debug, Clone)]
pub struct MockModule {
    name: String,
    mocker_name: String,
    enabled: bool,
    description: Option<String>,
    path: PathBuf,
    definition: ModuleDefinition,
}

impl MockModule {
    pub fn new(
        name: impl Into<String>,
        mocker_name: impl Into<String>,
        path: impl Into<PathBuf>,
        definition: ModuleDefinition,
    ) -> Self {
        Self {
            name: name.into(),
            mocker_name: mocker_name.into(),
            enabled: true,
            description: None,
            path: path.into(),
            definition,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning mocker
    pub fn mocker_name(&self) -> &str {
        &self.mocker_name
    }

    /// Disabled modules are skipped by default selection but can still be
    /// requested by name.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Backing file of the module
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    pub fn kind(&self) -> DefinitionKind {
        self.definition.kind()
    }

    /// Evaluate the module for one request.
    pub async fn get_result(&self, params: Option<&Value>) -> Result<Value, EvaluationError> {
        self.definition.evaluate(&self.name, params).await
    }
}
