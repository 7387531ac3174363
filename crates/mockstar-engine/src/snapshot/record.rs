//! Serializable projection of the mocker tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::definition::{DefinitionKind, HandlerRegistry, ModuleDefinition};
use crate::model::{MockModule, Mocker};
use crate::scripting::RhaiScript;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockerRecord {
    pub name: String,
    pub dir_name: String,
    pub path: PathBuf,
    pub routes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
    pub mock_modules: Vec<ModuleRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    pub name: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub path: PathBuf,
    pub kind: DefinitionKind,
    /// Static data, for `value` modules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Script text, for `script` and `callback` modules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Registered handler name, for `native` modules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
}

impl From<&MockModule> for ModuleRecord {
    fn from(module: &MockModule) -> Self {
        let (value, source, handler) = match module.definition() {
            ModuleDefinition::Value(value) => (Some(value.clone()), None, None),
            ModuleDefinition::Script(script) | ModuleDefinition::Callback(script) => {
                (None, Some(script.source().to_string()), None)
            }
            ModuleDefinition::Native { handler, .. } => (None, None, Some(handler.clone())),
        };

        Self {
            name: module.name().to_string(),
            enabled: module.is_enabled(),
            description: module.description().map(str::to_string),
            path: module.path().to_path_buf(),
            kind: module.kind(),
            value,
            source,
            handler,
        }
    }
}

impl From<&Mocker> for MockerRecord {
    fn from(mocker: &Mocker) -> Self {
        Self {
            name: mocker.name.clone(),
            dir_name: mocker.dir_name.clone(),
            path: mocker.path.clone(),
            routes: mocker.routes.clone(),
            method: mocker.method.clone(),
            description: mocker.description.clone(),
            tags: mocker.tags.clone(),
            disabled: mocker.disabled,
            active_module: mocker.active_module.clone(),
            readme: mocker.readme.clone(),
            static_dir: mocker.static_dir.clone(),
            mock_modules: mocker
                .mock_modules
                .iter()
                .map(|m| ModuleRecord::from(m.as_ref()))
                .collect(),
        }
    }
}

impl ModuleRecord {
    /// Rebuild the module; `None` (with a warning) when its script no longer
    /// compiles or its handler is not registered.
    pub fn into_module(self, mocker_name: &str, handlers: &HandlerRegistry) -> Option<MockModule> {
        let definition = match self.kind {
            DefinitionKind::Value => ModuleDefinition::Value(self.value.unwrap_or(Value::Null)),
            DefinitionKind::Script | DefinitionKind::Callback => {
                let source = self.source.unwrap_or_default();
                match RhaiScript::compile(&source) {
                    Ok(script) => ModuleDefinition::from_script(script),
                    Err(e) => {
                        warn!(
                            "Snapshot module '{}/{}' failed to compile: {}",
                            mocker_name, self.name, e
                        );
                        return None;
                    }
                }
            }
            DefinitionKind::Native => {
                let handler = self.handler.unwrap_or_default();
                let Some(inner) = handlers.get(&handler) else {
                    warn!(
                        "Snapshot module '{}/{}' references unregistered handler '{}'",
                        mocker_name, self.name, handler
                    );
                    return None;
                };
                ModuleDefinition::native(handler, inner)
            }
        };

        Some(
            MockModule::new(self.name, mocker_name, self.path, definition)
                .with_enabled(self.enabled)
                .with_description(self.description),
        )
    }
}

impl MockerRecord {
    pub fn into_mocker(self, handlers: &HandlerRegistry) -> Mocker {
        let name = self.name;
        let mock_modules = self
            .mock_modules
            .into_iter()
            .filter_map(|record| record.into_module(&name, handlers))
            .map(Arc::new)
            .collect();

        Mocker {
            name,
            dir_name: self.dir_name,
            path: self.path,
            routes: self.routes,
            method: self.method,
            description: self.description,
            tags: self.tags,
            disabled: self.disabled,
            active_module: self.active_module,
            readme: self.readme,
            static_dir: self.static_dir,
            mock_modules,
        }
    }
}
