use std::path::PathBuf;
use std::sync::Arc;

use super::MockModule;

/// A named, route-addressable group of mock modules backed by one directory.
#[derive(Debug, Clone)]
pub struct Mocker {
    pub name: String,
    /// Directory name as found on disk, before any rename
    pub dir_name: String,
    pub path: PathBuf,
    pub routes: Vec<String>,
    /// Restricts route matches to one HTTP method when set
    pub method: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Requests resolved to a disabled mocker are reported as bypassed
    pub disabled: bool,
    /// Module preferred over scan order for default selection
    pub active_module: Option<String>,
    /// Rendered documentation
    pub readme: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub mock_modules: Vec<Arc<MockModule>>,
}

impl Mocker {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            dir_name: name.clone(),
            routes: vec![name.clone()],
            name,
            path: path.into(),
            method: None,
            description: None,
            tags: Vec::new(),
            disabled: false,
            active_module: None,
            readme: None,
            static_dir: None,
            mock_modules: Vec::new(),
        }
    }

    pub fn get_mock_module(&self, name: &str) -> Option<Arc<MockModule>> {
        self.mock_modules.iter().find(|m| m.name() == name).cloned()
    }

    pub fn enabled_modules(&self) -> impl Iterator<Item = &Arc<MockModule>> {
        self.mock_modules.iter().filter(|m| m.is_enabled())
    }

    /// Module served when the request does not name one: the descriptor's
    /// active module if it is enabled, else the first enabled module.
    pub fn default_module(&self) -> Option<Arc<MockModule>> {
        let active = self
            .active_module
            .as_deref()
            .and_then(|name| self.get_mock_module(name))
            .filter(|m| m.is_enabled());

        active.or_else(|| self.enabled_modules().next().cloned())
    }
}
