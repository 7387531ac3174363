//! Tree scanner: turns a mocker base directory into [`Mocker`] values.
//!
//! Layout (names configurable through [`Convention`]):
//!
//! ```text
//! <base>/
//!   <mocker>/
//!     config.json          optional MockerDescriptor
//!     README.md            optional documentation
//!     static/              optional assets
//!     mock_modules/
//!       <module>.json      static value
//!       <module>.yaml      static value
//!       <module>.rhai      script
//!       <module>/          folder module: config.json + index.<ext>
//! ```
//!
//! Entries are visited in file-name order, which fixes default-module
//! precedence. Broken module files are skipped with a warning.

mod descriptor;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{Convention, SourceFormat};
use crate::definition::{HandlerRegistry, ModuleDefinition};
use crate::docs::{rewrite_static_links, DocRenderer};
use crate::error::ScanError;
use crate::model::{MockModule, Mocker};
use crate::scripting::RhaiScript;

pub use descriptor::{MockerDescriptor, ModuleDescriptor, RouteSpec};
use descriptor::read_descriptor;

static NAME_UNSAFE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("name pattern is valid"));

/// Directory-derived mocker name; anything outside `[A-Za-z0-9_-]` becomes `_`.
pub fn normalize_name(raw: &str) -> String {
    NAME_UNSAFE.replace_all(raw, "_").into_owned()
}

pub struct TreeScanner<'a> {
    convention: &'a Convention,
    handlers: &'a HandlerRegistry,
    renderer: &'a dyn DocRenderer,
    /// Directories under the base path that are never mockers
    excluded: Vec<PathBuf>,
}

impl<'a> TreeScanner<'a> {
    pub fn new(
        convention: &'a Convention,
        handlers: &'a HandlerRegistry,
        renderer: &'a dyn DocRenderer,
    ) -> Self {
        Self {
            convention,
            handlers,
            renderer,
            excluded: Vec::new(),
        }
    }

    /// Skip `dirs` when they appear under the base path, such as a build
    /// directory placed next to the mockers.
    pub fn with_excluded<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.excluded = dirs.into_iter().map(|d| canonical(d.as_ref())).collect();
        self
    }

    fn is_excluded(&self, dir: &Path) -> bool {
        !self.excluded.is_empty() && self.excluded.contains(&canonical(dir))
    }

    /// Scan every mocker directory under `base_path`.
    ///
    /// When two directories claim the same mocker name the first one in scan
    /// order is kept and the other is skipped. Broken module files are
    /// skipped, but a directory that cannot be listed fails the whole scan.
    pub fn scan(&self, base_path: &Path) -> Result<Vec<Mocker>, ScanError> {
        if !base_path.exists() {
            return Err(ScanError::MissingBasePath(base_path.to_path_buf()));
        }
        if !base_path.is_dir() {
            return Err(ScanError::NotADirectory(base_path.to_path_buf()));
        }

        let entries = sorted_entries(base_path)?;
        let mut names = HashSet::new();
        let mut mockers = Vec::new();

        for dir in entries
            .into_iter()
            .filter(|p| p.is_dir() && !self.is_excluded(p))
        {
            let mocker = self.scan_mocker(&dir)?;

            if !names.insert(mocker.name.clone()) {
                warn!(
                    "Mocker name '{}' from {} is already taken, skipping",
                    mocker.name,
                    dir.display()
                );
                continue;
            }

            debug!(
                "Mocker '{}' ({} modules, routes {:?})",
                mocker.name,
                mocker.mock_modules.len(),
                mocker.routes
            );
            mockers.push(mocker);
        }

        info!(
            "Scanned {} mockers from {}",
            mockers.len(),
            base_path.display()
        );
        Ok(mockers)
    }

    fn scan_mocker(&self, dir: &Path) -> Result<Mocker, ScanError> {
        let dir_name = file_name(dir);
        let descriptor: MockerDescriptor =
            read_descriptor(&dir.join(&self.convention.mocker_descriptor));

        let default_name = normalize_name(&dir_name);
        let name = descriptor.name.clone().unwrap_or_else(|| default_name.clone());
        let routes = descriptor
            .route
            .map(RouteSpec::into_vec)
            .filter(|routes| !routes.is_empty())
            .unwrap_or_else(|| vec![default_name]);

        let static_dir = dir.join(&self.convention.static_dir);
        let modules_dir = dir.join(&self.convention.modules_dir);
        let mock_modules = if modules_dir.exists() {
            self.scan_modules(&name, &modules_dir)?
        } else {
            Vec::new()
        };

        if mock_modules.iter().all(|m| !m.is_enabled()) {
            warn!("Mocker '{}' has no enabled mock module", name);
        }

        Ok(Mocker {
            readme: self.load_readme(&name, dir),
            name,
            dir_name,
            path: dir.to_path_buf(),
            routes,
            method: descriptor.method.map(|m| m.to_ascii_uppercase()),
            description: descriptor.description,
            tags: descriptor.tags,
            disabled: descriptor.disable,
            active_module: descriptor.active_module,
            static_dir: static_dir.is_dir().then_some(static_dir),
            mock_modules,
        })
    }

    fn scan_modules(
        &self,
        mocker_name: &str,
        modules_dir: &Path,
    ) -> Result<Vec<Arc<MockModule>>, ScanError> {
        let mut names = HashSet::new();
        let mut modules = Vec::new();

        for entry in sorted_entries(modules_dir)? {
            let module = if entry.is_dir() {
                self.load_module_folder(mocker_name, &entry)
            } else {
                self.load_module_file(mocker_name, &entry)
            };

            let Some(module) = module else { continue };

            if !names.insert(module.name().to_string()) {
                warn!(
                    "Duplicate mock module '{}' in mocker '{}', keeping the first",
                    module.name(),
                    mocker_name
                );
                continue;
            }
            modules.push(Arc::new(module));
        }

        Ok(modules)
    }

    fn load_module_file(&self, mocker_name: &str, path: &Path) -> Option<MockModule> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.convention.format_for(ext))?;
        let name = path.file_stem()?.to_string_lossy().to_string();

        let definition = self.load_definition(path, format)?;
        Some(MockModule::new(name, mocker_name, path, definition))
    }

    fn load_module_folder(&self, mocker_name: &str, dir: &Path) -> Option<MockModule> {
        let descriptor: ModuleDescriptor =
            read_descriptor(&dir.join(&self.convention.module_descriptor));
        let name = descriptor.name.clone().unwrap_or_else(|| file_name(dir));

        let (path, definition) = if let Some(handler) = &descriptor.handler {
            let Some(inner) = self.handlers.get(handler) else {
                warn!(
                    "Mock module '{}/{}' references unregistered handler '{}', skipping",
                    mocker_name, name, handler
                );
                return None;
            };
            (
                dir.to_path_buf(),
                ModuleDefinition::native(handler.clone(), inner),
            )
        } else {
            let Some(index) = self
                .convention
                .index_candidates()
                .into_iter()
                .map(|candidate| dir.join(candidate))
                .find(|candidate| candidate.is_file())
            else {
                debug!("No index file in {}, not a mock module", dir.display());
                return None;
            };

            let format = index
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(|ext| self.convention.format_for(ext))?;
            let definition = self.load_definition(&index, format)?;
            (index, definition)
        };

        Some(
            MockModule::new(name, mocker_name, path, definition)
                .with_enabled(!descriptor.disable)
                .with_description(descriptor.description),
        )
    }

    fn load_definition(&self, path: &Path, format: SourceFormat) -> Option<ModuleDefinition> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read mock module {}: {}", path.display(), e);
                return None;
            }
        };

        let definition = match format {
            SourceFormat::Json => serde_json::from_str::<Value>(&content)
                .map(ModuleDefinition::Value)
                .map_err(|e| e.to_string()),
            SourceFormat::Yaml => serde_yaml::from_str::<Value>(&content)
                .map(ModuleDefinition::Value)
                .map_err(|e| e.to_string()),
            SourceFormat::Rhai => RhaiScript::compile(&content)
                .map(ModuleDefinition::from_script)
                .map_err(|e| e.to_string()),
        };

        match definition {
            Ok(definition) => Some(definition),
            Err(e) => {
                warn!("Skipping mock module {}: {}", path.display(), e);
                None
            }
        }
    }

    fn load_readme(&self, mocker_name: &str, dir: &Path) -> Option<String> {
        let rendered = dir.join(&self.convention.rendered_readme);
        if rendered.is_file() {
            return read_optional(&rendered);
        }

        let source = self
            .convention
            .readme_files
            .iter()
            .map(|file| dir.join(file))
            .find(|path| path.is_file())
            .and_then(|path| read_optional(&path))?;

        let source = rewrite_static_links(&source, mocker_name, &self.convention.static_dir);
        Some(self.renderer.render(mocker_name, &source))
    }
}

fn read_optional(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Non-hidden entries of `dir`, sorted by file name.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let entries = fs::read_dir(dir).map_err(|e| ScanError::ReadDir(dir.to_path_buf(), e))?;

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| !file_name(path).starts_with('.'))
        .collect();
    paths.sort_by_key(|path| file_name(path));
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{handler_fn, DefinitionKind};
    use crate::docs::PassthroughRenderer;
    use serde_json::json;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scan(base: &Path, handlers: &HandlerRegistry) -> Result<Vec<Mocker>, ScanError> {
        let convention = Convention::default();
        TreeScanner::new(&convention, handlers, &PassthroughRenderer).scan(base)
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("demo_01"), "demo_01");
        assert_eq!(normalize_name("user info.v2"), "user_info_v2");
    }

    #[test]
    fn test_missing_base_path() {
        let err = scan(Path::new("/no/such/mockers"), &HandlerRegistry::new()).unwrap_err();
        assert!(matches!(err, ScanError::MissingBasePath(_)));
    }

    #[test]
    fn test_base_path_is_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        write(&file, "x");
        let err = scan(&file, &HandlerRegistry::new()).unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }

    #[test]
    fn test_modules_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let modules = dir.path().join("user/mock_modules");
        write(&modules.join("b_success.json"), r#"{"ok": true}"#);
        write(&modules.join("a_error.yaml"), "errCode: 1\n");
        write(&modules.join("c_script.rhai"), "fn mock(params) { 1 }");
        write(&modules.join("notes.txt"), "ignored");
        write(&modules.join(".hidden.json"), "{}");

        let mockers = scan(dir.path(), &HandlerRegistry::new()).unwrap();
        assert_eq!(mockers.len(), 1);

        let names: Vec<&str> = mockers[0].mock_modules.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["a_error", "b_success", "c_script"]);
        assert_eq!(mockers[0].mock_modules[0].kind(), DefinitionKind::Value);
        assert_eq!(mockers[0].mock_modules[2].kind(), DefinitionKind::Script);
        assert_eq!(mockers[0].routes, vec!["user"]);
    }

    #[test]
    fn test_broken_module_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let modules = dir.path().join("m/mock_modules");
        write(&modules.join("bad.json"), "{ nope");
        write(&modules.join("bad_script.rhai"), "fn mock( {");
        write(&modules.join("good.json"), "1");

        let mockers = scan(dir.path(), &HandlerRegistry::new()).unwrap();
        let names: Vec<&str> = mockers[0].mock_modules.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["good"]);
    }

    #[test]
    fn test_duplicate_mocker_name_keeps_first() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("a/config.json"), r#"{"name": "shared"}"#);
        write(&dir.path().join("b/config.json"), r#"{"name": "shared"}"#);

        let mockers = scan(dir.path(), &HandlerRegistry::new()).unwrap();
        assert_eq!(mockers.len(), 1);
        assert_eq!(mockers[0].dir_name, "a");
    }

    #[test]
    fn test_mocker_without_modules_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        let mockers = scan(dir.path(), &HandlerRegistry::new()).unwrap();
        assert_eq!(mockers.len(), 1);
        assert!(mockers[0].mock_modules.is_empty());
        assert!(mockers[0].default_module().is_none());
    }

    #[test]
    fn test_descriptor_overrides() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("raw/config.json"),
            r#"{"name": "renamed", "route": ["/api/users/:id", "users"], "method": "post", "disable": true}"#,
        );

        let mockers = scan(dir.path(), &HandlerRegistry::new()).unwrap();
        let mocker = &mockers[0];
        assert_eq!(mocker.name, "renamed");
        assert_eq!(mocker.dir_name, "raw");
        assert_eq!(mocker.routes, vec!["/api/users/:id", "users"]);
        assert_eq!(mocker.method.as_deref(), Some("POST"));
        assert!(mocker.disabled);
    }

    #[test]
    fn test_folder_module_with_native_handler() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("m/mock_modules/live/config.json"),
            r#"{"handler": "echo", "description": "echoes params"}"#,
        );
        write(
            &dir.path().join("m/mock_modules/ghost/config.json"),
            r#"{"handler": "not_registered"}"#,
        );

        let handlers =
            HandlerRegistry::new().with("echo", handler_fn(|p: Value| async move { Ok(p) }));
        let mockers = scan(dir.path(), &handlers).unwrap();
        let modules = &mockers[0].mock_modules;

        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name(), "live");
        assert_eq!(modules[0].kind(), DefinitionKind::Native);
        assert_eq!(modules[0].description(), Some("echoes params"));
    }

    #[tokio::test]
    async fn test_folder_module_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().join("m/mock_modules/success_3");
        write(
            &module.join("config.json"),
            r#"{"name": "success_3_renamed", "disable": true}"#,
        );
        write(&module.join("index.yml"), "result: 3\n");

        let mockers = scan(dir.path(), &HandlerRegistry::new()).unwrap();
        let module = &mockers[0].mock_modules[0];
        assert_eq!(module.name(), "success_3_renamed");
        assert!(!module.is_enabled());
        assert!(module.path().ends_with("index.yml"));
        assert_eq!(module.get_result(None).await.unwrap(), json!({"result": 3}));
    }

    #[test]
    fn test_unlistable_modules_dir_fails_scan() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("a_ok/mock_modules/ok.json"), "1");
        write(&dir.path().join("b_broken/mock_modules"), "not a directory");

        let err = scan(dir.path(), &HandlerRegistry::new()).unwrap_err();
        assert!(
            matches!(err, ScanError::ReadDir(ref path, _) if path.ends_with("b_broken/mock_modules"))
        );
    }

    #[test]
    fn test_excluded_build_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("demo/mock_modules/ok.json"), "1");
        write(&dir.path().join("build/db.json"), "{}");

        let convention = Convention::default();
        let handlers = HandlerRegistry::new();
        let mockers = TreeScanner::new(&convention, &handlers, &PassthroughRenderer)
            .with_excluded([dir.path().join("build")])
            .scan(dir.path())
            .unwrap();

        assert_eq!(mockers.len(), 1);
        assert_eq!(mockers[0].name, "demo");
    }

    #[test]
    fn test_rendered_readme_preferred() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("m/README.md"), "# source");
        write(&dir.path().join("m/README.html"), "<h1>prebuilt</h1>");

        let mockers = scan(dir.path(), &HandlerRegistry::new()).unwrap();
        assert_eq!(mockers[0].readme.as_deref(), Some("<h1>prebuilt</h1>"));
    }
}
