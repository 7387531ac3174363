//! The resolution engine.
//!
//! [`Parser`] owns the current mocker tree and its route index. The tree is
//! immutable: a rescan builds a complete replacement and swaps the shared
//! pointer, so concurrent readers see either the old tree or the new one.

mod hooks;
mod query;
mod resolution;

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ParserOptions;
use crate::error::EngineError;
use crate::model::{MockModule, Mocker};
use crate::routing::RouteIndex;
use crate::scanner::TreeScanner;
use crate::snapshot::SnapshotStore;
use crate::watcher::TreeWatcher;

pub use hooks::{EngineHooks, RescanObserver};
pub use query::{MockQuery, MockQueryItem};
pub use resolution::{ResolutionResult, ResolveRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Scanning,
    Ready,
    Rescanning,
    Disposed,
}

/// One immutable generation of the parsed tree.
#[derive(Debug, Default)]
struct Tree {
    mockers: Vec<Arc<Mocker>>,
    by_name: HashMap<String, Arc<Mocker>>,
    index: RouteIndex,
}

impl Tree {
    fn new(mockers: Vec<Mocker>) -> Self {
        let mockers: Vec<Arc<Mocker>> = mockers.into_iter().map(Arc::new).collect();
        let by_name = mockers
            .iter()
            .map(|m| (m.name.clone(), Arc::clone(m)))
            .collect();
        let index = RouteIndex::build(&mockers);

        Self {
            mockers,
            by_name,
            index,
        }
    }
}

struct ParserInner {
    options: ParserOptions,
    hooks: EngineHooks,
    tree: RwLock<Arc<Tree>>,
    state: Mutex<ParserState>,
    /// Serializes rescans and disposal
    refresh_lock: Mutex<()>,
}

impl ParserInner {
    fn scan(&self) -> Result<Vec<Mocker>, EngineError> {
        let scanner = TreeScanner::new(
            &self.options.convention,
            &self.hooks.handlers,
            self.hooks.renderer.as_ref(),
        )
        .with_excluded(self.options.build_path.iter());
        Ok(scanner.scan(&self.options.base_path)?)
    }

    fn snapshot_store(&self) -> Option<SnapshotStore> {
        self.options.build_path.as_ref().map(SnapshotStore::new)
    }

    fn save_snapshot(&self, tree: &Tree) {
        if let Some(store) = self.snapshot_store() {
            if let Err(e) = store.save(&self.options.base_path, &tree.mockers) {
                warn!("Failed to write snapshot: {}", e);
            }
        }
    }

    /// Mockers from a snapshot written for the same paths, if allowed.
    fn rehydrate(&self) -> Option<Vec<Mocker>> {
        if !self.options.reuse_snapshot {
            return None;
        }
        let store = self.snapshot_store()?;

        match store.load_matching(&self.options.base_path) {
            Ok(Some(record)) => {
                info!(
                    "Reusing snapshot {} ({} mockers)",
                    store.file_path().display(),
                    record.data.len()
                );
                Some(
                    record
                        .data
                        .into_iter()
                        .map(|m| m.into_mocker(&self.hooks.handlers))
                        .collect(),
                )
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Ignoring unreadable snapshot: {}", e);
                None
            }
        }
    }

    fn tree(&self) -> Arc<Tree> {
        Arc::clone(&self.tree.read())
    }

    fn set_state(&self, next: ParserState) {
        let mut state = self.state.lock();
        if *state != ParserState::Disposed {
            *state = next;
        }
    }

    fn is_disposed(&self) -> bool {
        *self.state.lock() == ParserState::Disposed
    }

    fn refresh(&self) -> Result<(), EngineError> {
        let _guard = self.refresh_lock.lock();
        if self.is_disposed() {
            return Err(EngineError::Disposed);
        }

        self.set_state(ParserState::Rescanning);
        let mockers = match self.scan() {
            Ok(mockers) => mockers,
            Err(e) => {
                self.set_state(ParserState::Ready);
                warn!("Rescan failed, keeping previous tree: {}", e);
                if let Some(observer) = &self.hooks.observer {
                    observer.on_rescan_error(&e);
                }
                return Err(e);
            }
        };

        let tree = Arc::new(Tree::new(mockers));
        let count = tree.mockers.len();
        self.save_snapshot(&tree);
        *self.tree.write() = tree;
        self.set_state(ParserState::Ready);

        info!("Rescanned {} mockers", count);
        if let Some(observer) = &self.hooks.observer {
            observer.on_rescan(count);
        }
        Ok(())
    }
}

pub struct Parser {
    inner: Arc<ParserInner>,
    watcher: Mutex<Option<TreeWatcher>>,
}

impl Parser {
    pub fn new(options: ParserOptions) -> Result<Self, EngineError> {
        Self::with_hooks(options, EngineHooks::default())
    }

    /// Build the engine: scan (or rehydrate a matching snapshot), index
    /// routes, persist the snapshot and start watching when enabled.
    pub fn with_hooks(options: ParserOptions, hooks: EngineHooks) -> Result<Self, EngineError> {
        options.validate()?;

        let inner = Arc::new(ParserInner {
            options,
            hooks,
            tree: RwLock::new(Arc::new(Tree::default())),
            state: Mutex::new(ParserState::Scanning),
            refresh_lock: Mutex::new(()),
        });

        let (mockers, rehydrated) = match inner.rehydrate() {
            Some(mockers) => (mockers, true),
            None => (inner.scan()?, false),
        };

        let tree = Arc::new(Tree::new(mockers));
        if !rehydrated {
            inner.save_snapshot(&tree);
        }
        *inner.tree.write() = tree;
        inner.set_state(ParserState::Ready);

        let watcher = if inner.options.watch {
            Some(start_watcher(&inner)?)
        } else {
            None
        };

        Ok(Self {
            inner,
            watcher: Mutex::new(watcher),
        })
    }

    pub fn options(&self) -> &ParserOptions {
        &self.inner.options
    }

    pub fn state(&self) -> ParserState {
        *self.inner.state.lock()
    }

    /// All mockers in scan order.
    pub fn get_all_mocker(&self) -> Vec<Arc<Mocker>> {
        self.inner.tree().mockers.clone()
    }

    pub fn get_mocker_by_name(&self, name: &str) -> Option<Arc<Mocker>> {
        self.inner.tree().by_name.get(name).cloned()
    }

    pub fn get_mock_module_by_name(
        &self,
        mocker_name: &str,
        mock_module_name: &str,
    ) -> Option<Arc<MockModule>> {
        self.get_mocker_by_name(mocker_name)?
            .get_mock_module(mock_module_name)
    }

    pub fn get_mocker_by_route(&self, route: &str) -> Option<Arc<Mocker>> {
        self.inner.tree().index.find(route, None).map(|m| m.mocker)
    }

    pub fn get_res_info_by_route(&self, route: &str) -> Option<ResolutionResult> {
        self.resolve(&ResolveRequest::new(route))
    }

    /// Route a request and pick the module to serve.
    ///
    /// The request's override for the matched mocker takes precedence, then
    /// the mocker's active module, then its first enabled module.
    pub fn resolve(&self, request: &ResolveRequest) -> Option<ResolutionResult> {
        let tree = self.inner.tree();
        let Some(found) = tree.index.find(&request.path, request.method.as_deref()) else {
            debug!("No mocker matches {}", request.path);
            return None;
        };

        let mocker = found.mocker;
        let item = request.query.find(&mocker.name);
        let bypass = mocker.disabled || item.map_or(false, |i| i.should_disable);

        let mock_module = item
            .and_then(|i| i.mock_module_name.as_deref())
            .and_then(|name| mocker.get_mock_module(name))
            .or_else(|| mocker.default_module());

        debug!(
            "Resolved {} to {}/{} (pattern '{}', bypass {})",
            request.path,
            mocker.name,
            mock_module.as_ref().map_or("-", |m| m.name()),
            found.pattern,
            bypass
        );

        Some(ResolutionResult {
            module_full_path: mock_module.as_ref().map(|m| m.path().to_path_buf()),
            mock_module,
            mocker,
            params: found.params,
            bypass,
        })
    }

    /// Rendered documentation of a mocker.
    pub fn get_read_me_content(&self, mocker_name: &str) -> Option<String> {
        self.get_mocker_by_name(mocker_name)?.readme.clone()
    }

    /// Rescan and swap the tree. On failure the previous tree stays in place.
    pub fn refresh(&self) -> Result<(), EngineError> {
        self.inner.refresh()
    }

    /// Stop watching and drop the tree. Idempotent.
    pub fn dispose(&self) {
        *self.inner.state.lock() = ParserState::Disposed;

        if let Some(mut watcher) = self.watcher.lock().take() {
            watcher.stop();
        }

        let _guard = self.inner.refresh_lock.lock();
        *self.inner.tree.write() = Arc::new(Tree::default());
        debug!("Parser for {} disposed", self.inner.options.base_path.display());
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("base_path", &self.inner.options.base_path)
            .field("state", &self.state())
            .field("mockers", &self.inner.tree().mockers.len())
            .finish()
    }
}

fn start_watcher(inner: &Arc<ParserInner>) -> Result<TreeWatcher, EngineError> {
    let options = &inner.options;
    let root = canonical(&options.base_path);
    let ignore: Vec<PathBuf> = options.build_path.iter().map(|p| canonical(p)).collect();
    if ignore.iter().any(|p| root.starts_with(p)) {
        warn!("Base path {} lies inside the build path", root.display());
    }

    let weak: Weak<ParserInner> = Arc::downgrade(inner);
    TreeWatcher::start(
        &root,
        Duration::from_millis(options.watch_debounce_ms),
        ignore,
        move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // Failures are logged and reported to the observer by refresh.
            let _ = inner.refresh();
        },
    )
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
