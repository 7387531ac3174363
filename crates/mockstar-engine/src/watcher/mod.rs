//! Debounced filesystem watcher for the mock tree.
//!
//! A `notify` watcher feeds raw events into a channel; a processor thread
//! coalesces bursts and fires the change callback once the tree has been quiet
//! for the debounce window.

use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::EngineError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct TreeWatcher {
    watcher: Option<RecommendedWatcher>,
    processor: Option<thread::JoinHandle<()>>,
    running: Arc<AtomicBool>,
    root: PathBuf,
}

impl TreeWatcher {
    /// Watch `root` recursively. `on_change` runs on the processor thread
    /// after `debounce` of quiet following a relevant event. Events under any
    /// `ignore` prefix are dropped.
    pub fn start<F>(
        root: &Path,
        debounce: Duration,
        ignore: Vec<PathBuf>,
        on_change: F,
    ) -> Result<Self, EngineError>
    where
        F: Fn() + Send + 'static,
    {
        let (event_tx, event_rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(e) => warn!("File watcher error: {}", e),
            },
            NotifyConfig::default(),
        )
        .map_err(|e| EngineError::Watch(format!("failed to create watcher: {e}")))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| EngineError::Watch(format!("failed to watch {}: {e}", root.display())))?;

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let processor = thread::Builder::new()
            .name("mockstar-watcher".to_string())
            .spawn(move || process_events(event_rx, debounce, ignore, flag, on_change))
            .map_err(|e| EngineError::Watch(format!("failed to spawn watcher thread: {e}")))?;

        debug!("Watching {} (debounce {:?})", root.display(), debounce);

        Ok(Self {
            watcher: Some(watcher),
            processor: Some(processor),
            running,
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop watching and join the processor thread. Idempotent.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        self.watcher = None;
        if let Some(processor) = self.processor.take() {
            // The callback may itself drop the last handle to this watcher.
            if processor.thread().id() != thread::current().id() && processor.join().is_err() {
                warn!("Watcher thread panicked");
            }
        }
        debug!("Stopped watching {}", self.root.display());
    }
}

impl Drop for TreeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn is_relevant(event: &Event, ignore: &[PathBuf]) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|path| !ignore.iter().any(|prefix| path.starts_with(prefix)))
}

fn process_events<F>(
    event_rx: Receiver<Event>,
    debounce: Duration,
    ignore: Vec<PathBuf>,
    running: Arc<AtomicBool>,
    on_change: F,
) where
    F: Fn(),
{
    let mut pending_since: Option<Instant> = None;

    while running.load(Ordering::SeqCst) {
        match event_rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                if is_relevant(&event, &ignore) {
                    debug!("Change detected: {:?} {:?}", event.kind, event.paths);
                    pending_since = Some(Instant::now());
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(since) = pending_since {
            if since.elapsed() >= debounce {
                pending_since = None;
                on_change();
            }
        }
    }
}
