use parking_lot::Mutex;
use rhai::Dynamic;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;

mod rhai_engine;
pub use rhai_engine::{dynamic_to_json, RhaiScript, ScriptShape};

/// Outcome delivered by a callback-style script.
pub type CompletionOutcome = Result<Value, String>;

/// The `done` handle passed to `fn mock(params, done)`.
///
/// Only the first `resolve`/`reject` counts; later calls are ignored.
/// Dropping every clone without signalling closes the channel.
#[derive(Clone)]
pub struct Completion {
    sender: Arc<Mutex<Option<oneshot::Sender<CompletionOutcome>>>>,
}

impl Completion {
    pub fn channel() -> (Self, oneshot::Receiver<CompletionOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    pub fn resolve(&mut self, value: Dynamic) {
        self.complete(Ok(dynamic_to_json(value)));
    }

    pub fn reject(&mut self, reason: Dynamic) {
        let message = reason
            .clone()
            .try_cast::<String>()
            .unwrap_or_else(|| reason.to_string());
        self.complete(Err(message));
    }

    fn complete(&self, outcome: CompletionOutcome) {
        match self.sender.lock().take() {
            Some(tx) => {
                let _ = tx.send(outcome);
            }
            None => tracing::debug!("Completion already signalled, ignoring"),
        }
    }
}
