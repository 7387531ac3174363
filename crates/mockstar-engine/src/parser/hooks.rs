use std::sync::Arc;

use crate::definition::HandlerRegistry;
use crate::docs::{DocRenderer, PassthroughRenderer};
use crate::error::EngineError;

/// Notified after background and explicit rescans.
pub trait RescanObserver: Send + Sync {
    fn on_rescan_error(&self, error: &EngineError);

    fn on_rescan(&self, _mocker_count: usize) {}
}

/// Extension points supplied by the embedding application.
#[derive(Clone)]
pub struct EngineHooks {
    pub handlers: HandlerRegistry,
    pub renderer: Arc<dyn DocRenderer>,
    pub observer: Option<Arc<dyn RescanObserver>>,
}

impl EngineHooks {
    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DocRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RescanObserver>) -> Self {
        self.observer = Some(observer);
        self
    }
}

impl Default for EngineHooks {
    fn default() -> Self {
        Self {
            handlers: HandlerRegistry::new(),
            renderer: Arc::new(PassthroughRenderer),
            observer: None,
        }
    }
}

impl std::fmt::Debug for EngineHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHooks")
            .field("handlers", &self.handlers)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
