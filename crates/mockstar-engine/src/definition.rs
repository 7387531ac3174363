//! Module definitions and their evaluation.
//!
//! A mock module's response is one of four shapes, fixed when the module is
//! loaded:
//!
//! - `Value`: static data from a JSON/YAML file
//! - `Script`: a Rhai script returning the response
//! - `Callback`: a Rhai script that signals through `done.resolve` / `done.reject`
//! - `Native`: an async [`MockHandler`] registered by the embedding application
//!
//! [`ModuleDefinition::evaluate`] hides the difference behind one async call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::error::EvaluationError;
use crate::scripting::{Completion, CompletionOutcome, RhaiScript, ScriptShape};

/// Async response producer registered in code rather than on disk.
#[async_trait]
pub trait MockHandler: Send + Sync {
    async fn handle(&self, params: Value) -> anyhow::Result<Value>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> MockHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn handle(&self, params: Value) -> anyhow::Result<Value> {
        (self.0)(params).await
    }
}

/// Wrap an async closure as a [`MockHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn MockHandler>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Named native handlers, referenced from module descriptors via `handler`.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn MockHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn MockHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn with(mut self, name: impl Into<String>, handler: Arc<dyn MockHandler>) -> Self {
        self.register(name, handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn MockHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Value,
    Script,
    Callback,
    Native,
}

#[derive(Clone)]
pub enum ModuleDefinition {
    Value(Value),
    Script(RhaiScript),
    Callback(RhaiScript),
    Native {
        handler: String,
        inner: Arc<dyn MockHandler>,
    },
}

impl std::fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleDefinition::Value(v) => f.debug_tuple("Value").field(v).finish(),
            ModuleDefinition::Script(s) => f.debug_tuple("Script").field(s).finish(),
            ModuleDefinition::Callback(s) => f.debug_tuple("Callback").field(s).finish(),
            ModuleDefinition::Native { handler, .. } => {
                f.debug_struct("Native").field("handler", handler).finish()
            }
        }
    }
}

impl ModuleDefinition {
    /// Tag a compiled script by the shape of its `mock` function.
    pub fn from_script(script: RhaiScript) -> Self {
        match script.shape() {
            ScriptShape::Callback => ModuleDefinition::Callback(script),
            ScriptShape::Body | ScriptShape::Function { .. } => ModuleDefinition::Script(script),
        }
    }

    pub fn native(handler: impl Into<String>, inner: Arc<dyn MockHandler>) -> Self {
        ModuleDefinition::Native {
            handler: handler.into(),
            inner,
        }
    }

    pub fn kind(&self) -> DefinitionKind {
        match self {
            ModuleDefinition::Value(_) => DefinitionKind::Value,
            ModuleDefinition::Script(_) => DefinitionKind::Script,
            ModuleDefinition::Callback(_) => DefinitionKind::Callback,
            ModuleDefinition::Native { .. } => DefinitionKind::Native,
        }
    }

    /// Produce the module's response. Every call runs the definition again.
    pub async fn evaluate(
        &self,
        module: &str,
        params: Option<&Value>,
    ) -> Result<Value, EvaluationError> {
        match self {
            ModuleDefinition::Value(value) => Ok(value.clone()),
            ModuleDefinition::Script(script) => {
                script.call(params).map_err(|e| EvaluationError::Script {
                    module: module.to_string(),
                    message: e.to_string(),
                })
            }
            ModuleDefinition::Callback(script) => {
                let (done, mut rx) = Completion::channel();
                if let Err(e) = script.call_with_completion(params, done) {
                    // A signal sent before the script failed still stands.
                    return match rx.try_recv() {
                        Ok(outcome) => settle(module, outcome),
                        Err(_) => Err(EvaluationError::Script {
                            module: module.to_string(),
                            message: e.to_string(),
                        }),
                    };
                }

                match rx.await {
                    Ok(outcome) => settle(module, outcome),
                    Err(_) => Err(EvaluationError::NeverCompleted(module.to_string())),
                }
            }
            ModuleDefinition::Native { inner, .. } => inner
                .handle(params.cloned().unwrap_or(Value::Null))
                .await
                .map_err(|source| EvaluationError::Handler {
                    module: module.to_string(),
                    source,
                }),
        }
    }
}

fn settle(module: &str, outcome: CompletionOutcome) -> Result<Value, EvaluationError> {
    outcome.map_err(|message| EvaluationError::Rejected {
        module: module.to_string(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn script(source: &str) -> ModuleDefinition {
        ModuleDefinition::from_script(RhaiScript::compile(source).unwrap())
    }

    #[tokio::test]
    async fn test_value_definition_is_stable() {
        let def = ModuleDefinition::Value(json!({"errCode": 100000}));
        for _ in 0..3 {
            assert_eq!(def.evaluate("error", None).await.unwrap(), json!({"errCode": 100000}));
        }
        assert_eq!(def.kind(), DefinitionKind::Value);
    }

    #[tokio::test]
    async fn test_script_definition_uses_params() {
        let def = script(r#"fn mock(params) { if params == () { 0 } else { params.n * 2 } }"#);
        assert_eq!(def.kind(), DefinitionKind::Script);
        assert_eq!(def.evaluate("double", None).await.unwrap(), json!(0));
        assert_eq!(
            def.evaluate("double", Some(&json!({"n": 21}))).await.unwrap(),
            json!(42)
        );
    }

    #[tokio::test]
    async fn test_script_error_becomes_evaluation_error() {
        let def = script(r#"fn mock(params) { throw "bad input"; }"#);
        let err = def.evaluate("broken", None).await.unwrap_err();
        assert!(matches!(err, EvaluationError::Script { ref module, .. } if module == "broken"));
    }

    #[tokio::test]
    async fn test_callback_definition() {
        let def = script(
            r#"
            fn mock(params, done) {
                if params == () {
                    done.reject("missing params");
                } else {
                    done.resolve(#{ id: params.id });
                }
            }
        "#,
        );
        assert_eq!(def.kind(), DefinitionKind::Callback);

        assert_eq!(
            def.evaluate("cb", Some(&json!({"id": 3}))).await.unwrap(),
            json!({"id": 3})
        );

        let err = def.evaluate("cb", None).await.unwrap_err();
        assert!(
            matches!(err, EvaluationError::Rejected { ref message, .. } if message == "missing params")
        );
    }

    #[tokio::test]
    async fn test_callback_never_signalled() {
        let def = script("fn mock(params, done) { 1 }");
        let err = def.evaluate("silent", None).await.unwrap_err();
        assert!(matches!(err, EvaluationError::NeverCompleted(ref m) if m == "silent"));
    }

    #[tokio::test]
    async fn test_callback_failing_after_signal_keeps_outcome() {
        let def = script(r#"fn mock(params, done) { done.resolve(1); throw "late failure"; }"#);
        assert_eq!(def.evaluate("cb", None).await.unwrap(), json!(1));

        let def = script(r#"fn mock(params, done) { done.reject("nope"); throw "late failure"; }"#);
        let err = def.evaluate("cb", None).await.unwrap_err();
        assert!(matches!(err, EvaluationError::Rejected { ref message, .. } if message == "nope"));
    }

    #[tokio::test]
    async fn test_callback_failing_before_signal() {
        let def = script(r#"fn mock(params, done) { throw "early failure"; done.resolve(1); }"#);
        let err = def.evaluate("cb", None).await.unwrap_err();
        assert!(matches!(err, EvaluationError::Script { ref module, .. } if module == "cb"));
    }

    #[tokio::test]
    async fn test_native_definition_runs_every_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = handler_fn(move |params: Value| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                tokio::task::yield_now().await;
                Ok(json!({"call": n, "params": params}))
            }
        });
        let def = ModuleDefinition::native("counter", handler);

        assert_eq!(
            def.evaluate("n", None).await.unwrap(),
            json!({"call": 1, "params": null})
        );
        assert_eq!(
            def.evaluate("n", Some(&json!({"x": 1}))).await.unwrap(),
            json!({"call": 2, "params": {"x": 1}})
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_native_error_wrapped() {
        let handler = handler_fn(|_params: Value| async { Err(anyhow::anyhow!("db down")) });
        let def = ModuleDefinition::native("failing", handler);
        let err = def.evaluate("f", None).await.unwrap_err();
        assert!(err.to_string().contains("db down"));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = HandlerRegistry::new().with(
            "echo",
            handler_fn(|params: Value| async move { Ok(params) }),
        );
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 1);
    }
}
