use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use rhai::{Dynamic, Engine, Map, Scope, AST};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::Completion;

/// Name of the entry function a module script may define.
pub const ENTRY_FN: &str = "mock";

/// Shared engine; scripts are compiled once at scan time and evaluated here.
static ENGINE: Lazy<Engine> = Lazy::new(create_engine);

/// How a compiled module script produces its result, detected from the AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptShape {
    /// No `mock` function: the script body is the result, `params` is in scope
    Body,
    /// `fn mock()` or `fn mock(params)` returning the result
    Function { arity: usize },
    /// `fn mock(params, done)` signalling through `done.resolve` / `done.reject`
    Callback,
}

/// A compiled Rhai module script.
#[derive(Clone)]
pub struct RhaiScript {
    ast: Arc<AST>,
    source: Arc<str>,
    shape: ScriptShape,
}

impl std::fmt::Debug for RhaiScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RhaiScript")
            .field("shape", &self.shape)
            .field("source_len", &self.source.len())
            .finish()
    }
}

impl RhaiScript {
    pub fn compile(source: &str) -> Result<Self> {
        let ast = ENGINE
            .compile(source)
            .map_err(|e| anyhow!("Failed to compile script: {e}"))?;
        let shape = detect_shape(&ast)?;

        Ok(Self {
            ast: Arc::new(ast),
            source: Arc::from(source),
            shape,
        })
    }

    pub fn shape(&self) -> ScriptShape {
        self.shape
    }

    /// Original script text, kept so snapshots can recompile it
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Run a `Body` or `Function` script and return its value.
    pub fn call(&self, params: Option<&Value>) -> Result<Value> {
        let params = params.cloned().map(json_to_dynamic).unwrap_or(Dynamic::UNIT);
        let mut scope = Scope::new();

        let result: Dynamic = match self.shape {
            ScriptShape::Body => {
                scope.push_dynamic("params", params);
                ENGINE
                    .eval_ast_with_scope(&mut scope, &self.ast)
                    .map_err(|e| anyhow!("Script execution error: {e}"))?
            }
            ScriptShape::Function { arity: 0 } => ENGINE
                .call_fn(&mut scope, &self.ast, ENTRY_FN, ())
                .map_err(|e| anyhow!("Script execution error: {e}"))?,
            ScriptShape::Function { .. } => ENGINE
                .call_fn(&mut scope, &self.ast, ENTRY_FN, (params,))
                .map_err(|e| anyhow!("Script execution error: {e}"))?,
            ScriptShape::Callback => {
                return Err(anyhow!("Callback scripts must be run with call_with_completion"))
            }
        };

        Ok(dynamic_to_json(result))
    }

    /// Run a `Callback` script; the outcome arrives through `done`.
    pub fn call_with_completion(&self, params: Option<&Value>, done: Completion) -> Result<()> {
        let params = params.cloned().map(json_to_dynamic).unwrap_or(Dynamic::UNIT);
        let mut scope = Scope::new();

        let _: Dynamic = ENGINE
            .call_fn(
                &mut scope,
                &self.ast,
                ENTRY_FN,
                (params, Dynamic::from(done)),
            )
            .map_err(|e| anyhow!("Script execution error: {e}"))?;

        Ok(())
    }
}

fn detect_shape(ast: &AST) -> Result<ScriptShape> {
    let entry = ast.iter_functions().find(|f| f.name == ENTRY_FN);

    match entry.map(|f| f.params.len()) {
        None => Ok(ScriptShape::Body),
        Some(2) => Ok(ScriptShape::Callback),
        Some(arity @ (0 | 1)) => Ok(ScriptShape::Function { arity }),
        Some(arity) => Err(anyhow!(
            "fn {ENTRY_FN} must take (params) or (params, done), found {arity} parameters"
        )),
    }
}

fn create_engine() -> Engine {
    let mut engine = Engine::new();

    engine
        .register_type_with_name::<Completion>("Completion")
        .register_fn("resolve", Completion::resolve)
        .register_fn("reject", Completion::reject);

    engine.on_print(|text| debug!(target: "mockstar::script", "{text}"));
    engine.on_debug(|text, source, pos| {
        debug!(target: "mockstar::script", "{} @ {pos:?}: {text}", source.unwrap_or("module"));
    });

    engine
}

// Helper functions to convert between Rhai Dynamic and serde_json::Value

pub fn json_to_dynamic(value: Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else if let Some(f) = n.as_f64() {
                Dynamic::from(f)
            } else {
                Dynamic::UNIT
            }
        }
        Value::String(s) => Dynamic::from(s),
        Value::Array(arr) => {
            let vec: Vec<Dynamic> = arr.into_iter().map(json_to_dynamic).collect();
            Dynamic::from(vec)
        }
        Value::Object(obj) => {
            let mut map = Map::new();
            for (k, v) in obj {
                map.insert(k.into(), json_to_dynamic(v));
            }
            Dynamic::from(map)
        }
    }
}

pub fn dynamic_to_json(value: Dynamic) -> Value {
    if value.is_unit() {
        Value::Null
    } else if let Ok(b) = value.as_bool() {
        Value::Bool(b)
    } else if let Ok(i) = value.as_int() {
        Value::Number(i.into())
    } else if let Ok(f) = value.as_float() {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    } else if let Some(s) = value.clone().try_cast::<String>() {
        Value::String(s)
    } else if let Some(arr) = value.clone().try_cast::<Vec<Dynamic>>() {
        Value::Array(arr.into_iter().map(dynamic_to_json).collect())
    } else if let Some(map) = value.clone().try_cast::<Map>() {
        let mut obj = serde_json::Map::new();
        for (k, v) in map {
            obj.insert(k.to_string(), dynamic_to_json(v));
        }
        Value::Object(obj)
    } else {
        Value::String(format!("{value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_script_sees_params() {
        let script = RhaiScript::compile(r#"if params == () { "none" } else { params.name }"#)
            .unwrap();
        assert_eq!(script.shape(), ScriptShape::Body);

        assert_eq!(script.call(None).unwrap(), json!("none"));
        assert_eq!(
            script.call(Some(&json!({"name": "alice"}))).unwrap(),
            json!("alice")
        );
    }

    #[test]
    fn test_function_script() {
        let script = RhaiScript::compile(
            r#"
            fn mock(params) {
                if params == () || params.a == () {
                    return 4;
                }
                "from_param_" + params.a.to_string()
            }
        "#,
        )
        .unwrap();

        assert_eq!(script.shape(), ScriptShape::Function { arity: 1 });
        assert_eq!(script.call(None).unwrap(), json!(4));
        assert_eq!(
            script.call(Some(&json!({"a": 110}))).unwrap(),
            json!("from_param_110")
        );
    }

    #[test]
    fn test_zero_arity_function() {
        let script = RhaiScript::compile("fn mock() { #{ ok: true, list: [1, 2] } }").unwrap();
        assert_eq!(script.shape(), ScriptShape::Function { arity: 0 });
        assert_eq!(
            script.call(Some(&json!({"ignored": 1}))).unwrap(),
            json!({"ok": true, "list": [1, 2]})
        );
    }

    #[test]
    fn test_callback_shape_detected() {
        let script =
            RhaiScript::compile("fn mock(params, done) { done.resolve(1); }").unwrap();
        assert_eq!(script.shape(), ScriptShape::Callback);
        assert!(script.call(None).is_err());
    }

    #[test]
    fn test_bad_arity_rejected() {
        let err = RhaiScript::compile("fn mock(a, b, c) { 1 }").unwrap_err();
        assert!(err.to_string().contains("3 parameters"));
    }

    #[test]
    fn test_syntax_error() {
        let err = RhaiScript::compile("fn mock(params) { #{ broken: ").unwrap_err();
        assert!(err.to_string().contains("Failed to compile script"));
    }

    #[test]
    fn test_runtime_error_reported() {
        let script = RhaiScript::compile(r#"fn mock(params) { throw "boom"; }"#).unwrap();
        let err = script.call(None).unwrap_err();
        assert!(err.to_string().contains("Script execution error"));
    }

    #[test]
    fn test_json_dynamic_conversion_preserves_nesting() {
        let value = json!({"a": [1, 2.5, "x", null, {"b": true}]});
        assert_eq!(dynamic_to_json(json_to_dynamic(value.clone())), value);
    }
}
