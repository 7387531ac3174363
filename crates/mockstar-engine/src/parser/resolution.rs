use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::query::MockQuery;
use crate::error::EvaluationError;
use crate::model::{MockModule, Mocker};

/// A request as seen by the engine, already decoded by the server layer.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub path: String,
    pub method: Option<String>,
    pub query: MockQuery,
}

impl ResolveRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_query(mut self, query: MockQuery) -> Self {
        self.query = query;
        self
    }
}

/// Outcome of routing one request.
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    pub mocker: Arc<Mocker>,
    /// `None` when the mocker has no enabled module and no override applies
    pub mock_module: Option<Arc<MockModule>>,
    pub module_full_path: Option<PathBuf>,
    /// Parameters captured by the route pattern
    pub params: HashMap<String, String>,
    /// Mocking is disabled for this mocker; the caller should pass the
    /// request through
    pub bypass: bool,
}

impl ResolutionResult {
    /// Evaluate the selected module with route parameters merged under
    /// `extra`. Keys in `extra` win over route parameters.
    pub async fn evaluate(&self, extra: Option<&Value>) -> Option<Result<Value, EvaluationError>> {
        let module = self.mock_module.as_ref()?;
        let params = merge_params(&self.params, extra);
        Some(module.get_result(params.as_ref()).await)
    }
}

fn merge_params(route: &HashMap<String, String>, extra: Option<&Value>) -> Option<Value> {
    if route.is_empty() {
        return extra.cloned();
    }

    match extra {
        None => Some(Value::Object(route_object(route))),
        Some(Value::Object(fields)) => {
            let mut merged = route_object(route);
            merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(Value::Object(merged))
        }
        Some(other) => Some(other.clone()),
    }
}

fn route_object(route: &HashMap<String, String>) -> Map<String, Value> {
    route
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_params() {
        let mut route = HashMap::new();
        route.insert("id".to_string(), "42".to_string());

        assert_eq!(merge_params(&HashMap::new(), None), None);
        assert_eq!(merge_params(&route, None), Some(json!({"id": "42"})));
        assert_eq!(
            merge_params(&route, Some(&json!({"id": "7", "a": 1}))),
            Some(json!({"id": "7", "a": 1}))
        );
        assert_eq!(merge_params(&route, Some(&json!(3))), Some(json!(3)));
    }
}
