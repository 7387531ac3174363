//! On-disk descriptors for mockers and folder modules.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// `route` accepts a single pattern or a list.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum RouteSpec {
    One(String),
    Many(Vec<String>),
}

impl RouteSpec {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            RouteSpec::One(route) => vec![route],
            RouteSpec::Many(routes) => routes,
        }
    }
}

/// Per-mocker descriptor, e.g. `demo_02/config.json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MockerDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "routes")]
    pub route: Option<RouteSpec>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub disable: bool,
    #[serde(default)]
    pub active_module: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Descriptor inside a folder module, e.g. `mock_modules/success_3/config.json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub disable: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Name of a registered native handler serving this module
    #[serde(default)]
    pub handler: Option<String>,
}

/// Read an optional JSON descriptor. A missing file yields the default; an
/// unreadable or malformed one is logged and also yields the default.
pub(crate) fn read_descriptor<T>(path: &Path) -> T
where
    T: Default + for<'de> Deserialize<'de>,
{
    if !path.is_file() {
        return T::default();
    }

    let parsed = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()));

    match parsed {
        Ok(descriptor) => descriptor,
        Err(e) => {
            tracing::warn!("Ignoring invalid descriptor {}: {}", path.display(), e);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mocker_descriptor_single_route() {
        let desc: MockerDescriptor =
            serde_json::from_str(r#"{"name": "renamed", "route": "/api/user"}"#).unwrap();
        assert_eq!(desc.name.as_deref(), Some("renamed"));
        assert_eq!(desc.route.unwrap().into_vec(), vec!["/api/user"]);
        assert!(!desc.disable);
    }

    #[test]
    fn test_mocker_descriptor_route_list_alias() {
        let desc: MockerDescriptor = serde_json::from_str(
            r#"{"routes": ["/a", "/b/:id"], "activeModule": "success", "tags": ["user"]}"#,
        )
        .unwrap();
        assert_eq!(desc.route.unwrap().into_vec(), vec!["/a", "/b/:id"]);
        assert_eq!(desc.active_module.as_deref(), Some("success"));
        assert_eq!(desc.tags, vec!["user"]);
    }

    #[test]
    fn test_module_descriptor_defaults() {
        let desc: ModuleDescriptor = serde_json::from_str("{}").unwrap();
        assert_eq!(desc, ModuleDescriptor::default());
    }

    #[test]
    fn test_invalid_descriptor_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let desc: MockerDescriptor = read_descriptor(&path);
        assert_eq!(desc, MockerDescriptor::default());
    }
}
