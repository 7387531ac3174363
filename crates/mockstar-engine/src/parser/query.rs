//! Per-request override list sent by clients.

use serde::{Deserialize, Serialize};

/// Overrides module selection for one mocker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockQueryItem {
    pub mocker_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_module_name: Option<String>,
    /// Bypass mocking for this mocker
    #[serde(default, alias = "shouldDisableMatman")]
    pub should_disable: bool,
}

/// Ordered override list, serialized as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MockQuery {
    items: Vec<MockQueryItem>,
}

impl MockQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_one(
        &mut self,
        mocker_name: impl Into<String>,
        mock_module_name: Option<&str>,
        should_disable: bool,
    ) -> &mut Self {
        self.items.push(MockQueryItem {
            mocker_name: mocker_name.into(),
            mock_module_name: mock_module_name.map(str::to_string),
            should_disable,
        });
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> String {
        // A Vec of plain structs cannot fail to serialize.
        serde_json::to_string(&self.items).unwrap_or_else(|_| "[]".to_string())
    }

    /// Override for `mocker_name`; the last matching item wins.
    pub fn find(&self, mocker_name: &str) -> Option<&MockQueryItem> {
        self.items.iter().rev().find(|item| item.mocker_name == mocker_name)
    }

    pub fn items(&self) -> &[MockQueryItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_client_payload() {
        let query = MockQuery::from_json(
            r#"[{"mockerName":"demo_01","mockModuleName":"error","shouldDisableMatman":false},
                {"mockerName":"demo_03_post","shouldDisable":true}]"#,
        )
        .unwrap();

        let item = query.find("demo_01").unwrap();
        assert_eq!(item.mock_module_name.as_deref(), Some("error"));
        assert!(!item.should_disable);
        assert!(query.find("demo_03_post").unwrap().should_disable);
        assert!(query.find("other").is_none());
    }

    #[test]
    fn test_last_item_wins() {
        let mut query = MockQuery::new();
        query
            .add_one("demo_01", Some("error"), false)
            .add_one("demo_01", Some("success"), false);
        assert_eq!(
            query.find("demo_01").unwrap().mock_module_name.as_deref(),
            Some("success")
        );
    }

    #[test]
    fn test_to_json_is_array() {
        let mut query = MockQuery::new();
        query.add_one("a", None, true);
        assert_eq!(query.to_json(), r#"[{"mockerName":"a","shouldDisable":true}]"#);
        assert_eq!(MockQuery::from_json(&query.to_json()).unwrap(), query);
    }
}
