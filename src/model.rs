//! Declarative inventory state
//!
//! This is the shape callers declare and the shape persisted after an apply.
//! Ids are absent until the entity has been created remotely.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};
pub use crate::variables::Variables;

/// Desired or observed inventory with its groups and hosts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Owning organization; the configured default is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<i64>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Variables::is_empty")]
    pub variables: Variables,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupState>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<HostState>,
}

/// A group and the names of its child groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<i64>,

    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub children: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Variables::is_empty")]
    pub variables: Variables,
}

/// A host and the names of the groups it belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<i64>,

    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub groups: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Variables::is_empty")]
    pub variables: Variables,
}

impl InventoryState {
    /// Create an empty inventory declaration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a declaration from TOML
    ///
    /// ```
    /// let state = aap_inventory::InventoryState::from_toml_str(r#"
    /// name = "lab"
    ///
    /// [[groups]]
    /// name = "web"
    ///
    /// [[hosts]]
    /// name = "web1"
    /// groups = ["web"]
    /// "#).unwrap();
    /// assert_eq!(state.hosts[0].groups.len(), 1);
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::State(format!("invalid inventory declaration: {e}")))
    }

    /// Find a group by name
    pub fn group(&self, name: &str) -> Option<&GroupState> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Find a host by name
    pub fn host(&self, name: &str) -> Option<&HostState> {
        self.hosts.iter().find(|h| h.name == name)
    }

    /// Check declared names are unique per entity kind
    pub fn validate(&self) -> Result<()> {
        crate::resolver::validate_unique(self)
    }
}

impl GroupState {
    /// Create a group declaration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Declare child groups by name
    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }
}

impl HostState {
    /// Create a host declaration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Declare group membership by name
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_are_not_serialized() {
        let state = InventoryState {
            groups: vec![GroupState::new("web")],
            ..InventoryState::new("lab")
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"name":"lab","groups":[{"name":"web"}]}"#);
    }

    #[test]
    fn test_from_toml() {
        let state = InventoryState::from_toml_str(
            r#"
            name = "lab"
            organization = 2
            description = "staging"

            [variables]
            env = "staging"

            [[groups]]
            name = "all_web"
            children = ["web_eu", "web_us"]

            [[groups]]
            name = "web_eu"

            [[groups]]
            name = "web_us"

            [[hosts]]
            name = "eu1"
            groups = ["web_eu"]
            variables = { ansible_host = "10.0.0.1" }
            "#,
        )
        .unwrap();

        assert_eq!(state.organization, Some(2));
        assert_eq!(state.variables["env"], "staging");
        assert_eq!(state.groups.len(), 3);
        assert_eq!(
            state.group("all_web").unwrap().children,
            ["web_eu", "web_us"]
                .iter()
                .map(|s| (*s).to_string())
                .collect::<BTreeSet<_>>()
        );
        assert_eq!(state.host("eu1").unwrap().variables["ansible_host"], "10.0.0.1");
        assert!(state.id.is_none());
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(matches!(
            InventoryState::from_toml_str("name = "),
            Err(Error::State(_))
        ));
    }

    #[test]
    fn test_builders() {
        let group = GroupState::new("a").with_children(["b", "c", "b"]);
        assert_eq!(group.children.len(), 2);

        let host = HostState::new("h").with_groups(vec!["a".to_string()]);
        assert!(host.groups.contains("a"));
    }
}
