//! Name resolution for associations
//!
//! Associations are declared by group name but the platform links ids. Names
//! are resolved against the in-memory set of groups materialised in the
//! current pass, never against a live query, so every group must have an id
//! before any edge that references it is wired.

use std::collections::BTreeSet;
use thiserror::Error;

use aapkit::Group;

use crate::error::{EntityKind, Error, Result};
use crate::model::InventoryState;

/// A group name that could not be turned into an id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("group '{0}' not found")]
    NotFound(String),

    #[error("group name '{name}' is ambiguous (ids {ids:?})")]
    Ambiguous { name: String, ids: Vec<i64> },
}

/// Resolve a group name to its id within a working set
pub fn resolve_id(name: &str, groups: &[Group]) -> std::result::Result<i64, ResolveError> {
    let mut matches = groups.iter().filter(|g| g.name == name).map(|g| g.id);

    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (None, _) => Err(ResolveError::NotFound(name.to_string())),
        (Some(first), Some(second)) => {
            let mut ids = vec![first, second];
            ids.extend(matches);
            Err(ResolveError::Ambiguous {
                name: name.to_string(),
                ids,
            })
        }
    }
}

/// Reject declarations where two groups or two hosts share a name
pub fn validate_unique(state: &InventoryState) -> Result<()> {
    first_duplicate(state.groups.iter().map(|g| g.name.as_str()))
        .map(|name| (EntityKind::Group, name))
        .or_else(|| {
            first_duplicate(state.hosts.iter().map(|h| h.name.as_str()))
                .map(|name| (EntityKind::Host, name))
        })
        .map_or(Ok(()), |(kind, name)| {
            Err(Error::DuplicateName {
                kind,
                name: name.to_string(),
                inventory: state.name.clone(),
            })
        })
}

fn first_duplicate<'a>(mut names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = BTreeSet::new();
    names.find(|name| !seen.insert(*name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupState, HostState};

    fn group(id: i64, name: &str) -> Group {
        Group {
            id,
            inventory: 1,
            name: name.to_string(),
            description: String::new(),
            variables: None,
        }
    }

    #[test]
    fn test_resolve_found() {
        let groups = vec![group(10, "web"), group(11, "db")];
        assert_eq!(resolve_id("db", &groups), Ok(11));
    }

    #[test]
    fn test_resolve_not_found() {
        let groups = vec![group(10, "web")];
        assert_eq!(
            resolve_id("cache", &groups),
            Err(ResolveError::NotFound("cache".to_string()))
        );
        assert_eq!(
            resolve_id("web", &[]),
            Err(ResolveError::NotFound("web".to_string()))
        );
    }

    #[test]
    fn test_resolve_is_exact_match() {
        let groups = vec![group(10, "Web"), group(11, "web2")];
        assert!(resolve_id("web", &groups).is_err());
    }

    #[test]
    fn test_resolve_ambiguous() {
        let groups = vec![group(10, "web"), group(11, "db"), group(12, "web")];
        assert_eq!(
            resolve_id("web", &groups),
            Err(ResolveError::Ambiguous {
                name: "web".to_string(),
                ids: vec![10, 12],
            })
        );
    }

    #[test]
    fn test_validate_unique() {
        let mut state = InventoryState::new("lab");
        state.groups = vec![GroupState::new("a"), GroupState::new("b")];
        state.hosts = vec![HostState::new("a")];
        assert!(validate_unique(&state).is_ok());

        state.groups.push(GroupState::new("a"));
        match validate_unique(&state) {
            Err(Error::DuplicateName { kind, name, .. }) => {
                assert_eq!(kind, EntityKind::Group);
                assert_eq!(name, "a");
            }
            other => panic!("expected duplicate group, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_duplicate_host() {
        let mut state = InventoryState::new("lab");
        state.hosts = vec![HostState::new("h"), HostState::new("h")];
        assert!(matches!(
            validate_unique(&state),
            Err(Error::DuplicateName {
                kind: EntityKind::Host,
                ..
            })
        ));
    }
}
