//! Error types for reconciliation

use std::fmt;
use thiserror::Error;

use crate::resolver::ResolveError;
use crate::variables::CodecError;

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciliation pass an error happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validate,
    Create,
    Update,
    Read,
    Delete,
    Plan,
    Snapshot,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validate => "validate",
            Self::Create => "create",
            Self::Update => "update",
            Self::Read => "read",
            Self::Delete => "delete",
            Self::Plan => "plan",
            Self::Snapshot => "snapshot",
        })
    }
}

/// Remote action that was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Get,
    Update,
    Delete,
    List,
    ListChildren,
    ListGroups,
    Associate,
    Disassociate,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Get => "get",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
            Self::ListChildren => "list children of",
            Self::ListGroups => "list groups of",
            Self::Associate => "associate",
            Self::Disassociate => "disassociate",
        })
    }
}

/// Kind of entity involved in a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Inventory,
    Group,
    Host,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inventory => "inventory",
            Self::Group => "group",
            Self::Host => "host",
        })
    }
}

/// Errors that abort a reconciliation pass
#[derive(Debug, Error)]
pub enum Error {
    /// A gateway call failed (transport or non-success status)
    #[error("{phase}: failed to {action} {kind} '{target}': {source}")]
    Gateway {
        phase: Phase,
        action: Action,
        kind: EntityKind,
        target: String,
        #[source]
        source: aapkit::Error,
    },

    /// A declared association names a group outside the working set
    #[error("{phase}: {kind} '{owner}': {source}")]
    Resolve {
        phase: Phase,
        kind: EntityKind,
        owner: String,
        #[source]
        source: ResolveError,
    },

    /// Variables could not be encoded or decoded
    #[error("{kind} '{name}': {source}")]
    Codec {
        kind: EntityKind,
        name: String,
        #[source]
        source: CodecError,
    },

    /// Two declared entities of the same kind share a name
    #[error("duplicate {kind} name '{name}' in inventory '{inventory}'")]
    DuplicateName {
        kind: EntityKind,
        name: String,
        inventory: String,
    },

    /// An operation needs the remote id carried in state
    #[error("{phase}: {kind} '{name}' has no id; it has not been created yet")]
    MissingId {
        phase: Phase,
        kind: EntityKind,
        name: String,
    },

    /// Configuration could not be loaded or is incomplete
    #[error("configuration error: {0}")]
    Config(String),

    /// Persisted state could not be read or written
    #[error("state error: {0}")]
    State(String),
}

impl Error {
    /// The underlying gateway error, if any
    pub fn gateway_error(&self) -> Option<&aapkit::Error> {
        match self {
            Self::Gateway { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Check if the failure was a remote 404
    pub fn is_not_found(&self) -> bool {
        self.gateway_error().is_some_and(aapkit::Error::is_not_found)
    }

    /// Check if re-running the pass may succeed without changing input
    pub fn is_retryable(&self) -> bool {
        self.gateway_error().is_some_and(aapkit::Error::is_retryable)
    }

    /// Phase the error was raised in, when it is tied to one
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Gateway { phase, .. }
            | Self::Resolve { phase, .. }
            | Self::MissingId { phase, .. } => Some(*phase),
            Self::DuplicateName { .. } => Some(Phase::Validate),
            _ => None,
        }
    }
}

/// Attach reconciliation context to gateway results
pub(crate) trait GatewayContext<T> {
    fn during(
        self,
        phase: Phase,
        action: Action,
        kind: EntityKind,
        target: impl fmt::Display,
    ) -> Result<T>;
}

impl<T> GatewayContext<T> for aapkit::Result<T> {
    fn during(
        self,
        phase: Phase,
        action: Action,
        kind: EntityKind,
        target: impl fmt::Display,
    ) -> Result<T> {
        self.map_err(|source| Error::Gateway {
            phase,
            action,
            kind,
            target: target.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_message_names_context() {
        let result: aapkit::Result<()> = Err(aapkit::Error::status(400, "bad"));
        let err = result
            .during(Phase::Update, Action::Associate, EntityKind::Group, "web -> db")
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "update: failed to associate group 'web -> db': status: 400, body: bad"
        );
        assert_eq!(err.phase(), Some(Phase::Update));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_and_retryable() {
        let not_found = Error::Gateway {
            phase: Phase::Read,
            action: Action::Get,
            kind: EntityKind::Inventory,
            target: "7".to_string(),
            source: aapkit::Error::status(404, "{}"),
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_retryable());

        let unavailable = Error::Gateway {
            phase: Phase::Read,
            action: Action::Get,
            kind: EntityKind::Inventory,
            target: "7".to_string(),
            source: aapkit::Error::status(503, ""),
        };
        assert!(unavailable.is_retryable());
    }

    #[test]
    fn test_missing_id_message() {
        let err = Error::MissingId {
            phase: Phase::Update,
            kind: EntityKind::Inventory,
            name: "lab".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "update: inventory 'lab' has no id; it has not been created yet"
        );
    }

    #[test]
    fn test_duplicate_name_is_validation() {
        let err = Error::DuplicateName {
            kind: EntityKind::Host,
            name: "h1".to_string(),
            inventory: "lab".to_string(),
        };
        assert_eq!(err.phase(), Some(Phase::Validate));
        assert!(err.to_string().contains("duplicate host name 'h1'"));
    }
}
