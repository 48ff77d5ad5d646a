//! Core types for reconciliation bookkeeping

use serde::{Deserialize, Serialize};

/// A single remote change made while converging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    /// Entity was created
    Created,
    /// Entity was rewritten in place
    Updated,
    /// Entity was deleted
    Deleted,
    /// A membership edge was added
    Associated,
    /// A membership edge was removed
    Disassociated,
}

impl Change {
    /// Check if the change touches membership rather than entities
    pub fn is_association(&self) -> bool {
        matches!(self, Self::Associated | Self::Disassociated)
    }
}

/// Summary of reconciliation results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub associated: usize,
    pub disassociated: usize,
}

impl ReconcileSummary {
    /// Total number of structural changes made
    ///
    /// Updates are excluded: declared entities are always rewritten, so a
    /// converged run still reports them.
    pub fn total_changes(&self) -> usize {
        self.created + self.deleted + self.associated + self.disassociated
    }

    /// Check if no structural change was needed
    pub fn is_converged(&self) -> bool {
        self.total_changes() == 0
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ReconcileSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.associated += other.associated;
        self.disassociated += other.disassociated;
    }

    /// Add a change to the summary
    pub fn record(&mut self, change: Change) {
        match change {
            Change::Created => self.created += 1,
            Change::Updated => self.updated += 1,
            Change::Deleted => self.deleted += 1,
            Change::Associated => self.associated += 1,
            Change::Disassociated => self.disassociated += 1,
        }
    }
}

impl std::fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted, {} associated, {} disassociated",
            self.created, self.updated, self.deleted, self.associated, self.disassociated
        )
    }
}
