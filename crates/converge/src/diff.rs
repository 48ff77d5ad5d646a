//! Diff computation between declared and observed state

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Difference between a declared membership set and the members observed
/// remotely.
///
/// Members are compared by key (usually a name). Keys present on both sides
/// produce no change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipDiff<'a, K, T> {
    /// Declared keys with no matching observed member
    pub to_add: Vec<&'a K>,
    /// Observed members whose key is not declared
    pub to_remove: Vec<&'a T>,
}

impl<K, T> MembershipDiff<'_, K, T> {
    /// Check if the sets already agree
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Number of pairwise operations needed to converge
    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

/// Compute the symmetric difference between declared keys and observed members
///
/// # Example
///
/// ```
/// use converge::membership_diff;
/// use std::collections::BTreeSet;
///
/// let desired: BTreeSet<String> = ["b", "c", "d"].iter().map(|s| s.to_string()).collect();
/// let current = vec!["a".to_string(), "b".to_string(), "c".to_string()];
///
/// let diff = membership_diff(&desired, &current, |m| m);
/// assert_eq!(diff.to_add, vec!["d"]);
/// assert_eq!(diff.to_remove, vec!["a"]);
/// ```
pub fn membership_diff<'a, K, T, F>(
    desired: &'a BTreeSet<K>,
    current: &'a [T],
    key: F,
) -> MembershipDiff<'a, K, T>
where
    K: Ord,
    F: Fn(&T) -> &K,
{
    let observed: BTreeSet<&K> = current.iter().map(&key).collect();

    MembershipDiff {
        to_add: desired.iter().filter(|k| !observed.contains(k)).collect(),
        to_remove: current
            .iter()
            .filter(|&member| !desired.contains(key(member)))
            .collect(),
    }
}

/// What to do with a declared entity given the identities observed remotely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition<Id> {
    /// No carried identity, or it no longer exists remotely
    Create,
    /// The carried identity exists remotely
    Update(Id),
}

impl<Id> Disposition<Id> {
    /// Check if the entity will be created
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create)
    }
}

/// Decide between create and update for one declared entity
///
/// Keyed by identity, not by name: an entity whose carried id vanished
/// out-of-band falls back to create.
pub fn disposition<Id: Ord + Copy>(
    carried: Option<Id>,
    observed: &BTreeSet<Id>,
) -> Disposition<Id> {
    match carried {
        Some(id) if observed.contains(&id) => Disposition::Update(id),
        _ => Disposition::Create,
    }
}

/// Observed entities whose identity is not among the reconciled ones
pub fn orphans<'a, T, Id, F>(current: &'a [T], reconciled: &BTreeSet<Id>, id: F) -> Vec<&'a T>
where
    Id: Ord,
    F: Fn(&T) -> Id,
{
    current
        .iter()
        .filter(|&item| !reconciled.contains(&id(item)))
        .collect()
}
