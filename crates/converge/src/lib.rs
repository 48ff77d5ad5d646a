//! # Converge
//!
//! Primitives for converging remote collections toward a declared state.
//!
//! ## Core Concepts
//!
//! - **Disposition**: whether a declared entity is created or updated, keyed
//!   by the identity it carries
//! - **Orphans**: observed entities no reconciled identity claims
//! - **MembershipDiff**: declared member keys versus observed members
//! - **ReconcileSummary**: counts of the changes a run made
//!
//! ## Example
//!
//! ```
//! use converge::{disposition, orphans, Disposition};
//! use std::collections::BTreeSet;
//!
//! let observed: BTreeSet<i64> = [1, 2].into_iter().collect();
//! assert_eq!(disposition(Some(2), &observed), Disposition::Update(2));
//! assert_eq!(disposition(Some(7), &observed), Disposition::Create);
//!
//! let current = vec![1_i64, 2, 3];
//! let reconciled: BTreeSet<i64> = [1, 3].into_iter().collect();
//! assert_eq!(orphans(&current, &reconciled, |id| *id), vec![&2]);
//! ```

pub mod diff;
pub mod types;

pub use diff::{Disposition, MembershipDiff, disposition, membership_diff, orphans};
pub use types::{Change, ReconcileSummary};
