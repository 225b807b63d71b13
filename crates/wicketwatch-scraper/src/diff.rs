//! Snapshot diffing between discovery cycles.

use std::collections::HashSet;
use wicketwatch_core::MatchId;

/// Added/removed identifier sets between two discovery snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Identifiers present now but not in the previous snapshot.
    pub added: HashSet<MatchId>,
    /// Identifiers present previously but missing now.
    pub removed: HashSet<MatchId>,
}

impl SnapshotDiff {
    /// True when nothing was added or removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute the set difference between the persisted snapshot and the
/// freshly scraped one.
///
/// First-run rule: when `previous` is empty, the whole of `current` is
/// treated as added and nothing as removed. Cold persistence is
/// indistinguishable from "everything is new", so a refresh after a wipe
/// restarts every worker rather than stopping any.
#[must_use]
pub fn diff(previous: &HashSet<MatchId>, current: &HashSet<MatchId>) -> SnapshotDiff {
    if previous.is_empty() {
        return SnapshotDiff {
            added: current.clone(),
            removed: HashSet::new(),
        };
    }

    SnapshotDiff {
        added: current.difference(previous).cloned().collect(),
        removed: previous.difference(current).cloned().collect(),
    }
}
