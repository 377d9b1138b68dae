//! Per-node fetch state machine
//!
//! `Unfetched -> Fetching -> Fetched`, with `Fetching -> Unfetched` on failure.
//! Expanding or collapsing a fetched node is a display change, not a
//! transition on this axis.

use crate::error::TreeError;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// Fetch status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Children never requested (or last request failed)
    Unfetched,
    /// Request in flight
    Fetching,
    /// Children attached; never re-requested
    Fetched,
}

impl NodeStatus {
    /// Check if a new fetch may start from this status
    #[inline]
    #[must_use]
    pub fn can_fetch(self) -> bool {
        matches!(self, Self::Unfetched)
    }
}

/// Statuses reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: NodeStatus) -> &'static [NodeStatus] {
    use NodeStatus::{Fetched, Fetching, Unfetched};
    match from {
        Unfetched => &[Fetching],
        Fetching => &[Fetched, Unfetched],
        Fetched => &[],
    }
}

/// Validates a status transition for `node`.
pub fn validate_transition(
    node: NodeId,
    from: NodeStatus,
    to: NodeStatus,
) -> Result<(), TreeError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        tracing::debug!(%node, ?from, ?to, "rejected status transition");
        Err(TreeError::IllegalTransition { node, from, to })
    }
}
