use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseBallotError;
use crate::node::NodeId;

/// A monotone `(counter, node_id)` pair used to totally order proposals.
///
/// Comparison is lexicographic on `(counter, node_id)`. `Ballot::none()` compares
/// below every ballot a real proposer ever generates, since node ids start
/// counting from zone/index `(0, 0)` only as the sentinel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ballot {
    pub counter: u64,
    pub node_id: NodeId,
}

impl Ballot {
    pub const fn new(counter: u64, node_id: NodeId) -> Self {
        Ballot { counter, node_id }
    }

    /// The distinguished "no ballot observed yet" value.
    pub const fn none() -> Self {
        Ballot { counter: 0, node_id: NodeId::none() }
    }

    pub fn is_none(&self) -> bool {
        *self == Ballot::none()
    }

    /// Advances this ballot to a fresh, self-owned value: one higher than the
    /// highest counter observed so far, stamped with `self_id`.
    pub fn next(&mut self, self_id: NodeId) {
        self.counter += 1;
        self.node_id = self_id;
    }

    pub fn id(&self) -> NodeId {
        self.node_id
    }
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.counter, self.node_id)
    }
}

impl FromStr for Ballot {
    type Err = ParseBallotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '.');
        let counter: u64 = parts
            .next()
            .ok_or_else(|| ParseBallotError(s.to_string()))?
            .parse()
            .map_err(|_| ParseBallotError(s.to_string()))?;
        let rest = parts.next().ok_or_else(|| ParseBallotError(s.to_string()))?;
        let node_id: NodeId = rest.parse().map_err(|_| ParseBallotError(s.to_string()))?;
        Ok(Ballot { counter, node_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_below_any_real_ballot() {
        let b = Ballot::new(1, NodeId::new(1, 1));
        assert!(Ballot::none() < b);
    }

    #[test]
    fn next_increments_and_stamps_self() {
        let mut b = Ballot::new(4, NodeId::new(2, 7));
        b.next(NodeId::new(1, 1));
        assert_eq!(b, Ballot::new(5, NodeId::new(1, 1)));
    }

    #[test]
    fn compares_counter_before_node() {
        assert!(Ballot::new(1, NodeId::new(9, 9)) < Ballot::new(2, NodeId::new(0, 0)));
        assert!(Ballot::new(2, NodeId::new(0, 0)) < Ballot::new(2, NodeId::new(0, 1)));
    }

    #[test]
    fn round_trips_through_string() {
        let b = Ballot::new(8, NodeId::new(2, 1));
        assert_eq!("8.2.1", b.to_string());
        assert_eq!(Ok(b), "8.2.1".parse());
    }
}
