use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseIdError;

/// A replica identity, partitioned into a zone and an index within that zone.
///
/// Only the zone half is consulted by the quorum tracker's zone predicates; the
/// core ballot/accept/commit path treats a `NodeId` as an opaque, totally ordered
/// token. Renders as `"zone.index"`, matching the `--id` flag format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub zone: u32,
    pub index: u32,
}

impl NodeId {
    pub const fn new(zone: u32, index: u32) -> Self {
        NodeId { zone, index }
    }

    /// The distinguished "no node" id, used only as part of `Ballot::none()`.
    pub const fn none() -> Self {
        NodeId { zone: 0, index: 0 }
    }

    pub fn zone(&self) -> u32 {
        self.zone
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.zone, self.index)
    }
}

impl FromStr for NodeId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '.');
        let zone = parts
            .next()
            .ok_or_else(|| ParseIdError(s.to_string()))?
            .parse()
            .map_err(|_| ParseIdError(s.to_string()))?;
        let index = parts
            .next()
            .ok_or_else(|| ParseIdError(s.to_string()))?
            .parse()
            .map_err(|_| ParseIdError(s.to_string()))?;
        Ok(NodeId { zone, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        let id = NodeId::new(1, 3);
        assert_eq!("1.3", id.to_string());
        assert_eq!(Ok(id), "1.3".parse());
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!("1".parse::<NodeId>().is_err());
        assert!("a.b".parse::<NodeId>().is_err());
    }

    #[test]
    fn orders_by_zone_then_index() {
        assert!(NodeId::new(1, 9) < NodeId::new(2, 0));
        assert!(NodeId::new(1, 1) < NodeId::new(1, 2));
    }
}
