use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::ballot::Ballot;
use crate::command::{Command, Request};
use crate::quorum::QuorumTracker;

/// Per-slot lifecycle state. Transitions only move forward:
/// `Accept -> Commit -> Execute` (invariant 2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryStatus {
    Accept,
    Commit,
    Execute,
}

impl EntryStatus {
    /// The `"accept" | "committed" | "executed"` spelling used in reply
    /// headers (spec §6 `KeyStatus`).
    pub fn as_header_str(&self) -> &'static str {
        match self {
            EntryStatus::Accept => "accept",
            EntryStatus::Commit => "committed",
            EntryStatus::Execute => "executed",
        }
    }
}

/// The serializable subset of an [`Entry`] exchanged on the wire: inside
/// `P1b`'s uncommitted-log map and inside `P2b`'s entry snapshot. The
/// `quorum` tracker and `request` back-reference are local-only and never
/// cross the wire (spec §3, §9 Design Notes).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEntry {
    pub ballot: Ballot,
    pub command: Command,
    pub commutativity: bool,
    pub status: EntryStatus,
}

/// A single log slot's full local state.
#[derive(Clone, Debug)]
pub struct Entry {
    pub ballot: Ballot,
    pub command: Command,
    pub commutativity: bool,
    pub status: EntryStatus,
    /// Redundant with `status >= Commit`; preserved for compatibility with
    /// the original source's separate `Commit bool` field.
    pub commit: bool,
    pub request: Option<Request>,
    pub quorum: QuorumTracker,
    pub timestamp: SystemTime,
}

impl Entry {
    pub fn new_accepted(ballot: Ballot, command: Command, commutativity: bool, request: Option<Request>) -> Self {
        Entry {
            ballot,
            command,
            commutativity,
            status: EntryStatus::Accept,
            commit: false,
            request,
            quorum: QuorumTracker::new(),
            timestamp: SystemTime::now(),
        }
    }

    /// An entry learned only from a peer's promise/commit, with no local
    /// request attached and no quorum progress yet.
    pub fn uncommitted(ballot: Ballot, command: Command) -> Self {
        Entry {
            ballot,
            command,
            commutativity: false,
            status: EntryStatus::Accept,
            commit: false,
            request: None,
            quorum: QuorumTracker::new(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn is_committed(&self) -> bool {
        self.status >= EntryStatus::Commit
    }

    pub fn to_wire(&self) -> WireEntry {
        WireEntry {
            ballot: self.ballot,
            command: self.command.clone(),
            commutativity: self.commutativity,
            status: self.status,
        }
    }

    pub fn from_wire(wire: WireEntry) -> Self {
        Entry {
            ballot: wire.ballot,
            command: wire.command,
            commutativity: wire.commutativity,
            status: wire.status,
            commit: wire.status >= EntryStatus::Commit,
            request: None,
            quorum: QuorumTracker::new(),
            timestamp: SystemTime::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;

    #[test]
    fn status_is_monotone_by_value() {
        assert!(EntryStatus::Accept < EntryStatus::Commit);
        assert!(EntryStatus::Commit < EntryStatus::Execute);
    }

    #[test]
    fn wire_round_trip_drops_local_only_fields() {
        let cmd = Command::write("a", "1", 1, 1);
        let entry = Entry::new_accepted(Ballot::new(1, NodeId::new(1, 1)), cmd.clone(), true, None);
        let wire = entry.to_wire();
        let restored = Entry::from_wire(wire);
        assert_eq!(restored.command, cmd);
        assert!(restored.request.is_none());
        assert_eq!(0, restored.quorum.size());
    }
}
