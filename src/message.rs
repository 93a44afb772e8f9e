use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ballot::Ballot;
use crate::command::{Command, Request, Slot};
use crate::entry::{EntryStatus, WireEntry};
use crate::node::NodeId;

/// The peer-to-peer protocol message set, ported field-for-field from
/// `rlpaxos/msg.go`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PeerMessage {
    /// Phase 1a: prepare.
    P1a { ballot: Ballot },
    /// Phase 1b: promise, carrying every uncommitted entry this replica
    /// knows about in `[execute, slot]`.
    P1b {
        ballot: Ballot,
        id: NodeId,
        log: BTreeMap<Slot, (Command, Ballot)>,
    },
    /// Phase 2a: accept.
    P2a {
        id: NodeId,
        ballot: Ballot,
        slot: Slot,
        commutativity: bool,
        command: Command,
        request: Option<Request>,
        status: EntryStatus,
    },
    /// Phase 2b: accepted, carrying a wire snapshot of the entry so a
    /// late-joining replica can learn the slot from this message alone
    /// (spec §9 Open Question 2).
    P2b {
        ballot: Ballot,
        id: NodeId,
        slot: Slot,
        entry: WireEntry,
    },
    /// Phase 3: commit fan-out.
    P3 { ballot: Ballot, slot: Slot, command: Command },
    /// Log-hole repair request. Registered but not wired into the core path
    /// (spec §6) — a receiving replica logs a warning and otherwise no-ops.
    PullRequest { id: NodeId, slots: Vec<Slot> },
    /// Log-hole repair response. Same status as `PullRequest`.
    PushRequest { id: NodeId, entries: BTreeMap<Slot, WireEntry> },
}

impl PeerMessage {
    pub fn ballot(&self) -> Option<Ballot> {
        match self {
            PeerMessage::P1a { ballot }
            | PeerMessage::P1b { ballot, .. }
            | PeerMessage::P2a { ballot, .. }
            | PeerMessage::P2b { ballot, .. }
            | PeerMessage::P3 { ballot, .. } => Some(*ballot),
            PeerMessage::PullRequest { .. } | PeerMessage::PushRequest { .. } => None,
        }
    }
}
