//! The consensus core: a single Paxos instance driving one replica's log.
//!
//! One method per protocol message, routed by whoever owns the `Transport`.
//! The bodies are ported from `paxos2bro.go`; deviations from its exact
//! behavior are noted inline and recorded in `DESIGN.md`.

use std::collections::BTreeMap;

use crate::ballot::Ballot;
use crate::command::{headers, Command, Reply, Request, Slot};
use crate::config::ClusterConfig;
use crate::entry::{Entry, EntryStatus, WireEntry};
use crate::log::Log;
use crate::message::PeerMessage;
use crate::node::NodeId;
use crate::quorum::QuorumTracker;
use crate::transport::Transport;

/// One replica's view of the replicated log, plus the proposer/acceptor
/// state needed to drive it forward. Owned exclusively by the dispatcher
/// task that also owns its `Transport` (spec §5) — nothing here takes a
/// lock.
pub struct Paxos<T: Transport> {
    transport: T,
    config: ClusterConfig,
    log: Log,
    /// Next slot to execute, in order.
    execute: Slot,
    /// Highest slot this replica has assigned or learned of.
    slot: Slot,
    /// True once this replica has observed a phase 1 quorum for `ballot`.
    active: bool,
    ballot: Ballot,
    /// Phase 1 quorum, reset on every new `p1a`.
    quorum: QuorumTracker,
    /// Client requests buffered while phase 1 is in flight.
    requests: Vec<Request>,
}

impl<T: Transport> Paxos<T> {
    pub fn new(transport: T, config: ClusterConfig) -> Self {
        Paxos {
            transport,
            config,
            log: Log::new(),
            execute: 0,
            slot: -1,
            active: false,
            ballot: Ballot::none(),
            quorum: QuorumTracker::new(),
            requests: Vec::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    pub fn ballot(&self) -> Ballot {
        self.ballot
    }

    pub fn execute_slot(&self) -> Slot {
        self.execute
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// The node whose ballot currently holds the proposer role.
    pub fn leader(&self) -> NodeId {
        self.ballot.id()
    }

    /// True once this replica may propose directly instead of forwarding.
    /// The original source hardcoded this to `false` ("TODO"); restored to
    /// the commented-out intent (active leader, or self holds the current
    /// ballot) per the redesign note in `DESIGN.md`.
    pub fn is_leader(&self) -> bool {
        self.active || self.ballot.id() == self.transport.node_id()
    }

    /// Entry point for a freshly received client request: proposes directly
    /// if this replica is an active leader, otherwise buffers it and kicks
    /// off phase 1 if no prepare is already in flight.
    pub fn handle_request(&mut self, request: Request) {
        if !self.active {
            let already_preparing = self.ballot.id() == self.transport.node_id();
            self.requests.push(request);
            if !already_preparing {
                self.p1a();
            }
        } else {
            self.p2a(request);
        }
    }

    /// Starts phase 1: a fresh, self-stamped ballot broadcast as `P1a`.
    pub fn p1a(&mut self) {
        if self.active {
            return;
        }
        let id = self.transport.node_id();
        self.ballot.next(id);
        self.quorum.reset();
        self.quorum.ack(id);
        self.transport.broadcast(PeerMessage::P1a { ballot: self.ballot });
    }

    /// True if any entry in the trailing `slide_window` slots before `slot`
    /// touches the same key as `request`. Entries this replica has no record
    /// of (holes) are treated as non-conflicting, matching the source.
    pub fn check_commutativity(&self, slot: Slot, request: &Request) -> bool {
        let start = (slot - self.config.slide_window as i64).max(0);
        let mut i = start;
        while i < slot {
            if let Some(entry) = self.log.get(i) {
                if entry.command.key == request.command.key {
                    return true;
                }
            }
            i += 1;
        }
        false
    }

    /// Starts phase 2 for a single request: assigns the next slot, records
    /// an `Accept` entry, and fans the proposal out to followers (subject to
    /// the thrifty multicast setting).
    pub fn p2a(&mut self, request: Request) {
        self.slot += 1;
        let slot = self.slot;
        // `check_commutativity` reports whether a same-key conflict was
        // found in the trailing window; spec §3 defines the stored flag as
        // the opposite ("true iff NO prior entry ... targets the same key"),
        // so negate here rather than at the predicate itself.
        let commutative = !self.check_commutativity(slot, &request);
        let self_id = self.transport.node_id();

        let mut entry = Entry::new_accepted(self.ballot, request.command.clone(), commutative, Some(request.clone()));
        entry.quorum.ack(self_id);
        self.log.insert(slot, entry);

        let msg = PeerMessage::P2a {
            id: self_id,
            ballot: self.ballot,
            slot,
            commutativity: commutative,
            command: request.command.clone(),
            request: Some(request),
            status: EntryStatus::Accept,
        };
        if self.config.thrifty {
            self.transport.multicast(self.config.thrifty_multicast_size(), msg);
        } else {
            self.transport.broadcast(msg);
        }
    }

    /// Acceptor side of phase 1: promises not to accept lower ballots and
    /// reports every uncommitted entry it holds in `[execute, slot]` so the
    /// new proposer can recover them.
    pub fn handle_p1a(&mut self, ballot: Ballot) {
        if ballot > self.ballot {
            self.ballot = ballot;
            self.active = false;
            self.forward();
        }

        let mut uncommitted = BTreeMap::new();
        let mut s = self.execute;
        while s <= self.slot {
            if let Some(entry) = self.log.get(s) {
                if !entry.is_committed() {
                    uncommitted.insert(s, (entry.command.clone(), entry.ballot));
                }
            }
            s += 1;
        }

        self.transport.send(
            ballot.id(),
            PeerMessage::P1b { ballot: self.ballot, id: self.transport.node_id(), log: uncommitted },
        );
    }

    /// Merges a peer's uncommitted-log report into this replica's own log,
    /// keeping the higher-ballotted command for any slot both sides know.
    fn update(&mut self, log: BTreeMap<Slot, (Command, Ballot)>) {
        for (s, (command, ballot)) in log {
            self.slot = self.slot.max(s);
            if let Some(entry) = self.log.get_mut(s) {
                if !entry.is_committed() && ballot > entry.ballot {
                    entry.ballot = ballot;
                    entry.command = command;
                }
            } else {
                self.log.insert(s, Entry::uncommitted(ballot, command));
            }
        }
    }

    /// Proposer side of phase 1: on a phase 1 quorum, becomes active,
    /// re-broadcasts any recovered uncommitted entries under the new
    /// ballot, then proposes every buffered request.
    pub fn handle_p1b(&mut self, ballot: Ballot, from: NodeId, log: BTreeMap<Slot, (Command, Ballot)>) {
        self.update(log);

        if ballot < self.ballot || self.active {
            return;
        }
        if ballot > self.ballot {
            self.ballot = ballot;
            self.active = false;
            self.forward();
        }

        if ballot.id() == self.transport.node_id() && ballot == self.ballot {
            self.quorum.ack(from);
            if self.quorum.majority(&self.config) {
                self.active = true;
                let self_id = self.transport.node_id();

                let mut s = self.execute;
                let through = self.slot;
                while s <= through {
                    if let Some(entry) = self.log.get_mut(s) {
                        if !entry.is_committed() {
                            entry.ballot = self.ballot;
                            entry.quorum = QuorumTracker::new();
                            entry.quorum.ack(self_id);
                            let msg = PeerMessage::P2a {
                                id: self_id,
                                ballot: self.ballot,
                                slot: s,
                                commutativity: entry.commutativity,
                                command: entry.command.clone(),
                                request: entry.request.clone(),
                                status: EntryStatus::Accept,
                            };
                            self.transport.broadcast(msg);
                        }
                    }
                    s += 1;
                }

                let pending = std::mem::take(&mut self.requests);
                for request in pending {
                    self.p2a(request);
                }
            }
        }
    }

    /// Acceptor side of phase 2: accepts (or refreshes) the entry at `slot`
    /// and always replies with a `P2b` carrying a wire snapshot, so a
    /// replica that never saw the matching `P2a` can still learn the slot
    /// from this message alone (the source left this branch commented out
    /// for one read mode and silent for the other; both are folded into one
    /// unconditional broadcast here, see `DESIGN.md`).
    pub fn handle_p2a(
        &mut self,
        id: NodeId,
        ballot: Ballot,
        slot: Slot,
        commutativity: bool,
        command: Command,
        request: Option<Request>,
        status: EntryStatus,
    ) {
        if ballot < self.ballot {
            return;
        }
        self.ballot = ballot;
        self.active = false;
        self.slot = slot;

        let self_id = self.transport.node_id();
        if let Some(entry) = self.log.get_mut(slot) {
            if !entry.is_committed() && ballot > entry.ballot {
                if entry.command != command {
                    if let Some(displaced) = entry.request.take() {
                        self.transport.forward(ballot.id(), displaced);
                    }
                }
                entry.command = command.clone();
                entry.ballot = ballot;
                entry.commutativity = commutativity;
                entry.request = request.clone();
                entry.status = status;
            }
            entry.quorum = QuorumTracker::new();
            entry.quorum.ack(self_id);
            entry.quorum.ack(id);
        } else {
            let mut entry = Entry::new_accepted(ballot, command.clone(), commutativity, request.clone());
            entry.status = status;
            entry.quorum.ack(self_id);
            entry.quorum.ack(id);
            self.log.insert(slot, entry);
        }

        let wire = self.log.get(slot).expect("entry was just accepted").to_wire();
        self.transport.broadcast(PeerMessage::P2b { ballot, id: self_id, slot, entry: wire });
    }

    /// Handles a phase 2 acknowledgement. The first report of a slot (this
    /// replica never saw the originating `P2a`) seeds a fresh entry from the
    /// wire snapshot with the reporter's ack counted; later reports
    /// accumulate into the existing entry's quorum until it commits.
    pub fn handle_p2b(&mut self, ballot: Ballot, id: NodeId, slot: Slot, wire_entry: WireEntry) {
        if slot < self.execute {
            return;
        }
        let self_id = self.transport.node_id();

        if !self.log.contains(slot) {
            let mut entry = Entry::from_wire(wire_entry);
            entry.quorum.ack(self_id);
            entry.quorum.ack(id);
            let committed = entry.quorum.majority(&self.config);
            if committed {
                entry.status = EntryStatus::Commit;
                entry.commit = true;
            }
            let command_for_p3 = entry.command.clone();
            self.log.insert(slot, entry);

            if committed {
                self.exec(slot);
                self.transport.broadcast(PeerMessage::P3 { ballot, slot: self.execute, command: command_for_p3 });
            }
            return;
        }

        let status = match self.log.get(slot) {
            Some(entry) => entry.status,
            None => return,
        };
        match status {
            EntryStatus::Accept => {
                let mut committed = false;
                if let Some(entry) = self.log.get_mut(slot) {
                    entry.quorum.ack(id);
                    if entry.quorum.majority(&self.config) {
                        entry.commit = true;
                        entry.status = EntryStatus::Commit;
                        committed = true;
                    }
                }
                if committed {
                    self.exec(slot);
                }
            }
            EntryStatus::Commit => self.exec(slot),
            EntryStatus::Execute => {}
        }
    }

    /// Phase 3: unconditional commit fan-out, also used to repair a replica
    /// that missed enough `P2b`s to reach its own quorum. Ported with one
    /// correction: the original shadowed its `exist` branch's entry pointer
    /// with a block-local variable, so an already-known slot was never
    /// actually advanced to `Commit`/executed by this handler — fixed here
    /// so both branches update the entry and call `exec` (see `DESIGN.md`).
    pub fn handle_p3(&mut self, _ballot: Ballot, slot: Slot, command: Command) {
        self.slot = self.slot.max(slot);
        let fallback_ballot = self.ballot;
        {
            let entry = self.log.entry_or_insert_with(slot, || Entry::uncommitted(fallback_ballot, command.clone()));
            entry.command = command;
            entry.status = EntryStatus::Commit;
            entry.commit = true;
        }
        self.exec(slot);
    }

    /// Executes against the state machine, either out of order within the
    /// sliding window (only replying when the entry is flagged commutative)
    /// or strictly in order otherwise. Matches the source's choice to
    /// advance the in-order cursor by at most one slot per call; callers
    /// that commit a run of slots call `exec` once per newly committed slot.
    pub fn exec(&mut self, s: Slot) {
        let self_id = self.transport.node_id();
        let max_slot = self.execute + self.config.slide_window as i64;

        if s > self.execute && s <= max_slot {
            let snapshot = match self.log.get(s) {
                Some(entry) if entry.status == EntryStatus::Commit => {
                    Some((entry.command.clone(), entry.commutativity, entry.request.clone()))
                }
                _ => None,
            };
            let (command, commutativity, request) = match snapshot {
                Some(v) => v,
                None => return,
            };

            let value = self.transport.state_machine().apply(&command);
            if let Some(entry) = self.log.get_mut(s) {
                entry.status = EntryStatus::Execute;
            }
            if commutativity {
                if let Some(request) = request {
                    let reply = Reply::new(command, value).with_property(headers::NODE_ID, self_id.to_string());
                    self.transport.reply(request.client_id(), reply);
                    if let Some(entry) = self.log.get_mut(s) {
                        entry.request = None;
                    }
                }
            }
            return;
        }

        let ready = match self.log.get(self.execute) {
            Some(entry) if entry.status == EntryStatus::Execute => {
                self.execute += 1;
                return;
            }
            Some(entry) => Some((entry.command.clone(), entry.request.clone())),
            None => None,
        };
        let (command, request) = match ready {
            Some(v) => v,
            None => return,
        };

        let slot = self.execute;
        let value = self.transport.state_machine().apply(&command);
        if let Some(entry) = self.log.get_mut(slot) {
            entry.status = EntryStatus::Execute;
        }
        self.execute += 1;
        if let Some(request) = request {
            let reply = Reply::new(command, value).with_property(headers::NODE_ID, self_id.to_string());
            self.transport.reply(request.client_id(), reply);
            if let Some(entry) = self.log.get_mut(slot) {
                entry.request = None;
            }
        }
    }

    /// Forwards every buffered client request to the node the current
    /// ballot belongs to, then clears the buffer.
    pub fn forward(&mut self) {
        let pending = std::mem::take(&mut self.requests);
        let leader = self.ballot.id();
        for request in pending {
            self.transport.forward(leader, request);
        }
    }

    /// Single entry point for peer messages, dispatched by whoever drives
    /// this replica's network loop.
    pub fn handle_peer_message(&mut self, from: NodeId, msg: PeerMessage) {
        match msg {
            PeerMessage::P1a { ballot } => self.handle_p1a(ballot),
            PeerMessage::P1b { ballot, id, log } => self.handle_p1b(ballot, id, log),
            PeerMessage::P2a { id, ballot, slot, commutativity, command, request, status } => {
                self.handle_p2a(id, ballot, slot, commutativity, command, request, status)
            }
            PeerMessage::P2b { ballot, id, slot, entry } => self.handle_p2b(ballot, id, slot, entry),
            PeerMessage::P3 { ballot, slot, command } => self.handle_p3(ballot, slot, command),
            PeerMessage::PullRequest { id, slots } => {
                log::warn!("replica {} received an unsupported PullRequest from {} for {:?}", self.transport.node_id(), id, slots);
                let _ = from;
            }
            PeerMessage::PushRequest { id, entries } => {
                log::warn!("replica {} received an unsupported PushRequest from {} with {} entries", self.transport.node_id(), id, entries.len());
            }
        }
    }
}
