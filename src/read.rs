//! The read-serving paths: the replica-side snapshot (`serve_read`) and the
//! five client-side read modes, ported from `rlpaxos/replica.go`'s
//! `readInProgress` and `rlpaxos/client.go`'s `read*` family.

use log::error;
use rand::seq::SliceRandom;

use crate::command::{headers, Command, Reply, Slot};
use crate::config::ClusterConfig;
use crate::entry::EntryStatus;
use crate::error::MalformedHeader;
use crate::node::NodeId;
use crate::paxos::Paxos;
use crate::transport::Transport;

/// The snapshot a replica computes locally for a read command, without
/// entering the log (spec §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadSnapshot {
    pub value: crate::command::Value,
    /// The most recent slot touching this key, or `-1` if none is in the log.
    pub key_slot: Slot,
    /// `"accept" | "committed" | "executed" | ""`.
    pub key_status: &'static str,
    pub in_progress: bool,
}

/// Scans the log from `slot` down to `execute` for the first entry touching
/// `command`'s key; falls back to the state machine if none is found.
/// Mirrors `readInProgress`: a hit anywhere in the scanned range counts as
/// "in progress" regardless of the entry's own status, matching the source's
/// unconditional `true` on the matching branch.
pub fn serve_read<T: Transport>(paxos: &mut Paxos<T>, command: &Command) -> ReadSnapshot {
    let high = paxos.slot();
    let low = paxos.execute_slot();
    if let Some((slot, entry)) = paxos.log().most_recent_touching(high, low, &command.key) {
        return ReadSnapshot {
            value: entry.command.value.clone(),
            key_slot: slot,
            key_status: entry.status.as_header_str(),
            in_progress: true,
        };
    }
    let value = paxos.transport_mut().state_machine().get(&command.key);
    ReadSnapshot { value, key_slot: -1, key_status: "", in_progress: false }
}

/// Stamps a read reply with the full header set of spec §6, built from the
/// replica's current proposer state plus the computed [`ReadSnapshot`].
pub fn read_reply<T: Transport>(paxos: &Paxos<T>, command: &Command, snapshot: &ReadSnapshot) -> Reply {
    let self_id = paxos.transport().node_id();
    let hole = paxos.log().hole_map(paxos.execute_slot(), paxos.slot());
    let hole_json = serde_json::to_string(&hole).unwrap_or_else(|_| "{}".to_string());
    Reply::new(command.clone(), snapshot.value.clone())
        .with_property(headers::NODE_ID, self_id.to_string())
        .with_property(headers::SLOT, paxos.slot().to_string())
        .with_property(headers::KEY_SLOT, snapshot.key_slot.to_string())
        .with_property(headers::KEY_STATUS, snapshot.key_status)
        .with_property(headers::BALLOT, paxos.ballot().to_string())
        .with_property(headers::EXECUTE, (paxos.execute_slot() - 1).to_string())
        .with_property(headers::IN_PROGRESS, snapshot.in_progress.to_string())
        .with_property(headers::HOLE, hole_json)
}

/// Client-facing contract for issuing a read to one or more replicas,
/// standing in for the source's `HTTPClient.RESTGet`/`QuorumGet` (spec §6,
/// out of scope as a collaborator but needed to express the read modes).
pub trait ReadTransport {
    /// Sends a read for `key` to a specific replica and returns its reply.
    fn get_from(&mut self, node: NodeId, key: &crate::command::Key) -> Option<Reply>;

    /// Sends a read for `key` to every node in the cluster and returns every
    /// reply received (absent/unreachable replicas are simply missing from
    /// the result, per spec §7's "never fail the whole read").
    fn get_quorum(&mut self, cfg: &ClusterConfig, key: &crate::command::Key) -> Vec<(NodeId, Reply)>;

    /// A uniformly random member of the cluster, used by the quorum/RFL
    /// barrier-polling loop (mirrors `RESTGet("", key)`'s random-node pick).
    fn random_node(&mut self, cfg: &ClusterConfig) -> NodeId;
}

/// Tracks the ballot a `leader`/`local`-mode client has last observed, so
/// subsequent reads target that node directly instead of the statically
/// configured one (spec §4.4).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClientReadState {
    ballot: Option<crate::ballot::Ballot>,
}

fn parse_header<V: std::str::FromStr>(reply: &Reply, from: NodeId, header: &'static str) -> Option<V> {
    match reply.property(header) {
        Some(raw) => match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                let err = MalformedHeader { header, value: raw.to_string(), from };
                error!("{err}");
                None
            }
        },
        None => None,
    }
}

impl ClientReadState {
    pub fn new() -> Self {
        ClientReadState::default()
    }

    /// `leader`/`local`: single round-trip to the last-known ballot holder
    /// (or `designated` on the first read), adopting any higher ballot the
    /// reply carries.
    pub fn read_leader<R: ReadTransport>(
        &mut self,
        transport: &mut R,
        designated: NodeId,
        key: &crate::command::Key,
    ) -> Option<crate::command::Value> {
        let target = self.ballot.map(|b| b.id()).unwrap_or(designated);
        let reply = transport.get_from(target, key)?;
        if let Some(b) = parse_header::<crate::ballot::Ballot>(&reply, target, headers::BALLOT) {
            if self.ballot.map_or(true, |cur| b > cur) {
                self.ballot = Some(b);
            }
        }
        Some(reply.value)
    }

    /// `any`: single round-trip to `self_id`, with no linearization guarantee.
    pub fn read_any<R: ReadTransport>(
        &mut self,
        transport: &mut R,
        self_id: NodeId,
        key: &crate::command::Key,
    ) -> Option<crate::command::Value> {
        transport.get_from(self_id, key).map(|r| r.value)
    }

    /// `quorum`: read a majority, pick the value at the highest reported
    /// slot, and if the key was still in progress poll random replicas'
    /// `execute` header until it clears the barrier or a majority reaches it.
    pub fn read_quorum<R: ReadTransport>(
        &mut self,
        transport: &mut R,
        cfg: &ClusterConfig,
        key: &crate::command::Key,
    ) -> Option<crate::command::Value> {
        let majority = cfg.n() / 2 + 1;
        let replies = transport.get_quorum(cfg, key);

        let mut barrier: Slot = -1;
        let mut reached_barrier = 0usize;
        let mut in_progress = 0usize;
        let mut value = crate::command::Value::new();

        for (from, reply) in &replies {
            let slot = match parse_header::<Slot>(reply, *from, headers::SLOT) {
                Some(s) => s,
                None => continue,
            };
            let progressing = parse_header::<bool>(reply, *from, headers::IN_PROGRESS).unwrap_or(false);
            if progressing {
                in_progress += 1;
            }
            if slot > barrier {
                barrier = slot;
                reached_barrier = 1;
                value = reply.value.clone();
            } else if slot == barrier {
                reached_barrier += 1;
            }
        }

        self.poll_until_barrier(transport, cfg, key, barrier, &mut in_progress, &mut reached_barrier, majority);
        Some(value)
    }

    /// `RFL`: like `quorum` but barriers on `key_slot` (the most recent slot
    /// touching this key) instead of the highest slot seen, and short-circuits
    /// if any replica already reports the barrier slot as executed.
    pub fn read_follower_linearizable<R: ReadTransport>(
        &mut self,
        transport: &mut R,
        cfg: &ClusterConfig,
        key: &crate::command::Key,
    ) -> Option<crate::command::Value> {
        let majority = cfg.n() / 2 + 1;
        let replies = transport.get_quorum(cfg, key);

        let mut key_barrier: Slot = -1;
        let mut reached_key_barrier = 0usize;
        let mut value = crate::command::Value::new();
        let mut statuses: Vec<(Slot, String)> = Vec::new();

        for (from, reply) in &replies {
            let key_slot = parse_header::<Slot>(reply, *from, headers::KEY_SLOT).unwrap_or(-1);
            let status = reply.property(headers::KEY_STATUS).unwrap_or("").to_string();
            statuses.push((key_slot, status));
            if key_slot > key_barrier {
                key_barrier = key_slot;
                reached_key_barrier = 1;
                value = reply.value.clone();
            } else if key_slot == key_barrier {
                reached_key_barrier += 1;
            }
        }

        if reached_key_barrier >= majority {
            return Some(value);
        }
        if statuses.iter().any(|(slot, status)| *slot == key_barrier && status == "executed") {
            return Some(value);
        }

        let mut barrier = key_barrier;
        let mut reached_barrier = 0usize;
        let mut in_progress = 1usize;
        self.poll_until_barrier(transport, cfg, key, barrier, &mut in_progress, &mut reached_barrier, majority);
        let _ = &mut barrier;
        Some(value)
    }

    /// Shared barrier-polling loop used by `quorum` and `RFL`: repeatedly
    /// reads a random replica's `Execute` header until it clears `barrier`,
    /// counting replicas whose own highest slot has also reached it.
    fn poll_until_barrier<R: ReadTransport>(
        &mut self,
        transport: &mut R,
        cfg: &ClusterConfig,
        key: &crate::command::Key,
        barrier: Slot,
        in_progress: &mut usize,
        reached_barrier: &mut usize,
        majority: usize,
    ) {
        while *in_progress > 0 && *reached_barrier < majority {
            let node = transport.random_node(cfg);
            let reply = match transport.get_from(node, key) {
                Some(r) => r,
                None => break,
            };
            let execute = match parse_header::<Slot>(&reply, node, headers::EXECUTE) {
                Some(e) => e,
                None => continue,
            };
            if execute >= barrier {
                break;
            }
            let slot = match parse_header::<Slot>(&reply, node, headers::SLOT) {
                Some(s) => s,
                None => continue,
            };
            if slot >= barrier {
                *reached_barrier += 1;
            }
        }
    }
}

/// Picks a uniformly random peer from `cfg`'s membership. Shared helper for
/// `ReadTransport` implementations; not itself part of the trait contract.
pub fn pick_random_node(cfg: &ClusterConfig) -> NodeId {
    *cfg.nodes.choose(&mut rand::thread_rng()).expect("cluster config has at least one node")
}
