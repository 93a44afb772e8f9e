//! Wires one replica's [`Paxos`] core to its [`Transport`]: registers one
//! handler per message type and routes inbound client requests between the
//! read server, direct proposal, and forwarding, in the manner of
//! `replica.go`'s `NewReplica`/`handleRequest`.

use log::debug;

use crate::command::Request;
use crate::config::LeaderPolicy;
use crate::message::PeerMessage;
use crate::node::NodeId;
use crate::paxos::Paxos;
use crate::read::{read_reply, serve_read};
use crate::transport::Transport;

/// A single replica: a [`Paxos`] instance plus the request-routing policy
/// around it. Not itself generic over any async runtime — spec §5 models
/// the replica as one logical event loop, so `Dispatcher` exposes plain
/// synchronous entry points its caller drives from a message queue.
pub struct Dispatcher<T: Transport> {
    paxos: Paxos<T>,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(paxos: Paxos<T>) -> Self {
        Dispatcher { paxos }
    }

    pub fn paxos(&self) -> &Paxos<T> {
        &self.paxos
    }

    pub fn paxos_mut(&mut self) -> &mut Paxos<T> {
        &mut self.paxos
    }

    /// Resolves this replica's current forwarding target under the
    /// configured [`LeaderPolicy`] (spec §9 Design Notes).
    fn forwarding_target(&self) -> NodeId {
        match self.paxos.config().leader_policy {
            LeaderPolicy::Static(node) => node,
            LeaderPolicy::EphemeralSelf => self.paxos.transport().node_id(),
            LeaderPolicy::BallotHolder => self.paxos.leader(),
        }
    }

    /// Entry point for an inbound client [`Request`] (spec §4.5): reads are
    /// served locally whenever a read mode is configured; writes are
    /// proposed directly if this replica is leader-eligible under the
    /// ephemeral-leader flag or `is_leader()`, otherwise forwarded.
    pub fn handle_client_request(&mut self, request: Request) {
        let command = request.command.clone();
        if command.is_read() && self.paxos.config().read_mode.is_some() {
            debug!(
                "replica {} serving read request {:?} locally",
                self.paxos.transport().node_id(),
                command
            );
            let snapshot = serve_read(&mut self.paxos, &command);
            let reply = read_reply(&self.paxos, &command, &snapshot);
            self.paxos.transport_mut().reply(request.client_id(), reply);
            return;
        }

        if self.paxos.config().ephemeral_leader || self.paxos.is_leader() {
            self.paxos.handle_request(request);
        } else {
            let target = self.forwarding_target();
            self.paxos.transport_mut().forward(target, request);
        }
    }

    /// Entry point for an inbound peer [`PeerMessage`]: dispatches to the
    /// matching `Paxos` handler.
    pub fn handle_peer_message(&mut self, from: NodeId, msg: PeerMessage) {
        self.paxos.handle_peer_message(from, msg);
    }
}
