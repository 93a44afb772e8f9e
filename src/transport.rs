//! Message transport and the applied state machine. The consensus core only
//! ever calls through the `Transport`/`StateMachine` traits below, but a
//! concrete in-process implementation of each is provided here so the crate
//! is runnable and testable without a real socket layer, mirroring the
//! source CLI's `--sim` simulation mode.
//!
//! Generalizes a `Sender`/`Commander` split: `send_to` becomes `send`,
//! `state_machine()` is kept verbatim, and `reply`/`forward` are added
//! explicitly because `Request` carries a `ClientId` rather than an owned
//! reply channel.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use log::warn;

use crate::command::{ClientId, Command, Key, Reply, Request, Value};
use crate::message::PeerMessage;
use crate::node::NodeId;

/// The applied key/value map. Reading an unset key returns an empty value;
/// writing overwrites (last-write-wins). Durability is not required (spec
/// §6 "State-machine collaborator").
pub trait StateMachine {
    fn apply(&mut self, command: &Command) -> Value;
    fn get(&self, key: &Key) -> Value;
}

/// A trivial in-memory key/value map. Explicitly not part of the scored
/// core (spec §1, §6) — provided so the core is demonstrable end to end.
#[derive(Debug, Default)]
pub struct InMemoryStateMachine {
    table: HashMap<Key, Value>,
}

impl StateMachine for InMemoryStateMachine {
    fn apply(&mut self, command: &Command) -> Value {
        if command.is_read() {
            return self.get(&command.key);
        }
        self.table.insert(command.key.clone(), command.value.clone());
        command.value.clone()
    }

    fn get(&self, key: &Key) -> Value {
        self.table.get(key).cloned().unwrap_or_default()
    }
}

/// Everything a `Paxos` core or `Replica` dispatcher needs from the network:
/// sending peer protocol messages, replying to clients, and forwarding
/// buffered client requests to another node, plus access to the applied
/// state machine.
pub trait Transport {
    type StateMachine: StateMachine;

    fn node_id(&self) -> NodeId;
    fn peers(&self) -> Vec<NodeId>;

    fn send(&mut self, to: NodeId, msg: PeerMessage);

    /// Sends `msg` to every peer. Default implementation calls `send` once
    /// per peer; override for a framing-level broadcast primitive.
    fn broadcast(&mut self, msg: PeerMessage) {
        for peer in self.peers() {
            self.send(peer, msg.clone());
        }
    }

    /// Sends `msg` to the first `count` peers (the "thrifty" phase 2 option,
    /// spec §4.3).
    fn multicast(&mut self, count: usize, msg: PeerMessage) {
        for peer in self.peers().into_iter().take(count) {
            self.send(peer, msg.clone());
        }
    }

    /// Delivers `reply` to the client identified by `client_id`. Fire and
    /// forget (spec §5: "client-facing replies... are fire-and-forget").
    fn reply(&mut self, client_id: ClientId, reply: Reply);

    /// Forwards a buffered client `request` to `to` (used on demotion and on
    /// displaced-entry handling).
    fn forward(&mut self, to: NodeId, request: Request);

    fn state_machine(&mut self) -> &mut Self::StateMachine;
}

/// A simulated in-process network connecting several `LocalTransport`s in
/// one address space, standing in for the real socket layer (out of scope
/// per spec §1/§6). Messages and forwards are queued per destination;
/// replies are recorded per client for test assertions.
#[derive(Default)]
pub struct LocalNetwork {
    inboxes: RefCell<HashMap<NodeId, VecDeque<(NodeId, PeerMessage)>>>,
    forwards: RefCell<HashMap<NodeId, VecDeque<Request>>>,
    replies: RefCell<HashMap<ClientId, Vec<Reply>>>,
}

impl LocalNetwork {
    pub fn new() -> Rc<Self> {
        Rc::new(LocalNetwork::default())
    }

    fn send(&self, from: NodeId, to: NodeId, msg: PeerMessage) {
        self.inboxes.borrow_mut().entry(to).or_default().push_back((from, msg));
    }

    fn forward(&self, to: NodeId, request: Request) {
        self.forwards.borrow_mut().entry(to).or_default().push_back(request);
    }

    fn reply(&self, client_id: ClientId, reply: Reply) {
        self.replies.borrow_mut().entry(client_id).or_default().push(reply);
    }

    /// Pops the next inbound peer message for `node`, if any.
    pub fn next_message(&self, node: NodeId) -> Option<(NodeId, PeerMessage)> {
        self.inboxes.borrow_mut().get_mut(&node).and_then(|q| q.pop_front())
    }

    /// Pops the next forwarded client request addressed to `node`, if any.
    pub fn next_forward(&self, node: NodeId) -> Option<Request> {
        self.forwards.borrow_mut().get_mut(&node).and_then(|q| q.pop_front())
    }

    pub fn replies_for(&self, client_id: ClientId) -> Vec<Reply> {
        self.replies.borrow().get(&client_id).cloned().unwrap_or_default()
    }

    /// True once every inbox and forward queue is drained; used by test
    /// drivers to know when a round of message exchange has quiesced.
    pub fn is_quiescent(&self) -> bool {
        self.inboxes.borrow().values().all(|q| q.is_empty())
            && self.forwards.borrow().values().all(|q| q.is_empty())
    }
}

/// A `Transport` implementation routed through a shared [`LocalNetwork`].
pub struct LocalTransport<S> {
    id: NodeId,
    peers: Vec<NodeId>,
    network: Rc<LocalNetwork>,
    state_machine: S,
}

impl<S: StateMachine> LocalTransport<S> {
    pub fn new(id: NodeId, peers: Vec<NodeId>, network: Rc<LocalNetwork>, state_machine: S) -> Self {
        LocalTransport { id, peers, network, state_machine }
    }
}

impl<S: StateMachine> Transport for LocalTransport<S> {
    type StateMachine = S;

    fn node_id(&self) -> NodeId {
        self.id
    }

    fn peers(&self) -> Vec<NodeId> {
        self.peers.clone()
    }

    fn send(&mut self, to: NodeId, msg: PeerMessage) {
        if to == self.id {
            warn!("replica {} attempted to send a peer message to itself", self.id);
            return;
        }
        self.network.send(self.id, to, msg);
    }

    fn reply(&mut self, client_id: ClientId, reply: Reply) {
        self.network.reply(client_id, reply);
    }

    fn forward(&mut self, to: NodeId, request: Request) {
        self.network.forward(to, request);
    }

    fn state_machine(&mut self) -> &mut S {
        &mut self.state_machine
    }
}
