//! End-to-end cluster scenarios from spec §8, driven against a shared
//! `LocalNetwork` the way `src/paxos.rs`'s own
//! `three_node_cluster_commits_and_executes_a_write` test does, scaled up to
//! exercise commutative out-of-order execution, non-commutative
//! serialization, leader failover, and the RFL/quorum read modes.

use paxos_mkv::config::{ClusterConfig, LeaderPolicy};
use paxos_mkv::dispatcher::Dispatcher;
use paxos_mkv::entry::EntryStatus;
use paxos_mkv::node::NodeId;
use paxos_mkv::paxos::Paxos;
use paxos_mkv::transport::{InMemoryStateMachine, LocalNetwork, LocalTransport};
use paxos_mkv::{Command, Request};

type TestDispatcher = Dispatcher<LocalTransport<InMemoryStateMachine>>;

fn three_node_cluster(window: u64) -> (Vec<NodeId>, std::rc::Rc<LocalNetwork>, Vec<TestDispatcher>) {
    let ids = vec![NodeId::new(1, 1), NodeId::new(1, 2), NodeId::new(1, 3)];
    let network = LocalNetwork::new();
    let dispatchers = ids
        .iter()
        .map(|&id| {
            let cfg = ClusterConfig {
                current: id,
                nodes: ids.clone(),
                thrifty: false,
                highload: false,
                read_mode: None,
                slide_window: window,
                ephemeral_leader: true,
                leader_policy: LeaderPolicy::Static(NodeId::new(1, 1)),
            };
            let peers = ids.iter().copied().filter(|&p| p != id).collect();
            let transport = LocalTransport::new(id, peers, network.clone(), InMemoryStateMachine::default());
            Dispatcher::new(Paxos::new(transport, cfg))
        })
        .collect();
    (ids, network, dispatchers)
}

fn drive_to_quiescence(ids: &[NodeId], network: &LocalNetwork, dispatchers: &mut [TestDispatcher]) {
    for _ in 0..200 {
        if network.is_quiescent() {
            break;
        }
        for (i, &id) in ids.iter().enumerate() {
            while let Some((from, msg)) = network.next_message(id) {
                dispatchers[i].handle_peer_message(from, msg);
            }
            while let Some(req) = network.next_forward(id) {
                dispatchers[i].handle_client_request(req);
            }
        }
    }
}

/// Scenario 1: single-leader happy path.
#[test]
fn single_leader_happy_path() {
    let (ids, network, mut dispatchers) = three_node_cluster(5);
    dispatchers[0].handle_client_request(Request::new(Command::write("a", "1", 42, 1)));
    drive_to_quiescence(&ids, &network, &mut dispatchers);

    // Every replica attaches the client's request and replies on in-order
    // execution (leader via `p2a`, followers via `handle_p2a`), so all three
    // reply to the client here; dedup is the client's concern (spec §4.3/§5).
    let replies = network.replies_for(42);
    assert!(!replies.is_empty());
    assert_eq!(replies[0].value.as_ref(), b"1");
    assert_eq!(Some("0"), replies[0].property("Execute"));
    assert_eq!(Some("executed"), replies[0].property("KeyStatus"));

    for d in &dispatchers {
        assert_eq!(1, d.paxos().execute_slot());
        assert_eq!(EntryStatus::Execute, d.paxos().log().get(0).unwrap().status);
    }
}

/// Scenario 2: three pipelined writes on distinct keys are all flagged
/// commutative and may execute out of order relative to each other.
#[test]
fn commutative_writes_on_distinct_keys_all_execute() {
    let (ids, network, mut dispatchers) = three_node_cluster(5);
    dispatchers[0].handle_client_request(Request::new(Command::write("a", "1", 1, 1)));
    dispatchers[0].handle_client_request(Request::new(Command::write("b", "2", 2, 1)));
    dispatchers[0].handle_client_request(Request::new(Command::write("c", "3", 3, 1)));
    drive_to_quiescence(&ids, &network, &mut dispatchers);

    assert_eq!(b"1".as_ref(), network.replies_for(1)[0].value.as_ref());
    assert_eq!(b"2".as_ref(), network.replies_for(2)[0].value.as_ref());
    assert_eq!(b"3".as_ref(), network.replies_for(3)[0].value.as_ref());
    for d in &dispatchers {
        assert_eq!(3, d.paxos().execute_slot());
    }
}

/// Scenario 3: a second write to the same key is never flagged commutative
/// and only executes once the earlier slot on that key has executed.
#[test]
fn non_commutative_write_to_same_key_serializes() {
    let (ids, network, mut dispatchers) = three_node_cluster(5);
    dispatchers[0].handle_client_request(Request::new(Command::write("a", "1", 1, 1)));
    dispatchers[0].handle_client_request(Request::new(Command::write("a", "2", 1, 2)));
    drive_to_quiescence(&ids, &network, &mut dispatchers);

    for d in &dispatchers {
        let slot1 = d.paxos().log().get(1).unwrap();
        assert!(!slot1.commutativity, "second write to the same key must not be commutative");
        assert_eq!(EntryStatus::Execute, slot1.status);
    }
    let replies = network.replies_for(1);
    assert_eq!(replies[0].value.as_ref(), b"2");
}

/// Scenario 4: leader 1.1 accepted slot 0 and got it to 1.2 before crashing
/// (1.3 never saw it — a hole). 1.3 runs phase 1 with a higher ballot, 1.2's
/// promise reports the uncommitted entry, and 1.3 re-proposes and commits it
/// under its own ballot. Invariant 1 (agreement) must hold on that slot.
#[test]
fn leader_failover_recovers_uncommitted_slot() {
    let (ids, network, mut dispatchers) = three_node_cluster(5);
    let leader_ballot = paxos_mkv::Ballot::new(1, ids[0]);
    let command = Command::write("a", "1", 1, 1);

    // Seed 1.2 with the entry it would hold had it received 1.1's P2a for
    // slot 0 before 1.1 crashed (ids[2] never gets this call — a hole there).
    dispatchers[1].paxos_mut().handle_p2a(
        ids[0],
        leader_ballot,
        0,
        false,
        command.clone(),
        Some(Request::new(command.clone())),
        EntryStatus::Accept,
    );
    // Drain the P2b that seeding broadcast, so the failover below is driven
    // purely by phase 1 recovery rather than a stray direct P2b.
    while network.next_message(ids[0]).is_some() {}
    while network.next_message(ids[2]).is_some() {}

    // 1.1 is treated as crashed from here on: only 1.2 and 1.3 are driven.
    // Messages 1.3 sends to 1.1 are simply never collected, modeling a dead
    // peer rather than a dropped message.
    dispatchers[2].paxos_mut().p1a();
    let alive = [ids[1], ids[2]];
    for _ in 0..50 {
        for &id in &alive {
            let i = ids.iter().position(|&n| n == id).unwrap();
            while let Some((from, msg)) = network.next_message(id) {
                dispatchers[i].handle_peer_message(from, msg);
            }
        }
    }

    let committed: Vec<_> = [1usize, 2usize]
        .iter()
        .filter_map(|&i| dispatchers[i].paxos().log().get(0))
        .filter(|e| e.is_committed())
        .map(|e| e.command.clone())
        .collect();
    // The new leader (1.3) reaches a phase-2 quorum and commits; the lone
    // surviving follower (1.2) may still show `Accept` locally since nobody
    // ever sends it a further `P2b` once 1.1 is gone (commit is learned
    // reactively, not derived from one's own quorum count — spec §4.3). Any
    // replica that DOES reach Commit must agree with every other (invariant 1).
    assert!(!committed.is_empty(), "the new leader must commit the recovered slot");
    for pair in committed.windows(2) {
        assert_eq!(pair[0], pair[1], "invariant 1: committed commands at a slot must agree");
    }
    assert_eq!(committed[0], command, "the recovered command must be the one 1.2 had accepted, not a fresh proposal");
}

/// Scenario 5: an RFL read after scenario 1's write returns the value
/// without a second round-trip, because at least one replica reports the
/// key's slot as executed.
#[test]
fn rfl_read_hits_executed_key_without_polling() {
    use paxos_mkv::read::{read_reply, serve_read, ClientReadState, ReadTransport};

    let (ids, network, mut dispatchers) = three_node_cluster(5);
    dispatchers[0].handle_client_request(Request::new(Command::write("a", "1", 42, 1)));
    drive_to_quiescence(&ids, &network, &mut dispatchers);

    struct DirectReadTransport<'a> {
        dispatchers: &'a mut Vec<TestDispatcher>,
        ids: &'a [NodeId],
    }
    impl ReadTransport for DirectReadTransport<'_> {
        fn get_from(&mut self, node: NodeId, key: &paxos_mkv::command::Key) -> Option<paxos_mkv::Reply> {
            let i = self.ids.iter().position(|&n| n == node)?;
            let command = Command::read(key.clone(), 99, 1);
            let snapshot = serve_read(self.dispatchers[i].paxos_mut(), &command);
            Some(read_reply(self.dispatchers[i].paxos(), &command, &snapshot))
        }
        fn get_quorum(&mut self, cfg: &ClusterConfig, key: &paxos_mkv::command::Key) -> Vec<(NodeId, paxos_mkv::Reply)> {
            cfg.nodes.iter().filter_map(|&n| self.get_from(n, key).map(|r| (n, r))).collect()
        }
        fn random_node(&mut self, cfg: &ClusterConfig) -> NodeId {
            cfg.nodes[0]
        }
    }

    let cfg = dispatchers[0].paxos().config().clone();
    let mut transport = DirectReadTransport { dispatchers: &mut dispatchers, ids: &ids };
    let mut client = ClientReadState::new();
    let value = client
        .read_follower_linearizable(&mut transport, &cfg, &paxos_mkv::command::Key::from_static(b"a"))
        .expect("RFL read should return a value");
    assert_eq!(value.as_ref(), b"1");
}
