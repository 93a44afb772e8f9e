//! Property tests for the safety invariants of spec §8, driven against a
//! single-node cluster (majority of one) so the full `handle_request` ->
//! `p1a` -> `p2a` -> commit -> `exec` path runs deterministically without
//! needing to interleave a simulated network — every self-ack already
//! satisfies `Q1`/`Q2` on a one-node cluster, isolating the state machine's
//! own bookkeeping (status monotonicity, the window bound, idempotent acks)
//! from the quorum-arithmetic already covered by `src/quorum.rs`'s unit tests.

use proptest::prelude::*;

use paxos_mkv::config::{ClusterConfig, LeaderPolicy};
use paxos_mkv::entry::EntryStatus;
use paxos_mkv::node::NodeId;
use paxos_mkv::paxos::Paxos;
use paxos_mkv::quorum::QuorumTracker;
use paxos_mkv::transport::{InMemoryStateMachine, LocalNetwork, LocalTransport};
use paxos_mkv::{Command, Request};

fn solo_paxos(window: u64) -> Paxos<LocalTransport<InMemoryStateMachine>> {
    let id = NodeId::new(1, 1);
    let network = LocalNetwork::new();
    let cfg = ClusterConfig {
        current: id,
        nodes: vec![id],
        thrifty: false,
        highload: false,
        read_mode: None,
        slide_window: window,
        ephemeral_leader: true,
        leader_policy: LeaderPolicy::EphemeralSelf,
    };
    let transport = LocalTransport::new(id, vec![], network, InMemoryStateMachine::default());
    Paxos::new(transport, cfg)
}

fn keys() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(String::from)
}

proptest! {
    /// Monotone execute + window bound: after proposing any sequence of
    /// writes on a one-node cluster, `execute` never decreases step to step
    /// and no slot beyond `execute + W` is ever marked `Execute`.
    #[test]
    fn execute_is_monotone_and_window_bounded(
        window in 0u64..6,
        writes in prop::collection::vec((keys(), any::<u8>()), 0..20),
    ) {
        let mut p = solo_paxos(window);
        let mut last_execute = p.execute_slot();
        for (i, (key, value)) in writes.into_iter().enumerate() {
            p.handle_request(Request::new(Command::write(key, vec![value.max(1)], 1, i as u64)));
            prop_assert!(p.execute_slot() >= last_execute, "execute must not regress");
            last_execute = p.execute_slot();

            let max_slot = p.execute_slot() + window as i64;
            for (slot, entry) in p.log().range(0..=p.slot()) {
                if entry.status == EntryStatus::Execute {
                    prop_assert!(
                        slot <= max_slot || slot < p.execute_slot(),
                        "slot {} executed beyond the window bound (execute={}, W={})",
                        slot, p.execute_slot(), window
                    );
                }
            }
        }
    }

    /// Commutativity safety: whenever an entry is flagged commutative at
    /// proposal time, no *present* entry within the preceding window shares
    /// its key (spec invariant 6 / §8 "Commutativity safety", restricted to
    /// the source's documented absent-entry-is-non-conflicting behavior).
    #[test]
    fn commutativity_flag_matches_present_window_entries(
        window in 1u64..6,
        writes in prop::collection::vec((keys(), any::<u8>()), 1..15),
    ) {
        let mut p = solo_paxos(window);
        for (i, (key, value)) in writes.into_iter().enumerate() {
            let request = Request::new(Command::write(key.clone(), vec![value.max(1)], 1, i as u64));
            let next_slot = p.slot() + 1;
            let flagged = p.check_commutativity(next_slot, &request);

            let start = (next_slot - window as i64).max(0);
            let conflicts = (start..next_slot).any(|s| {
                p.log().get(s).map_or(false, |e| e.command.key.as_ref() == key.as_bytes())
            });
            prop_assert_eq!(flagged, conflicts);

            p.handle_request(request);
        }
    }

    /// Quorum idempotence: acking the same id any number of times never
    /// reports a larger size than acking it once.
    #[test]
    fn duplicate_acks_never_inflate_quorum_size(repeats in 0usize..10) {
        let mut q = QuorumTracker::new();
        let id = NodeId::new(1, 1);
        for _ in 0..=repeats {
            q.ack(id);
        }
        prop_assert_eq!(1, q.size());
    }
}

/// Boundary case: `W = 0` degenerates to strict in-order execution, and
/// `check_commutativity` is always false (spec §8 "Boundary cases").
#[test]
fn zero_window_never_flags_commutative_and_serializes_strictly() {
    let mut p = solo_paxos(0);
    p.handle_request(Request::new(Command::write("a", "1", 1, 1)));
    p.handle_request(Request::new(Command::write("b", "2", 1, 2)));

    assert!(!p.log().get(0).unwrap().commutativity);
    assert!(!p.log().get(1).unwrap().commutativity);
    assert_eq!(2, p.execute_slot());
}
