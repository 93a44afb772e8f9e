use std::collections::{HashMap, HashSet};

use crate::config::ClusterConfig;
use crate::node::NodeId;

/// Tracks per-proposal acknowledgements (and, separately, negative
/// acknowledgements) and answers the family of quorum predicates the cluster
/// shape supports. Ported field-for-field from the original `Quorum` type:
/// `Acks`/`Nacks`/`Zones` become `acks`/`nacks`/`zones`, `ACK`/`NACK`/`Reset`
/// become `ack`/`nack`/`reset`.
///
/// Mutated only from the single dispatcher task (§5) — no internal locking.
#[derive(Debug, Clone, Default)]
pub struct QuorumTracker {
    acks: HashSet<NodeId>,
    nacks: HashSet<NodeId>,
    zones: HashMap<u32, usize>,
}

impl QuorumTracker {
    pub fn new() -> Self {
        QuorumTracker::default()
    }

    /// Records an acknowledgement from `id`. Idempotent: a duplicate ack does
    /// not increase the recorded size.
    pub fn ack(&mut self, id: NodeId) {
        if self.acks.insert(id) {
            *self.zones.entry(id.zone()).or_insert(0) += 1;
        }
    }

    pub fn nack(&mut self, id: NodeId) {
        self.nacks.insert(id);
    }

    pub fn reset(&mut self) {
        self.acks.clear();
        self.nacks.clear();
        self.zones.clear();
    }

    pub fn size(&self) -> usize {
        self.acks.len()
    }

    pub fn has_acked(&self, id: NodeId) -> bool {
        self.acks.contains(&id)
    }

    pub fn all(&self, cfg: &ClusterConfig) -> bool {
        self.size() == cfg.n()
    }

    /// Simple majority: strictly more than half the cluster.
    pub fn majority(&self, cfg: &ClusterConfig) -> bool {
        self.size() > cfg.n() / 2
    }

    pub fn all_zones(&self, cfg: &ClusterConfig) -> bool {
        self.zones.len() == cfg.zone_count()
    }

    /// True if a majority of acks landed within any single zone.
    pub fn zone_majority(&self, cfg: &ClusterConfig) -> bool {
        self.zones
            .iter()
            .any(|(zone, n)| *n > cfg.zone_size(*zone) / 2)
    }

    /// Grid-quorum phase 1: one ack from every zone (== `all_zones`).
    pub fn grid_row(&self, cfg: &ClusterConfig) -> bool {
        self.all_zones(cfg)
    }

    /// Grid-quorum phase 2: every node within some single zone.
    pub fn grid_column(&self, cfg: &ClusterConfig) -> bool {
        self.zones.iter().any(|(zone, n)| *n == cfg.zone_size(*zone))
    }

    /// Flexible-grid phase 1 quorum tolerating `f` absent zones.
    pub fn f_grid_q1(&self, cfg: &ClusterConfig, f: u32) -> bool {
        let satisfied_zones = self
            .zones
            .iter()
            .filter(|(zone, n)| **n > cfg.zone_size(**zone) / 2)
            .count() as u32;
        satisfied_zones >= cfg.zone_count() as u32 - f
    }

    /// Flexible-grid phase 2 quorum requiring `f + 1` majority zones.
    pub fn f_grid_q2(&self, cfg: &ClusterConfig, f: u32) -> bool {
        let satisfied_zones = self
            .zones
            .iter()
            .filter(|(zone, n)| **n > cfg.zone_size(**zone) / 2)
            .count() as u32;
        satisfied_zones >= f + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClusterConfig;

    fn three_node_config() -> ClusterConfig {
        ClusterConfig::single_zone(NodeId::new(1, 1), 3)
    }

    #[test]
    fn duplicate_ack_is_idempotent() {
        let cfg = three_node_config();
        let mut q = QuorumTracker::new();
        q.ack(NodeId::new(1, 1));
        q.ack(NodeId::new(1, 1));
        assert_eq!(1, q.size());
        assert!(!q.majority(&cfg));
    }

    #[test]
    fn majority_needs_strictly_more_than_half() {
        let cfg = three_node_config();
        let mut q = QuorumTracker::new();
        q.ack(NodeId::new(1, 1));
        assert!(!q.majority(&cfg));
        q.ack(NodeId::new(1, 2));
        assert!(q.majority(&cfg));
    }

    #[test]
    fn reset_clears_everything() {
        let mut q = QuorumTracker::new();
        q.ack(NodeId::new(1, 1));
        q.nack(NodeId::new(1, 2));
        q.reset();
        assert_eq!(0, q.size());
        assert!(!q.has_acked(NodeId::new(1, 1)));
    }
}
