use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::node::NodeId;

/// How a non-leader replica decides where to route a write request it cannot
/// serve itself. Promotes the source's hardcoded `is_leader() = false` plus
/// `ephemeral_leader2` flag-to-"1.1" forwarding into an explicit capability
/// (§9 Design Notes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderPolicy {
    /// Always forward to a fixed, statically configured node.
    Static(NodeId),
    /// This node always considers itself leader-eligible and proposes locally
    /// (the `--ephemeral_leader2` flag from the source CLI).
    EphemeralSelf,
    /// Forward to whoever currently holds the highest observed ballot.
    BallotHolder,
}

/// The five client-side read validation policies of spec §4.4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    Leader,
    Local,
    Any,
    Quorum,
    #[serde(rename = "RFL")]
    Rfl,
}

impl std::str::FromStr for ReadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leader" => Ok(ReadMode::Leader),
            "local" => Ok(ReadMode::Local),
            "any" => Ok(ReadMode::Any),
            "quorum" => Ok(ReadMode::Quorum),
            "RFL" | "rfl" => Ok(ReadMode::Rfl),
            other => Err(format!("unknown read mode {other:?}")),
        }
    }
}

/// Cluster shape and per-replica runtime settings. Mirrors the original
/// source's package-level `config` (node count, zone membership, thrifty
/// flag) plus the CLI-exposed per-replica knobs from spec §6.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// This replica's own id.
    pub current: NodeId,
    /// Every node in the cluster, including `current`.
    pub nodes: Vec<NodeId>,
    /// If true, phase 2 multicasts to `n/2 + 1` peers instead of broadcasting.
    #[serde(default)]
    pub thrifty: bool,
    /// If true, phase 2b is sent to a single designated peer instead of
    /// broadcast. Preserved for wire compatibility per spec §6; the canonical
    /// `handle_p2a` path always broadcasts regardless of this flag (§9 Open
    /// Question 1).
    #[serde(default)]
    pub highload: bool,
    /// Whether (and which) client-side read mode a replica serves reads under.
    #[serde(default)]
    pub read_mode: Option<ReadMode>,
    /// Sliding-window length `W` bounding out-of-order execution.
    #[serde(default = "default_slide_window")]
    pub slide_window: u64,
    /// `--ephemeral_leader2`: if set, every node treats itself as leader-eligible
    /// instead of forwarding to `leader_policy`'s target.
    #[serde(default)]
    pub ephemeral_leader: bool,
    pub leader_policy: LeaderPolicy,
}

fn default_slide_window() -> u64 {
    5
}

impl ClusterConfig {
    /// A single-zone cluster of `n` sequentially indexed nodes in zone 1,
    /// with `current` as this replica's id. Convenient for tests.
    pub fn single_zone(current: NodeId, n: u32) -> Self {
        let nodes = (1..=n).map(|i| NodeId::new(1, i)).collect();
        ClusterConfig {
            current,
            nodes,
            thrifty: false,
            highload: false,
            read_mode: None,
            slide_window: default_slide_window(),
            ephemeral_leader: false,
            leader_policy: LeaderPolicy::Static(NodeId::new(1, 1)),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml { path: "<string>".into(), source })
    }

    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn n(&self) -> usize {
        self.nodes.len()
    }

    pub fn zone_count(&self) -> usize {
        self.zones().len()
    }

    fn zones(&self) -> HashMap<u32, usize> {
        let mut zones = HashMap::new();
        for node in &self.nodes {
            *zones.entry(node.zone()).or_insert(0) += 1;
        }
        zones
    }

    pub fn zone_size(&self, zone: u32) -> usize {
        self.zones().get(&zone).copied().unwrap_or(0)
    }

    /// All nodes other than `current`.
    pub fn peers(&self) -> Vec<NodeId> {
        self.nodes.iter().copied().filter(|n| *n != self.current).collect()
    }

    /// Size of a phase-2 multicast set under the thrifty setting.
    pub fn thrifty_multicast_size(&self) -> usize {
        self.n() / 2 + 1
    }
}
