//! Ambient error types for the boundary concerns: CLI argument validation,
//! cluster-configuration loading, and malformed read-reply headers. The core
//! protocol state machine (`Paxos`, `Entry`, `QuorumTracker`, ...) has no
//! fallible operations of its own — per spec §7 no protocol-level condition
//! aborts the process, anomalies are logged and tolerated.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid node id {0:?}, expected \"zone.index\"")]
pub struct ParseIdError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ballot string {0:?}, expected \"counter.zone.index\"")]
pub struct ParseBallotError(pub String);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("node id {0} is not a member of the cluster configuration")]
    UnknownNode(crate::node::NodeId),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown algorithm {0:?}, only \"paxos2bro\" is supported")]
    UnknownAlgorithm(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Raised instead of connecting a real socket transport, which is out of
    /// scope for this crate (spec §1/§6) — `--sim` is the only runnable path.
    #[error("no real network transport is implemented; re-run with --sim")]
    RealTransportUnimplemented,
}

/// A single malformed reply header encountered while validating a read-mode
/// response. Never fatal to the overall read — callers log and skip the
/// contributing replica, per spec §7.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {header} header {value:?} from replica {from}")]
pub struct MalformedHeader {
    pub header: &'static str,
    pub value: String,
    pub from: crate::node::NodeId,
}
