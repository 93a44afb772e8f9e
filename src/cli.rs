//! Server and client flag surfaces, ported from `server/server.go`'s and
//! `client/client.go`'s `flag.String`/`flag.Bool` declarations into `clap`
//! derive structs.

use clap::Parser;

use crate::config::ReadMode;
use crate::error::CliError;
use crate::node::NodeId;

pub const ALGORITHM_PAXOS2BRO: &str = "paxos2bro";

/// `paxos-server` flags (spec §6 "CLI (server)").
#[derive(Debug, Parser)]
#[command(name = "paxos-server", about = "A sliding-window multi-Paxos replica")]
pub struct ServerArgs {
    /// Distributed algorithm; only "paxos2bro" is supported.
    #[arg(long, default_value = "paxos2bro")]
    pub algorithm: String,

    /// This replica's id, in "zone.index" form.
    #[arg(long)]
    pub id: NodeId,

    /// Path to the cluster's TOML configuration file.
    #[arg(long)]
    pub config: std::path::PathBuf,

    /// Run every configured replica in-process against a `LocalNetwork`
    /// instead of a real socket transport.
    #[arg(long)]
    pub sim: bool,

    /// Master coordinator address. Accepted for wire compatibility with the
    /// original CLI; a bare consensus core has no master collaborator to
    /// connect to.
    #[arg(long)]
    pub master: Option<String>,
}

impl ServerArgs {
    /// Validates `--algorithm`, matching the source's
    /// `panic("Unknown algorithm")` turned into a typed, nonzero-exit error
    /// (spec §7 "Configuration/CLI errors").
    pub fn validate_algorithm(&self) -> Result<(), CliError> {
        if self.algorithm != ALGORITHM_PAXOS2BRO {
            return Err(CliError::UnknownAlgorithm(self.algorithm.clone()));
        }
        Ok(())
    }
}

/// `paxos-client` flags (spec §6 "CLI (client)" and "Client flags relevant
/// to the core").
#[derive(Debug, Parser)]
#[command(name = "paxos-client", about = "A client for the sliding-window multi-Paxos replica")]
pub struct ClientArgs {
    /// The node id this client connects to.
    #[arg(long)]
    pub id: NodeId,

    /// Client API type; only "paxos2bro" is supported.
    #[arg(long, default_value = "paxos2bro")]
    pub algorithm: String,

    /// Path to the cluster's TOML configuration file.
    #[arg(long)]
    pub config: std::path::PathBuf,

    /// Load K keys into the DB instead of running the benchmark workload.
    #[arg(long)]
    pub load: bool,

    /// Master coordinator address. See `ServerArgs::master`.
    #[arg(long)]
    pub master: Option<String>,

    /// Client operation history file path.
    #[arg(long, default_value = "/bin/history")]
    pub historypath: std::path::PathBuf,

    /// Read mode: "leader", "local", "quorum", "any", or "RFL". Unset means
    /// reads are proposed through the log like any other command.
    #[arg(long = "read2")]
    pub read_mode: Option<ReadMode>,

    /// Sliding-window length `W` bounding out-of-order execution.
    #[arg(long, default_value_t = 5)]
    pub slidewindow: u64,

    /// If set, every replica treats itself as leader-eligible instead of
    /// forwarding writes to the configured leader.
    #[arg(long = "ephemeral_leader2")]
    pub ephemeral_leader: bool,

    /// Selects between broadcast and direct send of `P2b`. Kept for wire
    /// compatibility; the canonical path always broadcasts (§9 Open
    /// Question 1).
    #[arg(long)]
    pub highload: bool,
}

impl ClientArgs {
    pub fn validate_algorithm(&self) -> Result<(), CliError> {
        if self.algorithm != ALGORITHM_PAXOS2BRO {
            return Err(CliError::UnknownAlgorithm(self.algorithm.clone()));
        }
        Ok(())
    }
}
