//! A sliding-window multi-Paxos replicated key/value log: ballot/leader
//! discipline, per-slot accept/commit/execute state, out-of-order execution
//! of commutative entries within a bounded window, and follower-side read
//! modes including a quorum-barrier linearizable read.

pub mod ballot;
pub mod cli;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod entry;
pub mod error;
pub mod log;
pub mod message;
pub mod node;
pub mod paxos;
pub mod quorum;
pub mod read;
pub mod transport;

pub use ballot::Ballot;
pub use command::{Command, Reply, Request};
pub use config::{ClusterConfig, LeaderPolicy, ReadMode};
pub use dispatcher::Dispatcher;
pub use entry::{Entry, EntryStatus};
pub use log::Log;
pub use message::PeerMessage;
pub use node::NodeId;
pub use paxos::Paxos;
pub use quorum::QuorumTracker;
pub use transport::{InMemoryStateMachine, LocalNetwork, LocalTransport, StateMachine, Transport};
