//! The `paxos-server` binary (spec §6 "CLI (server)"), ported from
//! `server/server.go`'s `main`/`replica` functions.

use std::process::ExitCode;

use clap::Parser;
use log::info;

use paxos_mkv::cli::ServerArgs;
use paxos_mkv::config::ClusterConfig;
use paxos_mkv::dispatcher::Dispatcher;
use paxos_mkv::error::CliError;
use paxos_mkv::node::NodeId;
use paxos_mkv::paxos::Paxos;
use paxos_mkv::transport::{InMemoryStateMachine, LocalNetwork, LocalTransport};
use paxos_mkv::{Command, Request};

fn main() -> ExitCode {
    env_logger::init();
    let args = ServerArgs::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: ServerArgs) -> Result<(), CliError> {
    args.validate_algorithm()?;
    let cfg = ClusterConfig::load(&args.config)?;
    if !cfg.nodes.contains(&args.id) {
        return Err(CliError::Config(paxos_mkv::error::ConfigError::UnknownNode(args.id)));
    }

    if !args.sim {
        return Err(CliError::RealTransportUnimplemented);
    }

    info!("starting a {}-node simulated cluster rooted at {}", cfg.nodes.len(), args.id);
    run_simulation(cfg);
    Ok(())
}

/// Runs every node in `cfg.nodes` in-process against a shared
/// [`LocalNetwork`], mirroring the source's `--sim` flag which spawns one
/// goroutine per configured address instead of connecting real sockets
/// (`paxi.Simulation()` in `server/server.go`).
fn run_simulation(cfg: ClusterConfig) {
    let network = LocalNetwork::new();
    let mut dispatchers: Vec<Dispatcher<LocalTransport<InMemoryStateMachine>>> = cfg
        .nodes
        .iter()
        .map(|&id| {
            let mut node_cfg = cfg.clone();
            node_cfg.current = id;
            let peers = node_cfg.peers();
            let transport = LocalTransport::new(id, peers, network.clone(), InMemoryStateMachine::default());
            Dispatcher::new(Paxos::new(transport, node_cfg))
        })
        .collect();

    // Demonstrates the replicated log end to end: propose one write at the
    // statically configured leader and drive message exchange to quiescence.
    let leader_idx = cfg.nodes.iter().position(|&n| n == leader_of(&cfg)).unwrap_or(0);
    dispatchers[leader_idx].handle_client_request(Request::new(Command::write("a", "1", 1, 1)));

    for _ in 0..64 {
        if network.is_quiescent() {
            break;
        }
        for (i, &id) in cfg.nodes.iter().enumerate() {
            while let Some((from, msg)) = network.next_message(id) {
                dispatchers[i].handle_peer_message(from, msg);
            }
        }
    }

    info!("simulation quiesced with {} reply(ies) delivered", network.replies_for(1).len());
}

fn leader_of(cfg: &ClusterConfig) -> NodeId {
    match cfg.leader_policy {
        paxos_mkv::config::LeaderPolicy::Static(node) => node,
        _ => cfg.nodes[0],
    }
}
