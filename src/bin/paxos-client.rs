//! The `paxos-client` binary (spec §6 "CLI (client)"), ported from
//! `client/client.go`'s `main`/`db` benchmark shim.

use std::process::ExitCode;

use clap::Parser;
use log::info;

use paxos_mkv::cli::ClientArgs;
use paxos_mkv::config::ClusterConfig;
use paxos_mkv::error::CliError;
use paxos_mkv::read::ClientReadState;

fn main() -> ExitCode {
    env_logger::init();
    let args = ClientArgs::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: ClientArgs) -> Result<(), CliError> {
    args.validate_algorithm()?;
    let cfg = ClusterConfig::load(&args.config)?;
    if !cfg.nodes.contains(&args.id) {
        return Err(CliError::Config(paxos_mkv::error::ConfigError::UnknownNode(args.id)));
    }

    // `--slidewindow`/`--ephemeral_leader2`/`--highload` are server-side
    // knobs (spec §6); a client only consumes `--read2` to pick its own read
    // validation policy. The real socket-connected benchmark client (the
    // source's `paxi.HTTPClient`) is out of scope (spec §1/§6): without it
    // there is nothing for `--load` or the default benchmark run to drive.
    let _read_state = ClientReadState::new();
    if args.load {
        info!("--load requested against {} nodes; no network client is wired up (spec §1/§6)", cfg.nodes.len());
    }
    let _ = args.historypath;
    let _ = args.read_mode;
    let _ = args.slidewindow;
    let _ = args.ephemeral_leader;
    let _ = args.highload;

    Err(CliError::RealTransportUnimplemented)
}
