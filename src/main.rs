//! `ant` CLI entrypoint.
//!
//! This binary is a thin composition root over the library's wallet and
//! cheque APIs — the daemon lifecycle (running the mine service against a
//! live libp2p host and block store) is an external collaborator's
//! responsibility and is out of this crate's scope; see `lib.rs`.
//!
//! Subcommands:
//! - `ant wallet {ls,new,delete,import,export,default,setdefault}`
//! - `ant cheque {ls,get,cashout,cashoutall}`
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `CONFIG` selects the JSON configuration file (default `config.json`)
//! - `RUST_LOG` controls log verbosity

use clap::Parser;
use dotenvy::dotenv;

use ant::cli;
use ant::config::{CliArgs, Config};
use ant::util::Telemetry;

#[tokio::main]
async fn main() {
    dotenv().ok();

    Telemetry::new()
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .register();

    let cli_args = CliArgs::parse();

    let config = match Config::load_from_path(cli_args.config.clone()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let Some(command) = cli_args.command else {
        eprintln!("no subcommand given; run `ant --help`");
        std::process::exit(1);
    };

    std::process::exit(cli::run(&config, command).await);
}
