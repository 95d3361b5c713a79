use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

use empower_e2e::{config::HarnessConfig, prelude::Error};

mod common;
mod compose;
mod devnet;
mod identities;

#[derive(Debug, Subcommand)]
enum Command {
    /// Layers the test fixtures onto an existing genesis file
    ComposeGenesis(compose::Args),

    /// Prints the test actors and their addresses
    Identities(identities::Args),

    /// Runs a full suite setup and keeps the network up
    Devnet(devnet::Args),
}

#[derive(Debug, Parser)]
#[clap(name = "empower-e2e")]
#[clap(bin_name = "empower-e2e")]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let config = HarnessConfig::new(args.config.as_deref()).map_err(Error::from)?;

    common::setup_tracing(&config.logging)?;

    match args.command {
        Command::ComposeGenesis(x) => compose::run(&config, &x)?,
        Command::Identities(x) => identities::run(&config, &x)?,
        Command::Devnet(x) => devnet::run(&config, &x)?,
    };

    Ok(())
}
