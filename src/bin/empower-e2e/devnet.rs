use std::{io::BufRead, path::PathBuf};

use tracing::info;

use empower_e2e::{config::HarnessConfig, prelude::Error, suite::Suite};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Number of validators, overrides the config
    #[arg(long)]
    validators: Option<usize>,

    /// Keep node homes here instead of a temp dir
    #[arg(long)]
    root_dir: Option<PathBuf>,
}

pub fn run(config: &HarnessConfig, args: &Args) -> Result<(), Error> {
    let mut network = config.network.clone();

    if let Some(validators) = args.validators {
        network.num_validators = validators;
    }

    if args.root_dir.is_some() {
        network.root_dir = args.root_dir.clone();
    }

    let suite = Suite::setup(network, &config.suite, config.retries.clone())?;

    for validator in suite.network().validators() {
        info!(
            moniker = %validator.moniker,
            rpc = %validator.rpc().base(),
            grpc = %validator.grpc_address(),
            home = %validator.home.root.display(),
            "validator running"
        );
    }

    println!("devnet running at {}", suite.network().root().display());
    println!("press enter to stop");

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    suite.teardown();

    Ok(())
}
