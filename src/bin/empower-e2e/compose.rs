use std::path::PathBuf;

use tracing::info;

use empower_e2e::{
    config::HarnessConfig,
    core::Coin,
    genesis::{self, GenesisFile},
    prelude::Error,
};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// genesis.json to start from
    #[arg(long)]
    input: PathBuf,

    /// Where to write the result, defaults to overwriting the input
    #[arg(long)]
    output: Option<PathBuf>,

    /// Credit class creation fee, e.g. 50000stake
    #[arg(long)]
    fee: Option<Coin>,
}

pub fn run(config: &HarnessConfig, args: &Args) -> Result<(), Error> {
    let mut file = GenesisFile::read(&args.input)?;

    let mut params = config.suite.compose_params();

    if let Some(fee) = &args.fee {
        params.credit_class_creation_fee = fee.clone();
    }

    file.app_state = genesis::compose(file.app_state, &params)?;

    let output = args.output.as_ref().unwrap_or(&args.input);

    file.write(output)?;

    info!(output = %output.display(), "genesis written");

    Ok(())
}
