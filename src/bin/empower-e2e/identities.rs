use miette::IntoDiagnostic;

use empower_e2e::{
    actors::TestActor,
    config::HarnessConfig,
    identity::{Keyring, MemoryKeyring, DEFAULT_BIP39_PASSPHRASE},
};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Also print the unarmored private keys
    #[arg(long)]
    show_private: bool,
}

pub fn run(_config: &HarnessConfig, args: &Args) -> miette::Result<()> {
    let mut keyring = MemoryKeyring::new();

    for actor in TestActor::everyone() {
        let record = keyring
            .create(&actor.identity(), DEFAULT_BIP39_PASSPHRASE)
            .into_diagnostic()?;

        let expected = actor.address_str();

        let status = if record.address.to_string() == expected {
            "ok"
        } else {
            "MISMATCH"
        };

        println!("{:<14} {} {} {}", record.name, record.address, expected, status);

        if args.show_private {
            println!("{:<14} {}", "", record.private_key_hex());
        }
    }

    Ok(())
}
