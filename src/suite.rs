//! One end-to-end suite: a running network with seeded genesis, test actors
//! in the first validator's keyrings, and a resolver for tx results.

use serde::{Deserialize, Serialize};
use tracing::info;

use empower_e2e_core::{config::RetryConfig, Coin};

use crate::{
    actors::{self, TestActor},
    confirm::PollingConfirm,
    genesis::{self, ComposeParams},
    identity::{FileKeyring, KeyRecord, Keyring, DEFAULT_BIP39_PASSPHRASE},
    network::{
        cli::{default_fee, KeyCommands},
        ChainCli, CommonFlags, Network, NetworkConfig, SetupError, Validator,
    },
    resolve::TxResolver,
};

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct SuiteConfig {
    /// Fee attached to every tx.
    pub fee: Coin,

    pub bond_denom: String,

    /// Starting balance of every funded test actor.
    pub initial_tokens: u128,

    pub credit_class_creation_fee: Coin,

    pub voting_period_secs: u64,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        let compose = ComposeParams::default();

        Self {
            fee: default_fee(),
            bond_denom: compose.bond_denom,
            initial_tokens: compose.initial_tokens,
            credit_class_creation_fee: compose.credit_class_creation_fee,
            voting_period_secs: compose.voting_period.as_secs(),
        }
    }
}

impl SuiteConfig {
    pub fn compose_params(&self) -> ComposeParams {
        ComposeParams {
            bond_denom: self.bond_denom.clone(),
            initial_tokens: self.initial_tokens,
            credit_class_creation_fee: self.credit_class_creation_fee.clone(),
            voting_period: std::time::Duration::from_secs(self.voting_period_secs),
        }
    }

    pub fn common_flags(&self) -> CommonFlags {
        CommonFlags::with_fees(self.fee.clone())
    }
}

/// Runs after setup, before the suite is handed to the tests.
pub type BeforeAllHook<N = Network> = Box<dyn FnOnce(&mut Suite<N>) -> Result<(), SetupError>>;

/// Validators whose keys are copied into the first validator's keyrings so
/// one client can sign for all of them.
const IMPORTED_VALIDATORS: [usize; 2] = [1, 2];

/// Guards validator keys while they move between nodes. The chain binary
/// wants at least eight characters.
const TRANSFER_PASSPHRASE: &str = "empower-e2e-transfer";

/// What setup needs from a network that is already producing blocks: each
/// node's harness keyring and chain client, and a way to wait for a block.
pub trait SetupHost {
    type Keyring: Keyring;
    type Cli: KeyCommands;

    fn node_count(&self) -> usize;

    /// Name of the node's own validator key.
    fn moniker(&self, node: usize) -> Option<String>;

    fn keyring(&self, node: usize) -> Option<&Self::Keyring>;

    fn keyring_mut(&mut self, node: usize) -> Option<&mut Self::Keyring>;

    fn cli(&self, node: usize) -> Option<&Self::Cli>;

    fn wait_for_next_block(&mut self) -> Result<u64, SetupError>;
}

impl SetupHost for Network {
    type Keyring = FileKeyring;
    type Cli = ChainCli;

    fn node_count(&self) -> usize {
        self.validators().len()
    }

    fn moniker(&self, node: usize) -> Option<String> {
        self.validator(node).map(|x| x.moniker.clone())
    }

    fn keyring(&self, node: usize) -> Option<&FileKeyring> {
        self.validator(node).map(|x| &x.keyring)
    }

    fn keyring_mut(&mut self, node: usize) -> Option<&mut FileKeyring> {
        self.validator_mut(node).map(|x| &mut x.keyring)
    }

    fn cli(&self, node: usize) -> Option<&ChainCli> {
        self.validator(node).map(|x| &x.cli)
    }

    fn wait_for_next_block(&mut self) -> Result<u64, SetupError> {
        Network::wait_for_next_block(self)
    }
}

fn missing_node(node: usize) -> SetupError {
    SetupError::Layout(format!("network has no node {node}"))
}

/// Test actors go into node0's harness keyring and, recovered from their
/// mnemonics, into its chain keyring.
fn provision_actors<H: SetupHost>(host: &mut H) -> Result<Vec<KeyRecord>, SetupError> {
    let keyring = host.keyring_mut(0).ok_or_else(|| missing_node(0))?;
    let records = actors::provision(keyring, DEFAULT_BIP39_PASSPHRASE)?;

    let cli = host.cli(0).ok_or_else(|| missing_node(0))?;

    for actor in TestActor::everyone() {
        cli.recover_key(actor.key_name(), actor.mnemonic())?;
    }

    Ok(records)
}

/// Copies the validator key of `source` into node0, in both keyrings.
fn import_validator_key<H: SetupHost>(host: &mut H, source: usize) -> Result<(), SetupError> {
    let name = host.moniker(source).ok_or_else(|| missing_node(source))?;

    let harness_armor = host
        .keyring(source)
        .ok_or_else(|| missing_node(source))?
        .export_armor(&name, TRANSFER_PASSPHRASE)?;

    let chain_armor = host
        .cli(source)
        .ok_or_else(|| missing_node(source))?
        .export_key(&name, TRANSFER_PASSPHRASE)?;

    host.keyring_mut(0)
        .ok_or_else(|| missing_node(0))?
        .import_armor(&name, &harness_armor, TRANSFER_PASSPHRASE)?;

    host.cli(0)
        .ok_or_else(|| missing_node(0))?
        .import_key(&name, &chain_armor, TRANSFER_PASSPHRASE)?;

    info!(%name, "imported validator key into node0");

    Ok(())
}

pub struct Suite<N = Network> {
    network: N,
    flags: CommonFlags,
    retries: RetryConfig,
    actors: Vec<KeyRecord>,
}

impl Suite {
    pub fn setup(
        network: NetworkConfig,
        config: &SuiteConfig,
        retries: RetryConfig,
    ) -> Result<Self, SetupError> {
        Self::setup_with_hook(network, config, retries, None)
    }

    /// Full setup in order: genesis, network, identities, validator keys,
    /// one more block, then `hook`.
    pub fn setup_with_hook(
        network: NetworkConfig,
        config: &SuiteConfig,
        retries: RetryConfig,
        hook: Option<BeforeAllHook>,
    ) -> Result<Self, SetupError> {
        info!("setting up e2e suite");

        let params = config.compose_params();
        let mut network = Network::start(network, |base| {
            genesis::compose(base, &params).map_err(SetupError::from)
        })?;

        let flags = config.common_flags();

        let node0 = network.validator_mut(0).ok_or_else(|| missing_node(0))?;
        node0.cli = node0.cli.clone().with_flags(flags.clone());

        Suite::assemble(network, flags, retries, hook)
    }

    /// The validator every test signs through.
    pub fn node0(&self) -> &Validator {
        &self.network.validators()[0]
    }

    pub fn cli(&self) -> &ChainCli {
        &self.node0().cli
    }

    /// Resolver confirming through the first validator.
    pub fn resolver(&self) -> TxResolver<PollingConfirm<&ChainCli>> {
        TxResolver::new(PollingConfirm::new(self.cli(), self.retries.clone()))
    }

    pub fn teardown(self) {
        info!("tearing down e2e suite");
        self.network.stop();
    }
}

impl<N: SetupHost> Suite<N> {
    /// The part of setup that runs once blocks are being produced: test
    /// actors, validator keys `node1` and `node2` into node0, one more block,
    /// then `hook`.
    pub fn assemble(
        mut network: N,
        flags: CommonFlags,
        retries: RetryConfig,
        hook: Option<BeforeAllHook<N>>,
    ) -> Result<Self, SetupError> {
        let actors = provision_actors(&mut network)?;

        for source in IMPORTED_VALIDATORS {
            if source < network.node_count() {
                import_validator_key(&mut network, source)?;
            }
        }

        network.wait_for_next_block()?;

        let mut suite = Self {
            network,
            flags,
            retries,
            actors,
        };

        if let Some(hook) = hook {
            hook(&mut suite)?;
        }

        info!("e2e suite ready");

        Ok(suite)
    }
}

impl<N> Suite<N> {
    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn flags(&self) -> &CommonFlags {
        &self.flags
    }

    pub fn retries(&self) -> &RetryConfig {
        &self.retries
    }

    pub fn actors(&self) -> &[KeyRecord] {
        &self.actors
    }
}
