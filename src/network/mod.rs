//! A local multi-validator network driven through the chain binary.
//!
//! Startup has two phases so the genesis can be composed from what the
//! bootstrapper produced:
//!
//! 1. [`PreparedNetwork::init`] lays out the node homes
//! 2. [`PreparedNetwork::launch`] installs the final genesis, starts every node
//!    and blocks until the first block
//!
//! Dropping either value stops the processes and removes the temporary root.

use std::{
    net::Ipv4Addr,
    path::{Path, PathBuf},
    process::Command,
    thread,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    genesis::{GenesisDocument, GenesisError, GenesisFile},
    identity::{FileKeyring, IdentityError, Keyring, SigningIdentity},
};

pub mod cli;
pub mod layout;
pub mod process;
pub mod rpc;

pub use cli::{ChainCli, CliError, CommandInterface, CommonFlags};
pub use process::ProcessGuard;
pub use rpc::{RpcClient, RpcError};

use layout::NodeHome;

/// Anything that keeps the network from coming up. None of these are retried.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("can't run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected node layout: {0}")]
    Layout(String),

    #[error("node config error: {0}")]
    Config(String),

    #[error("validator {node} exited during startup with {status}, see {log}")]
    NodeExited {
        node: String,
        status: String,
        log: PathBuf,
    },

    #[error("chain did not reach height {height} within {waited:?}")]
    LivenessTimeout { height: u64, waited: Duration },

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Genesis(#[from] GenesisError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Cli(#[from] CliError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct NetworkConfig {
    /// Chain binary, looked up on `PATH` unless absolute.
    pub binary: PathBuf,

    pub num_validators: usize,

    pub chain_id: String,

    /// Directory name of each home inside `nodeN/`.
    pub node_daemon_home: String,

    /// Keep the network here instead of a temporary directory. The directory
    /// is left in place after shutdown.
    pub root_dir: Option<PathBuf>,

    /// CometBFT `consensus.timeout_commit`.
    pub timeout_commit: String,

    pub startup_timeout_secs: u64,

    pub block_timeout_secs: u64,

    pub poll_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("empowerd"),
            num_validators: 3,
            chain_id: "empowerchain-local-1".into(),
            node_daemon_home: "empowerd".into(),
            root_dir: None,
            timeout_commit: "1s".into(),
            startup_timeout_secs: 60,
            block_timeout_secs: 30,
            poll_interval_ms: 250,
        }
    }
}

impl NetworkConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn block_timeout(&self) -> Duration {
        Duration::from_secs(self.block_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug)]
enum Root {
    Temp(TempDir),
    Kept(PathBuf),
}

impl Root {
    fn create(config: &NetworkConfig) -> Result<Self, SetupError> {
        match &config.root_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Ok(Root::Kept(dir.clone()))
            }
            None => Ok(Root::Temp(
                tempfile::Builder::new().prefix("empower-e2e-").tempdir()?,
            )),
        }
    }

    fn path(&self) -> &Path {
        match self {
            Root::Temp(dir) => dir.path(),
            Root::Kept(dir) => dir,
        }
    }
}

/// One validator: where it lives, how to talk to it, and its process once
/// launched.
#[derive(Debug)]
pub struct Validator {
    pub index: usize,
    pub moniker: String,
    pub ip: Ipv4Addr,
    pub home: NodeHome,
    pub cli: ChainCli,
    pub keyring: FileKeyring,
    rpc: RpcClient,
    process: Option<ProcessGuard>,
}

impl Validator {
    fn prepare(
        index: usize,
        output_dir: &Path,
        config: &NetworkConfig,
    ) -> Result<Self, SetupError> {
        let moniker = layout::moniker(index);
        let ip = layout::validator_ip(index)?;
        let home = NodeHome::new(output_dir, index, &config.node_daemon_home);

        if !home.root.is_dir() {
            return Err(SetupError::Layout(format!(
                "missing home {}",
                home.root.display()
            )));
        }

        layout::patch_config_toml(&home, ip, config)?;
        layout::patch_app_toml(&home, ip)?;

        let node = format!("tcp://{ip}:{}", layout::RPC_PORT);
        let cli = ChainCli::new(&config.binary, &home.root, &config.chain_id, &node);
        let rpc = RpcClient::new(format!("http://{ip}:{}", layout::RPC_PORT))?;

        let mut keyring = FileKeyring::open(home.harness_keyring())?;
        let mnemonic = layout::read_key_seed(&home)?;
        keyring.create(&SigningIdentity::new(&moniker, mnemonic), "")?;

        debug!(%moniker, %ip, home = %home.root.display(), "prepared validator");

        Ok(Self {
            index,
            moniker,
            ip,
            home,
            cli,
            keyring,
            rpc,
            process: None,
        })
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    pub fn grpc_address(&self) -> String {
        format!("{}:{}", self.ip, layout::GRPC_PORT)
    }

    fn start(&mut self, binary: &Path) -> Result<(), SetupError> {
        let mut cmd = Command::new(binary);
        cmd.arg("start").arg("--home").arg(&self.home.root);

        let guard = ProcessGuard::spawn(&self.moniker, cmd, &self.home.log_file()).map_err(
            |source| SetupError::Spawn {
                command: format!("{} start", binary.display()),
                source,
            },
        )?;

        self.process = Some(guard);

        Ok(())
    }

    fn check_alive(&mut self) -> Result<(), SetupError> {
        let Some(process) = self.process.as_mut() else {
            return Ok(());
        };

        match process.try_exited()? {
            None => Ok(()),
            Some(status) => Err(SetupError::NodeExited {
                node: self.moniker.clone(),
                status: status.to_string(),
                log: self.home.log_file(),
            }),
        }
    }

    fn stop(&mut self) {
        if let Some(process) = self.process.take() {
            process.stop();
        }
    }
}

fn init_files(config: &NetworkConfig, output_dir: &Path) -> Result<(), SetupError> {
    let mut cmd = Command::new(&config.binary);

    cmd.args(["testnet", "init-files"])
        .arg(format!("--v={}", config.num_validators))
        .arg("--output-dir")
        .arg(output_dir)
        .arg(format!("--chain-id={}", config.chain_id))
        .arg(format!("--keyring-backend={}", cli::KEYRING_BACKEND))
        .arg(format!("--node-daemon-home={}", config.node_daemon_home))
        .arg(format!("--starting-ip-address={}", layout::STARTING_IP));

    let command = format!("{} testnet init-files", config.binary.display());
    debug!(%command, "bootstrapping node homes");

    let output = cmd.output().map_err(|source| SetupError::Spawn {
        command: command.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(SetupError::CommandFailed {
            command,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }

    Ok(())
}

/// Node homes on disk, nothing running yet.
#[derive(Debug)]
pub struct PreparedNetwork {
    // dropped before `root`
    validators: Vec<Validator>,
    config: NetworkConfig,
    root: Root,
}

impl PreparedNetwork {
    pub fn init(config: NetworkConfig) -> Result<Self, SetupError> {
        if config.num_validators == 0 {
            return Err(SetupError::Config("at least one validator is needed".into()));
        }

        let root = Root::create(&config)?;
        init_files(&config, root.path())?;

        let validators = (0..config.num_validators)
            .map(|i| Validator::prepare(i, root.path(), &config))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            validators = validators.len(),
            root = %root.path().display(),
            "prepared network"
        );

        Ok(Self {
            validators,
            config,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// The bootstrapper's `app_state`; identical on every node.
    pub fn base_genesis(&self) -> Result<GenesisDocument, SetupError> {
        let node0 = &self.validators[0];
        let file = GenesisFile::read(&node0.home.genesis_json())?;

        Ok(file.app_state)
    }

    /// Installs `genesis` on every node, starts them and waits for the first
    /// block.
    pub fn launch(self, genesis: GenesisDocument) -> Result<Network, SetupError> {
        let Self {
            validators,
            config,
            root,
        } = self;

        let mut file = GenesisFile::read(&validators[0].home.genesis_json())?;
        file.app_state = genesis;

        for validator in &validators {
            file.write(&validator.home.genesis_json())?;
        }

        let mut network = Network {
            validators,
            config,
            root,
        };

        for validator in network.validators.iter_mut() {
            validator.start(&network.config.binary)?;
        }

        info!("waiting for first block");
        network.wait_for_height(1, network.config.startup_timeout())?;

        Ok(network)
    }
}

/// A running network.
#[derive(Debug)]
pub struct Network {
    validators: Vec<Validator>,
    config: NetworkConfig,
    root: Root,
}

impl Network {
    /// Prepares, lets `compose` turn the base genesis into the final one, and
    /// launches.
    pub fn start<F, E>(config: NetworkConfig, compose: F) -> Result<Self, E>
    where
        F: FnOnce(GenesisDocument) -> Result<GenesisDocument, E>,
        E: From<SetupError>,
    {
        let prepared = PreparedNetwork::init(config)?;
        let base = prepared.base_genesis()?;
        let genesis = compose(base)?;

        Ok(prepared.launch(genesis)?)
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn validator(&self, index: usize) -> Option<&Validator> {
        self.validators.get(index)
    }

    pub fn validator_mut(&mut self, index: usize) -> Option<&mut Validator> {
        self.validators.get_mut(index)
    }

    pub fn latest_height(&self) -> Result<u64, SetupError> {
        Ok(self.validators[0].rpc.latest_height()?)
    }

    /// Blocks until the first validator reports `height`, failing early if a
    /// node dies.
    pub fn wait_for_height(&mut self, height: u64, timeout: Duration) -> Result<u64, SetupError> {
        let started = Instant::now();

        loop {
            for validator in self.validators.iter_mut() {
                validator.check_alive()?;
            }

            match self.validators[0].rpc.latest_height() {
                Ok(current) if current >= height => {
                    debug!(current, "reached height");
                    return Ok(current);
                }
                Ok(current) => debug!(current, target = height, "waiting for height"),
                Err(err) => debug!(%err, "rpc not ready"),
            }

            if started.elapsed() >= timeout {
                return Err(SetupError::LivenessTimeout {
                    height,
                    waited: started.elapsed(),
                });
            }

            thread::sleep(self.config.poll_interval());
        }
    }

    pub fn wait_for_next_block(&mut self) -> Result<u64, SetupError> {
        let next = self.latest_height()? + 1;
        self.wait_for_height(next, self.config.block_timeout())
    }

    pub fn stop(mut self) {
        for validator in self.validators.iter_mut() {
            validator.stop();
        }

        if let Root::Kept(dir) = &self.root {
            warn!(root = %dir.display(), "leaving network files in place");
        }

        info!("network stopped");
    }
}
