//! The chain binary as a client: broadcasting txs, querying the index and
//! managing its keyring.

use std::{
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

use thiserror::Error;
use tracing::debug;

use empower_e2e_core::{Coin, TxHash, TxResponse};

use crate::confirm::{LookupError, TxLookup};

pub const KEYRING_BACKEND: &str = "test";

/// Fee used when nothing else is configured.
pub fn default_fee() -> Coin {
    Coin::new(10, "stake")
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("can't run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected output from {command}: {source}")]
    Output {
        command: String,
        source: serde_json::Error,
    },

    #[error("no armored key in output of {command}")]
    MissingArmor { command: String },
}

/// Flags appended to every `tx` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonFlags {
    pub skip_confirmation: bool,
    pub broadcast_mode: String,
    pub output: String,
    pub fees: Coin,
}

impl Default for CommonFlags {
    fn default() -> Self {
        Self::with_fees(default_fee())
    }
}

impl CommonFlags {
    pub fn with_fees(fees: Coin) -> Self {
        Self {
            skip_confirmation: true,
            broadcast_mode: "sync".into(),
            output: "json".into(),
            fees,
        }
    }

    pub fn to_args(&self) -> Vec<String> {
        vec![
            format!("--yes={}", self.skip_confirmation),
            format!("--broadcast-mode={}", self.broadcast_mode),
            format!("--output={}", self.output),
            format!("--fees={}", self.fees),
        ]
    }
}

/// Something that can submit a tx and hand back the raw acknowledgment.
pub trait CommandInterface {
    /// `args` are the `tx` subcommand and its arguments, e.g.
    /// `["plasticcredit", "create-issuer", ..., "--from=issuer"]`.
    fn submit(&self, args: &[String]) -> Result<Vec<u8>, CliError>;
}

/// Key management in the chain binary's own keyring.
///
/// Passphrases are the ones guarding armored exports; the keyring backend
/// itself is unencrypted.
pub trait KeyCommands {
    /// `keys add <name> --recover`, with the mnemonic fed on stdin.
    fn recover_key(&self, name: &str, mnemonic: &str) -> Result<(), CliError>;

    /// `keys export <name>`, returning the ASCII armor.
    fn export_key(&self, name: &str, passphrase: &str) -> Result<String, CliError>;

    /// `keys import <name> <file>` for armor produced by [`Self::export_key`].
    fn import_key(&self, name: &str, armor: &str, passphrase: &str) -> Result<(), CliError>;
}

const ARMOR_BEGIN: &str = "-----BEGIN ";
const ARMOR_END: &str = "-----END ";

/// Cuts the armored block out of command output. Depending on the SDK
/// version it goes to stdout or stderr, next to prompts.
fn extract_armor(output: &str) -> Option<String> {
    let start = output.find(ARMOR_BEGIN)?;
    let rest = &output[start..];

    let end_marker = rest.find(ARMOR_END)?;
    let end_line = rest[end_marker..]
        .find('\n')
        .map(|x| end_marker + x)
        .unwrap_or(rest.len());

    Some(rest[..end_line].trim_end().to_owned())
}

/// Client context of one validator: its home, keyring and RPC endpoint.
#[derive(Debug, Clone)]
pub struct ChainCli {
    binary: PathBuf,
    home: PathBuf,
    chain_id: String,
    node: String,
    flags: CommonFlags,
}

fn describe(cmd: &Command) -> String {
    let args: Vec<_> = cmd.get_args().map(|x| x.to_string_lossy()).collect();
    format!("{} {}", cmd.get_program().to_string_lossy(), args.join(" "))
}

impl ChainCli {
    pub fn new(
        binary: impl Into<PathBuf>,
        home: impl Into<PathBuf>,
        chain_id: impl Into<String>,
        node: impl Into<String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            home: home.into(),
            chain_id: chain_id.into(),
            node: node.into(),
            flags: CommonFlags::default(),
        }
    }

    pub fn with_flags(self, flags: CommonFlags) -> Self {
        Self { flags, ..self }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn flags(&self) -> &CommonFlags {
        &self.flags
    }

    fn command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(subcommand);
        cmd
    }

    fn scoped(&self, cmd: &mut Command) {
        cmd.arg("--home").arg(&self.home);
        cmd.arg(format!("--keyring-backend={KEYRING_BACKEND}"));
    }

    fn networked(&self, cmd: &mut Command) {
        self.scoped(cmd);
        cmd.arg(format!("--chain-id={}", self.chain_id));
        cmd.arg(format!("--node={}", self.node));
    }

    fn run(cmd: &mut Command) -> Result<Output, CliError> {
        let command = describe(cmd);
        debug!(%command, "running chain cli");

        cmd.output().map_err(|source| CliError::Spawn { command, source })
    }

    /// Runs `cmd` with `input` written to its stdin.
    fn run_with_input(cmd: &mut Command, input: &str) -> Result<Output, CliError> {
        let command = describe(cmd);
        debug!(%command, "running chain cli");

        let spawn_error = |source| CliError::Spawn {
            command: command.clone(),
            source,
        };

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).map_err(spawn_error)?;
        }

        child.wait_with_output().map_err(spawn_error)
    }

    fn check(cmd: &Command, output: Output) -> Result<Output, CliError> {
        if !output.status.success() {
            return Err(CliError::Failed {
                command: describe(cmd),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(output)
    }

    fn run_ok(cmd: &mut Command) -> Result<Vec<u8>, CliError> {
        let output = Self::run(cmd)?;

        if !output.status.success() {
            return Err(CliError::Failed {
                command: describe(cmd),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(output.stdout)
    }

    /// Runs `query <args> --output=json` and returns stdout.
    pub fn query(&self, args: &[String]) -> Result<Vec<u8>, CliError> {
        let mut cmd = self.command("query");
        cmd.args(args);
        cmd.arg("--output=json");
        cmd.arg(format!("--node={}", self.node));

        Self::run_ok(&mut cmd)
    }
}

impl KeyCommands for ChainCli {
    fn recover_key(&self, name: &str, mnemonic: &str) -> Result<(), CliError> {
        let mut cmd = self.command("keys");
        cmd.args(["add", name, "--recover"]);
        self.scoped(&mut cmd);

        let output = Self::run_with_input(&mut cmd, &format!("{mnemonic}\n"))?;
        Self::check(&cmd, output)?;

        debug!(%name, home = %self.home.display(), "recovered key in chain keyring");

        Ok(())
    }

    fn export_key(&self, name: &str, passphrase: &str) -> Result<String, CliError> {
        let mut cmd = self.command("keys");
        cmd.args(["export", name]);
        self.scoped(&mut cmd);

        let output = Self::run_with_input(&mut cmd, &format!("{passphrase}\n"))?;
        let output = Self::check(&cmd, output)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        extract_armor(&stdout)
            .or_else(|| extract_armor(&stderr))
            .ok_or_else(|| CliError::MissingArmor {
                command: describe(&cmd),
            })
    }

    fn import_key(&self, name: &str, armor: &str, passphrase: &str) -> Result<(), CliError> {
        let mut file = tempfile::NamedTempFile::new().map_err(|source| CliError::Spawn {
            command: "keys import".into(),
            source,
        })?;

        file.write_all(armor.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|source| CliError::Spawn {
                command: "keys import".into(),
                source,
            })?;

        let mut cmd = self.command("keys");
        cmd.args(["import", name]).arg(file.path());
        self.scoped(&mut cmd);

        let output = Self::run_with_input(&mut cmd, &format!("{passphrase}\n"))?;
        Self::check(&cmd, output)?;

        Ok(())
    }
}

impl CommandInterface for ChainCli {
    fn submit(&self, args: &[String]) -> Result<Vec<u8>, CliError> {
        let mut cmd = self.command("tx");
        cmd.args(args);
        cmd.args(self.flags.to_args());
        self.networked(&mut cmd);

        Self::run_ok(&mut cmd)
    }
}

fn is_not_found(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("not found")
}

impl TxLookup for ChainCli {
    fn lookup_tx(&self, hash: &TxHash) -> Result<Option<TxResponse>, LookupError> {
        let mut cmd = self.command("query");
        cmd.args(["tx", &hash.to_string(), "--output=json"]);
        cmd.arg(format!("--node={}", self.node));

        let command = describe(&cmd);
        let output = Self::run(&mut cmd).map_err(|e| LookupError(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);

            if is_not_found(&stderr) {
                return Ok(None);
            }

            return Err(LookupError(format!("{command}: {}", stderr.trim())));
        }

        serde_json::from_slice(&output.stdout)
            .map(Some)
            .map_err(|source| LookupError(CliError::Output { command, source }.to_string()))
    }
}
