//! Where `testnet init-files` puts things, and the edits each node home needs
//! before it can run next to its peers on one machine.
//!
//! Every validator gets its own loopback address (`127.0.0.1`, `127.0.0.2`,
//! ...) so all of them can keep the default ports. The bootstrapper already
//! wrote peers with those addresses when given `--starting-ip-address`.

use std::{
    fs,
    net::Ipv4Addr,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use toml::{Table, Value};

use super::{NetworkConfig, SetupError};

pub const STARTING_IP: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

pub const RPC_PORT: u16 = 26657;
pub const P2P_PORT: u16 = 26656;
pub const ABCI_PORT: u16 = 26658;
pub const GRPC_PORT: u16 = 9090;

pub fn moniker(index: usize) -> String {
    format!("node{index}")
}

pub fn validator_ip(index: usize) -> Result<Ipv4Addr, SetupError> {
    let last = u8::try_from(index + 1)
        .ok()
        .filter(|x| *x < 255)
        .ok_or_else(|| SetupError::Layout(format!("no loopback address for validator {index}")))?;

    let [a, b, c, _] = STARTING_IP.octets();

    Ok(Ipv4Addr::new(a, b, c, last))
}

/// Paths inside one validator home.
#[derive(Debug, Clone)]
pub struct NodeHome {
    pub root: PathBuf,
}

impl NodeHome {
    pub fn new(output_dir: &Path, index: usize, daemon_home: &str) -> Self {
        Self {
            root: output_dir.join(moniker(index)).join(daemon_home),
        }
    }

    pub fn config_toml(&self) -> PathBuf {
        self.root.join("config").join("config.toml")
    }

    pub fn app_toml(&self) -> PathBuf {
        self.root.join("config").join("app.toml")
    }

    pub fn genesis_json(&self) -> PathBuf {
        self.root.join("config").join("genesis.json")
    }

    pub fn key_seed(&self) -> PathBuf {
        self.root.join("key_seed.json")
    }

    pub fn harness_keyring(&self) -> PathBuf {
        self.root.join("harness-keyring")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("node.log")
    }
}

#[derive(Debug, Deserialize)]
struct KeySeed {
    secret: String,
}

/// The validator mnemonic written by the bootstrapper.
pub fn read_key_seed(home: &NodeHome) -> Result<String, SetupError> {
    let path = home.key_seed();

    let raw = fs::read(&path)
        .map_err(|e| SetupError::Layout(format!("reading {}: {e}", path.display())))?;

    let seed: KeySeed = serde_json::from_slice(&raw)
        .map_err(|e| SetupError::Layout(format!("parsing {}: {e}", path.display())))?;

    Ok(seed.secret)
}

fn set(table: &mut Table, section: &str, key: &str, value: impl Into<Value>) {
    let target = if section.is_empty() {
        table
    } else {
        let entry = table
            .entry(section)
            .or_insert_with(|| Value::Table(Table::new()));

        if !entry.is_table() {
            *entry = Value::Table(Table::new());
        }

        match entry {
            Value::Table(inner) => inner,
            _ => return,
        }
    };

    target.insert(key.to_owned(), value.into());
}

fn edit_toml(path: &Path, edit: impl FnOnce(&mut Table)) -> Result<(), SetupError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| SetupError::Layout(format!("reading {}: {e}", path.display())))?;

    let mut table: Table = raw
        .parse()
        .map_err(|e| SetupError::Config(format!("parsing {}: {e}", path.display())))?;

    edit(&mut table);

    let out = toml::to_string(&table)
        .map_err(|e| SetupError::Config(format!("writing {}: {e}", path.display())))?;

    fs::write(path, out)?;

    Ok(())
}

/// Points every CometBFT listener at the node's own address.
pub fn patch_config_toml(
    home: &NodeHome,
    ip: Ipv4Addr,
    config: &NetworkConfig,
) -> Result<(), SetupError> {
    edit_toml(&home.config_toml(), |t| {
        set(t, "", "proxy_app", format!("tcp://{ip}:{ABCI_PORT}"));
        set(t, "rpc", "laddr", format!("tcp://{ip}:{RPC_PORT}"));
        set(t, "rpc", "pprof_laddr", "");
        set(t, "p2p", "laddr", format!("tcp://{ip}:{P2P_PORT}"));
        set(t, "p2p", "allow_duplicate_ip", true);
        set(t, "p2p", "addr_book_strict", false);
        set(t, "consensus", "timeout_commit", config.timeout_commit.clone());
    })
}

pub fn patch_app_toml(home: &NodeHome, ip: Ipv4Addr) -> Result<(), SetupError> {
    edit_toml(&home.app_toml(), |t| {
        set(t, "api", "enable", false);
        set(t, "grpc", "enable", true);
        set(t, "grpc", "address", format!("{ip}:{GRPC_PORT}"));
        set(t, "grpc-web", "enable", false);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validators_get_consecutive_loopback_ips() {
        assert_eq!(validator_ip(0).unwrap(), Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(validator_ip(2).unwrap(), Ipv4Addr::new(127, 0, 0, 3));
        assert!(validator_ip(254).is_err());
    }

    #[test]
    fn listeners_are_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let home = NodeHome::new(dir.path(), 1, "empowerd");

        fs::create_dir_all(home.root.join("config")).unwrap();
        fs::write(
            home.config_toml(),
            r#"
proxy_app = "tcp://127.0.0.1:26658"
moniker = "node1"

[rpc]
laddr = "tcp://127.0.0.1:26657"
pprof_laddr = "localhost:6060"

[p2p]
laddr = "tcp://0.0.0.0:26656"
persistent_peers = "abc@127.0.0.1:26656"
"#,
        )
        .unwrap();

        let ip = validator_ip(1).unwrap();
        patch_config_toml(&home, ip, &NetworkConfig::default()).unwrap();

        let table: Table = fs::read_to_string(home.config_toml())
            .unwrap()
            .parse()
            .unwrap();

        assert_eq!(table["proxy_app"].as_str(), Some("tcp://127.0.0.2:26658"));
        assert_eq!(table["moniker"].as_str(), Some("node1"));
        assert_eq!(table["rpc"]["laddr"].as_str(), Some("tcp://127.0.0.2:26657"));
        assert_eq!(table["rpc"]["pprof_laddr"].as_str(), Some(""));
        assert_eq!(table["p2p"]["allow_duplicate_ip"].as_bool(), Some(true));
        assert_eq!(
            table["p2p"]["persistent_peers"].as_str(),
            Some("abc@127.0.0.1:26656")
        );
        assert_eq!(table["consensus"]["timeout_commit"].as_str(), Some("1s"));
    }

    #[test]
    fn key_seed_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let home = NodeHome::new(dir.path(), 0, "empowerd");

        fs::create_dir_all(&home.root).unwrap();
        fs::write(home.key_seed(), r#"{"secret":"word word"}"#).unwrap();

        assert_eq!(read_key_seed(&home).unwrap(), "word word");
    }
}
