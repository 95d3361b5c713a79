//! Deterministic signing identities for test actors and validators.

use thiserror::Error;

pub mod armor;
pub mod hd;
pub mod keyring;

pub use hd::{Algorithm, KeyPair, DEFAULT_BIP39_PASSPHRASE, FULL_FUNDRAISER_PATH};
pub use keyring::{FileKeyring, KeyRecord, Keyring, MemoryKeyring};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid key name: {0:?}")]
    InvalidName(String),

    #[error("invalid armor: {0}")]
    InvalidArmor(String),

    #[error("failed to decrypt armored key, wrong passphrase?")]
    Decryption,

    #[error("identity {0} already exists")]
    DuplicateIdentity(String),

    #[error("identity {name} derived {derived}, expected {expected}")]
    AddressMismatch {
        name: String,
        expected: String,
        derived: String,
    },

    #[error("identity {0} not found")]
    NotFound(String),

    #[error("keyring io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("keyring record error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything needed to derive a key; the name is the keyring entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningIdentity {
    pub name: String,
    pub mnemonic: String,
    pub hd_path: String,
    pub algorithm: Algorithm,
}

impl SigningIdentity {
    /// Identity on the default fundraiser path with secp256k1.
    pub fn new(name: impl Into<String>, mnemonic: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mnemonic: mnemonic.into(),
            hd_path: FULL_FUNDRAISER_PATH.to_owned(),
            algorithm: Algorithm::Secp256k1,
        }
    }

    pub fn with_hd_path(self, hd_path: impl Into<String>) -> Self {
        Self {
            hd_path: hd_path.into(),
            ..self
        }
    }
}
