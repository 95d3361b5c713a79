//! Mnemonic → secp256k1 key → account address.

use std::{fmt::Display, str::FromStr};

use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};
use k256::ecdsa::SigningKey;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use empower_e2e_core::AccAddress;

use super::IdentityError;

/// BIP-44 path for coin type 118, first account, first address.
pub const FULL_FUNDRAISER_PATH: &str = "m/44'/118'/0'/0/0";

/// Passphrase appended to the mnemonic when deriving the seed.
pub const DEFAULT_BIP39_PASSPHRASE: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Secp256k1,
}

impl FromStr for Algorithm {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "secp256k1" => Ok(Self::Secp256k1),
            other => Err(IdentityError::UnsupportedAlgorithm(other.to_owned())),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Secp256k1 => f.write_str("secp256k1"),
        }
    }
}

/// A private key together with what can be derived from it.
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self, IdentityError> {
        let signing = SigningKey::from_slice(bytes)
            .map_err(|e| IdentityError::InvalidKey(e.to_string()))?;

        Ok(Self { signing })
    }

    pub fn private_bytes(&self) -> [u8; 32] {
        self.signing.to_bytes().into()
    }

    /// Compressed SEC1 public key.
    pub fn public_bytes(&self) -> Vec<u8> {
        self.signing
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    pub fn address(&self) -> AccAddress {
        address_from_pubkey(&self.public_bytes())
    }
}

/// `ripemd160(sha256(pubkey))`, the account address of a secp256k1 key.
pub fn address_from_pubkey(pubkey: &[u8]) -> AccAddress {
    let sha = Sha256::digest(pubkey);
    let hash = Ripemd160::digest(sha);

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash);

    AccAddress::from_bytes(bytes)
}

pub fn parse_mnemonic(phrase: &str) -> Result<Mnemonic, IdentityError> {
    Mnemonic::parse_in_normalized(Language::English, phrase)
        .map_err(|e| IdentityError::InvalidMnemonic(e.to_string()))
}

pub fn derive_key(
    mnemonic: &str,
    passphrase: &str,
    path: &str,
    algorithm: Algorithm,
) -> Result<KeyPair, IdentityError> {
    let Algorithm::Secp256k1 = algorithm;

    let mnemonic = parse_mnemonic(mnemonic)?;
    let seed = mnemonic.to_seed(passphrase);

    let path: DerivationPath = path
        .parse()
        .map_err(|_| IdentityError::InvalidDerivationPath(path.to_owned()))?;

    let xprv = XPrv::derive_from_path(seed, &path)
        .map_err(|e| IdentityError::InvalidKey(e.to_string()))?;

    Ok(KeyPair {
        signing: xprv.private_key().clone(),
    })
}
