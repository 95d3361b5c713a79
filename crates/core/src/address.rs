use std::{fmt::Display, str::FromStr};

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Bech32 human readable part for EmpowerChain account addresses.
pub const ACCOUNT_PREFIX: &str = "empower";

const ADDRESS_LEN: usize = 20;

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("invalid bech32 address: {0}")]
    Bech32(#[from] bech32::DecodeError),

    #[error("unexpected address prefix {found}, expected {expected}")]
    Prefix { found: String, expected: String },

    #[error("unexpected address length {0}, expected 20 bytes")]
    Length(usize),
}

/// A 20-byte account address, rendered as bech32 with the `empower` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccAddress([u8; ADDRESS_LEN]);

impl AccAddress {
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let bytes: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressError::Length(bytes.len()))?;

        Ok(Self(bytes))
    }

    /// Address of a module account: the first 20 bytes of `sha256(name)`.
    pub fn for_module(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());

        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..ADDRESS_LEN]);

        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_bech32(&self) -> String {
        let hrp = Hrp::parse_unchecked(ACCOUNT_PREFIX);

        // a 20 byte payload with a short valid hrp can't exceed the bech32 length limit
        bech32::encode::<Bech32>(hrp, &self.0).unwrap_or_default()
    }
}

impl FromStr for AccAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hrp, data) = bech32::decode(s)?;

        if hrp.as_str() != ACCOUNT_PREFIX {
            return Err(AddressError::Prefix {
                found: hrp.to_string(),
                expected: ACCOUNT_PREFIX.to_owned(),
            });
        }

        Self::try_from_slice(&data)
    }
}

impl Display for AccAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_bech32())
    }
}

impl Serialize for AccAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_bech32())
    }
}

impl<'de> Deserialize<'de> for AccAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = String::deserialize(deserializer)?;
        repr.parse().map_err(<D::Error as serde::de::Error>::custom)
    }
}
