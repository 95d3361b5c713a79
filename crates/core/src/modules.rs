//! The slices of framework module genesis states that the harness edits.
//!
//! Only the touched fields are typed; everything else rides along in the
//! flattened `extra` maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Coin, DecCoin};

/// `@type` of a plain account in `auth.accounts`.
pub const BASE_ACCOUNT_TYPE: &str = "/cosmos.auth.v1beta1.BaseAccount";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthGenesis {
    /// Accounts are `Any`-encoded; only their `address` is inspected.
    #[serde(default)]
    pub accounts: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthGenesis {
    pub fn has_account(&self, address: &str) -> bool {
        self.accounts
            .iter()
            .any(|x| x.get("address").and_then(Value::as_str) == Some(address))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub address: String,

    #[serde(default)]
    pub coins: Vec<Coin>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankGenesis {
    #[serde(default)]
    pub balances: Vec<Balance>,

    #[serde(default)]
    pub supply: Vec<Coin>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_period: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovGenesis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<GovParams>,

    /// Pre-v1 layout still exported by some framework versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_params: Option<GovParams>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeePool {
    #[serde(default)]
    pub community_pool: Vec<DecCoin>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionGenesis {
    #[serde(default)]
    pub fee_pool: FeePool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
