use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

/// Hash of a transaction as indexed by the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl FromStr for TxHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/// JSON response printed by `tx` and `query tx` commands.
///
/// For a sync broadcast only `code`, `codespace`, `txhash` and `raw_log` are
/// meaningful; `height` and `data` are filled once the tx is in a block.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxResponse {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[serde(default)]
    pub height: i64,

    #[serde(default)]
    pub txhash: String,

    #[serde(default)]
    pub codespace: String,

    #[serde(default)]
    pub code: u32,

    /// Hex encoded `TxMsgData`.
    #[serde(default)]
    pub data: String,

    #[serde(default)]
    pub raw_log: String,

    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[serde(default)]
    pub gas_wanted: i64,

    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[serde(default)]
    pub gas_used: i64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TxResponse {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// `google.protobuf.Any`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,

    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

/// `cosmos.base.abci.v1beta1.TxMsgData`, the envelope carried in
/// [`TxResponse::data`]. Field 1 is the deprecated per-message `data` list and
/// is skipped on decode.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxMsgData {
    #[prost(message, repeated, tag = "2")]
    pub msg_responses: Vec<Any>,
}
