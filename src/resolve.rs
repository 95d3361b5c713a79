//! From the JSON printed by a `tx` command to the typed message response.
//!
//! A sync broadcast only tells us the tx got into the mempool. Resolution
//! walks four states, each with its own transition function:
//!
//! * [`Submitted`]: the acknowledgment parsed and passed admission
//! * [`Pending`]: its hash is known
//! * [`Confirmed`]: the tx is in a block and executed successfully
//! * decoded: the first message response, as the caller's type
//!
//! [`TxResolver::resolve`] runs them in order.

use std::fmt::Display;

use prost::{Message, Name};
use thiserror::Error;
use tracing::{debug, warn};

use empower_e2e_core::{
    tx::{Any, TxMsgData},
    TxHash, TxResponse,
};

use crate::confirm::{ConfirmError, LookupError, TxConfirm};

/// Which of the nested encodings of a tx result could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeLayer {
    Hex,
    Envelope,
    TypedPayload,
}

impl Display for DecodeLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeLayer::Hex => f.write_str("hex"),
            DecodeLayer::Envelope => f.write_str("envelope"),
            DecodeLayer::TypedPayload => f.write_str("typed-payload"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid acknowledgment: {0}")]
    InvalidAcknowledgment(String),

    #[error("rejected at admission with code {code} ({codespace}): {raw_log}")]
    AdmissionRejected {
        code: u32,
        codespace: String,
        raw_log: String,
    },

    #[error("tx {hash} not confirmed after {attempts} attempts")]
    ConfirmationTimeout { hash: TxHash, attempts: usize },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("tx {hash} failed execution with code {code} ({codespace}): {raw_log}")]
    ExecutionFailed {
        hash: TxHash,
        code: u32,
        codespace: String,
        raw_log: String,
    },

    #[error("can't decode {layer} layer of tx result: {message}")]
    Decode { layer: DecodeLayer, message: String },
}

impl ResolveError {
    fn decode(layer: DecodeLayer, message: impl Display) -> Self {
        ResolveError::Decode {
            layer,
            message: message.to_string(),
        }
    }

    /// The failing decode layer, if this is a decode error.
    pub fn layer(&self) -> Option<DecodeLayer> {
        match self {
            ResolveError::Decode { layer, .. } => Some(*layer),
            _ => None,
        }
    }
}

impl From<ConfirmError> for ResolveError {
    fn from(value: ConfirmError) -> Self {
        match value {
            ConfirmError::Timeout { hash, attempts, .. } => {
                ResolveError::ConfirmationTimeout { hash, attempts }
            }
            ConfirmError::Lookup(x) => ResolveError::Lookup(x),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submitted(pub TxResponse);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending(pub TxHash);

#[derive(Debug, Clone, PartialEq)]
pub struct Confirmed {
    pub hash: TxHash,
    pub response: TxResponse,
}

/// Some CLI versions print warnings (gas estimates, deprecation notices)
/// before the JSON object.
fn json_start(raw: &[u8]) -> &[u8] {
    match raw.iter().position(|b| *b == b'{') {
        Some(idx) => &raw[idx..],
        None => raw,
    }
}

/// Parses the acknowledgment and checks mempool admission.
pub fn submit(ack: &[u8]) -> Result<Submitted, ResolveError> {
    let response: TxResponse = serde_json::from_slice(json_start(ack)).map_err(|e| {
        ResolveError::InvalidAcknowledgment(format!(
            "{e}: {}",
            String::from_utf8_lossy(ack).trim()
        ))
    })?;

    if !response.is_ok() {
        debug!(code = response.code, raw_log = %response.raw_log, "tx rejected at admission");

        return Err(ResolveError::AdmissionRejected {
            code: response.code,
            codespace: response.codespace,
            raw_log: response.raw_log,
        });
    }

    Ok(Submitted(response))
}

pub fn pending(submitted: Submitted) -> Result<Pending, ResolveError> {
    let Submitted(response) = submitted;

    response.txhash.parse().map(Pending).map_err(|e| {
        ResolveError::InvalidAcknowledgment(format!("bad txhash {:?}: {e}", response.txhash))
    })
}

pub fn confirm(pending: Pending, confirmer: &impl TxConfirm) -> Result<Confirmed, ResolveError> {
    let Pending(hash) = pending;
    let response = confirmer.confirm(&hash)?;

    if !response.is_ok() {
        warn!(%hash, code = response.code, "tx included but failed");

        return Err(ResolveError::ExecutionFailed {
            hash,
            code: response.code,
            codespace: response.codespace,
            raw_log: response.raw_log,
        });
    }

    Ok(Confirmed { hash, response })
}

fn decode_hex(data: &str) -> Result<Vec<u8>, ResolveError> {
    hex::decode(data.trim()).map_err(|e| ResolveError::decode(DecodeLayer::Hex, e))
}

fn decode_envelope(bytes: &[u8]) -> Result<Any, ResolveError> {
    let envelope =
        TxMsgData::decode(bytes).map_err(|e| ResolveError::decode(DecodeLayer::Envelope, e))?;

    envelope
        .msg_responses
        .into_iter()
        .next()
        .ok_or_else(|| ResolveError::decode(DecodeLayer::Envelope, "no message responses"))
}

fn decode_payload<T>(any: &Any) -> Result<T, ResolveError>
where
    T: Message + Name + Default,
{
    let expected = T::type_url();

    if any.type_url != expected {
        return Err(ResolveError::decode(
            DecodeLayer::TypedPayload,
            format!("expected {expected}, found {}", any.type_url),
        ));
    }

    T::decode(any.value.as_slice()).map_err(|e| ResolveError::decode(DecodeLayer::TypedPayload, e))
}

/// Decodes the first message response of a confirmed tx.
pub fn decode<T>(confirmed: &Confirmed) -> Result<T, ResolveError>
where
    T: Message + Name + Default,
{
    let bytes = decode_hex(&confirmed.response.data)?;
    let first = decode_envelope(&bytes)?;

    decode_payload(&first)
}

/// Drives an acknowledgment through every resolution step.
#[derive(Debug, Clone)]
pub struct TxResolver<C> {
    confirm: C,
}

impl<C: TxConfirm> TxResolver<C> {
    pub fn new(confirm: C) -> Self {
        Self { confirm }
    }

    /// Resolves `ack` into its confirmed response without decoding it.
    pub fn confirmed(&self, ack: &[u8]) -> Result<Confirmed, ResolveError> {
        let submitted = submit(ack)?;
        let pending = pending(submitted)?;

        confirm(pending, &self.confirm)
    }

    pub fn resolve<T>(&self, ack: &[u8]) -> Result<T, ResolveError>
    where
        T: Message + Name + Default,
    {
        let confirmed = self.confirmed(ack)?;
        decode(&confirmed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use empower_e2e_core::msg::{MsgCreateIssuerResponse, MsgCreateProjectResponse};

    use super::*;

    const HASH: &str = "9F86D081884C7D659A2FEAA0C55AD015A3BF4F1B2B0B822CD15D6C15B0F00A08";

    fn ack(code: u32) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "height": "0",
            "txhash": HASH,
            "codespace": if code == 0 { "" } else { "sdk" },
            "code": code,
            "raw_log": if code == 0 { "[]" } else { "insufficient fee" },
        }))
        .unwrap()
    }

    fn confirmed_with(data: String) -> Confirmed {
        Confirmed {
            hash: HASH.parse().unwrap(),
            response: TxResponse {
                height: 5,
                txhash: HASH.into(),
                data,
                ..Default::default()
            },
        }
    }

    fn envelope(responses: Vec<Any>) -> String {
        hex::encode_upper(
            TxMsgData {
                msg_responses: responses,
            }
            .encode_to_vec(),
        )
    }

    #[test]
    fn rejected_ack_stops_at_submit() {
        let err = submit(&ack(5)).unwrap_err();

        assert!(matches!(
            err,
            ResolveError::AdmissionRejected { code: 5, raw_log, .. } if raw_log == "insufficient fee"
        ));
    }

    #[test]
    fn leading_cli_noise_is_skipped() {
        let mut raw = b"gas estimate: 123456\n".to_vec();
        raw.extend(ack(0));

        let submitted = submit(&raw).unwrap();
        assert_eq!(pending(submitted).unwrap().0.to_string(), HASH);
    }

    #[test]
    fn garbage_ack_is_invalid() {
        assert!(matches!(
            submit(b"Error: key not found"),
            Err(ResolveError::InvalidAcknowledgment(_))
        ));
    }

    #[test]
    fn short_hash_is_invalid() {
        let submitted = Submitted(TxResponse {
            txhash: "ABCD".into(),
            ..Default::default()
        });

        assert!(matches!(
            pending(submitted),
            Err(ResolveError::InvalidAcknowledgment(_))
        ));
    }

    #[test]
    fn decodes_first_response() {
        let first = MsgCreateIssuerResponse { issuer_id: 4 };
        let second = MsgCreateProjectResponse { project_id: 9 };

        let data = envelope(vec![
            Any {
                type_url: MsgCreateIssuerResponse::type_url(),
                value: first.encode_to_vec(),
            },
            Any {
                type_url: MsgCreateProjectResponse::type_url(),
                value: second.encode_to_vec(),
            },
        ]);

        let decoded: MsgCreateIssuerResponse = decode(&confirmed_with(data)).unwrap();
        assert_eq!(decoded, first);
    }

    #[test]
    fn each_layer_is_reported() {
        let bad_hex = decode::<MsgCreateIssuerResponse>(&confirmed_with("zz".into()));
        assert_eq!(bad_hex.unwrap_err().layer(), Some(DecodeLayer::Hex));

        let bad_envelope = decode::<MsgCreateIssuerResponse>(&confirmed_with("FFFF".into()));
        assert_eq!(bad_envelope.unwrap_err().layer(), Some(DecodeLayer::Envelope));

        let empty = decode::<MsgCreateIssuerResponse>(&confirmed_with(String::new()));
        assert_eq!(empty.unwrap_err().layer(), Some(DecodeLayer::Envelope));

        let wrong_type = envelope(vec![Any {
            type_url: MsgCreateProjectResponse::type_url(),
            value: MsgCreateProjectResponse { project_id: 1 }.encode_to_vec(),
        }]);

        let err = decode::<MsgCreateIssuerResponse>(&confirmed_with(wrong_type)).unwrap_err();
        assert_eq!(err.layer(), Some(DecodeLayer::TypedPayload));
        assert!(err.to_string().contains("typed-payload"));
    }
}
