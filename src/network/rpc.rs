use std::time::Duration;

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("rpc request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status response: {0}")]
    Status(String),
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct SyncInfo {
    #[serde_as(as = "DisplayFromStr")]
    latest_block_height: u64,
}

#[derive(Debug, Deserialize)]
struct Status {
    sync_info: SyncInfo,
}

/// CometBFT wraps results in a JSON-RPC envelope on some versions only.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatusReply {
    Wrapped { result: Status },
    Bare(Status),
}

/// Blocking client for the node's CometBFT RPC.
#[derive(Debug, Clone)]
pub struct RpcClient {
    base: String,
    http: reqwest::blocking::Client,
}

impl RpcClient {
    pub fn new(base: impl Into<String>) -> Result<Self, RpcError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            base: base.into(),
            http,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn latest_height(&self) -> Result<u64, RpcError> {
        let raw = self
            .http
            .get(format!("{}/status", self.base))
            .send()?
            .error_for_status()?
            .bytes()?;

        parse_height(&raw)
    }
}

fn parse_height(raw: &[u8]) -> Result<u64, RpcError> {
    let reply: StatusReply =
        serde_json::from_slice(raw).map_err(|e| RpcError::Status(e.to_string()))?;

    let status = match reply {
        StatusReply::Wrapped { result } => result,
        StatusReply::Bare(status) => status,
    };

    Ok(status.sync_info.latest_block_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_wrapped_and_bare_status() {
        let wrapped = br#"{"jsonrpc":"2.0","id":-1,"result":{"node_info":{},"sync_info":{"latest_block_height":"12","catching_up":false}}}"#;
        assert_eq!(parse_height(wrapped).unwrap(), 12);

        let bare = br#"{"sync_info":{"latest_block_height":"3"}}"#;
        assert_eq!(parse_height(bare).unwrap(), 3);

        assert!(matches!(
            parse_height(br#"{"error":"boom"}"#),
            Err(RpcError::Status(_))
        ));
    }
}
