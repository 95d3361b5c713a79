//! Builders and fakes for exercising the harness without a running chain.

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashMap},
};

use prost::{Message, Name};
use serde_json::{json, Value};

use empower_e2e_core::{
    confirm::{ConfirmError, LookupError, TxConfirm, TxLookup},
    module_names::{AUTH, BANK, DISTRIBUTION, GOV, PLASTIC_CREDIT},
    tx::{Any, TxMsgData},
    TxHash, TxResponse,
};

/// Address of the single genesis validator in [`base_app_state`].
pub const VALIDATOR_ADDRESS: &str = "empower1xwl9jka7g3w32tjg5u7z7wcxjz4mmlyhqwg7vk";

/// A small `app_state` shaped like the one `testnet init-files` writes.
pub fn base_app_state() -> BTreeMap<String, Value> {
    let mut state = BTreeMap::new();

    state.insert(
        AUTH.to_owned(),
        json!({
            "params": { "max_memo_characters": "256" },
            "accounts": [{
                "@type": "/cosmos.auth.v1beta1.BaseAccount",
                "address": VALIDATOR_ADDRESS,
                "pub_key": null,
                "account_number": "0",
                "sequence": "0"
            }]
        }),
    );

    state.insert(
        BANK.to_owned(),
        json!({
            "params": { "default_send_enabled": true },
            "balances": [{
                "address": VALIDATOR_ADDRESS,
                "coins": [{ "denom": "stake", "amount": "1000000000" }]
            }],
            "supply": [],
            "denom_metadata": []
        }),
    );

    state.insert(
        GOV.to_owned(),
        json!({
            "starting_proposal_id": "1",
            "params": {
                "min_deposit": [{ "denom": "stake", "amount": "10000000" }],
                "max_deposit_period": "172800s",
                "voting_period": "172800s"
            }
        }),
    );

    state.insert(
        DISTRIBUTION.to_owned(),
        json!({
            "params": { "community_tax": "0.020000000000000000" },
            "fee_pool": { "community_pool": [] },
            "delegator_withdraw_infos": []
        }),
    );

    state.insert(
        PLASTIC_CREDIT.to_owned(),
        json!({
            "params": {
                "issuer_creator": "",
                "credit_class_creation_fee": { "denom": "stake", "amount": "0" }
            },
            "id_counters": {
                "next_issuer_id": "1",
                "next_applicant_id": "1",
                "next_project_id": "1"
            },
            "issuers": [],
            "applicants": [],
            "credit_classes": [],
            "projects": [],
            "credit_collections": [],
            "credit_balances": []
        }),
    );

    state.insert("staking".to_owned(), json!({ "params": { "bond_denom": "stake" } }));

    state
}

/// Deterministic hash for the `n`th fake tx.
pub fn tx_hash(n: u8) -> TxHash {
    TxHash([n; 32])
}

/// Sync broadcast acknowledgment as printed by `tx ... --output=json`.
pub fn ack(hash: &TxHash, code: u32, raw_log: &str) -> Vec<u8> {
    let raw = json!({
        "height": "0",
        "txhash": hash.to_string(),
        "codespace": if code == 0 { "" } else { "sdk" },
        "code": code,
        "data": "",
        "raw_log": raw_log,
        "logs": [],
        "info": "",
        "gas_wanted": "0",
        "gas_used": "0",
        "tx": null,
        "timestamp": "",
        "events": []
    });

    raw.to_string().into_bytes()
}

pub fn accepted_ack(hash: &TxHash) -> Vec<u8> {
    ack(hash, 0, "[]")
}

pub fn any_of<T: Message + Name>(msg: &T) -> Any {
    Any {
        type_url: T::type_url(),
        value: msg.encode_to_vec(),
    }
}

/// Hex `data` field holding a `TxMsgData` with `responses`.
pub fn envelope(responses: Vec<Any>) -> String {
    let data = TxMsgData {
        msg_responses: responses,
    };

    hex::encode_upper(data.encode_to_vec())
}

/// Response of `query tx` for an included tx.
pub fn included_tx(hash: &TxHash, code: u32, data: String, raw_log: &str) -> TxResponse {
    TxResponse {
        height: 12,
        txhash: hash.to_string(),
        codespace: if code == 0 { String::new() } else { "plasticcredit".into() },
        code,
        data,
        raw_log: raw_log.to_owned(),
        gas_wanted: 200_000,
        gas_used: 87_211,
        ..Default::default()
    }
}

/// Included, successful tx whose first message returned `msg`.
pub fn confirmed_tx<T: Message + Name>(hash: &TxHash, msg: &T) -> TxResponse {
    included_tx(hash, 0, envelope(vec![any_of(msg)]), "")
}

struct Entry {
    visible_after: usize,
    polls: usize,
    response: TxResponse,
}

/// In-memory tx index. Each tx becomes visible after a number of lookups,
/// which lets tests drive [`empower_e2e_core::confirm::PollingConfirm`].
#[derive(Default)]
pub struct FakeChain {
    txs: RefCell<HashMap<TxHash, Entry>>,
    lookups: Cell<usize>,
    confirms: Cell<usize>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `response`; it is found on the `visible_after + 1`th lookup.
    pub fn include(&self, hash: TxHash, response: TxResponse, visible_after: usize) {
        self.txs.borrow_mut().insert(
            hash,
            Entry {
                visible_after,
                polls: 0,
                response,
            },
        );
    }

    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }

    pub fn confirms(&self) -> usize {
        self.confirms.get()
    }

    /// Total calls through either trait.
    pub fn calls(&self) -> usize {
        self.lookups() + self.confirms()
    }
}

impl TxLookup for FakeChain {
    fn lookup_tx(&self, hash: &TxHash) -> Result<Option<TxResponse>, LookupError> {
        self.lookups.set(self.lookups.get() + 1);

        let mut txs = self.txs.borrow_mut();

        let Some(entry) = txs.get_mut(hash) else {
            return Ok(None);
        };

        entry.polls += 1;

        if entry.polls > entry.visible_after {
            Ok(Some(entry.response.clone()))
        } else {
            Ok(None)
        }
    }
}

/// Confirms in one step; a tx that is not visible yet counts as a timeout.
impl TxConfirm for FakeChain {
    fn confirm(&self, hash: &TxHash) -> Result<TxResponse, ConfirmError> {
        self.confirms.set(self.confirms.get() + 1);

        let txs = self.txs.borrow();

        match txs.get(hash) {
            Some(entry) => Ok(entry.response.clone()),
            None => Err(ConfirmError::Timeout {
                hash: *hash,
                attempts: 1,
                elapsed: Default::default(),
            }),
        }
    }
}
