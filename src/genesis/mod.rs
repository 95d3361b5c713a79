//! Composes the genesis `app_state` every suite starts from.
//!
//! [`compose`] takes whatever the node bootstrapper generated and layers the
//! domain fixtures, test account funding and parameter tweaks on top. It is
//! safe to run on its own output: ids keep growing, credit totals add up and
//! nothing is duplicated.

use std::{collections::BTreeMap, path::Path, time::Duration};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use empower_e2e_core::{
    coin::add_dec_coin,
    module_names::{AUTH, BANK, DISTRIBUTION, GOV, PLASTIC_CREDIT},
    modules::{AuthGenesis, BankGenesis, DistributionGenesis, GovGenesis, GovParams},
    AccAddress, Coin, CoinError, DecCoin, DomainLedgerState, IdCounters, IntegrityError,
};

use crate::actors::TestActor;

pub mod accounts;
pub mod fixtures;

pub const DEFAULT_BOND_DENOM: &str = "stake";
pub const DEFAULT_INITIAL_TOKENS: u128 = 500_000_000;
pub const DEFAULT_CREATION_FEE: u128 = 50_000;
pub const DEFAULT_VOTING_PERIOD: Duration = Duration::from_secs(10);

/// What the `nocoins` actor starts with.
pub const NOCOINS_TOKENS: u128 = 10;

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("module {module} has unexpected shape: {source}")]
    Module {
        module: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Coin(#[from] CoinError),

    #[error("plasticcredit ledger is inconsistent: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("genesis file io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("genesis file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Module name to module state, as found under `app_state`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenesisDocument(BTreeMap<String, Value>);

impl GenesisDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, module: &str) -> Option<&Value> {
        self.0.get(module)
    }

    pub fn contains(&self, module: &str) -> bool {
        self.0.contains_key(module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Typed view of a module; `None` when the entry is absent or null.
    pub fn module<T: DeserializeOwned>(&self, module: &str) -> Result<Option<T>, GenesisError> {
        match self.0.get(module) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| GenesisError::Module {
                    module: module.to_owned(),
                    source,
                }),
        }
    }

    pub fn set_module<T: Serialize>(&mut self, module: &str, state: &T) -> Result<(), GenesisError> {
        let value = serde_json::to_value(state).map_err(|source| GenesisError::Module {
            module: module.to_owned(),
            source,
        })?;

        self.0.insert(module.to_owned(), value);

        Ok(())
    }

    pub fn insert_raw(&mut self, module: impl Into<String>, value: Value) {
        self.0.insert(module.into(), value);
    }
}

impl From<BTreeMap<String, Value>> for GenesisDocument {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self(value)
    }
}

/// A node's `genesis.json`. Everything outside `app_state` is carried as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisFile {
    pub app_state: GenesisDocument,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl GenesisFile {
    pub fn read(path: &Path) -> Result<Self, GenesisError> {
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), GenesisError> {
        let raw = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, raw)?;

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeParams {
    pub bond_denom: String,
    pub initial_tokens: u128,
    pub credit_class_creation_fee: Coin,
    pub voting_period: Duration,
}

impl Default for ComposeParams {
    fn default() -> Self {
        Self {
            bond_denom: DEFAULT_BOND_DENOM.to_owned(),
            initial_tokens: DEFAULT_INITIAL_TOKENS,
            credit_class_creation_fee: Coin::new(DEFAULT_CREATION_FEE, DEFAULT_BOND_DENOM),
            voting_period: DEFAULT_VOTING_PERIOD,
        }
    }
}

/// Renders a duration the way protobuf JSON encodes `Duration`, e.g. `10s`
/// or `1.5s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let nanos = duration.subsec_nanos();

    if nanos == 0 {
        return format!("{secs}s");
    }

    let frac = format!("{nanos:09}");
    format!("{secs}.{}s", frac.trim_end_matches('0'))
}

fn compose_ledger(
    ledger: &mut DomainLedgerState,
    params: &ComposeParams,
) -> Result<(), GenesisError> {
    let offsets = fixtures::Offsets::of(ledger);
    debug!(?offsets, "seeding plasticcredit fixtures");

    fixtures::apply(ledger, offsets)?;

    ledger.params.credit_class_creation_fee = Some(params.credit_class_creation_fee.clone());
    ledger.id_counters = IdCounters::derive_from(ledger)?;

    Ok(())
}

fn fund_actors(
    auth: &mut AuthGenesis,
    bank: &mut BankGenesis,
    params: &ComposeParams,
) -> Result<(), GenesisError> {
    let standard = Coin::new(params.initial_tokens, &params.bond_denom);

    for actor in TestActor::funded() {
        accounts::add_base_account_and_balance(auth, bank, actor.address_str(), &standard)?;
    }

    let minimal = Coin::new(NOCOINS_TOKENS, &params.bond_denom);
    accounts::add_base_account_and_balance(auth, bank, TestActor::NoCoins.address_str(), &minimal)?;

    Ok(())
}

fn shorten_voting_period(gov: &mut GovGenesis, period: Duration) {
    let period = format_duration(period);

    if gov.params.is_none() && gov.voting_params.is_none() {
        gov.params = Some(GovParams::default());
    }

    for params in [gov.params.as_mut(), gov.voting_params.as_mut()]
        .into_iter()
        .flatten()
    {
        params.voting_period = Some(period.clone());
    }
}

fn seed_community_pool(
    distribution: &mut DistributionGenesis,
    bank: &mut BankGenesis,
    fee: &Coin,
) -> Result<(), GenesisError> {
    add_dec_coin(
        &mut distribution.fee_pool.community_pool,
        &DecCoin::from_coin(fee)?,
    )?;

    let module_account = AccAddress::for_module(DISTRIBUTION);
    accounts::credit_balance(bank, &module_account.to_string(), fee)
}

/// Layers the test fixtures onto `base` and returns the finished document.
pub fn compose(
    mut base: GenesisDocument,
    params: &ComposeParams,
) -> Result<GenesisDocument, GenesisError> {
    let mut ledger: DomainLedgerState = base.module(PLASTIC_CREDIT)?.unwrap_or_default();
    let mut auth: AuthGenesis = base.module(AUTH)?.unwrap_or_default();
    let mut bank: BankGenesis = base.module(BANK)?.unwrap_or_default();
    let mut gov: GovGenesis = base.module(GOV)?.unwrap_or_default();
    let mut distribution: DistributionGenesis = base.module(DISTRIBUTION)?.unwrap_or_default();

    compose_ledger(&mut ledger, params)?;
    fund_actors(&mut auth, &mut bank, params)?;
    shorten_voting_period(&mut gov, params.voting_period);
    seed_community_pool(
        &mut distribution,
        &mut bank,
        &params.credit_class_creation_fee,
    )?;

    ledger.validate()?;

    base.set_module(PLASTIC_CREDIT, &ledger)?;
    base.set_module(AUTH, &auth)?;
    base.set_module(BANK, &bank)?;
    base.set_module(GOV, &gov)?;
    base.set_module(DISTRIBUTION, &distribution)?;

    info!(
        issuers = ledger.issuers.len(),
        applicants = ledger.applicants.len(),
        projects = ledger.projects.len(),
        accounts = auth.accounts.len(),
        "composed genesis"
    );

    Ok(base)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn durations_use_proto_json_form() {
        assert_eq!(format_duration(Duration::from_secs(10)), "10s");
        assert_eq!(format_duration(Duration::from_millis(1_500)), "1.5s");
        assert_eq!(format_duration(Duration::from_nanos(1)), "0.000000001s");
    }

    #[test]
    fn null_module_reads_as_absent() {
        let mut doc = GenesisDocument::new();
        doc.insert_raw(GOV, Value::Null);

        let gov: Option<GovGenesis> = doc.module(GOV).unwrap();
        assert!(gov.is_none());
    }

    #[test]
    fn malformed_module_names_the_module() {
        let mut doc = GenesisDocument::new();
        doc.insert_raw(BANK, json!({ "balances": "nope" }));

        let err = compose(doc, &ComposeParams::default()).unwrap_err();
        assert!(matches!(err, GenesisError::Module { module, .. } if module == BANK));
    }

    #[test]
    fn legacy_voting_params_are_updated() {
        let mut gov = GovGenesis {
            voting_params: Some(GovParams {
                voting_period: Some("172800s".into()),
                ..Default::default()
            }),
            ..Default::default()
        };

        shorten_voting_period(&mut gov, DEFAULT_VOTING_PERIOD);

        assert!(gov.params.is_none());
        assert_eq!(
            gov.voting_params.unwrap().voting_period.as_deref(),
            Some("10s")
        );
    }

    #[test]
    fn genesis_file_keeps_other_keys() {
        let raw = json!({
            "chain_id": "empowerchain-local-1",
            "genesis_time": "2024-01-01T00:00:00Z",
            "app_state": { "bank": { "balances": [] } }
        });

        let file: GenesisFile = serde_json::from_value(raw.clone()).unwrap();
        assert!(file.app_state.contains(BANK));

        assert_eq!(serde_json::to_value(&file).unwrap(), raw);
    }
}
