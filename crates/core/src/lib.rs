//! Shared data model for the EmpowerChain end-to-end harness.
//!
//! Everything in here is plain data: genesis module states, coin amounts,
//! account addresses, transaction responses and the protobuf messages the
//! resolver decodes. Behaviour (composition, key management, process
//! control) lives in the `empower-e2e` crate.

pub mod address;
pub mod coin;
pub mod config;
pub mod confirm;
pub mod ledger;
pub mod modules;
pub mod msg;
pub mod tx;

pub use address::{AccAddress, AddressError, ACCOUNT_PREFIX};
pub use coin::{Coin, CoinError, DecCoin};
pub use ledger::{
    Applicant, CreditAmount, CreditBalance, CreditClass, CreditCollection, DomainLedgerState,
    IdCounters, IntegrityError, Issuer, LedgerParams, Project, ProjectStatus,
};
pub use tx::{TxHash, TxResponse};

/// Module names as they appear in the genesis `app_state`.
pub mod module_names {
    pub const AUTH: &str = "auth";
    pub const BANK: &str = "bank";
    pub const GOV: &str = "gov";
    pub const DISTRIBUTION: &str = "distribution";
    pub const PLASTIC_CREDIT: &str = "plasticcredit";
}
