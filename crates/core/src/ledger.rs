//! Genesis state of the `plasticcredit` module.
//!
//! Mirrors the chain's proto-JSON encoding: snake_case keys, `uint64` values
//! as decimal strings and enums by name. Fields this harness doesn't know
//! about are kept in `extra` so a composed document never loses data.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use thiserror::Error;

use crate::Coin;

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub id: u64,
    pub name: String,
    pub description: String,
    pub admin: String,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub id: u64,
    pub name: String,
    pub description: String,
    pub admin: String,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditClass {
    pub abbreviation: String,

    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub issuer_id: u64,

    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "APPROVED")]
    Approved,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "SUSPENDED")]
    Suspended,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub id: u64,

    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub applicant_id: u64,

    pub credit_class_abbreviation: String,
    pub name: String,
    pub status: ProjectStatus,
}

#[serde_as]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAmount {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[serde(default)]
    pub active: u64,

    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[serde(default)]
    pub retired: u64,
}

impl CreditAmount {
    pub fn new(active: u64, retired: u64) -> Self {
        Self { active, retired }
    }

    pub fn saturating_add(self, other: CreditAmount) -> Self {
        Self {
            active: self.active.saturating_add(other.active),
            retired: self.retired.saturating_add(other.retired),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCollection {
    pub denom: String,

    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub project_id: u64,

    pub total_amount: CreditAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBalance {
    pub owner: String,
    pub denom: String,
    pub balance: CreditAmount,
}

#[serde_as]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounters {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[serde(default)]
    pub next_issuer_id: u64,

    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[serde(default)]
    pub next_applicant_id: u64,

    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[serde(default)]
    pub next_project_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerParams {
    #[serde(default)]
    pub credit_class_creation_fee: Option<Coin>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainLedgerState {
    #[serde(default)]
    pub params: LedgerParams,

    #[serde(default)]
    pub id_counters: IdCounters,

    #[serde(default)]
    pub issuers: Vec<Issuer>,

    #[serde(default)]
    pub applicants: Vec<Applicant>,

    #[serde(default)]
    pub credit_classes: Vec<CreditClass>,

    #[serde(default)]
    pub projects: Vec<Project>,

    #[serde(default)]
    pub credit_collections: Vec<CreditCollection>,

    #[serde(default)]
    pub credit_balances: Vec<CreditBalance>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("duplicate issuer id {0}")]
    DuplicateIssuer(u64),

    #[error("duplicate applicant id {0}")]
    DuplicateApplicant(u64),

    #[error("duplicate project id {0}")]
    DuplicateProject(u64),

    #[error("duplicate credit class {0}")]
    DuplicateCreditClass(String),

    #[error("duplicate credit collection {0}")]
    DuplicateCollection(String),

    #[error("duplicate credit balance for {owner} in {denom}")]
    DuplicateBalance { owner: String, denom: String },

    #[error("credit class {abbreviation} references unknown issuer {issuer_id}")]
    UnknownIssuer { abbreviation: String, issuer_id: u64 },

    #[error("project {project_id} references unknown applicant {applicant_id}")]
    UnknownApplicant { project_id: u64, applicant_id: u64 },

    #[error("project {project_id} references unknown credit class {abbreviation}")]
    UnknownCreditClass { project_id: u64, abbreviation: String },

    #[error("credit collection {denom} references unknown project {project_id}")]
    UnknownProject { denom: String, project_id: u64 },

    #[error("{kind} ids exhausted")]
    IdOverflow { kind: &'static str },

    #[error("id counter {kind} is {found}, expected {expected}")]
    StaleCounter {
        kind: &'static str,
        expected: u64,
        found: u64,
    },
}

/// `offset + n`, failing instead of wrapping past `u64::MAX`.
pub fn offset_id(kind: &'static str, offset: u64, n: u64) -> Result<u64, IntegrityError> {
    offset.checked_add(n).ok_or(IntegrityError::IdOverflow { kind })
}

fn next_id(kind: &'static str, ids: impl Iterator<Item = u64>) -> Result<u64, IntegrityError> {
    offset_id(kind, ids.max().unwrap_or(0), 1)
}

impl IdCounters {
    /// Counters derived from the collections; never maintained by hand.
    pub fn derive_from(state: &DomainLedgerState) -> Result<Self, IntegrityError> {
        Ok(Self {
            next_issuer_id: next_id("issuer", state.issuers.iter().map(|x| x.id))?,
            next_applicant_id: next_id("applicant", state.applicants.iter().map(|x| x.id))?,
            next_project_id: next_id("project", state.projects.iter().map(|x| x.id))?,
        })
    }
}

fn ensure_unique<K: Ord, E>(
    keys: impl Iterator<Item = K>,
    err: impl Fn(K) -> E,
) -> Result<BTreeSet<K>, E>
where
    K: Clone,
{
    let mut seen = BTreeSet::new();

    for key in keys {
        if !seen.insert(key.clone()) {
            return Err(err(key));
        }
    }

    Ok(seen)
}

impl DomainLedgerState {
    pub fn issuer(&self, id: u64) -> Option<&Issuer> {
        self.issuers.iter().find(|x| x.id == id)
    }

    pub fn applicant(&self, id: u64) -> Option<&Applicant> {
        self.applicants.iter().find(|x| x.id == id)
    }

    pub fn project(&self, id: u64) -> Option<&Project> {
        self.projects.iter().find(|x| x.id == id)
    }

    pub fn credit_class(&self, abbreviation: &str) -> Option<&CreditClass> {
        self.credit_classes
            .iter()
            .find(|x| x.abbreviation == abbreviation)
    }

    pub fn credit_collection(&self, denom: &str) -> Option<&CreditCollection> {
        self.credit_collections.iter().find(|x| x.denom == denom)
    }

    pub fn credit_balance(&self, owner: &str, denom: &str) -> Option<&CreditBalance> {
        self.credit_balances
            .iter()
            .find(|x| x.owner == owner && x.denom == denom)
    }

    /// Credit collections keyed by denom. Two rows with the same denom are
    /// an error rather than one overwriting the other.
    pub fn collections_by_denom(
        &self,
    ) -> Result<BTreeMap<String, CreditCollection>, IntegrityError> {
        let mut out = BTreeMap::new();

        for x in &self.credit_collections {
            if out.insert(x.denom.clone(), x.clone()).is_some() {
                return Err(IntegrityError::DuplicateCollection(x.denom.clone()));
            }
        }

        Ok(out)
    }

    /// Credit balances keyed by `(owner, denom)`, rejecting repeated keys.
    pub fn balances_by_owner(
        &self,
    ) -> Result<BTreeMap<(String, String), CreditBalance>, IntegrityError> {
        let mut out = BTreeMap::new();

        for x in &self.credit_balances {
            let key = (x.owner.clone(), x.denom.clone());

            if out.insert(key, x.clone()).is_some() {
                return Err(IntegrityError::DuplicateBalance {
                    owner: x.owner.clone(),
                    denom: x.denom.clone(),
                });
            }
        }

        Ok(out)
    }

    /// Checks key uniqueness, cross references and id counters.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        let issuers = ensure_unique(
            self.issuers.iter().map(|x| x.id),
            IntegrityError::DuplicateIssuer,
        )?;

        let applicants = ensure_unique(
            self.applicants.iter().map(|x| x.id),
            IntegrityError::DuplicateApplicant,
        )?;

        let projects = ensure_unique(
            self.projects.iter().map(|x| x.id),
            IntegrityError::DuplicateProject,
        )?;

        let classes = ensure_unique(
            self.credit_classes.iter().map(|x| x.abbreviation.clone()),
            IntegrityError::DuplicateCreditClass,
        )?;

        ensure_unique(
            self.credit_collections.iter().map(|x| x.denom.clone()),
            IntegrityError::DuplicateCollection,
        )?;

        ensure_unique(
            self.credit_balances
                .iter()
                .map(|x| (x.owner.clone(), x.denom.clone())),
            |(owner, denom)| IntegrityError::DuplicateBalance { owner, denom },
        )?;

        for class in &self.credit_classes {
            if !issuers.contains(&class.issuer_id) {
                return Err(IntegrityError::UnknownIssuer {
                    abbreviation: class.abbreviation.clone(),
                    issuer_id: class.issuer_id,
                });
            }
        }

        for project in &self.projects {
            if !applicants.contains(&project.applicant_id) {
                return Err(IntegrityError::UnknownApplicant {
                    project_id: project.id,
                    applicant_id: project.applicant_id,
                });
            }

            if !classes.contains(&project.credit_class_abbreviation) {
                return Err(IntegrityError::UnknownCreditClass {
                    project_id: project.id,
                    abbreviation: project.credit_class_abbreviation.clone(),
                });
            }
        }

        for collection in &self.credit_collections {
            if !projects.contains(&collection.project_id) {
                return Err(IntegrityError::UnknownProject {
                    denom: collection.denom.clone(),
                    project_id: collection.project_id,
                });
            }
        }

        let expected = IdCounters::derive_from(self)?;
        let found = self.id_counters;

        let counters = [
            ("issuer", expected.next_issuer_id, found.next_issuer_id),
            ("applicant", expected.next_applicant_id, found.next_applicant_id),
            ("project", expected.next_project_id, found.next_project_id),
        ];

        for (kind, expected, found) in counters {
            if expected != found {
                return Err(IntegrityError::StaleCounter {
                    kind,
                    expected,
                    found,
                });
            }
        }

        Ok(())
    }
}
