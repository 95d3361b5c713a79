//! Fixed `plasticcredit` rows seeded into every composed genesis.

use empower_e2e_core::{
    ledger::offset_id, Applicant, CreditAmount, CreditBalance, CreditClass, CreditCollection, DomainLedgerState,
    IntegrityError, Issuer, Project, ProjectStatus,
};

use crate::actors::TestActor;

/// Highest id already taken per entity kind; fixture ids start right after.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offsets {
    pub issuer: u64,
    pub applicant: u64,
    pub project: u64,
}

impl Offsets {
    pub fn of(state: &DomainLedgerState) -> Self {
        Self {
            issuer: state.issuers.iter().map(|x| x.id).max().unwrap_or(0),
            applicant: state.applicants.iter().map(|x| x.id).max().unwrap_or(0),
            project: state.projects.iter().map(|x| x.id).max().unwrap_or(0),
        }
    }
}

const ISSUERS: [(&str, &str, TestActor); 3] = [
    ("Empower", "First Issuer", TestActor::Issuer),
    ("Test Issuer", "Purely for testing", TestActor::Issuer),
    (
        "Test Issuer with no coins",
        "Purely for testing",
        TestActor::NoCoins,
    ),
];

const APPLICANTS: [(&str, &str); 3] = [
    ("Plastix Inc.", "Grab that bottle"),
    ("Ocean plastic Inc.", "Grab that net"),
    ("Sea plastic Inc.", "collector"),
];

/// `(abbreviation, name, nth new issuer)`
const CREDIT_CLASSES: [(&str, &str, u64); 2] = [
    ("ETEST", "Empower Plastic", 1),
    ("PTEST", "Plastic Credit", 2),
];

const PROJECTS: [(&str, &str, ProjectStatus); 11] = [
    ("ETEST", "Approved project", ProjectStatus::Approved),
    ("PTEST", "Suspended project", ProjectStatus::Suspended),
    ("ETEST", "New project", ProjectStatus::New),
    ("PTEST", "Rejected project", ProjectStatus::Rejected),
    ("PTEST", "Other New Project", ProjectStatus::New),
    ("PTEST", "Another New Project", ProjectStatus::New),
    ("PTEST", "Another Rejected Project", ProjectStatus::Rejected),
    ("PTEST", "Another Suspended Project", ProjectStatus::Suspended),
    ("PTEST", "New Project to update", ProjectStatus::New),
    ("ETEST", "Approved project 2", ProjectStatus::Approved),
    ("ETEST", "Approved project to suspend", ProjectStatus::Approved),
];

/// `(denom, nth new project, active, retired)`
pub const CREDIT_COLLECTIONS: [(&str, u64, u64, u64); 2] =
    [("ETEST/123", 1, 1000, 200), ("PTEST/00001", 2, 5000, 0)];

/// Owner of the seeded credit balances.
pub fn credit_owner() -> &'static str {
    TestActor::Applicant.address_str()
}

/// Appends the fixture rows to `state`. Collections and balances that
/// already exist are incremented instead of duplicated, credit classes that
/// already exist are left alone. Id counters are not touched.
///
/// Fails without touching `state` when the base repeats a collection denom or
/// a balance key, or when new ids would run past `u64::MAX`.
pub fn apply(state: &mut DomainLedgerState, offsets: Offsets) -> Result<(), IntegrityError> {
    let mut collections = state.collections_by_denom()?;
    let mut balances = state.balances_by_owner()?;

    // the largest id each kind hands out
    offset_id("issuer", offsets.issuer, ISSUERS.len() as u64)?;
    offset_id("applicant", offsets.applicant, APPLICANTS.len() as u64)?;
    offset_id("project", offsets.project, PROJECTS.len() as u64)?;

    for (i, (name, description, admin)) in (1..).zip(ISSUERS) {
        state.issuers.push(Issuer {
            id: offset_id("issuer", offsets.issuer, i)?,
            name: name.to_owned(),
            description: description.to_owned(),
            admin: admin.address_str().to_owned(),
        });
    }

    for (i, (name, description)) in (1..).zip(APPLICANTS) {
        state.applicants.push(Applicant {
            id: offset_id("applicant", offsets.applicant, i)?,
            name: name.to_owned(),
            description: description.to_owned(),
            admin: TestActor::Applicant.address_str().to_owned(),
        });
    }

    for (abbreviation, name, nth_issuer) in CREDIT_CLASSES {
        if state.credit_class(abbreviation).is_some() {
            continue;
        }

        state.credit_classes.push(CreditClass {
            abbreviation: abbreviation.to_owned(),
            issuer_id: offset_id("issuer", offsets.issuer, nth_issuer)?,
            name: name.to_owned(),
        });
    }

    for (i, (class, name, status)) in (1..).zip(PROJECTS) {
        state.projects.push(Project {
            id: offset_id("project", offsets.project, i)?,
            applicant_id: offset_id("applicant", offsets.applicant, 1)?,
            credit_class_abbreviation: class.to_owned(),
            name: name.to_owned(),
            status,
        });
    }

    for (denom, nth_project, active, retired) in CREDIT_COLLECTIONS {
        let amount = CreditAmount::new(active, retired);
        let project_id = offset_id("project", offsets.project, nth_project)?;

        collections
            .entry(denom.to_owned())
            .and_modify(|x| x.total_amount = x.total_amount.saturating_add(amount))
            .or_insert_with(|| CreditCollection {
                denom: denom.to_owned(),
                project_id,
                total_amount: amount,
            });

        // each denom is merged on its own
        balances
            .entry((credit_owner().to_owned(), denom.to_owned()))
            .and_modify(|x| x.balance = x.balance.saturating_add(amount))
            .or_insert_with(|| CreditBalance {
                owner: credit_owner().to_owned(),
                denom: denom.to_owned(),
                balance: amount,
            });
    }

    state.credit_collections = collections.into_values().collect();
    state.credit_balances = balances.into_values().collect();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_on_empty_state() {
        let mut state = DomainLedgerState::default();
        let offsets = Offsets::of(&state);
        apply(&mut state, offsets).unwrap();

        assert_eq!(state.issuers.len(), 3);
        assert_eq!(state.applicants.len(), 3);
        assert_eq!(state.credit_classes.len(), 2);
        assert_eq!(state.projects.len(), 11);
        assert_eq!(state.credit_collections.len(), 2);
        assert_eq!(state.credit_balances.len(), 2);

        assert_eq!(state.issuers[2].admin, TestActor::NoCoins.address_str());
        assert_eq!(state.credit_class("PTEST").unwrap().issuer_id, 2);
        assert_eq!(state.credit_collection("PTEST/00001").unwrap().project_id, 2);
    }

    #[test]
    fn every_status_is_seeded() {
        let mut state = DomainLedgerState::default();
        apply(&mut state, Offsets::default()).unwrap();

        for status in [
            ProjectStatus::New,
            ProjectStatus::Approved,
            ProjectStatus::Rejected,
            ProjectStatus::Suspended,
        ] {
            assert!(state.projects.iter().any(|x| x.status == status));
        }
    }

    #[test]
    fn balances_merge_per_denom() {
        let mut state = DomainLedgerState {
            credit_balances: vec![CreditBalance {
                owner: credit_owner().to_owned(),
                denom: "ETEST/123".into(),
                balance: CreditAmount::new(1, 1),
            }],
            ..Default::default()
        };

        apply(&mut state, Offsets::default()).unwrap();

        let etest = state.credit_balance(credit_owner(), "ETEST/123").unwrap();
        assert_eq!(etest.balance, CreditAmount::new(1001, 201));

        // absent denom is still appended even though another one matched
        let ptest = state.credit_balance(credit_owner(), "PTEST/00001").unwrap();
        assert_eq!(ptest.balance, CreditAmount::new(5000, 0));
    }

    #[test]
    fn ids_continue_after_sparse_base() {
        let mut state = DomainLedgerState::default();
        state.issuers.push(Issuer {
            id: 10,
            name: "existing".into(),
            description: String::new(),
            admin: String::new(),
        });

        let offsets = Offsets::of(&state);
        apply(&mut state, offsets).unwrap();

        let ids: Vec<_> = state.issuers.iter().map(|x| x.id).collect();
        assert_eq!(ids, vec![10, 11, 12, 13]);
        assert_eq!(state.credit_class("ETEST").unwrap().issuer_id, 11);
    }

    #[test]
    fn repeated_collection_in_base_is_rejected() {
        let row = |active| CreditCollection {
            denom: "ZZZ/1".into(),
            project_id: 1,
            total_amount: CreditAmount::new(active, 0),
        };

        let mut state = DomainLedgerState {
            credit_collections: vec![row(10), row(20)],
            ..Default::default()
        };

        let before = state.clone();

        assert_eq!(
            apply(&mut state, Offsets::default()),
            Err(IntegrityError::DuplicateCollection("ZZZ/1".into()))
        );
        assert_eq!(state, before);
    }

    #[test]
    fn ids_at_the_top_of_the_range_fail() {
        let mut state = DomainLedgerState::default();
        state.issuers.push(Issuer {
            id: u64::MAX - 1,
            name: "existing".into(),
            description: String::new(),
            admin: String::new(),
        });

        let offsets = Offsets::of(&state);
        let before = state.clone();

        assert_eq!(
            apply(&mut state, offsets),
            Err(IntegrityError::IdOverflow { kind: "issuer" })
        );
        assert_eq!(state, before);
    }
}
