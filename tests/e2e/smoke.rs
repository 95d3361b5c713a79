//! Live run against a local network. Needs `empowerd` on the `PATH`:
//!
//! ```sh
//! cargo test --test smoke -- --ignored
//! ```

#![cfg(unix)]

use empower_e2e::{
    actors::TestActor,
    core::{config::RetryConfig, msg::MsgCreateApplicantResponse},
    network::{cli::CommandInterface, NetworkConfig},
    suite::{Suite, SuiteConfig},
};

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
#[ignore = "spawns empowerd validators"]
fn seeded_network_accepts_transactions() {
    setup_tracing();

    let suite = Suite::setup(
        NetworkConfig::default(),
        &SuiteConfig::default(),
        RetryConfig::default(),
    )
    .unwrap();

    assert_eq!(suite.network().validators().len(), 3);
    assert_eq!(suite.actors().len(), TestActor::everyone().len());
    assert!(suite.network().latest_height().unwrap() > 1);

    let applicant = TestActor::Applicant;
    let args: Vec<String> = vec![
        "plasticcredit".into(),
        "create-applicant".into(),
        "Smoke applicant".into(),
        "created by the smoke test".into(),
        applicant.address_str().into(),
        format!("--from={}", applicant.key_name()),
    ];

    let ack = suite.cli().submit(&args).unwrap();
    let response: MsgCreateApplicantResponse = suite.resolver().resolve(&ack).unwrap();

    // three applicants are seeded at genesis
    assert_eq!(response.applicant_id, 4);

    suite.teardown();
}
