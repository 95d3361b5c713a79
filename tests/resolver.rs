use prost::Message;

use empower_e2e::{
    confirm::PollingConfirm,
    core::{
        config::RetryConfig,
        msg::{MsgCreateApplicantResponse, MsgCreateIssuerResponse, MsgCreateProjectResponse},
        tx::Any,
    },
    resolve::{self, DecodeLayer, ResolveError, TxResolver},
};
use empower_e2e_testing::{
    accepted_ack, ack, any_of, confirmed_tx, envelope, included_tx, tx_hash, FakeChain,
};

#[test]
fn admission_rejection_skips_lookup() {
    let chain = FakeChain::new();
    let hash = tx_hash(1);
    let resolver = TxResolver::new(&chain);

    let err = resolver
        .resolve::<MsgCreateIssuerResponse>(&ack(&hash, 5, "insufficient fee"))
        .unwrap_err();

    match err {
        ResolveError::AdmissionRejected { code, raw_log, .. } => {
            assert_eq!(code, 5);
            assert!(raw_log.contains("insufficient fee"));
        }
        x => panic!("unexpected error {x:?}"),
    }

    assert_eq!(chain.calls(), 0);
}

#[test]
fn resolves_first_message_response() {
    let chain = FakeChain::new();
    let hash = tx_hash(2);

    let expected = MsgCreateIssuerResponse { issuer_id: 4 };
    chain.include(hash, confirmed_tx(&hash, &expected), 0);

    let resolver = TxResolver::new(&chain);
    let decoded: MsgCreateIssuerResponse = resolver.resolve(&accepted_ack(&hash)).unwrap();

    assert_eq!(decoded, expected);
    assert_eq!(chain.confirms(), 1);
}

#[test]
fn only_the_first_response_is_decoded() {
    let chain = FakeChain::new();
    let hash = tx_hash(3);

    let data = envelope(vec![
        any_of(&MsgCreateProjectResponse { project_id: 12 }),
        any_of(&MsgCreateApplicantResponse { applicant_id: 4 }),
    ]);
    chain.include(hash, included_tx(&hash, 0, data, ""), 0);

    let resolver = TxResolver::new(&chain);
    let decoded: MsgCreateProjectResponse = resolver.resolve(&accepted_ack(&hash)).unwrap();

    assert_eq!(decoded.project_id, 12);
}

#[test]
fn execution_failure_is_reported_with_chain_log() {
    let chain = FakeChain::new();
    let hash = tx_hash(4);

    let failed = included_tx(&hash, 9, String::new(), "issuer not found");
    chain.include(hash, failed, 0);

    let resolver = TxResolver::new(&chain);
    let err = resolver
        .resolve::<MsgCreateIssuerResponse>(&accepted_ack(&hash))
        .unwrap_err();

    match err {
        ResolveError::ExecutionFailed {
            hash: failed_hash,
            code,
            codespace,
            raw_log,
        } => {
            assert_eq!(failed_hash, hash);
            assert_eq!(code, 9);
            assert_eq!(codespace, "plasticcredit");
            assert_eq!(raw_log, "issuer not found");
        }
        x => panic!("unexpected error {x:?}"),
    }
}

fn decode_error(data: String) -> ResolveError {
    let chain = FakeChain::new();
    let hash = tx_hash(5);

    chain.include(hash, included_tx(&hash, 0, data, ""), 0);

    TxResolver::new(&chain)
        .resolve::<MsgCreateIssuerResponse>(&accepted_ack(&hash))
        .unwrap_err()
}

#[test]
fn bad_hex_fails_at_hex_layer() {
    let err = decode_error("not hex at all".into());
    assert_eq!(err.layer(), Some(DecodeLayer::Hex));
}

#[test]
fn garbage_bytes_fail_at_envelope_layer() {
    let err = decode_error(hex::encode([0xff, 0xff, 0xff]));
    assert_eq!(err.layer(), Some(DecodeLayer::Envelope));
}

#[test]
fn empty_envelope_fails_at_envelope_layer() {
    let err = decode_error(envelope(vec![]));
    assert_eq!(err.layer(), Some(DecodeLayer::Envelope));
}

#[test]
fn wrong_response_type_fails_at_payload_layer() {
    let data = envelope(vec![any_of(&MsgCreateProjectResponse { project_id: 1 })]);
    let err = decode_error(data);

    assert_eq!(err.layer(), Some(DecodeLayer::TypedPayload));
    assert!(err
        .to_string()
        .contains("/empowerchain.plasticcredit.MsgCreateProjectResponse"));
}

#[test]
fn corrupt_payload_fails_at_payload_layer() {
    let corrupt = Any {
        type_url: "/empowerchain.plasticcredit.MsgCreateIssuerResponse".into(),
        value: vec![0x08],
    };

    let err = decode_error(envelope(vec![corrupt]));
    assert_eq!(err.layer(), Some(DecodeLayer::TypedPayload));
}

#[test]
fn polling_waits_for_indexing() {
    let chain = FakeChain::new();
    let hash = tx_hash(6);

    let expected = MsgCreateApplicantResponse { applicant_id: 7 };
    chain.include(hash, confirmed_tx(&hash, &expected), 3);

    let resolver = TxResolver::new(PollingConfirm::new(&chain, RetryConfig::immediate(10)));
    let decoded: MsgCreateApplicantResponse = resolver.resolve(&accepted_ack(&hash)).unwrap();

    assert_eq!(decoded, expected);
    assert_eq!(chain.lookups(), 4);
}

#[test]
fn polling_gives_up_after_max_retries() {
    let chain = FakeChain::new();
    let hash = tx_hash(7);

    let resolver = TxResolver::new(PollingConfirm::new(&chain, RetryConfig::immediate(5)));
    let err = resolver
        .resolve::<MsgCreateIssuerResponse>(&accepted_ack(&hash))
        .unwrap_err();

    match err {
        ResolveError::ConfirmationTimeout {
            hash: missing,
            attempts,
        } => {
            assert_eq!(missing, hash);
            assert_eq!(attempts, 5);
        }
        x => panic!("unexpected error {x:?}"),
    }

    assert_eq!(chain.lookups(), 5);
}

#[test]
fn step_functions_compose() {
    let chain = FakeChain::new();
    let hash = tx_hash(8);

    let expected = MsgCreateIssuerResponse { issuer_id: 1 };
    chain.include(hash, confirmed_tx(&hash, &expected), 0);

    let submitted = resolve::submit(&accepted_ack(&hash)).unwrap();
    let pending = resolve::pending(submitted).unwrap();
    assert_eq!(pending.0, hash);

    let confirmed = resolve::confirm(pending, &chain).unwrap();
    assert_eq!(confirmed.response.height, 12);

    let decoded: MsgCreateIssuerResponse = resolve::decode(&confirmed).unwrap();
    assert_eq!(decoded, expected);

    // decoding is a pure function of the confirmed response
    let again: MsgCreateIssuerResponse = resolve::decode(&confirmed).unwrap();
    assert_eq!(again.encode_to_vec(), expected.encode_to_vec());
}

#[test]
fn cli_noise_before_ack_is_ignored() {
    let hash = tx_hash(9);

    let mut raw = b"gas estimate: 87211\n".to_vec();
    raw.extend(accepted_ack(&hash));

    let submitted = resolve::submit(&raw).unwrap();
    assert_eq!(resolve::pending(submitted).unwrap().0, hash);
}

#[test]
fn malformed_ack_is_rejected() {
    let err = resolve::submit(b"Error: rpc error: connection refused").unwrap_err();
    assert!(matches!(err, ResolveError::InvalidAcknowledgment(_)));
}
