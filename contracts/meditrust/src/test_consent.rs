#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::test::{register, secret, setup, write, TestContext};

struct Cast {
    doctor: WalletAddress,
    committee: WalletAddress,
    nurse: WalletAddress,
    patient: WalletAddress,
}

const DOCTOR: u8 = 2;
const COMMITTEE: u8 = 3;
const NURSE: u8 = 4;
const PATIENT: u8 = 5;

fn cast(ctx: &TestContext) -> Cast {
    Cast {
        doctor: register(ctx, Role::Doctor, DOCTOR, None),
        committee: register(ctx, Role::MedicalCommittee, COMMITTEE, None),
        nurse: register(ctx, Role::Nurse, NURSE, None),
        patient: register(ctx, Role::Patient, PATIENT, Some("P1")),
    }
}

fn request(ctx: &TestContext, patient_id: &str, requester: &WalletAddress) -> String {
    ctx.client.create_consent_request(
        &String::from_str(&ctx.env, patient_id),
        requester,
        &Tier::Private,
    )
}

#[test]
fn test_new_request_is_pending() {
    let ctx = setup();
    let people = cast(&ctx);
    let id = request(&ctx, "P1", &people.patient);

    assert_eq!(id.len(), 16);
    assert!(!ctx.client.is_consent_approved(&id));

    let stored = ctx.client.get_consent_request(&id);
    assert_eq!(stored.status, ConsentStatus::Pending);
    assert_eq!(stored.requester, people.patient);
    assert_eq!(stored.tier, Tier::Private);
    assert!(stored.signatures.is_empty());
}

#[test]
fn test_same_second_requests_get_distinct_ids() {
    let ctx = setup();
    let people = cast(&ctx);
    let first = request(&ctx, "P1", &people.patient);
    let second = request(&ctx, "P1", &people.patient);
    assert_ne!(first, second);
}

#[test]
fn test_quorum_needs_two_distinct_signers() {
    let ctx = setup();
    let env = &ctx.env;
    let people = cast(&ctx);
    let id = request(&ctx, "P1", &people.patient);

    let status = ctx
        .client
        .cosign_consent_request(&id, &people.doctor, &secret(env, DOCTOR));
    assert_eq!(status, ConsentStatus::Pending);

    // Signing again from the same address does not count twice.
    let status = ctx
        .client
        .cosign_consent_request(&id, &people.doctor, &secret(env, DOCTOR));
    assert_eq!(status, ConsentStatus::Pending);
    assert_eq!(ctx.client.get_consent_request(&id).signatures.len(), 1);

    let status =
        ctx.client
            .cosign_consent_request(&id, &people.committee, &secret(env, COMMITTEE));
    assert_eq!(status, ConsentStatus::Approved);
    assert!(ctx.client.is_consent_approved(&id));
    assert_eq!(ctx.client.get_consent_request(&id).signatures.len(), QUORUM);
}

#[test]
fn test_approval_is_permanent() {
    let ctx = setup();
    let env = &ctx.env;
    let people = cast(&ctx);
    let second_doctor = register(&ctx, Role::Doctor, 6, None);
    let id = request(&ctx, "P1", &people.patient);

    ctx.client
        .cosign_consent_request(&id, &people.doctor, &secret(env, DOCTOR));
    ctx.client
        .cosign_consent_request(&id, &people.committee, &secret(env, COMMITTEE));
    let status = ctx
        .client
        .cosign_consent_request(&id, &second_doctor, &secret(env, 6));

    assert_eq!(status, ConsentStatus::Approved);
    assert!(ctx.client.is_consent_approved(&id));
}

#[test]
fn test_unknown_request() {
    let ctx = setup();
    let people = cast(&ctx);
    let result = ctx.client.try_cosign_consent_request(
        &String::from_str(&ctx.env, "0000000000000000"),
        &people.doctor,
        &secret(&ctx.env, DOCTOR),
    );
    assert_eq!(result, Err(Ok(ContractError::RequestNotFound)));
    assert_eq!(
        ctx.client
            .try_get_consent_request(&String::from_str(&ctx.env, "missing")),
        Err(Ok(ContractError::RequestNotFound))
    );
}

#[test]
fn test_only_doctor_or_committee_may_sign() {
    let ctx = setup();
    let env = &ctx.env;
    let people = cast(&ctx);
    let director = register(&ctx, Role::Director, 7, None);
    let stranger = ctx.client.recover_keypair(&secret(env, 8)).address;
    let id = request(&ctx, "P1", &people.patient);

    for (signer, seed) in [
        (people.nurse.clone(), NURSE),
        (people.patient.clone(), PATIENT),
        (director, 7),
        (stranger, 8),
    ] {
        let result = ctx
            .client
            .try_cosign_consent_request(&id, &signer, &secret(env, seed));
        assert_eq!(result, Err(Ok(ContractError::SignerNotAuthorized)));
    }
    assert!(ctx.client.get_consent_request(&id).signatures.is_empty());
}

#[test]
fn test_signer_must_hold_their_own_key() {
    let ctx = setup();
    let env = &ctx.env;
    let people = cast(&ctx);
    let id = request(&ctx, "P1", &people.patient);

    let result =
        ctx.client
            .try_cosign_consent_request(&id, &people.doctor, &secret(env, COMMITTEE));
    assert_eq!(result, Err(Ok(ContractError::SignatureMismatch)));

    let result = ctx.client.try_cosign_consent_request(
        &id,
        &people.doctor,
        &String::from_str(env, "not-hex"),
    );
    assert_eq!(result, Err(Ok(ContractError::InvalidKeyFormat)));
    assert!(ctx.client.get_consent_request(&id).signatures.is_empty());
}

#[test]
fn test_stored_signature_verifies_against_signer_key() {
    let ctx = setup();
    let env = &ctx.env;
    let people = cast(&ctx);
    let id = request(&ctx, "P1", &people.patient);
    ctx.client
        .cosign_consent_request(&id, &people.doctor, &secret(env, DOCTOR));

    let stored = ctx.client.get_consent_request(&id);
    let signature = stored.signatures.get(people.doctor.clone()).unwrap();
    let doctor_keys = ctx.client.recover_keypair(&secret(env, DOCTOR));
    let message = consent::signing_message(env, &stored);

    assert!(ctx
        .client
        .verify_signature(&doctor_keys.public_key_hex, &message, &signature));
}

#[test]
fn test_consent_for_another_patient_does_not_unlock() {
    let ctx = setup();
    let env = &ctx.env;
    let people = cast(&ctx);
    let director = register(&ctx, Role::Director, 7, None);
    register(&ctx, Role::Patient, 9, Some("P2"));
    write(&ctx, "P1", Tier::Private, &director, 5);

    // Approved, but for P2.
    let id = request(&ctx, "P2", &people.patient);
    ctx.client
        .cosign_consent_request(&id, &people.doctor, &secret(env, DOCTOR));
    ctx.client
        .cosign_consent_request(&id, &people.committee, &secret(env, COMMITTEE));
    assert!(ctx.client.is_consent_approved(&id));

    let view = ctx
        .client
        .read_records(&String::from_str(env, "P1"), &people.patient, &Some(id));
    assert_eq!(view.private.len(), 0);
}

#[test]
fn test_pending_consent_does_not_unlock() {
    let ctx = setup();
    let env = &ctx.env;
    let people = cast(&ctx);
    let director = register(&ctx, Role::Director, 7, None);
    write(&ctx, "P1", Tier::Private, &director, 5);

    let id = request(&ctx, "P1", &people.patient);
    ctx.client
        .cosign_consent_request(&id, &people.doctor, &secret(env, DOCTOR));

    let view = ctx
        .client
        .read_records(&String::from_str(env, "P1"), &people.patient, &Some(id));
    assert_eq!(view.private.len(), 0);
}

#[test]
fn test_approved_consent_does_not_help_non_members() {
    let ctx = setup();
    let env = &ctx.env;
    let people = cast(&ctx);
    let director = register(&ctx, Role::Director, 7, None);
    let outsider = register(&ctx, Role::Family, 10, Some("P3"));
    write(&ctx, "P1", Tier::Private, &director, 5);

    let id = request(&ctx, "P1", &people.patient);
    ctx.client
        .cosign_consent_request(&id, &people.doctor, &secret(env, DOCTOR));
    ctx.client
        .cosign_consent_request(&id, &people.committee, &secret(env, COMMITTEE));

    let view = ctx
        .client
        .read_records(&String::from_str(env, "P1"), &outsider, &Some(id));
    assert_eq!(view.private.len(), 0);
}

#[test]
fn test_approved_public_tier_request_does_not_unlock_private() {
    let ctx = setup();
    let env = &ctx.env;
    let people = cast(&ctx);
    let director = register(&ctx, Role::Director, 7, None);
    write(&ctx, "P1", Tier::Private, &director, 5);

    let p1 = String::from_str(env, "P1");
    let id = ctx
        .client
        .create_consent_request(&p1, &people.patient, &Tier::Public);
    ctx.client
        .cosign_consent_request(&id, &people.doctor, &secret(env, DOCTOR));
    ctx.client
        .cosign_consent_request(&id, &people.committee, &secret(env, COMMITTEE));
    assert!(ctx.client.is_consent_approved(&id));

    let view = ctx.client.read_records(&p1, &people.patient, &Some(id));
    assert_eq!(view.private.len(), 0);
}
