#![allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]

use super::*;
use crate::test::{event_tuples, payload, register, setup, write, TestContext};
use soroban_sdk::testutils::{Events, Ledger};
use soroban_sdk::{symbol_short, IntoVal, TryIntoVal};

const YEAR_1971: u64 = 365 * common::SECONDS_PER_DAY;

fn tamper(ctx: &TestContext, index: u32, edit: impl FnOnce(&mut Record)) {
    let env = &ctx.env;
    env.as_contract(&ctx.contract_id, || {
        let mut record = ledger::get(env, index).unwrap();
        edit(&mut record);
        env.storage()
            .persistent()
            .set(&ledger::record_key(index), &record);
    });
}

fn first_violation(ctx: &TestContext) -> Option<u32> {
    ctx.env
        .as_contract(&ctx.contract_id, || ledger::first_violation(&ctx.env))
}

#[test]
fn test_genesis_record() {
    let ctx = setup();
    let env = &ctx.env;
    let genesis = ctx.client.get_record(&0);

    assert_eq!(genesis.index, 0);
    assert_eq!(genesis.patient_id, String::from_str(env, "0"));
    assert_eq!(genesis.creator, WalletAddress::new(env, "SYSTEM"));
    assert_eq!(genesis.tier, Tier::Public);
    assert_eq!(genesis.previous_hash, BytesN::from_array(env, &[0u8; 32]));
    assert_eq!(genesis.expires_at, common::add_years(genesis.created_at, 100));
    assert_eq!(
        genesis.payload.get(String::from_str(env, "message")),
        Some(String::from_str(env, "Genesis Block"))
    );
    assert!(ctx.client.verify_integrity());
}

#[test]
fn test_records_link_to_previous_hash() {
    let ctx = setup();
    let doctor = register(&ctx, Role::Doctor, 2, None);

    let first = write(&ctx, "P1", Tier::Public, &doctor, 5);
    let second = write(&ctx, "P2", Tier::Patient, &doctor, 5);

    assert_eq!(ctx.client.chain_length(), 3);
    assert_eq!(ctx.client.get_record(&1).hash, first);
    assert_eq!(ctx.client.get_record(&1).previous_hash, ctx.client.get_record(&0).hash);
    assert_eq!(ctx.client.get_record(&2).previous_hash, first);
    assert_eq!(ctx.client.get_record(&2).hash, second);
    assert_eq!(ctx.client.load_all().len(), 3);
    assert_eq!(
        ctx.client.audit_chain(),
        ChainAudit {
            chain_length: 3,
            first_violation: None
        }
    );
}

#[test]
fn test_missing_record_is_not_found() {
    let ctx = setup();
    assert_eq!(
        ctx.client.try_get_record(&5),
        Err(Ok(ContractError::RecordNotFound))
    );
}

#[test]
fn test_payload_tamper_is_detected() {
    let ctx = setup();
    let director = register(&ctx, Role::Director, 1, None);
    write(&ctx, "P1", Tier::Public, &director, 5);
    write(&ctx, "P1", Tier::Public, &director, 5);

    tamper(&ctx, 1, |record| {
        record
            .payload
            .set(String::from_str(&ctx.env, "note"), String::from_str(&ctx.env, "forged"));
    });

    assert!(!ctx.client.verify_integrity());
    assert_eq!(first_violation(&ctx), Some(1));
    assert_eq!(ctx.client.audit_chain().first_violation, Some(1));
}

#[test]
fn test_tier_tamper_is_detected() {
    let ctx = setup();
    let director = register(&ctx, Role::Director, 1, None);
    write(&ctx, "P1", Tier::Private, &director, 5);

    tamper(&ctx, 1, |record| record.tier = Tier::Public);

    assert!(!ctx.client.verify_integrity());
    assert_eq!(first_violation(&ctx), Some(1));
}

#[test]
fn test_relinked_record_is_detected() {
    let ctx = setup();
    let director = register(&ctx, Role::Director, 1, None);
    write(&ctx, "P1", Tier::Public, &director, 5);
    write(&ctx, "P1", Tier::Public, &director, 5);

    // Rehash after editing so only the link is wrong.
    let env = &ctx.env;
    tamper(&ctx, 2, |record| {
        record.previous_hash = BytesN::from_array(env, &[7u8; 32]);
        record.hash = ledger::compute_hash(env, record);
    });

    assert!(!ctx.client.verify_integrity());
    assert_eq!(first_violation(&ctx), Some(2));
}

#[test]
fn test_genesis_tamper_is_detected() {
    let ctx = setup();
    tamper(&ctx, 0, |record| {
        record.creator = WalletAddress::new(&ctx.env, "MALLORY");
    });

    assert!(!ctx.client.verify_integrity());
    assert_eq!(first_violation(&ctx), Some(0));
}

#[test]
fn test_audit_publishes_chain_violation() {
    let ctx = setup();
    let env = &ctx.env;
    let director = register(&ctx, Role::Director, 1, None);
    write(&ctx, "P1", Tier::Public, &director, 5);
    tamper(&ctx, 0, |record| {
        record.creator = WalletAddress::new(env, "MALLORY");
    });

    let report = ctx.client.audit_chain();
    let events = env.events().all();

    assert_eq!(report.chain_length, 2);
    assert_eq!(report.first_violation, Some(0));

    let our_events: soroban_sdk::Vec<(
        soroban_sdk::Address,
        soroban_sdk::Vec<soroban_sdk::Val>,
        soroban_sdk::Val,
    )> = event_tuples(env, &events);
    let event = our_events.get(our_events.len() - 1).unwrap();
    assert_eq!(
        event.1,
        (symbol_short!("CHAIN_BAD"), ErrorCategory::Integrity).into_val(env)
    );
    let payload: events::ChainViolationEvent = event.2.try_into_val(env).unwrap();
    assert_eq!(payload.index, 0);
    assert_eq!(payload.chain_length, 2);
    assert_eq!(payload.error_code, ContractError::ChainIntegrityViolation as u32);
    assert_eq!(payload.severity, ErrorSeverity::Critical);
}

#[test]
fn test_clean_audit_publishes_nothing() {
    let ctx = setup();
    let env = &ctx.env;
    assert_eq!(ctx.client.audit_chain().first_violation, None);

    let our_events: soroban_sdk::Vec<(
        soroban_sdk::Address,
        soroban_sdk::Vec<soroban_sdk::Val>,
        soroban_sdk::Val,
    )> = event_tuples(env, &env.events().all());
    let chain_bad: soroban_sdk::Vec<soroban_sdk::Val> =
        (symbol_short!("CHAIN_BAD"), ErrorCategory::Integrity).into_val(env);
    for (_, topics, _) in our_events.iter() {
        assert_ne!(topics, chain_bad);
    }
}

#[test]
fn test_expired_flag_is_outside_the_hash() {
    let ctx = setup();
    let director = register(&ctx, Role::Director, 1, None);
    write(&ctx, "P1", Tier::Public, &director, 5);

    tamper(&ctx, 1, |record| record.expired = true);

    assert!(ctx.client.verify_integrity());
}

#[test]
fn test_payload_insertion_order_does_not_change_hash() {
    let ctx = setup();
    let env = &ctx.env;

    let mut forward = payload(env, "a", "1");
    forward.set(String::from_str(env, "b"), String::from_str(env, "2"));
    let mut backward = payload(env, "b", "2");
    backward.set(String::from_str(env, "a"), String::from_str(env, "1"));

    let mut record = ctx.client.get_record(&0);
    record.payload = forward;
    let forward_hash = ledger::compute_hash(env, &record);
    record.payload = backward;
    assert_eq!(ledger::compute_hash(env, &record), forward_hash);
}

#[test]
fn test_expiry_boundary() {
    let ctx = setup();
    let director = register(&ctx, Role::Director, 1, None);
    write(&ctx, "P1", Tier::Public, &director, 1);
    let record = ctx.client.get_record(&1);

    assert_eq!(record.expires_at, YEAR_1971);
    assert!(!ledger::evaluate_expiry(&record, YEAR_1971 - 1));
    assert!(ledger::evaluate_expiry(&record, YEAR_1971));
}

#[test]
fn test_sweep_marks_expired_once() {
    let ctx = setup();
    let director = register(&ctx, Role::Director, 1, None);
    write(&ctx, "P1", Tier::Public, &director, 1);
    write(&ctx, "P1", Tier::Public, &director, 5);

    assert_eq!(ctx.client.sweep_expiry(), 0);

    ctx.env.ledger().set_timestamp(YEAR_1971);
    assert_eq!(ctx.client.sweep_expiry(), 1);
    assert_eq!(ctx.client.sweep_expiry(), 0);

    assert!(ctx.client.get_record(&1).expired);
    assert!(!ctx.client.get_record(&2).expired);
    assert!(!ctx.client.get_record(&0).expired);
    assert!(ctx.client.verify_integrity());
}

#[test]
fn test_sweep_never_flags_genesis() {
    let ctx = setup();
    ctx.env.ledger().set_timestamp(u64::MAX);
    assert_eq!(ctx.client.sweep_expiry(), 0);
    assert!(!ctx.client.get_record(&0).expired);
}
