#![allow(deprecated)]

use crate::errors::{ContractError, ErrorSeverity};
use crate::identity::WalletAddress;
use crate::policy::{Role, Tier};
use soroban_sdk::{symbol_short, BytesN, Env, String};

/// Event published when the contract is initialized.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InitializedEvent {
    pub genesis_hash: BytesN<32>,
    pub timestamp: u64,
}

/// Event published when an address is registered or re-registered.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserRegisteredEvent {
    pub address: WalletAddress,
    pub role: Role,
    pub name: String,
    pub patient_id: Option<String>,
    pub timestamp: u64,
}

/// Event published when a cohort moves to ex-patient status.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExPatientTransitionEvent {
    pub patient_id: String,
    pub transitioned: u32,
    pub timestamp: u64,
}

/// Event published when a record is appended to the ledger.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordAddedEvent {
    pub index: u32,
    pub patient_id: String,
    pub tier: Tier,
    pub creator: WalletAddress,
    pub hash: BytesN<32>,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConsentRequestedEvent {
    pub request_id: String,
    pub patient_id: String,
    pub requester: WalletAddress,
    pub tier: Tier,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConsentSignedEvent {
    pub request_id: String,
    pub signer: WalletAddress,
    pub signatures: u32,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConsentApprovedEvent {
    pub request_id: String,
    pub patient_id: String,
    pub timestamp: u64,
}

/// Event published after an expiry sweep flagged at least one record.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordsExpiredEvent {
    pub count: u32,
    pub timestamp: u64,
}

/// Event published when an audit finds a broken chain.
#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainViolationEvent {
    pub index: u32,
    pub chain_length: u32,
    pub error_code: u32,
    pub severity: ErrorSeverity,
    pub message: String,
    pub timestamp: u64,
}

pub fn publish_initialized(env: &Env, genesis_hash: BytesN<32>) {
    let topics = (symbol_short!("INIT"),);
    let data = InitializedEvent {
        genesis_hash,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_user_registered(
    env: &Env,
    address: WalletAddress,
    role: Role,
    name: String,
    patient_id: Option<String>,
) {
    let topics = (symbol_short!("USR_REG"), address.clone());
    let data = UserRegisteredEvent {
        address,
        role,
        name,
        patient_id,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_ex_patient_transition(env: &Env, patient_id: String, transitioned: u32) {
    let topics = (symbol_short!("EX_PAT"), patient_id.clone());
    let data = ExPatientTransitionEvent {
        patient_id,
        transitioned,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_record_added(
    env: &Env,
    index: u32,
    patient_id: String,
    tier: Tier,
    creator: WalletAddress,
    hash: BytesN<32>,
) {
    let topics = (symbol_short!("REC_ADD"), patient_id.clone(), creator.clone());
    let data = RecordAddedEvent {
        index,
        patient_id,
        tier,
        creator,
        hash,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_consent_requested(
    env: &Env,
    request_id: String,
    patient_id: String,
    requester: WalletAddress,
    tier: Tier,
) {
    let topics = (symbol_short!("CNS_REQ"), patient_id.clone());
    let data = ConsentRequestedEvent {
        request_id,
        patient_id,
        requester,
        tier,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_consent_signed(env: &Env, request_id: String, signer: WalletAddress, signatures: u32) {
    let topics = (symbol_short!("CNS_SIG"), request_id.clone());
    let data = ConsentSignedEvent {
        request_id,
        signer,
        signatures,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_consent_approved(env: &Env, request_id: String, patient_id: String) {
    let topics = (symbol_short!("CNS_OK"), request_id.clone());
    let data = ConsentApprovedEvent {
        request_id,
        patient_id,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_records_expired(env: &Env, count: u32) {
    let topics = (symbol_short!("EXPIRED"),);
    let data = RecordsExpiredEvent {
        count,
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}

pub fn publish_chain_violation(env: &Env, index: u32, chain_length: u32) {
    let error = ContractError::ChainIntegrityViolation;
    let topics = (symbol_short!("CHAIN_BAD"), error.category());
    let data = ChainViolationEvent {
        index,
        chain_length,
        error_code: error as u32,
        severity: error.severity(),
        message: String::from_str(env, error.message()),
        timestamp: env.ledger().timestamp(),
    };
    env.events().publish(topics, data);
}
