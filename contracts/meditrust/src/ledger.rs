//! Hash-chained record storage.
//!
//! Records live in persistent storage under `(RECORD, index)`; index 0 is the
//! genesis record. Each record's `hash` is the SHA-256 of this preimage
//! (integers big-endian, `str(s) = u32 byte length || UTF-8 bytes`):
//!
//! ```text
//! str(patient_id)
//! u32(payload entry count) || { str(key) || str(value) } in ascending key order
//! u32(tier code) || u64(created_at) || previous_hash[32]
//! str(creator) || u64(expires_at)
//! ```
//!
//! Payload maps are host maps, which always iterate in key order, so equal
//! payloads hash identically regardless of insertion order. The `expired`
//! flag is outside the preimage; it is the only field that changes after
//! append.

use soroban_sdk::{contracttype, symbol_short, Bytes, BytesN, Env, Map, String, Symbol, Vec};

use crate::errors::ContractError;
use crate::identity::WalletAddress;
use crate::policy::Tier;

// ── Storage keys ─────────────────────────────────────────────────────────────

const RECORD: Symbol = symbol_short!("RECORD");
const REC_CNT: Symbol = symbol_short!("REC_CNT");
const PAT_REC: Symbol = symbol_short!("PAT_REC");

const TTL_THRESHOLD: u32 = 5_184_000;
const TTL_EXTEND_TO: u32 = 10_368_000;

pub const GENESIS_EXPIRY_YEARS: u32 = 100;
pub const GENESIS_PATIENT_ID: &str = "0";
pub const GENESIS_CREATOR: &str = "SYSTEM";

// ── Types ────────────────────────────────────────────────────────────────────

/// One hash-chained unit of ledger data.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    pub index: u32,
    pub patient_id: String,
    pub payload: Map<String, String>,
    pub tier: Tier,
    pub previous_hash: BytesN<32>,
    pub creator: WalletAddress,
    pub created_at: u64,
    pub expires_at: u64,
    pub hash: BytesN<32>,
    pub expired: bool,
}

/// Outcome of a full chain audit.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainAudit {
    pub chain_length: u32,
    pub first_violation: Option<u32>,
}

// ── Storage helpers ──────────────────────────────────────────────────────────

pub(crate) fn record_key(index: u32) -> (Symbol, u32) {
    (RECORD, index)
}

fn patient_key(patient_id: &String) -> (Symbol, String) {
    (PAT_REC, patient_id.clone())
}

fn extend_record_ttl(env: &Env, key: &(Symbol, u32)) {
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

fn extend_patient_ttl(env: &Env, key: &(Symbol, String)) {
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

fn store(env: &Env, record: &Record) {
    let key = record_key(record.index);
    env.storage().persistent().set(&key, record);
    extend_record_ttl(env, &key);
}

fn zero_hash(env: &Env) -> BytesN<32> {
    BytesN::from_array(env, &[0u8; 32])
}

// ── Hashing ──────────────────────────────────────────────────────────────────

fn push_str(buf: &mut Bytes, s: &String) {
    buf.extend_from_array(&s.len().to_be_bytes());
    buf.append(&s.to_bytes());
}

/// Canonical preimage of a record; see the module docs for the layout.
pub fn canonical_bytes(env: &Env, record: &Record) -> Bytes {
    let mut buf = Bytes::new(env);
    push_str(&mut buf, &record.patient_id);
    buf.extend_from_array(&record.payload.len().to_be_bytes());
    for (key, value) in record.payload.iter() {
        push_str(&mut buf, &key);
        push_str(&mut buf, &value);
    }
    buf.extend_from_array(&record.tier.code().to_be_bytes());
    buf.extend_from_array(&record.created_at.to_be_bytes());
    buf.extend_from_array(&record.previous_hash.to_array());
    push_str(&mut buf, record.creator.as_string());
    buf.extend_from_array(&record.expires_at.to_be_bytes());
    buf
}

pub fn compute_hash(env: &Env, record: &Record) -> BytesN<32> {
    env.crypto().sha256(&canonical_bytes(env, record)).into()
}

// ── Chain operations ─────────────────────────────────────────────────────────

pub fn len(env: &Env) -> u32 {
    env.storage().instance().get(&REC_CNT).unwrap_or(0)
}

pub fn get(env: &Env, index: u32) -> Option<Record> {
    env.storage().persistent().get(&record_key(index))
}

pub fn get_or_err(env: &Env, index: u32) -> Result<Record, ContractError> {
    get(env, index).ok_or(ContractError::RecordNotFound)
}

fn head_hash(env: &Env) -> Result<BytesN<32>, ContractError> {
    let count = len(env);
    if count == 0 {
        return Err(ContractError::NotInitialized);
    }
    Ok(get_or_err(env, count - 1)?.hash)
}

/// Writes the genesis record. Called once, from `initialize`.
pub fn genesis(env: &Env) -> Record {
    let now = env.ledger().timestamp();
    let mut payload = Map::new(env);
    payload.set(
        String::from_str(env, "message"),
        String::from_str(env, "Genesis Block"),
    );

    let mut record = Record {
        index: 0,
        patient_id: String::from_str(env, GENESIS_PATIENT_ID),
        payload,
        tier: Tier::Public,
        previous_hash: zero_hash(env),
        creator: WalletAddress::new(env, GENESIS_CREATOR),
        created_at: now,
        expires_at: common::add_years(now, GENESIS_EXPIRY_YEARS),
        hash: zero_hash(env),
        expired: false,
    };
    record.hash = compute_hash(env, &record);

    store(env, &record);
    env.storage().instance().set(&REC_CNT, &1u32);
    record
}

/// Appends a record chained to the current head.
///
/// Callers must have cleared the write with the access policy first.
pub fn append(
    env: &Env,
    patient_id: String,
    payload: Map<String, String>,
    tier: Tier,
    creator: WalletAddress,
    expiry_years: u32,
) -> Result<Record, ContractError> {
    let previous_hash = head_hash(env)?;
    let index = len(env);
    let now = env.ledger().timestamp();

    let mut record = Record {
        index,
        patient_id,
        payload,
        tier,
        previous_hash,
        creator,
        created_at: now,
        expires_at: common::add_years(now, expiry_years),
        hash: zero_hash(env),
        expired: false,
    };
    record.hash = compute_hash(env, &record);

    store(env, &record);
    env.storage().instance().set(&REC_CNT, &(index + 1));

    let pkey = patient_key(&record.patient_id);
    let mut indices: Vec<u32> = env
        .storage()
        .persistent()
        .get(&pkey)
        .unwrap_or(Vec::new(env));
    indices.push_back(index);
    env.storage().persistent().set(&pkey, &indices);
    extend_patient_ttl(env, &pkey);

    Ok(record)
}

/// Indices of every record written for `patient_id`, in chain order.
pub fn patient_indices(env: &Env, patient_id: &String) -> Vec<u32> {
    env.storage()
        .persistent()
        .get(&patient_key(patient_id))
        .unwrap_or(Vec::new(env))
}

/// The whole chain in order, for replay by an external store.
pub fn load_all(env: &Env) -> Vec<Record> {
    let mut records = Vec::new(env);
    for index in 0..len(env) {
        if let Some(record) = get(env, index) {
            records.push_back(record);
        }
    }
    records
}

// ── Integrity ────────────────────────────────────────────────────────────────

/// Position of the first record in `records` whose stored hash or link
/// disagrees with its contents, or `None` for a consistent sequence.
pub fn first_violation_in(env: &Env, records: &Vec<Record>) -> Option<u32> {
    let mut previous: Option<Record> = None;
    for (position, record) in records.iter().enumerate() {
        let position = position as u32;
        if record.index != position || compute_hash(env, &record) != record.hash {
            return Some(position);
        }
        let expected_link = match &previous {
            Some(prev) => prev.hash.clone(),
            None => zero_hash(env),
        };
        if record.previous_hash != expected_link {
            return Some(position);
        }
        previous = Some(record);
    }
    None
}

/// First inconsistent stored record, including gaps in the sequence.
pub fn first_violation(env: &Env) -> Option<u32> {
    let count = len(env);
    let records = load_all(env);
    if records.len() != count {
        // A missing slot: report the first absent index.
        return (0..count).find(|i| get(env, *i).is_none());
    }
    first_violation_in(env, &records)
}

pub fn verify_integrity(env: &Env) -> bool {
    first_violation(env).is_none()
}

pub fn audit(env: &Env) -> ChainAudit {
    ChainAudit {
        chain_length: len(env),
        first_violation: first_violation(env),
    }
}

// ── Expiry ───────────────────────────────────────────────────────────────────

/// A record is expired once `now` reaches its expiry timestamp.
pub fn evaluate_expiry(record: &Record, now: u64) -> bool {
    record.expired || now >= record.expires_at
}

/// Flags every non-genesis record that has expired by `now`.
/// Returns how many records were newly flagged.
pub fn sweep_expiry(env: &Env, now: u64) -> u32 {
    let mut newly_expired = 0u32;
    for index in 1..len(env) {
        if let Some(mut record) = get(env, index) {
            if !record.expired && evaluate_expiry(&record, now) {
                record.expired = true;
                store(env, &record);
                newly_expired += 1;
            }
        }
    }
    newly_expired
}
