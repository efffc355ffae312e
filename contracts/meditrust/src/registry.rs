//! Accounts, patient cohorts and the policy-filtered view of the ledger.

use soroban_sdk::{contracttype, symbol_short, BytesN, Env, Map, String, Symbol, Vec};

use crate::consent::{self, ConsentStatus};
use crate::errors::ContractError;
use crate::identity::{self, KeyPair, WalletAddress};
use crate::ledger::{self, Record};
use crate::policy::{self, Role, Tier};

const ACCOUNT: Symbol = symbol_short!("ACCOUNT");
const COHORT: Symbol = symbol_short!("COHORT");
const ROLE_IDX: Symbol = symbol_short!("ROLE_IDX");

const TTL_THRESHOLD: u32 = 5_184_000;
const TTL_EXTEND_TO: u32 = 10_368_000;

/// Stands in for the payload of an expired record.
pub const REDACTED_PAYLOAD: &str = "[EXPIRED - data removed after retention period]";
const UNKNOWN_CREATOR: &str = "Unknown";

// ── Types ────────────────────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Profile {
    pub name: String,
    pub age: u32,
    pub identity_number: String,
    pub home_address: String,
    pub phone: String,
    pub specialization: Option<String>,
}

/// Everything the contract knows about a registered address.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Account {
    pub address: WalletAddress,
    pub role: Role,
    pub profile: Profile,
    pub public_key_hex: String,
    pub patient_id: Option<String>,
    pub registered_at: u64,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CohortStatus {
    Active,
    ExPatient,
}

/// Addresses tied to one patient: the patient and their family.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatientCohort {
    pub patient_id: String,
    pub members: Vec<WalletAddress>,
    pub status: CohortStatus,
}

/// Result of a registration. `private_key_hex` is only set when the
/// contract generated the key pair.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisteredIdentity {
    pub address: WalletAddress,
    pub role: Role,
    pub public_key_hex: String,
    pub private_key_hex: Option<String>,
}

/// Identity summary returned by login and address lookup.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IdentityInfo {
    pub address: WalletAddress,
    pub role: Role,
    pub profile: Profile,
    pub patient_id: Option<String>,
    pub can_access_private: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordView {
    pub index: u32,
    pub payload: Map<String, String>,
    pub created_at: u64,
    pub creator: WalletAddress,
    pub creator_name: String,
    pub expires_at: u64,
    pub expiry_date: String,
    pub hash: BytesN<32>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExpiredRecord {
    pub index: u32,
    pub placeholder: String,
    pub expires_at: u64,
    pub expiry_date: String,
    pub hash: BytesN<32>,
}

/// A patient's records as one reader is allowed to see them.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatientRecords {
    pub public: Vec<RecordView>,
    pub private: Vec<RecordView>,
    pub patient: Vec<RecordView>,
    pub expired: Vec<ExpiredRecord>,
}

// ── Storage helpers ──────────────────────────────────────────────────────────

fn account_key(address: &WalletAddress) -> (Symbol, WalletAddress) {
    (ACCOUNT, address.clone())
}

fn cohort_key(patient_id: &String) -> (Symbol, String) {
    (COHORT, patient_id.clone())
}

fn role_key(role: Role) -> (Symbol, Role) {
    (ROLE_IDX, role)
}

fn extend_ttl_address_key(env: &Env, key: &(Symbol, WalletAddress)) {
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

fn extend_ttl_string_key(env: &Env, key: &(Symbol, String)) {
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

fn extend_ttl_role_key(env: &Env, key: &(Symbol, Role)) {
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

fn save_account(env: &Env, account: &Account) {
    let key = account_key(&account.address);
    env.storage().persistent().set(&key, account);
    extend_ttl_address_key(env, &key);
}

fn save_cohort(env: &Env, cohort: &PatientCohort) {
    let key = cohort_key(&cohort.patient_id);
    env.storage().persistent().set(&key, cohort);
    extend_ttl_string_key(env, &key);
}

fn save_role_index(env: &Env, role: Role, members: &Vec<WalletAddress>) {
    let key = role_key(role);
    env.storage().persistent().set(&key, members);
    extend_ttl_role_key(env, &key);
}

fn remove_address(list: &mut Vec<WalletAddress>, address: &WalletAddress) {
    if let Some(pos) = list.first_index_of(address) {
        list.remove(pos);
    }
}

// ── Lookups ──────────────────────────────────────────────────────────────────

pub fn get_account(env: &Env, address: &WalletAddress) -> Option<Account> {
    env.storage().persistent().get(&account_key(address))
}

pub fn get_cohort(env: &Env, patient_id: &String) -> Option<PatientCohort> {
    env.storage().persistent().get(&cohort_key(patient_id))
}

pub fn list_users(env: &Env, role: Role) -> Vec<WalletAddress> {
    env.storage()
        .persistent()
        .get(&role_key(role))
        .unwrap_or(Vec::new(env))
}

pub fn is_cohort_member(env: &Env, patient_id: &String, address: &WalletAddress) -> bool {
    get_cohort(env, patient_id)
        .map(|cohort| cohort.members.contains(address))
        .unwrap_or(false)
}

fn role_of(env: &Env, address: &WalletAddress) -> Option<Role> {
    get_account(env, address).map(|account| account.role)
}

// ── Registration ─────────────────────────────────────────────────────────────

fn is_cohort_role(role: Role) -> bool {
    role.capabilities().is_cohort_capable
}

fn detach(env: &Env, previous: &Account) {
    let mut members = list_users(env, previous.role);
    remove_address(&mut members, &previous.address);
    save_role_index(env, previous.role, &members);

    if let Some(patient_id) = &previous.patient_id {
        if let Some(mut cohort) = get_cohort(env, patient_id) {
            remove_address(&mut cohort.members, &previous.address);
            save_cohort(env, &cohort);
        }
    }
}

fn join_cohort(env: &Env, patient_id: &String, address: &WalletAddress, role: Role) {
    let mut cohort = get_cohort(env, patient_id).unwrap_or(PatientCohort {
        patient_id: patient_id.clone(),
        members: Vec::new(env),
        status: CohortStatus::Active,
    });
    if !cohort.members.contains(address) {
        cohort.members.push_back(address.clone());
    }
    match role {
        Role::Patient => cohort.status = CohortStatus::Active,
        Role::ExPatient => cohort.status = CohortStatus::ExPatient,
        _ => {}
    }
    save_cohort(env, &cohort);
}

/// Registers (or re-registers) the holder of a key pair under `role`.
///
/// Without `private_key_hex` a fresh key pair is generated and returned.
/// Re-registering an address replaces its role, profile and cohort.
pub fn register(
    env: &Env,
    role: Role,
    profile: Profile,
    private_key_hex: Option<String>,
    patient_id: Option<String>,
) -> Result<RegisteredIdentity, ContractError> {
    let (keys, generated): (KeyPair, bool) = match &private_key_hex {
        Some(hex) => (identity::recover(env, hex)?, false),
        None => (identity::generate(env), true),
    };

    let patient_id = if is_cohort_role(role) {
        match patient_id {
            Some(id) if id.len() > 0 => Some(id),
            _ => return Err(ContractError::MissingCohort),
        }
    } else {
        None
    };

    if profile.name.len() == 0 || profile.identity_number.len() == 0 {
        return Err(ContractError::RegistrationFailure);
    }

    if let Some(previous) = get_account(env, &keys.address) {
        detach(env, &previous);
    }

    let account = Account {
        address: keys.address.clone(),
        role,
        profile,
        public_key_hex: keys.public_key_hex.clone(),
        patient_id: patient_id.clone(),
        registered_at: env.ledger().timestamp(),
    };
    save_account(env, &account);

    let mut members = list_users(env, role);
    members.push_back(keys.address.clone());
    save_role_index(env, role, &members);

    if let Some(id) = &patient_id {
        join_cohort(env, id, &keys.address, role);
    }

    Ok(RegisteredIdentity {
        address: keys.address,
        role,
        public_key_hex: keys.public_key_hex,
        private_key_hex: if generated {
            Some(keys.private_key_hex)
        } else {
            None
        },
    })
}

/// Moves every `Patient` member of a cohort to `ExPatient`.
/// Returns how many addresses changed role.
pub fn transition_to_ex_patient(env: &Env, patient_id: &String) -> Result<u32, ContractError> {
    let mut cohort = get_cohort(env, patient_id).ok_or(ContractError::UnknownPatient)?;

    let mut patients = list_users(env, Role::Patient);
    let mut ex_patients = list_users(env, Role::ExPatient);
    let mut transitioned = 0u32;

    for address in cohort.members.iter() {
        let Some(mut account) = get_account(env, &address) else {
            continue;
        };
        if account.role != Role::Patient {
            continue;
        }
        account.role = Role::ExPatient;
        save_account(env, &account);
        remove_address(&mut patients, &address);
        ex_patients.push_back(address);
        transitioned += 1;
    }

    if transitioned > 0 {
        save_role_index(env, Role::Patient, &patients);
        save_role_index(env, Role::ExPatient, &ex_patients);
    }
    cohort.status = CohortStatus::ExPatient;
    save_cohort(env, &cohort);

    Ok(transitioned)
}

// ── Identity resolution ──────────────────────────────────────────────────────

fn identity_info(account: Account) -> IdentityInfo {
    IdentityInfo {
        can_access_private: policy::allowed(Some(account.role), Tier::Private, false),
        address: account.address,
        role: account.role,
        profile: account.profile,
        patient_id: account.patient_id,
    }
}

pub fn resolve_identity(env: &Env, address: &WalletAddress) -> Result<IdentityInfo, ContractError> {
    get_account(env, address)
        .map(identity_info)
        .ok_or(ContractError::NotRegistered)
}

pub fn login(env: &Env, private_key_hex: &String) -> Result<IdentityInfo, ContractError> {
    let keys = identity::recover(env, private_key_hex)?;
    resolve_identity(env, &keys.address)
}

// ── Records ──────────────────────────────────────────────────────────────────

/// Appends a record after checking the writer against the access policy.
pub fn write(
    env: &Env,
    patient_id: String,
    payload: Map<String, String>,
    tier: Tier,
    writer: WalletAddress,
    expiry_years: u32,
) -> Result<Record, ContractError> {
    let member = is_cohort_member(env, &patient_id, &writer);
    if !policy::allowed(role_of(env, &writer), tier, member) {
        return Err(ContractError::AuthorizationDenied);
    }
    ledger::append(env, patient_id, payload, tier, writer, expiry_years)
}

fn iso_date(env: &Env, timestamp: u64) -> String {
    String::from_bytes(env, &common::format_iso_date(timestamp))
}

fn creator_name(env: &Env, creator: &WalletAddress) -> String {
    match get_account(env, creator) {
        Some(account) => account.profile.name,
        None => String::from_str(env, UNKNOWN_CREATOR),
    }
}

fn view(env: &Env, record: Record) -> RecordView {
    RecordView {
        index: record.index,
        creator_name: creator_name(env, &record.creator),
        expiry_date: iso_date(env, record.expires_at),
        payload: record.payload,
        created_at: record.created_at,
        creator: record.creator,
        expires_at: record.expires_at,
        hash: record.hash,
    }
}

fn consent_unlocks(env: &Env, patient_id: &String, request_id: &Option<String>) -> bool {
    let Some(id) = request_id else {
        return false;
    };
    match consent::get(env, id) {
        Some(request) => {
            request.status == ConsentStatus::Approved
                && request.patient_id == *patient_id
                && request.tier == Tier::Private
        }
        None => false,
    }
}

/// Buckets a patient's records by what `reader` may see.
///
/// Expiry is judged at the current ledger time; expired records are listed
/// for every reader with their payload withheld.
pub fn read(
    env: &Env,
    patient_id: &String,
    reader: &WalletAddress,
    consent_request_id: Option<String>,
) -> PatientRecords {
    let now = env.ledger().timestamp();
    let role = role_of(env, reader);
    let member = is_cohort_member(env, patient_id, reader);
    let private_unlocked = member && consent_unlocks(env, patient_id, &consent_request_id);

    let mut out = PatientRecords {
        public: Vec::new(env),
        private: Vec::new(env),
        patient: Vec::new(env),
        expired: Vec::new(env),
    };

    for index in ledger::patient_indices(env, patient_id).iter() {
        let Some(record) = ledger::get(env, index) else {
            continue;
        };

        if ledger::evaluate_expiry(&record, now) {
            out.expired.push_back(ExpiredRecord {
                index: record.index,
                placeholder: String::from_str(env, REDACTED_PAYLOAD),
                expires_at: record.expires_at,
                expiry_date: iso_date(env, record.expires_at),
                hash: record.hash,
            });
            continue;
        }

        let tier = record.tier;
        if !policy::allowed(role, tier, member) && !(tier == Tier::Private && private_unlocked) {
            continue;
        }
        let entry = view(env, record);
        match tier {
            Tier::Public => out.public.push_back(entry),
            Tier::Private => out.private.push_back(entry),
            Tier::Patient => out.patient.push_back(entry),
        }
    }

    out
}
