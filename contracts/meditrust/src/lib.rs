#![no_std]

pub mod consent;
pub mod errors;
pub mod events;
pub mod identity;
pub mod ledger;
pub mod policy;
pub mod registry;

use soroban_sdk::{
    contract, contractimpl, symbol_short, Bytes, BytesN, Env, Map, String, Symbol, Vec,
};

pub use consent::{ConsentRequest, ConsentStatus, QUORUM};
pub use errors::{ContractError, ErrorCategory, ErrorSeverity};
pub use identity::{KeyPair, WalletAddress};
pub use ledger::{ChainAudit, Record};
pub use policy::{Role, Tier};
pub use registry::{
    Account, CohortStatus, ExpiredRecord, IdentityInfo, PatientCohort, PatientRecords, Profile,
    RecordView, RegisteredIdentity, REDACTED_PAYLOAD,
};

/// Storage keys for the contract
const INITIALIZED: Symbol = symbol_short!("INIT");

fn require_initialized(env: &Env) -> Result<(), ContractError> {
    if env.storage().instance().has(&INITIALIZED) {
        Ok(())
    } else {
        Err(ContractError::NotInitialized)
    }
}

#[contract]
pub struct MediTrustContract;

#[contractimpl]
impl MediTrustContract {
    /// Writes the genesis record. Callable once.
    pub fn initialize(env: Env) -> Result<BytesN<32>, ContractError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(ContractError::AlreadyInitialized);
        }

        env.storage().instance().set(&INITIALIZED, &true);
        let genesis = ledger::genesis(&env);

        events::publish_initialized(&env, genesis.hash.clone());

        Ok(genesis.hash)
    }

    /// Check if the contract is initialized
    pub fn is_initialized(env: Env) -> bool {
        env.storage().instance().has(&INITIALIZED)
    }

    pub fn version(env: Env) -> String {
        String::from_str(&env, env!("CARGO_PKG_VERSION"))
    }

    // ── Identity ─────────────────────────────────────────────────────────────

    pub fn generate_keypair(env: Env) -> KeyPair {
        identity::generate(&env)
    }

    pub fn recover_keypair(env: Env, private_key_hex: String) -> Result<KeyPair, ContractError> {
        identity::recover(&env, &private_key_hex)
    }

    pub fn sign_message(
        env: Env,
        private_key_hex: String,
        message: Bytes,
    ) -> Result<String, ContractError> {
        identity::sign(&env, &private_key_hex, &message)
    }

    pub fn verify_signature(
        env: Env,
        public_key_hex: String,
        message: Bytes,
        signature_hex: String,
    ) -> bool {
        identity::verify(&env, &public_key_hex, &message, &signature_hex)
    }

    pub fn is_valid_address(env: Env, address: WalletAddress) -> bool {
        identity::is_valid_address(&env, &address)
    }

    // ── Registry ─────────────────────────────────────────────────────────────

    /// Registers an address under `role`. Cohort roles (patient, ex-patient,
    /// family) must name the patient they belong to.
    pub fn register(
        env: Env,
        role: Role,
        profile: Profile,
        private_key_hex: Option<String>,
        patient_id: Option<String>,
    ) -> Result<RegisteredIdentity, ContractError> {
        require_initialized(&env)?;

        let registered =
            registry::register(&env, role, profile.clone(), private_key_hex, patient_id)?;

        let account = registry::get_account(&env, &registered.address);
        events::publish_user_registered(
            &env,
            registered.address.clone(),
            role,
            profile.name,
            account.and_then(|a| a.patient_id),
        );

        Ok(registered)
    }

    pub fn login(env: Env, private_key_hex: String) -> Result<IdentityInfo, ContractError> {
        require_initialized(&env)?;
        registry::login(&env, &private_key_hex)
    }

    pub fn resolve_identity(
        env: Env,
        address: WalletAddress,
    ) -> Result<IdentityInfo, ContractError> {
        require_initialized(&env)?;
        registry::resolve_identity(&env, &address)
    }

    /// Moves the patient members of a cohort to the ex-patient role.
    pub fn transition_to_ex_patient(env: Env, patient_id: String) -> Result<u32, ContractError> {
        require_initialized(&env)?;

        let transitioned = registry::transition_to_ex_patient(&env, &patient_id)?;

        events::publish_ex_patient_transition(&env, patient_id, transitioned);
        Ok(transitioned)
    }

    pub fn get_cohort(env: Env, patient_id: String) -> Result<PatientCohort, ContractError> {
        require_initialized(&env)?;
        registry::get_cohort(&env, &patient_id).ok_or(ContractError::UnknownPatient)
    }

    pub fn list_users(env: Env, role: Role) -> Vec<WalletAddress> {
        registry::list_users(&env, role)
    }

    // ── Records ──────────────────────────────────────────────────────────────

    /// Appends a record for `patient_id` if `writer` may write `tier`.
    /// Returns the new record's hash.
    pub fn write_record(
        env: Env,
        patient_id: String,
        payload: Map<String, String>,
        tier: Tier,
        writer: WalletAddress,
        expiry_years: u32,
    ) -> Result<BytesN<32>, ContractError> {
        require_initialized(&env)?;

        let record = registry::write(&env, patient_id, payload, tier, writer, expiry_years)?;

        events::publish_record_added(
            &env,
            record.index,
            record.patient_id,
            record.tier,
            record.creator,
            record.hash.clone(),
        );

        Ok(record.hash)
    }

    /// Returns the records of `patient_id` that `reader` may see, bucketed by
    /// tier. An approved consent request for the same patient unlocks the
    /// private tier for cohort members.
    pub fn read_records(
        env: Env,
        patient_id: String,
        reader: WalletAddress,
        consent_request_id: Option<String>,
    ) -> Result<PatientRecords, ContractError> {
        require_initialized(&env)?;
        Ok(registry::read(&env, &patient_id, &reader, consent_request_id))
    }

    pub fn get_record(env: Env, index: u32) -> Result<Record, ContractError> {
        require_initialized(&env)?;
        ledger::get_or_err(&env, index)
    }

    pub fn chain_length(env: Env) -> u32 {
        ledger::len(&env)
    }

    pub fn load_all(env: Env) -> Result<Vec<Record>, ContractError> {
        require_initialized(&env)?;
        Ok(ledger::load_all(&env))
    }

    pub fn verify_integrity(env: Env) -> Result<bool, ContractError> {
        require_initialized(&env)?;
        Ok(ledger::verify_integrity(&env))
    }

    /// Like `verify_integrity`, but returns the first bad index and publishes
    /// a `CHAIN_BAD` event when there is one.
    pub fn audit_chain(env: Env) -> Result<ChainAudit, ContractError> {
        require_initialized(&env)?;

        let report = ledger::audit(&env);
        if let Some(index) = report.first_violation {
            events::publish_chain_violation(&env, index, report.chain_length);
        }
        Ok(report)
    }

    /// Flags every record whose expiry has passed at the current ledger time.
    pub fn sweep_expiry(env: Env) -> Result<u32, ContractError> {
        require_initialized(&env)?;

        let count = ledger::sweep_expiry(&env, env.ledger().timestamp());
        if count > 0 {
            events::publish_records_expired(&env, count);
        }
        Ok(count)
    }

    // ── Consent ──────────────────────────────────────────────────────────────

    pub fn create_consent_request(
        env: Env,
        patient_id: String,
        requester: WalletAddress,
        tier: Tier,
    ) -> Result<String, ContractError> {
        require_initialized(&env)?;
        Ok(consent::create(&env, patient_id, requester, tier).id)
    }

    pub fn cosign_consent_request(
        env: Env,
        request_id: String,
        signer: WalletAddress,
        private_key_hex: String,
    ) -> Result<ConsentStatus, ContractError> {
        require_initialized(&env)?;

        let request = consent::cosign(&env, &request_id, &signer, &private_key_hex)?;
        Ok(request.status)
    }

    pub fn is_consent_approved(env: Env, request_id: String) -> bool {
        consent::is_approved(&env, &request_id)
    }

    pub fn get_consent_request(
        env: Env,
        request_id: String,
    ) -> Result<ConsentRequest, ContractError> {
        consent::get(&env, &request_id).ok_or(ContractError::RequestNotFound)
    }
}

#[cfg(test)]
mod test_consent;
#[cfg(test)]
mod test_ledger;
