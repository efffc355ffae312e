//! Two-signature consent requests for private-tier reads by cohort members.

use soroban_sdk::{contracttype, symbol_short, Bytes, BytesN, Env, Map, String, Symbol};

use crate::errors::ContractError;
use crate::events;
use crate::identity::{self, WalletAddress};
use crate::policy::Tier;
use crate::registry;

const CONSENT: Symbol = symbol_short!("CONSENT");
const CNS_CTR: Symbol = symbol_short!("CNS_CTR");

const TTL_THRESHOLD: u32 = 5_184_000;
const TTL_EXTEND_TO: u32 = 10_368_000;

/// Distinct co-signers needed to approve a request.
pub const QUORUM: u32 = 2;

const REQUEST_ID_BYTES: usize = 8;
const MESSAGE_DOMAIN: &[u8] = b"meditrust-consent";

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConsentStatus {
    Pending,
    Approved,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConsentRequest {
    pub id: String,
    pub patient_id: String,
    pub requester: WalletAddress,
    pub tier: Tier,
    /// Hex signature per co-signing address.
    pub signatures: Map<WalletAddress, String>,
    pub status: ConsentStatus,
    pub created_at: u64,
}

fn request_key(id: &String) -> (Symbol, String) {
    (CONSENT, id.clone())
}

fn store(env: &Env, request: &ConsentRequest) {
    let key = request_key(&request.id);
    env.storage().persistent().set(&key, request);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

fn next_sequence(env: &Env) -> u64 {
    let seq: u64 = env.storage().instance().get(&CNS_CTR).unwrap_or(0);
    env.storage().instance().set(&CNS_CTR, &(seq + 1));
    seq
}

fn push_str(buf: &mut Bytes, s: &String) {
    buf.extend_from_array(&s.len().to_be_bytes());
    buf.append(&s.to_bytes());
}

fn derive_id(env: &Env, patient_id: &String, requester: &WalletAddress, seq: u64) -> String {
    let mut preimage = Bytes::new(env);
    push_str(&mut preimage, patient_id);
    push_str(&mut preimage, requester.as_string());
    preimage.extend_from_array(&env.ledger().timestamp().to_be_bytes());
    preimage.extend_from_array(&seq.to_be_bytes());

    let digest: BytesN<32> = env.crypto().sha256(&preimage).into();
    let mut text = [0u8; REQUEST_ID_BYTES * 2];
    match hex::encode_to_slice(&digest.to_array()[..REQUEST_ID_BYTES], &mut text) {
        Ok(()) => String::from_bytes(env, &text),
        Err(_) => String::from_str(env, ""),
    }
}

/// Bytes a co-signer signs: binds the request id, patient and requester.
pub fn signing_message(env: &Env, request: &ConsentRequest) -> Bytes {
    let mut message = Bytes::from_slice(env, MESSAGE_DOMAIN);
    push_str(&mut message, &request.id);
    push_str(&mut message, &request.patient_id);
    push_str(&mut message, request.requester.as_string());
    message
}

pub fn get(env: &Env, request_id: &String) -> Option<ConsentRequest> {
    env.storage().persistent().get(&request_key(request_id))
}

/// Opens a pending request. The requester is taken at its word; approval
/// rests entirely on the co-signatures.
pub fn create(env: &Env, patient_id: String, requester: WalletAddress, tier: Tier) -> ConsentRequest {
    let seq = next_sequence(env);
    let request = ConsentRequest {
        id: derive_id(env, &patient_id, &requester, seq),
        patient_id,
        requester,
        tier,
        signatures: Map::new(env),
        status: ConsentStatus::Pending,
        created_at: env.ledger().timestamp(),
    };
    store(env, &request);

    events::publish_consent_requested(
        env,
        request.id.clone(),
        request.patient_id.clone(),
        request.requester.clone(),
        request.tier,
    );
    request
}

/// Adds `signer`'s signature to a request.
///
/// The signature is produced from `private_key_hex` and must verify against
/// the public key the signer registered with. A repeat signature from the
/// same address replaces the earlier one without advancing the count.
pub fn cosign(
    env: &Env,
    request_id: &String,
    signer: &WalletAddress,
    private_key_hex: &String,
) -> Result<ConsentRequest, ContractError> {
    let mut request = get(env, request_id).ok_or(ContractError::RequestNotFound)?;

    let account = registry::get_account(env, signer).ok_or(ContractError::SignerNotAuthorized)?;
    if !account.role.can_cosign() {
        return Err(ContractError::SignerNotAuthorized);
    }

    let message = signing_message(env, &request);
    let signature = identity::sign(env, private_key_hex, &message)?;
    if !identity::verify(env, &account.public_key_hex, &message, &signature) {
        return Err(ContractError::SignatureMismatch);
    }

    request.signatures.set(signer.clone(), signature);
    let signed = request.signatures.len();
    let newly_approved = request.status == ConsentStatus::Pending && signed >= QUORUM;
    if newly_approved {
        request.status = ConsentStatus::Approved;
    }
    store(env, &request);

    events::publish_consent_signed(env, request.id.clone(), signer.clone(), signed);
    if newly_approved {
        events::publish_consent_approved(env, request.id.clone(), request.patient_id.clone());
    }
    Ok(request)
}

pub fn is_approved(env: &Env, request_id: &String) -> bool {
    matches!(
        get(env, request_id),
        Some(ConsentRequest {
            status: ConsentStatus::Approved,
            ..
        })
    )
}
