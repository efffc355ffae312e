//! Key pairs, wallet addresses and message signatures.
//!
//! Keys are Ed25519. A private key is the 32-byte secret seed, exchanged as
//! 64 hex characters. Addresses follow the familiar checksummed layout:
//!
//! ```text
//! base58( 0x00 || H(pk) || SHA-256(SHA-256(0x00 || H(pk)))[0..4] )
//! H(pk) = RIPEMD-160(SHA-256(pk))
//! ```
//!
//! Signatures cover the SHA-256 digest of the message bytes.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use ripemd::{Digest, Ripemd160};
use soroban_sdk::{contracttype, Bytes, BytesN, Env, String};

use crate::errors::ContractError;

pub const ADDRESS_VERSION: u8 = 0x00;

const HASHED_KEY_LEN: usize = 20;
const CHECKSUM_LEN: usize = 4;
const ADDRESS_BYTES: usize = 1 + HASHED_KEY_LEN + CHECKSUM_LEN;
// 25 bytes encode to at most 35 base-58 characters.
const ADDRESS_TEXT_MAX: usize = 35;

const PUBLIC_KEY_HEX_LEN: u32 = 64;
const SIGNATURE_HEX_LEN: u32 = 128;

/// Checksummed base-58 identity of a key holder.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    pub fn new(env: &Env, text: &str) -> Self {
        WalletAddress(String::from_str(env, text))
    }

    pub fn as_string(&self) -> &String {
        &self.0
    }
}

/// Key material handed back to the holder. Never stored by the contract.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeyPair {
    pub private_key_hex: String,
    pub public_key_hex: String,
    pub address: WalletAddress,
}

// ── Hash helpers ─────────────────────────────────────────────────────────────

pub(crate) fn sha256(env: &Env, data: &[u8]) -> [u8; 32] {
    let digest: BytesN<32> = env.crypto().sha256(&Bytes::from_slice(env, data)).into();
    digest.to_array()
}

fn message_digest(env: &Env, message: &Bytes) -> [u8; 32] {
    let digest: BytesN<32> = env.crypto().sha256(message).into();
    digest.to_array()
}

// ── String helpers ───────────────────────────────────────────────────────────

/// Copies a hex string of exactly `2 * N` characters and decodes it.
fn decode_hex_string<const N: usize, const H: usize>(text: &String) -> Option<[u8; N]> {
    if text.len() as usize != H {
        return None;
    }
    let mut buf = [0u8; H];
    text.copy_into_slice(&mut buf);
    let mut out = [0u8; N];
    hex::decode_to_slice(buf, &mut out).ok()?;
    Some(out)
}

fn hex_string<const N: usize, const H: usize>(env: &Env, bytes: &[u8; N]) -> String {
    let mut buf = [0u8; H];
    match hex::encode_to_slice(bytes, &mut buf) {
        Ok(()) => String::from_bytes(env, &buf),
        Err(_) => String::from_str(env, ""),
    }
}

// ── Address derivation ───────────────────────────────────────────────────────

fn address_bytes(env: &Env, public_key: &[u8; 32]) -> [u8; ADDRESS_BYTES] {
    let hashed = Ripemd160::digest(sha256(env, public_key));

    let mut raw = [0u8; ADDRESS_BYTES];
    raw[0] = ADDRESS_VERSION;
    raw[1..1 + HASHED_KEY_LEN].copy_from_slice(hashed.as_slice());

    let checksum = sha256(env, &sha256(env, &raw[..1 + HASHED_KEY_LEN]));
    raw[1 + HASHED_KEY_LEN..].copy_from_slice(&checksum[..CHECKSUM_LEN]);
    raw
}

/// Derives the wallet address of a public key.
pub fn derive_address(env: &Env, public_key: &[u8; 32]) -> WalletAddress {
    let raw = address_bytes(env, public_key);
    let mut text = [0u8; ADDRESS_TEXT_MAX];
    let len = bs58::encode(raw).onto(&mut text[..]).unwrap_or(0);
    WalletAddress(String::from_bytes(env, &text[..len]))
}

/// Checks base-58 form, version byte and checksum of an address.
pub fn is_valid_address(env: &Env, address: &WalletAddress) -> bool {
    let text_len = address.0.len() as usize;
    if text_len == 0 || text_len > ADDRESS_TEXT_MAX {
        return false;
    }
    let mut text = [0u8; ADDRESS_TEXT_MAX];
    address.0.copy_into_slice(&mut text[..text_len]);

    let mut raw = [0u8; ADDRESS_BYTES + 8];
    match bs58::decode(&text[..text_len]).onto(&mut raw[..]) {
        Ok(ADDRESS_BYTES) => {}
        _ => return false,
    }
    if raw[0] != ADDRESS_VERSION {
        return false;
    }
    let checksum = sha256(env, &sha256(env, &raw[..1 + HASHED_KEY_LEN]));
    raw[1 + HASHED_KEY_LEN..ADDRESS_BYTES] == checksum[..CHECKSUM_LEN]
}

// ── Key pairs ────────────────────────────────────────────────────────────────

fn parse_private_key(private_key_hex: &String) -> Result<[u8; 32], ContractError> {
    decode_hex_string::<32, 64>(private_key_hex).ok_or(ContractError::InvalidKeyFormat)
}

fn keypair_from_secret(env: &Env, secret: &[u8; 32]) -> KeyPair {
    let signing_key = SigningKey::from_bytes(secret);
    let public_key = signing_key.verifying_key().to_bytes();
    KeyPair {
        private_key_hex: hex_string::<32, 64>(env, secret),
        public_key_hex: hex_string::<32, 64>(env, &public_key),
        address: derive_address(env, &public_key),
    }
}

/// Produces a fresh key pair from the host PRNG.
pub fn generate(env: &Env) -> KeyPair {
    let seed: BytesN<32> = env.prng().gen();
    keypair_from_secret(env, &seed.to_array())
}

/// Rebuilds the key pair of an existing secret.
pub fn recover(env: &Env, private_key_hex: &String) -> Result<KeyPair, ContractError> {
    let secret = parse_private_key(private_key_hex)?;
    Ok(keypair_from_secret(env, &secret))
}

/// Signs `message`, returning the 64-byte signature as hex.
pub fn sign(env: &Env, private_key_hex: &String, message: &Bytes) -> Result<String, ContractError> {
    let secret = parse_private_key(private_key_hex)?;
    let signing_key = SigningKey::from_bytes(&secret);
    let signature = signing_key.sign(&message_digest(env, message));
    Ok(hex_string::<64, 128>(env, &signature.to_bytes()))
}

/// Checks a hex signature against a hex public key. Malformed input is `false`.
pub fn verify(env: &Env, public_key_hex: &String, message: &Bytes, signature_hex: &String) -> bool {
    if public_key_hex.len() != PUBLIC_KEY_HEX_LEN || signature_hex.len() != SIGNATURE_HEX_LEN {
        return false;
    }
    let public_key = match decode_hex_string::<32, 64>(public_key_hex) {
        Some(pk) => pk,
        None => return false,
    };
    let signature = match decode_hex_string::<64, 128>(signature_hex) {
        Some(sig) => Signature::from_bytes(&sig),
        None => return false,
    };
    let verifying_key = match VerifyingKey::from_bytes(&public_key) {
        Ok(vk) => vk,
        Err(_) => return false,
    };
    verifying_key
        .verify(&message_digest(env, message), &signature)
        .is_ok()
}
