#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use soroban_sdk::testutils::Ledger;
use soroban_sdk::{Bytes, Env, Map, String};
use meditrust::{
    MediTrustContract, MediTrustContractClient, Profile, Role, Tier, WalletAddress,
};

#[derive(Arbitrary, Debug)]
pub enum FuzzAction {
    Register { role: u8, seed: u8, patient: u8, name_len: u8 },
    Write { writer: u8, patient: u8, tier: u8, years: u8, value_len: u8 },
    Read { reader: u8, patient: u8, request: u8 },
    RequestConsent { requester: u8, patient: u8 },
    Cosign { request: u8, signer: u8, seed: u8 },
    Transition { patient: u8 },
    Advance { days: u16 },
    Sweep,
    Sign { seed: u8, message: Vec<u8> },
    RecoverRaw { key: Vec<u8> },
}

const ROLES: [Role; 7] = Role::ALL;

fn patient_id(env: &Env, n: u8) -> String {
    String::from_str(env, &format!("P{}", n % 4))
}

fn secret(env: &Env, seed: u8) -> String {
    String::from_str(env, &format!("{:02x}", seed).repeat(32))
}

fn profile(env: &Env, name_len: u8) -> Profile {
    Profile {
        name: String::from_str(env, &"n".repeat(name_len as usize % 40)),
        age: 40,
        identity_number: String::from_str(env, "0001"),
        home_address: String::from_str(env, "-"),
        phone: String::from_str(env, "-"),
        specialization: None,
    }
}

fuzz_target!(|actions: Vec<FuzzAction>| {
    let env = Env::default();
    env.mock_all_auths();

    let contract_id = env.register(MediTrustContract, ());
    let client = MediTrustContractClient::new(&env, &contract_id);
    let _ = client.try_initialize();

    let mut users: Vec<(WalletAddress, u8)> = Vec::new();
    let mut requests: Vec<String> = Vec::new();
    let mut accepted_writes = 0u32;

    for action in actions {
        match action {
            FuzzAction::Register { role, seed, patient, name_len } => {
                let role = ROLES[role as usize % ROLES.len()];
                let patient = if patient % 5 == 0 { None } else { Some(patient_id(&env, patient)) };
                if let Ok(Ok(registered)) =
                    client.try_register(&role, &profile(&env, name_len), &Some(secret(&env, seed)), &patient)
                {
                    users.push((registered.address, seed));
                }
            }
            FuzzAction::Write { writer, patient, tier, years, value_len } => {
                if users.is_empty() {
                    continue;
                }
                let (writer, _) = &users[writer as usize % users.len()];
                let tier = Tier::ALL[tier as usize % Tier::ALL.len()];
                let mut payload = Map::new(&env);
                payload.set(
                    String::from_str(&env, "v"),
                    String::from_str(&env, &"x".repeat(value_len as usize)),
                );
                let result = client.try_write_record(
                    &patient_id(&env, patient),
                    &payload,
                    &tier,
                    writer,
                    &u32::from(years % 20),
                );
                if result.is_ok() {
                    accepted_writes += 1;
                }
            }
            FuzzAction::Read { reader, patient, request } => {
                if users.is_empty() {
                    continue;
                }
                let (reader, _) = &users[reader as usize % users.len()];
                let request = if requests.is_empty() {
                    None
                } else {
                    Some(requests[request as usize % requests.len()].clone())
                };
                let _ = client.try_read_records(&patient_id(&env, patient), reader, &request);
            }
            FuzzAction::RequestConsent { requester, patient } => {
                if users.is_empty() {
                    continue;
                }
                let (requester, _) = &users[requester as usize % users.len()];
                if let Ok(Ok(id)) =
                    client.try_create_consent_request(&patient_id(&env, patient), requester, &Tier::Private)
                {
                    requests.push(id);
                }
            }
            FuzzAction::Cosign { request, signer, seed } => {
                if users.is_empty() || requests.is_empty() {
                    continue;
                }
                let id = &requests[request as usize % requests.len()];
                let (signer, own_seed) = &users[signer as usize % users.len()];
                let key_seed = if seed % 3 == 0 { seed } else { *own_seed };
                let before = client.is_consent_approved(id);
                let _ = client.try_cosign_consent_request(id, signer, &secret(&env, key_seed));
                if before {
                    assert!(client.is_consent_approved(id), "approval never reverts");
                }
            }
            FuzzAction::Transition { patient } => {
                let _ = client.try_transition_to_ex_patient(&patient_id(&env, patient));
            }
            FuzzAction::Advance { days } => {
                let now = env.ledger().timestamp();
                env.ledger().set_timestamp(now.saturating_add(u64::from(days) * 86_400));
            }
            FuzzAction::Sweep => {
                let _ = client.try_sweep_expiry();
                assert_eq!(client.sweep_expiry(), 0, "sweep is idempotent");
            }
            FuzzAction::Sign { seed, message } => {
                let keys = client.recover_keypair(&secret(&env, seed));
                let message = Bytes::from_slice(&env, &message);
                let signature = client.sign_message(&keys.private_key_hex, &message);
                assert!(client.verify_signature(&keys.public_key_hex, &message, &signature));
            }
            FuzzAction::RecoverRaw { key } => {
                let key = String::from_bytes(&env, &key);
                let _ = client.try_recover_keypair(&key);
            }
        }
    }

    assert_eq!(client.chain_length(), 1 + accepted_writes);
    assert!(client.verify_integrity());
});
