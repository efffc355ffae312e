use soroban_sdk::contracttype;

/// Error categories for classifying different types of errors
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ErrorCategory {
    /// Malformed input: bad keys, missing cohort, incomplete profiles
    Validation = 1,
    /// Role or signature checks failed
    Authorization = 2,
    /// Lookup of an identity, patient, request or record failed
    NotFound = 3,
    /// Contract lifecycle or ledger state problems
    State = 4,
    /// Stored history no longer matches its hashes
    Integrity = 5,
}

/// Error severity levels indicating the impact and urgency of errors
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ErrorSeverity {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

#[soroban_sdk::contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ContractError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    InvalidKeyFormat = 3,
    RegistrationFailure = 4,
    MissingCohort = 5,
    UnknownPatient = 6,
    AuthorizationDenied = 7,
    RequestNotFound = 8,
    SignerNotAuthorized = 9,
    NotRegistered = 10,
    ChainIntegrityViolation = 11,
    SignatureMismatch = 12,
    RecordNotFound = 13,
}

impl ContractError {
    /// Returns the error category for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ContractError::InvalidKeyFormat
            | ContractError::RegistrationFailure
            | ContractError::MissingCohort => ErrorCategory::Validation,
            ContractError::AuthorizationDenied
            | ContractError::SignerNotAuthorized
            | ContractError::SignatureMismatch => ErrorCategory::Authorization,
            ContractError::UnknownPatient
            | ContractError::RequestNotFound
            | ContractError::NotRegistered
            | ContractError::RecordNotFound => ErrorCategory::NotFound,
            ContractError::NotInitialized | ContractError::AlreadyInitialized => {
                ErrorCategory::State
            }
            ContractError::ChainIntegrityViolation => ErrorCategory::Integrity,
        }
    }

    /// Returns the severity level for this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ContractError::InvalidKeyFormat
            | ContractError::RegistrationFailure
            | ContractError::MissingCohort
            | ContractError::UnknownPatient
            | ContractError::RequestNotFound
            | ContractError::NotRegistered
            | ContractError::RecordNotFound
            | ContractError::AlreadyInitialized => ErrorSeverity::Low,
            ContractError::AuthorizationDenied
            | ContractError::SignerNotAuthorized
            | ContractError::SignatureMismatch => ErrorSeverity::Medium,
            ContractError::NotInitialized => ErrorSeverity::High,
            ContractError::ChainIntegrityViolation => ErrorSeverity::Critical,
        }
    }

    /// Returns a human-readable error message for this error.
    pub fn message(&self) -> &'static str {
        match self {
            ContractError::NotInitialized => "Contract has not been initialized",
            ContractError::AlreadyInitialized => "Contract is already initialized",
            ContractError::InvalidKeyFormat => "Private key must be 64 hex characters",
            ContractError::RegistrationFailure => "Profile is missing required fields",
            ContractError::MissingCohort => "Role requires a patient id",
            ContractError::UnknownPatient => "No cohort exists for this patient id",
            ContractError::AuthorizationDenied => "Role may not access this tier",
            ContractError::RequestNotFound => "Consent request not found",
            ContractError::SignerNotAuthorized => "Only doctors or the medical committee can co-sign",
            ContractError::NotRegistered => "Address is not registered",
            ContractError::ChainIntegrityViolation => "Ledger hash chain is inconsistent",
            ContractError::SignatureMismatch => "Signing key does not belong to the signer address",
            ContractError::RecordNotFound => "Record not found",
        }
    }
}
