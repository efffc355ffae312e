use soroban_sdk::contracttype;

/// Roles an address can hold. Exactly one per registered address.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Role {
    Nurse = 1,
    Doctor = 2,
    MedicalCommittee = 3,
    Director = 4,
    Patient = 5,
    ExPatient = 6,
    Family = 7,
}

/// Visibility class of a record.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Tier {
    Public = 0,
    Private = 1,
    Patient = 2,
}

/// What a role is allowed to do, independent of any particular patient.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Capabilities {
    pub can_write_public: bool,
    pub can_write_private: bool,
    pub can_write_patient: bool,
    /// Role belongs to a patient cohort (patient, ex-patient, family).
    pub is_cohort_capable: bool,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Nurse,
        Role::Doctor,
        Role::MedicalCommittee,
        Role::Director,
        Role::Patient,
        Role::ExPatient,
        Role::Family,
    ];

    pub fn capabilities(self) -> Capabilities {
        match self {
            Role::MedicalCommittee | Role::Director => Capabilities {
                can_write_public: true,
                can_write_private: true,
                can_write_patient: true,
                is_cohort_capable: false,
            },
            Role::Nurse | Role::Doctor => Capabilities {
                can_write_public: true,
                can_write_private: false,
                can_write_patient: true,
                is_cohort_capable: false,
            },
            Role::Patient | Role::ExPatient | Role::Family => Capabilities {
                can_write_public: false,
                can_write_private: false,
                can_write_patient: false,
                is_cohort_capable: true,
            },
        }
    }

    /// Roles whose signature counts toward a consent quorum.
    pub fn can_cosign(self) -> bool {
        matches!(self, Role::Doctor | Role::MedicalCommittee)
    }
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Public, Tier::Private, Tier::Patient];

    /// Stable code used in the record hash preimage.
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Decides whether `role` may create or see a record of `tier` for a patient.
///
/// `is_cohort_member` tells whether the address belongs to that patient's
/// cohort. An address without a role is denied everything.
pub fn allowed(role: Option<Role>, tier: Tier, is_cohort_member: bool) -> bool {
    let caps = match role {
        Some(role) => role.capabilities(),
        None => return false,
    };

    match tier {
        Tier::Private => caps.can_write_private,
        Tier::Patient => is_cohort_member || caps.can_write_patient,
        Tier::Public => caps.can_write_public || (caps.is_cohort_capable && is_cohort_member),
    }
}
