//! Shared helpers for the MediTrust contract suite.
//!
//! - [`calendar`]: civil-date arithmetic on UNIX timestamps (year offsets,
//!   ISO dates).
//!
//! Nothing here allocates, so the same code runs inside a Soroban contract
//! and in off-chain tooling.

#![cfg_attr(not(feature = "std"), no_std)]

// ── Modules ──────────────────────────────────────────────────────────────────

pub mod calendar;

pub use calendar::{add_years, format_iso_date, SECONDS_PER_DAY};
