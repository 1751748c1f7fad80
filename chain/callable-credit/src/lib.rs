//! Callable credit facility
//!
//! Share-accounted, multi-tenant credit facility layered on a lending-market
//! credit line. Authorized counter-protocols open positions for borrowers who
//! approved them, draw principal either from one borrower (targeted) or from a
//! whole silo (pro-rata), and close positions. Principal is held as a
//! yield-bearing wrapped asset; appreciation is routed to borrower debt first.
//!
//! # Modules
//! - `errors`: Facility and collaborator error types
//! - `events`: Events emitted by owner actions, approvals and position mutations
//! - `security`: Reentrancy guard, access control, freeze switch
//! - `config`: Facility configuration (fee, caps, throttle)
//! - `shares`: Share math with virtual offsets
//! - `ledger`: Lending ledger interface and in-memory ledger
//! - `market`: Wrapped-asset market interface and in-memory market
//! - `custody`: Settlement and wrapped balances by account
//! - `conversion`: Wrapping, redemption and excess routing
//! - `silo`: Per counter-protocol aggregates and borrower shares
//! - `admission`: Allowances, capacity caps, rolling throttle
//! - `facility`: Position lifecycle controller

pub mod admission;
pub mod config;
pub mod conversion;
pub mod custody;
pub mod errors;
pub mod events;
pub mod facility;
pub mod ledger;
pub mod market;
pub mod security;
pub mod shares;
pub mod silo;

pub use admission::Allowance;
pub use config::FacilityConfig;
pub use errors::{CreditError, ErrorKind};
pub use facility::CallableCredit;

/// Event and error ABI version
pub const CONTRACT_ABI_VERSION: &str = "1.0.0";
