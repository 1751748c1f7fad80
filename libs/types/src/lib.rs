//! Types library for the callable credit facility
//!
//! Shared identifier, amount and error types used by the facility and by any
//! tooling that reconciles its events.
//!
//! # Modules
//! - `ids`: Participant identifiers (AccountId, SiloId)
//! - `numeric`: Integer amounts (Notional, WrappedAmount, SharesAmount), Bps, Rate
//! - `errors`: Arithmetic error taxonomy

pub mod ids;
pub mod numeric;
pub mod errors;

