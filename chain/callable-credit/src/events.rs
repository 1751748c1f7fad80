//! Facility events
//!
//! Immutable records emitted by owner actions, approvals and position
//! mutations. Position events carry the silo, the borrower and the amounts
//! resulting from the operation so off-chain consumers can reconcile without
//! replaying share math.

use serde::{Deserialize, Serialize};
use types::ids::{AccountId, SiloId};
use types::numeric::{Notional, SharesAmount, WrappedAmount};
use uuid::Uuid;

use crate::admission::Allowance;
use crate::config::FacilityConfig;

/// Counter-protocol authorized or revoked by the owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterProtocolAuthorizationSet {
    pub counter_protocol: AccountId,
    pub authorized: bool,
}

/// Borrower set the allowance of a counter-protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceApproved {
    pub borrower: AccountId,
    pub counter_protocol: AccountId,
    pub allowance: Allowance,
}

/// New principal deposited into a silo for a borrower
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOpened {
    pub event_id: Uuid,
    pub silo: SiloId,
    pub borrower: AccountId,
    pub principal: Notional,
    pub fee: Notional,
    pub wrapped: WrappedAmount,
    pub shares_minted: SharesAmount,
    pub borrower_shares: SharesAmount,
    pub silo_principal: Notional,
}

/// Borrower principal returned to the borrower, fully or partially
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionClosed {
    pub event_id: Uuid,
    pub silo: SiloId,
    pub borrower: AccountId,
    pub principal: Notional,
    pub shares_burned: SharesAmount,
    pub wrapped_released: WrappedAmount,
    pub debt_repaid: Notional,
    pub notional_returned: Notional,
    pub wrapped_returned: WrappedAmount,
    pub borrower_shares: SharesAmount,
    pub silo_principal: Notional,
}

/// Principal drawn from one borrower's position to a recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetedDraw {
    pub event_id: Uuid,
    pub silo: SiloId,
    pub borrower: AccountId,
    pub recipient: AccountId,
    pub principal: Notional,
    pub shares_burned: SharesAmount,
    pub notional_sent: Notional,
    pub wrapped_sent: WrappedAmount,
    pub debt_repaid: Notional,
    pub excess_to_borrower: Notional,
    pub borrower_shares: SharesAmount,
    pub silo_principal: Notional,
}

/// Principal drawn proportionally from every position in a silo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProRataDraw {
    pub event_id: Uuid,
    pub silo: SiloId,
    pub recipient: AccountId,
    pub principal: Notional,
    pub wrapped_released: WrappedAmount,
    pub notional_sent: Notional,
    pub wrapped_sent: WrappedAmount,
    pub shares_retired: bool,
    pub silo_principal: Notional,
}

/// Facility frozen or unfrozen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeSet {
    pub frozen: bool,
}

/// Owner replaced the facility configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdated {
    pub config: FacilityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipTransferred {
    pub previous_owner: AccountId,
    pub new_owner: AccountId,
}

/// Enum wrapper for all facility events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    CounterProtocolAuthorizationSet(CounterProtocolAuthorizationSet),
    AllowanceApproved(AllowanceApproved),
    PositionOpened(PositionOpened),
    PositionClosed(PositionClosed),
    TargetedDraw(TargetedDraw),
    ProRataDraw(ProRataDraw),
    FreezeSet(FreezeSet),
    ConfigUpdated(ConfigUpdated),
    OwnershipTransferred(OwnershipTransferred),
}

impl ContractEvent {
    /// Silo the event belongs to, for position events.
    pub fn silo(&self) -> Option<SiloId> {
        match self {
            ContractEvent::PositionOpened(e) => Some(e.silo),
            ContractEvent::PositionClosed(e) => Some(e.silo),
            ContractEvent::TargetedDraw(e) => Some(e.silo),
            ContractEvent::ProRataDraw(e) => Some(e.silo),
            _ => None,
        }
    }
}
