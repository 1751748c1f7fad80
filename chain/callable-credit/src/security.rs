//! Shared security primitives for the facility
//!
//! Reentrancy guard, owner/counter-protocol access control and the freeze switch.

use std::collections::HashSet;
use types::ids::AccountId;

/// Reentrancy guard preventing nested calls into protected functions.
///
/// A lifecycle call acquires the guard before executing state-changing logic
/// and releases it on completion. Any nested call attempt fails.
#[derive(Debug, Clone)]
pub struct ReentrancyGuard {
    locked: bool,
}

impl ReentrancyGuard {
    /// Create a new unlocked guard.
    pub fn new() -> Self {
        Self { locked: false }
    }

    /// Acquire the guard. Returns `false` if already locked (reentrancy attempt).
    pub fn acquire(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.locked = true;
        true
    }

    /// Release the guard.
    pub fn release(&mut self) {
        self.locked = false;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Default for ReentrancyGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner and counter-protocol access control.
///
/// The owner manages the set of counter-protocols allowed to call lifecycle
/// operations. The owner is not implicitly a counter-protocol.
#[derive(Debug, Clone)]
pub struct AccessControl {
    owner: AccountId,
    counter_protocols: HashSet<AccountId>,
}

impl AccessControl {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            counter_protocols: HashSet::new(),
        }
    }

    pub fn is_owner(&self, caller: &AccountId) -> bool {
        self.owner == *caller
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    /// Authorize or revoke a counter-protocol. Only the owner can do this.
    pub fn set_counter_protocol(
        &mut self,
        caller: &AccountId,
        counter_protocol: AccountId,
        authorized: bool,
    ) -> bool {
        if !self.is_owner(caller) {
            return false;
        }
        if authorized {
            self.counter_protocols.insert(counter_protocol);
        } else {
            self.counter_protocols.remove(&counter_protocol);
        }
        true
    }

    pub fn is_counter_protocol(&self, caller: &AccountId) -> bool {
        self.counter_protocols.contains(caller)
    }

    /// Transfer ownership to a new account.
    pub fn transfer_ownership(&mut self, caller: &AccountId, new_owner: AccountId) -> bool {
        if !self.is_owner(caller) {
            return false;
        }
        self.owner = new_owner;
        true
    }
}

/// Owner-controlled freeze switch.
///
/// While frozen, every lifecycle operation is rejected.
#[derive(Debug, Clone)]
pub struct FreezeGuard {
    frozen: bool,
}

impl FreezeGuard {
    pub fn new() -> Self {
        Self { frozen: false }
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl Default for FreezeGuard {
    fn default() -> Self {
        Self::new()
    }
}
