//! Machine energy storage.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Anything a regulator can draw energy from.
///
/// A debit either succeeds in full and is deducted immediately, or fails and
/// leaves the store untouched.
pub trait EnergyStore {
    fn try_debit(&mut self, amount: u64) -> bool;
}

/// Internal energy buffer of a single machine.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode)]
pub struct EnergyBuffer {
    pub stored: u64,
    pub capacity: u64,
}

impl EnergyBuffer {
    pub fn new(capacity: u64) -> Self {
        Self {
            stored: 0,
            capacity,
        }
    }

    pub fn with_stored(mut self, stored: u64) -> Self {
        self.stored = stored.min(self.capacity);
        self
    }

    /// Add up to `amount` energy. Returns how much was accepted.
    pub fn insert(&mut self, amount: u64) -> u64 {
        let accepted = amount.min(self.capacity.saturating_sub(self.stored));
        self.stored += accepted;
        accepted
    }

    pub fn is_full(&self) -> bool {
        self.stored >= self.capacity
    }
}

impl EnergyStore for EnergyBuffer {
    fn try_debit(&mut self, amount: u64) -> bool {
        if self.stored < amount {
            return false;
        }
        self.stored -= amount;
        true
    }
}
