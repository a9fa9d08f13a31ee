//! Enhancers: stackable machine upgrades.
//!
//! The thermal regulator reads two of them. `Speed` multiplies the heating
//! rate quadratically and `Killswitch` arms the overheat interlock. The other
//! kinds are carried so a machine's enhancer slots model the full item set.

use std::collections::BTreeMap;
use std::fmt;

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub enum Enhancer {
    Speed,
    Buffer,
    BlastFurnace,
    Smoker,
    Damage,
    Killswitch,
}

impl Enhancer {
    pub const ALL: &'static [Enhancer] = &[
        Enhancer::Speed,
        Enhancer::Buffer,
        Enhancer::BlastFurnace,
        Enhancer::Smoker,
        Enhancer::Damage,
        Enhancer::Killswitch,
    ];

    /// Enhancers accepted by ordinary machines.
    pub const DEFAULT: &'static [Enhancer] =
        &[Enhancer::Speed, Enhancer::Buffer, Enhancer::Killswitch];

    /// Enhancers accepted by furnaces.
    pub const FURNACE: &'static [Enhancer] = &[
        Enhancer::Speed,
        Enhancer::Buffer,
        Enhancer::Killswitch,
        Enhancer::BlastFurnace,
        Enhancer::Smoker,
    ];
}

// =============================================================================
// EnhancerError
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnhancerError {
    /// The machine has no slot for this enhancer kind.
    NotAccepted(Enhancer),
    /// All enhancer slots are occupied.
    SlotFull { capacity: u32 },
}

impl fmt::Display for EnhancerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnhancerError::NotAccepted(kind) => {
                write!(f, "Enhancer {kind:?} is not accepted by this machine")
            }
            EnhancerError::SlotFull { capacity } => {
                write!(f, "All {capacity} enhancer slots are occupied")
            }
        }
    }
}

impl std::error::Error for EnhancerError {}

// =============================================================================
// EnhancerSet
// =============================================================================

/// Multiset of installed enhancers, bounded by the machine's slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancerSet {
    counts: BTreeMap<Enhancer, u32>,
    accepted: &'static [Enhancer],
    capacity: u32,
}

impl Default for EnhancerSet {
    fn default() -> Self {
        Self::unrestricted()
    }
}

impl EnhancerSet {
    /// An empty set accepting `accepted` kinds, at most `capacity` in total.
    pub fn new(accepted: &'static [Enhancer], capacity: u32) -> Self {
        Self {
            counts: BTreeMap::new(),
            accepted,
            capacity,
        }
    }

    /// An empty set that accepts every kind in any amount.
    pub fn unrestricted() -> Self {
        Self::new(Enhancer::ALL, u32::MAX)
    }

    /// Install `amount` enhancers of `kind`. Returns the new count for `kind`.
    pub fn insert(&mut self, kind: Enhancer, amount: u32) -> Result<u32, EnhancerError> {
        if !self.accepts(kind) {
            return Err(EnhancerError::NotAccepted(kind));
        }
        let slot_full = EnhancerError::SlotFull {
            capacity: self.capacity,
        };
        match self.total().checked_add(amount) {
            Some(total) if total <= self.capacity => {}
            _ => return Err(slot_full),
        }
        let count = self.counts.entry(kind).or_insert(0);
        *count = count.checked_add(amount).ok_or(slot_full)?;
        Ok(*count)
    }

    /// Remove up to `amount` enhancers of `kind`. Returns how many were removed.
    pub fn remove(&mut self, kind: Enhancer, amount: u32) -> u32 {
        let Some(count) = self.counts.get_mut(&kind) else {
            return 0;
        };
        let removed = amount.min(*count);
        *count -= removed;
        if *count == 0 {
            self.counts.remove(&kind);
        }
        removed
    }

    pub fn count(&self, kind: Enhancer) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn has(&self, kind: Enhancer) -> bool {
        self.count(kind) > 0
    }

    pub fn accepts(&self, kind: Enhancer) -> bool {
        self.accepted.contains(&kind)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Installed enhancers of all kinds. Saturates at `u32::MAX`.
    pub fn total(&self) -> u32 {
        self.counts
            .values()
            .fold(0u32, |total, &count| total.saturating_add(count))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Enhancer, u32)> + '_ {
        self.counts.iter().map(|(&kind, &count)| (kind, count))
    }
}
