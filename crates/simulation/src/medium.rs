//! Heating/cooling media: the consumable that sits in a machine's coolant slot.
//!
//! A medium is either an active heater (draws energy to force heating) or an
//! item with a signed heat factor (positive warms, negative cools). Both kinds
//! share the same durability model: damage accumulates one point at a time
//! and an exhausted item is consumed from the stack.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// What a medium does to its machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum MediumKind {
    /// Electrically powered heating coil.
    ActiveHeater,
    /// Passive item with a signed heat factor.
    SignedFactor(f64),
}

impl MediumKind {
    /// Heat factor of a passive medium. Active heaters have none.
    pub fn heat_factor(self) -> Option<f64> {
        match self {
            MediumKind::ActiveHeater => None,
            MediumKind::SignedFactor(factor) => Some(factor),
        }
    }

    pub fn is_coolant(self) -> bool {
        self.heat_factor().is_some_and(|f| f < 0.0)
    }
}

/// A stack of identical media with durability on the top item.
///
/// `max_damage == 0` marks a medium that takes no wear. Its top item is spent
/// on the first wear check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct MediumStack {
    kind: MediumKind,
    count: u32,
    damage: u32,
    max_damage: u32,
}

impl MediumStack {
    pub fn new(kind: MediumKind, count: u32, max_damage: u32) -> Self {
        Self {
            kind,
            count,
            damage: 0,
            max_damage,
        }
    }

    /// A single heating coil.
    pub fn active_heater(max_damage: u32) -> Self {
        Self::new(MediumKind::ActiveHeater, 1, max_damage)
    }

    /// A single passive heater or cooler.
    pub fn with_heat_factor(heat_factor: f64, max_damage: u32) -> Self {
        Self::new(MediumKind::SignedFactor(heat_factor), 1, max_damage)
    }

    /// Replace the stack size.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Replace the accumulated damage on the top item.
    pub fn with_damage(mut self, damage: u32) -> Self {
        self.damage = damage;
        self
    }

    pub fn kind(&self) -> MediumKind {
        self.kind
    }

    pub fn heat_factor(&self) -> Option<f64> {
        self.kind.heat_factor()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn damage(&self) -> u32 {
        self.damage
    }

    pub fn max_damage(&self) -> u32 {
        self.max_damage
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_damageable(&self) -> bool {
        self.max_damage > 0
    }

    /// Whether the top item has used up its durability.
    pub fn is_exhausted(&self) -> bool {
        self.damage >= self.max_damage
    }

    /// Add wear to the top item. No-op for non-damageable media.
    pub fn damage_by(&mut self, amount: u32) {
        if self.is_damageable() {
            self.damage = self.damage.saturating_add(amount);
        }
    }

    /// Destroy the top item. The next item in the stack starts undamaged.
    pub fn consume_unit(&mut self) {
        self.count = self.count.saturating_sub(1);
        self.damage = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heat_factor_by_kind() {
        assert_eq!(MediumKind::ActiveHeater.heat_factor(), None);
        assert_eq!(MediumKind::SignedFactor(-2.5).heat_factor(), Some(-2.5));
        assert!(MediumKind::SignedFactor(-2.5).is_coolant());
        assert!(!MediumKind::SignedFactor(3.0).is_coolant());
        assert!(!MediumKind::ActiveHeater.is_coolant());
    }

    #[test]
    fn test_non_damageable_takes_no_wear_but_is_spent() {
        let mut stack = MediumStack::with_heat_factor(-1.0, 0);
        stack.damage_by(10);
        assert_eq!(stack.damage(), 0);
        assert!(stack.is_exhausted());
    }

    #[test]
    fn test_damage_until_exhausted() {
        let mut stack = MediumStack::active_heater(2);
        stack.damage_by(1);
        assert!(!stack.is_exhausted());
        stack.damage_by(1);
        assert!(stack.is_exhausted());
    }

    #[test]
    fn test_consume_unit_resets_damage() {
        let mut stack = MediumStack::with_heat_factor(-5.0, 3)
            .with_count(2)
            .with_damage(3);
        stack.consume_unit();
        assert_eq!(stack.count(), 1);
        assert_eq!(stack.damage(), 0);
        stack.consume_unit();
        assert!(stack.is_empty());
        stack.consume_unit();
        assert_eq!(stack.count(), 0, "count saturates at zero");
    }
}
