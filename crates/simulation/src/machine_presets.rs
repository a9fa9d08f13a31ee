//! Built-in machine definitions.
//!
//! Key specs:
//! - Coal generator: slow heating (0.08), wide optimal band 900–2000, fails at 2500
//! - Electric furnace: 0.1 heating, optimal band 1300–1700, fails at 2000
//!
//! Both are explosive and take enhancers in four slots.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::enhancers::{Enhancer, EnhancerSet};
use crate::thermal_config::ThermalConfig;

/// Number of enhancer slots on every built-in machine.
pub const ENHANCER_SLOTS: u32 = 4;

/// Internal energy buffer of a tier-1 machine.
pub const DEFAULT_ENERGY_CAPACITY: u64 = 50_000;

pub const COAL_GENERATOR_THERMAL: ThermalConfig =
    ThermalConfig::from_parts(0.08, 900, 2000, 2500, true);

pub const ELECTRIC_FURNACE_THERMAL: ThermalConfig =
    ThermalConfig::from_parts(0.1, 1300, 1700, 2000, true);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum MachineKind {
    CoalGenerator,
    ElectricFurnace,
}

/// Everything needed to build a machine of a given kind.
#[derive(Debug, Clone, PartialEq)]
pub struct MachinePreset {
    pub kind: MachineKind,
    pub thermal: ThermalConfig,
    pub accepted_enhancers: &'static [Enhancer],
    pub enhancer_slots: u32,
    pub energy_capacity: u64,
}

impl MachinePreset {
    pub fn coal_generator() -> Self {
        Self {
            kind: MachineKind::CoalGenerator,
            thermal: COAL_GENERATOR_THERMAL,
            accepted_enhancers: Enhancer::DEFAULT,
            enhancer_slots: ENHANCER_SLOTS,
            energy_capacity: DEFAULT_ENERGY_CAPACITY,
        }
    }

    pub fn electric_furnace() -> Self {
        Self {
            kind: MachineKind::ElectricFurnace,
            thermal: ELECTRIC_FURNACE_THERMAL,
            accepted_enhancers: Enhancer::FURNACE,
            enhancer_slots: ENHANCER_SLOTS,
            energy_capacity: DEFAULT_ENERGY_CAPACITY,
        }
    }

    pub fn for_kind(kind: MachineKind) -> Self {
        match kind {
            MachineKind::CoalGenerator => Self::coal_generator(),
            MachineKind::ElectricFurnace => Self::electric_furnace(),
        }
    }

    /// Empty enhancer slots for this machine.
    pub fn enhancer_set(&self) -> EnhancerSet {
        EnhancerSet::new(self.accepted_enhancers, self.enhancer_slots)
    }
}
