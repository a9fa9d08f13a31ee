//! Per-machine thermal regulation.
//!
//! A [`ThermalRegulator`] is ticked once per simulation step by its owning
//! machine. Each tick it:
//!
//! 1. computes the heating and cooling rates from config, enhancers and medium,
//! 2. decides whether the medium forces heating and whether it wears,
//! 3. heats, cools, or drifts toward ambient,
//! 4. latches the killswitch near the limit,
//! 5. emits a failure for explosive machines sitting at or above the limit.
//!
//! Everything the regulator touches outside itself is borrowed for the
//! duration of one tick through [`TickContext`]; nothing is retained.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::energy::EnergyStore;
use crate::enhancers::{Enhancer, EnhancerSet};
use crate::medium::{MediumKind, MediumStack};
use crate::thermal_config::ThermalConfig;

// =============================================================================
// Constants
// =============================================================================

/// Temperature of a freshly built machine.
pub const INITIAL_TEMPERATURE: f64 = 25.0;

/// Upper edge of the idle band. Heated machines never sit below it.
pub const AMBIENT_CEILING: f64 = 35.0;

/// Lower edge of the idle band.
pub const AMBIENT_FLOOR: f64 = 20.0;

/// Energy drawn by an active heater each tick it fires.
pub const HEATER_ENERGY_COST: u64 = 16;

/// Media wear one point every this many ticks.
pub const MEDIUM_WEAR_INTERVAL: u64 = 120;

/// Idle machines drift (and release the killswitch) every this many ticks.
pub const AMBIENT_DRIFT_INTERVAL: u64 = 15;

/// Integer noise added to heated temperatures and heater targets, +/-.
pub const HEAT_JITTER: i32 = 5;

/// Multiplier applied to a positive heat factor.
pub const HEATER_FACTOR_SCALE: f64 = 1.5;

/// Passive cooling is `base_rate / PASSIVE_COOLING_DIVISOR`.
pub const PASSIVE_COOLING_DIVISOR: f64 = 1.5;

pub const MIN_FAILURE_POWER: f32 = 3.0;
pub const MAX_FAILURE_POWER: f32 = 25.0;

/// Temperature at which failure power reaches its maximum.
pub const FAILURE_POWER_CEILING: f64 = 5000.0;

// =============================================================================
// Collaborator capabilities
// =============================================================================

/// Uniform randomness, seeded by the owner.
pub trait RandomSource {
    /// Uniform integer in `lo..=hi`.
    fn random_int(&mut self, lo: i32, hi: i32) -> i32;
    /// Uniform float in `[0, 1)`.
    fn random_float(&mut self) -> f64;
}

impl<R: RngCore + ?Sized> RandomSource for R {
    fn random_int(&mut self, lo: i32, hi: i32) -> i32 {
        self.gen_range(lo..=hi)
    }

    fn random_float(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Receives destructive failure events. The regulator does not know where
/// its machine is; the sink does.
pub trait FailureSink {
    fn emit_failure(&mut self, power: f32);
}

impl FailureSink for Vec<f32> {
    fn emit_failure(&mut self, power: f32) {
        self.push(power);
    }
}

/// Everything a regulator may read or mutate during one tick.
pub struct TickContext<'a> {
    pub medium: Option<&'a mut MediumStack>,
    pub enhancers: &'a EnhancerSet,
    pub energy: &'a mut dyn EnergyStore,
    pub rng: &'a mut dyn RandomSource,
    pub failures: &'a mut dyn FailureSink,
}

// =============================================================================
// Snapshot / telemetry
// =============================================================================

/// Persisted regulator state. Missing fields load as zero / false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
#[serde(default)]
pub struct ThermalSnapshot {
    pub temperature: f64,
    pub killswitch_active: bool,
}

impl ThermalSnapshot {
    pub const SAVE_KEY: &'static str = "thermal_snapshot";

    pub fn to_bytes(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    /// Decode a snapshot, falling back to the zero state on corrupt input.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}

/// Integer view of a regulator for screens and status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThermalReading {
    pub temperature: i32,
    pub limit: i32,
    pub full_efficiency: bool,
    pub killswitch_active: bool,
}

/// What the medium asked for this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediumActivation {
    pub force_heat: bool,
    pub consume_medium: bool,
}

// =============================================================================
// ThermalRegulator
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ThermalRegulator {
    config: ThermalConfig,
    temperature: f64,
    killswitch_active: bool,
    tick_count: u64,
}

impl ThermalRegulator {
    pub fn new(config: ThermalConfig) -> Self {
        Self {
            config,
            temperature: INITIAL_TEMPERATURE,
            killswitch_active: false,
            tick_count: 0,
        }
    }

    /// Rebuild a regulator from saved state. `None` (no saved data at all)
    /// restores the zero state.
    pub fn from_snapshot(config: ThermalConfig, snapshot: Option<&ThermalSnapshot>) -> Self {
        let mut regulator = Self::new(config);
        regulator.restore(&snapshot.copied().unwrap_or_default());
        regulator
    }

    pub fn config(&self) -> &ThermalConfig {
        &self.config
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn is_killswitch_active(&self) -> bool {
        self.killswitch_active
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Whether the floored temperature sits inside the optimal band.
    pub fn is_full_efficiency(&self) -> bool {
        self.config
            .optimal_range()
            .contains(&(self.temperature.floor() as i32))
    }

    pub fn reading(&self) -> ThermalReading {
        ThermalReading {
            temperature: self.temperature.floor() as i32,
            limit: self.config.limit(),
            full_efficiency: self.is_full_efficiency(),
            killswitch_active: self.killswitch_active,
        }
    }

    pub fn snapshot(&self) -> ThermalSnapshot {
        ThermalSnapshot {
            temperature: self.temperature,
            killswitch_active: self.killswitch_active,
        }
    }

    /// Load persisted state. The periodic phase restarts from zero.
    pub fn restore(&mut self, snapshot: &ThermalSnapshot) {
        self.temperature = snapshot.temperature;
        self.killswitch_active = snapshot.killswitch_active;
        self.tick_count = 0;
    }

    /// Carry the thermal state of a replaced machine over to its upgrade.
    pub fn inherit_from(&mut self, previous: &ThermalRegulator) {
        self.restore(&previous.snapshot());
    }

    // -------------------------------------------------------------------------
    // Rate model
    // -------------------------------------------------------------------------

    /// Degrees gained per heated tick, before jitter.
    pub fn heating_speed(&self, enhancers: &EnhancerSet, medium: Option<&MediumStack>) -> f64 {
        let speed = f64::from(enhancers.count(Enhancer::Speed));
        let multiplier = 1.0 + speed * speed;
        let medium_boost = medium
            .and_then(MediumStack::heat_factor)
            .map_or(0.0, |factor| factor.max(0.0) * HEATER_FACTOR_SCALE);
        self.config.base_rate() * multiplier + medium_boost + 1.0
    }

    /// Degrees lost per tick while above the idle band. A coolant can only
    /// raise this above the passive rate.
    pub fn cooling_speed(&self, medium: Option<&MediumStack>) -> f64 {
        let passive = self.config.base_rate() / PASSIVE_COOLING_DIVISOR;
        match medium.and_then(MediumStack::heat_factor) {
            Some(factor) if factor < 0.0 => (-factor).max(passive),
            _ => passive,
        }
    }

    // -------------------------------------------------------------------------
    // Medium policy
    // -------------------------------------------------------------------------

    /// Decide whether the medium forces heating and whether it is in use.
    ///
    /// An active heater rolls a target just above the bottom of the optimal
    /// band and fires (paying [`HEATER_ENERGY_COST`]) while the machine is
    /// below it. A tripped killswitch keeps the heater off. A coolant is in
    /// use whenever the machine is above the idle band.
    pub fn evaluate_medium(
        &self,
        medium: Option<&MediumStack>,
        energy: &mut dyn EnergyStore,
        rng: &mut dyn RandomSource,
    ) -> MediumActivation {
        let Some(medium) = medium else {
            return MediumActivation::default();
        };
        match medium.kind() {
            MediumKind::ActiveHeater => {
                if self.killswitch_active {
                    return MediumActivation::default();
                }
                let target = self.heater_target(rng);
                let fires =
                    self.temperature.floor() <= target && energy.try_debit(HEATER_ENERGY_COST);
                MediumActivation {
                    force_heat: fires,
                    consume_medium: fires,
                }
            }
            MediumKind::SignedFactor(factor) => MediumActivation {
                force_heat: false,
                consume_medium: factor < 0.0 && self.temperature > AMBIENT_CEILING,
            },
        }
    }

    fn heater_target(&self, rng: &mut dyn RandomSource) -> f64 {
        let low = f64::from(self.config.optimal_low());
        let high = f64::from(self.config.optimal_high());
        low + 0.1 * (high - low) + f64::from(rng.random_int(-HEAT_JITTER, HEAT_JITTER))
    }

    fn wear_medium(&self, medium: &mut MediumStack) {
        if self.tick_count % MEDIUM_WEAR_INTERVAL != 0 {
            return;
        }
        medium.damage_by(1);
        if medium.is_exhausted() {
            medium.consume_unit();
        }
    }

    // -------------------------------------------------------------------------
    // Failure
    // -------------------------------------------------------------------------

    /// Explosion strength for the current temperature, scaled linearly from
    /// the optimal ceiling up to [`FAILURE_POWER_CEILING`].
    pub fn failure_power(&self) -> f32 {
        let high = f64::from(self.config.optimal_high());
        let span = FAILURE_POWER_CEILING - high;
        if span <= 0.0 {
            return MAX_FAILURE_POWER;
        }
        let range = f64::from(MAX_FAILURE_POWER - MIN_FAILURE_POWER);
        let power = f64::from(MIN_FAILURE_POWER) + (self.temperature - high) * range / span;
        (power as f32).clamp(MIN_FAILURE_POWER, MAX_FAILURE_POWER)
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    /// Advance one simulation step.
    pub fn tick(&mut self, demand_heat: bool, ctx: &mut TickContext<'_>) {
        self.tick_count = self.tick_count.wrapping_add(1);

        let mut medium = ctx.medium.as_deref_mut().filter(|m| !m.is_empty());

        let heating_speed = self.heating_speed(ctx.enhancers, medium.as_deref());
        let cooling_speed = self.cooling_speed(medium.as_deref());

        let activation = self.evaluate_medium(medium.as_deref(), &mut *ctx.energy, &mut *ctx.rng);
        if activation.consume_medium {
            if let Some(medium) = medium.as_deref_mut() {
                self.wear_medium(medium);
            }
        }

        if demand_heat || activation.force_heat {
            let jitter = f64::from(ctx.rng.random_int(-HEAT_JITTER, HEAT_JITTER));
            let heated = (self.temperature + heating_speed).max(AMBIENT_CEILING) + jitter;
            self.temperature = heated.min(f64::from(self.config.limit()));
        } else if self.temperature > AMBIENT_CEILING {
            self.temperature -= cooling_speed;
        } else if self.tick_count % AMBIENT_DRIFT_INTERVAL == 0 {
            self.killswitch_active = false;
            let drift = (2.0 * ctx.rng.random_float() - 1.0) / 2.0;
            self.temperature = (self.temperature + drift).clamp(AMBIENT_FLOOR, AMBIENT_CEILING);
        }

        if !self.killswitch_active
            && self.config.explodes()
            && ctx.enhancers.has(Enhancer::Killswitch)
            && self.temperature >= self.config.killswitch_threshold()
        {
            self.killswitch_active = true;
            info!(
                "Thermal killswitch engaged at {:.1} (limit {})",
                self.temperature,
                self.config.limit()
            );
        }

        if self.config.explodes() && self.temperature >= f64::from(self.config.limit()) {
            let power = self.failure_power();
            warn!(
                "Machine overheated at {:.1} (limit {}), failure power {:.2}",
                self.temperature,
                self.config.limit(),
                power
            );
            ctx.failures.emit_failure(power);
        }
    }
}

// =============================================================================
// Unit tests
// =============================================================================
