//! Thermal machines in the ECS.
//!
//! Each machine entity carries its own [`ThermalRegulator`] alongside the
//! collaborators the regulator borrows every tick: heat demand, the coolant
//! slot, installed enhancers, and the internal energy buffer. The
//! `tick_machine_thermals` system wires them together once per
//! `FixedUpdate`, and turns regulator failures into [`MachineFailureEvent`]s
//! carrying the entity that failed.

use std::collections::HashSet;

use bevy::prelude::*;

use crate::energy::EnergyBuffer;
use crate::enhancers::EnhancerSet;
use crate::machine_presets::{MachineKind, MachinePreset};
use crate::medium::MediumStack;
use crate::sim_rng::SimRng;
use crate::thermal::{ThermalRegulator, TickContext};
use crate::SimulationSet;

// =============================================================================
// Components
// =============================================================================

/// Stable machine identifier, used to match saved state back to entities.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MachineId(pub u32);

#[derive(Component, Debug, Clone)]
pub struct ThermalMachine {
    pub kind: MachineKind,
    pub regulator: ThermalRegulator,
}

/// Whether the machine wants heat this step (e.g. it is processing).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeatDemand(pub bool);

/// The machine's heating/cooling medium slot.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct CoolantSlot(pub Option<MediumStack>);

#[derive(Component, Debug, Clone, Default)]
pub struct MachineEnhancers(pub EnhancerSet);

#[derive(Bundle)]
pub struct ThermalMachineBundle {
    pub id: MachineId,
    pub machine: ThermalMachine,
    pub demand: HeatDemand,
    pub coolant: CoolantSlot,
    pub enhancers: MachineEnhancers,
    pub energy: EnergyBuffer,
}

impl ThermalMachineBundle {
    pub fn from_preset(id: u32, preset: &MachinePreset) -> Self {
        Self {
            id: MachineId(id),
            machine: ThermalMachine {
                kind: preset.kind,
                regulator: ThermalRegulator::new(preset.thermal),
            },
            demand: HeatDemand::default(),
            coolant: CoolantSlot::default(),
            enhancers: MachineEnhancers(preset.enhancer_set()),
            energy: EnergyBuffer::new(preset.energy_capacity),
        }
    }
}

// =============================================================================
// Events & resources
// =============================================================================

/// A machine reached its failure limit this step. Fires every step the
/// machine stays at or above the limit.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct MachineFailureEvent {
    pub entity: Entity,
    pub machine_id: MachineId,
    pub power: f32,
}

/// Aggregate thermal status across all machines.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct ThermalStats {
    pub machine_count: u32,
    /// Machines above their optimal band.
    pub overheating_count: u32,
    pub killswitch_count: u32,
    pub full_efficiency_count: u32,
    pub hottest_temperature: Option<f64>,
}

/// When true, machines that fail are despawned after the failure is reported.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyFailedMachines(pub bool);

impl Default for DestroyFailedMachines {
    fn default() -> Self {
        Self(true)
    }
}

// =============================================================================
// Systems
// =============================================================================

/// Ticks every machine's regulator once.
///
/// Empty coolant stacks are cleared from their slot after the tick so the
/// next step sees no medium.
#[allow(clippy::type_complexity)]
pub fn tick_machine_thermals(
    mut rng: ResMut<SimRng>,
    mut machines: Query<(
        Entity,
        &MachineId,
        &mut ThermalMachine,
        &HeatDemand,
        &mut CoolantSlot,
        &MachineEnhancers,
        &mut EnergyBuffer,
    )>,
    mut failures: EventWriter<MachineFailureEvent>,
) {
    let mut emitted: Vec<f32> = Vec::new();

    for (entity, id, mut machine, demand, mut coolant, enhancers, mut energy) in &mut machines {
        emitted.clear();
        {
            let mut ctx = TickContext {
                medium: coolant.0.as_mut(),
                enhancers: &enhancers.0,
                energy: &mut *energy,
                rng: rng.source(),
                failures: &mut emitted,
            };
            machine.regulator.tick(demand.0, &mut ctx);
        }

        if coolant.0.as_ref().is_some_and(MediumStack::is_empty) {
            debug!("Machine {}: coolant stack used up", id.0);
            coolant.0 = None;
        }

        for &power in &emitted {
            failures.send(MachineFailureEvent {
                entity,
                machine_id: *id,
                power,
            });
        }
    }
}

/// Destroys machines that reported a failure this step.
pub fn destroy_failed_machines(
    mut commands: Commands,
    policy: Res<DestroyFailedMachines>,
    mut failures: EventReader<MachineFailureEvent>,
) {
    if !policy.0 {
        failures.clear();
        return;
    }

    let mut destroyed = HashSet::new();
    for failure in failures.read() {
        if !destroyed.insert(failure.entity) {
            continue;
        }
        warn!(
            "Machine {} destroyed by thermal failure (power {:.2})",
            failure.machine_id.0, failure.power
        );
        if let Some(mut entity) = commands.get_entity(failure.entity) {
            entity.despawn();
        }
    }
}

/// Rebuilds [`ThermalStats`] from every machine.
pub fn aggregate_thermal_stats(
    machines: Query<&ThermalMachine>,
    mut stats: ResMut<ThermalStats>,
) {
    let mut next = ThermalStats::default();

    for machine in &machines {
        let regulator = &machine.regulator;
        let temperature = regulator.temperature();
        next.machine_count += 1;
        if temperature > f64::from(regulator.config().optimal_high()) {
            next.overheating_count += 1;
        }
        if regulator.is_killswitch_active() {
            next.killswitch_count += 1;
        }
        if regulator.is_full_efficiency() {
            next.full_efficiency_count += 1;
        }
        next.hottest_temperature = Some(
            next.hottest_temperature
                .map_or(temperature, |hottest| hottest.max(temperature)),
        );
    }

    *stats = next;
}

// =============================================================================
// Plugin
// =============================================================================

pub struct ThermalMachinesPlugin;

impl Plugin for ThermalMachinesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ThermalStats>()
            .init_resource::<DestroyFailedMachines>()
            .add_event::<MachineFailureEvent>()
            .add_systems(
                FixedUpdate,
                tick_machine_thermals.in_set(SimulationSet::Simulation),
            )
            .add_systems(
                FixedUpdate,
                (aggregate_thermal_stats, destroy_failed_machines)
                    .chain()
                    .in_set(SimulationSet::PostSim),
            );
    }
}

// =============================================================================
// Unit tests
// =============================================================================
