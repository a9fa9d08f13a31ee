//! End-to-end regulator scenarios driven by seeded RNGs.
//!
//! These exercise the regulator the way a machine does: one `tick` per
//! simulation step, with real energy buffers, media stacks and enhancer sets.
//!
//! Run: cargo test -p thermal_simulation --test thermal_scenarios

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use thermal_simulation::energy::{EnergyBuffer, EnergyStore};
use thermal_simulation::enhancers::{Enhancer, EnhancerSet};
use thermal_simulation::machine_presets::{MachinePreset, ELECTRIC_FURNACE_THERMAL};
use thermal_simulation::machines::{
    CoolantSlot, HeatDemand, MachineFailureEvent, ThermalMachine, ThermalMachineBundle, ThermalStats,
};
use thermal_simulation::medium::MediumStack;
use thermal_simulation::thermal::{
    ThermalRegulator, ThermalSnapshot, TickContext, AMBIENT_CEILING, AMBIENT_DRIFT_INTERVAL,
    AMBIENT_FLOOR, HEATER_ENERGY_COST, MAX_FAILURE_POWER, MEDIUM_WEAR_INTERVAL,
    MIN_FAILURE_POWER,
};
use thermal_simulation::thermal_config::ThermalConfig;
use thermal_simulation::SimulationPlugin;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Energy store that always pays and records each request.
#[derive(Default)]
struct GrantingStore {
    requests: Vec<u64>,
}

impl EnergyStore for GrantingStore {
    fn try_debit(&mut self, amount: u64) -> bool {
        self.requests.push(amount);
        true
    }
}

/// Collaborators for one simulated machine.
struct Rig {
    regulator: ThermalRegulator,
    medium: Option<MediumStack>,
    enhancers: EnhancerSet,
    energy: EnergyBuffer,
    rng: ChaCha8Rng,
    failures: Vec<f32>,
}

impl Rig {
    fn furnace(seed: u64) -> Self {
        Self {
            regulator: ThermalRegulator::new(ELECTRIC_FURNACE_THERMAL),
            medium: None,
            enhancers: MachinePreset::electric_furnace().enhancer_set(),
            energy: EnergyBuffer::new(50_000),
            rng: ChaCha8Rng::seed_from_u64(seed),
            failures: Vec::new(),
        }
    }

    fn at(mut self, temperature: f64) -> Self {
        self.regulator.restore(&ThermalSnapshot {
            temperature,
            killswitch_active: false,
        });
        self
    }

    fn tick(&mut self, demand_heat: bool) {
        let mut ctx = TickContext {
            medium: self.medium.as_mut(),
            enhancers: &self.enhancers,
            energy: &mut self.energy,
            rng: &mut self.rng,
            failures: &mut self.failures,
        };
        self.regulator.tick(demand_heat, &mut ctx);
    }
}

// ---------------------------------------------------------------------------
// 1. Heating to the limit
// ---------------------------------------------------------------------------

#[test]
fn test_constant_demand_saturates_at_limit_and_fails() {
    let mut rig = Rig::furnace(2024);
    let limit = f64::from(ELECTRIC_FURNACE_THERMAL.limit());

    // Jitter can outweigh the 1.1/tick rise over a few ticks, so the net rise
    // is checked per window.
    const WINDOW: u32 = 200;
    let mut window_start = rig.regulator.temperature();
    let mut ticks = 0;
    while rig.failures.is_empty() {
        rig.tick(true);
        ticks += 1;
        assert!(rig.regulator.temperature() <= limit, "never exceeds limit");
        assert!(
            rig.regulator.temperature() >= AMBIENT_CEILING - 5.0,
            "heated machines stay near or above the idle band"
        );
        if ticks % WINDOW == 0 {
            assert!(
                rig.regulator.temperature() > window_start,
                "no net rise by tick {ticks}"
            );
            window_start = rig.regulator.temperature();
        }
        assert!(ticks < 20_000, "furnace never reached its limit");
    }

    assert_eq!(rig.regulator.temperature(), limit);
    assert_eq!(rig.failures.len(), 1);
    let power = rig.failures[0];
    assert!((MIN_FAILURE_POWER..=MAX_FAILURE_POWER).contains(&power));
}

#[test]
fn test_saturated_furnace_fails_every_tick() {
    let mut rig = Rig::furnace(5).at(2000.0);
    // A warm medium outpaces the worst downward jitter.
    rig.medium = Some(MediumStack::with_heat_factor(4.0, 0));
    for _ in 0..10 {
        rig.tick(true);
    }
    assert_eq!(rig.failures.len(), 10);
}

#[test]
fn test_speed_enhancers_heat_faster() {
    let mut plain = Rig::furnace(77);
    let mut boosted = Rig::furnace(77);
    boosted.enhancers.insert(Enhancer::Speed, 4).unwrap();

    for _ in 0..200 {
        plain.tick(true);
        boosted.tick(true);
    }
    assert!(boosted.regulator.temperature() > plain.regulator.temperature());
}

// ---------------------------------------------------------------------------
// 2. Idle behaviour
// ---------------------------------------------------------------------------

#[test]
fn test_idle_machine_stays_in_ambient_band() {
    let mut rig = Rig::furnace(31);
    for tick in 1..=(AMBIENT_DRIFT_INTERVAL * 40) {
        rig.tick(false);
        if tick % AMBIENT_DRIFT_INTERVAL == 0 {
            let t = rig.regulator.temperature();
            assert!((AMBIENT_FLOOR..=AMBIENT_CEILING).contains(&t), "drifted to {t}");
        }
    }
    assert!(rig.failures.is_empty());
}

#[test]
fn test_hot_machine_cools_back_to_idle_band() {
    let mut rig = Rig::furnace(8).at(60.0);
    rig.medium = Some(MediumStack::with_heat_factor(-4.0, 0));
    for _ in 0..10 {
        rig.tick(false);
    }
    assert!(rig.regulator.temperature() <= AMBIENT_CEILING);
}

// ---------------------------------------------------------------------------
// 3. Media
// ---------------------------------------------------------------------------

#[test]
fn test_active_heater_debits_once_and_forces_heat() {
    let mut regulator = ThermalRegulator::from_snapshot(
        ELECTRIC_FURNACE_THERMAL,
        Some(&ThermalSnapshot {
            temperature: 100.0,
            killswitch_active: false,
        }),
    );
    let mut coil = MediumStack::active_heater(1000);
    let enhancers = EnhancerSet::default();
    let mut store = GrantingStore::default();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut failures = Vec::new();

    let mut ctx = TickContext {
        medium: Some(&mut coil),
        enhancers: &enhancers,
        energy: &mut store,
        rng: &mut rng,
        failures: &mut failures,
    };
    regulator.tick(false, &mut ctx);

    assert_eq!(store.requests, vec![HEATER_ENERGY_COST]);
    // 100 + 1.1 - 5 at worst
    assert!(regulator.temperature() > 96.0);
}

#[test]
fn test_active_heater_holds_near_optimal_floor() {
    let mut rig = Rig::furnace(11);
    rig.energy = EnergyBuffer::new(1_000_000).with_stored(1_000_000);
    // One point of wear per 120 ticks at most, so the coil outlasts the run.
    rig.medium = Some(MediumStack::active_heater(100));

    for _ in 0..5_000 {
        rig.tick(false);
    }
    let t = rig.regulator.temperature();
    assert!(t > 1300.0 && t < 1400.0, "heater settled at {t}");
    assert!(rig.energy.stored < 1_000_000);
    assert!(rig.failures.is_empty());
}

#[test]
fn test_unpowered_heater_leaves_machine_idle() {
    let mut rig = Rig::furnace(12);
    rig.medium = Some(MediumStack::active_heater(0));
    for _ in 0..300 {
        rig.tick(false);
    }
    assert!(rig.regulator.temperature() <= AMBIENT_CEILING);
}

#[test]
fn test_coolant_rate_and_consumption() {
    let mut rig = Rig::furnace(21).at(40.0);
    rig.medium = Some(MediumStack::with_heat_factor(-5.0, 1));

    let cooling = rig.regulator.cooling_speed(rig.medium.as_ref());
    assert!((cooling - 5.0).abs() < f64::EPSILON);

    // Keep the machine hot so the coolant stays in use.
    for _ in 0..(MEDIUM_WEAR_INTERVAL - 1) {
        rig.tick(true);
    }
    assert_eq!(rig.medium.as_ref().map(MediumStack::count), Some(1));

    rig.tick(true);
    assert!(rig.medium.as_ref().is_some_and(MediumStack::is_empty));
}

// ---------------------------------------------------------------------------
// 4. Killswitch
// ---------------------------------------------------------------------------

#[test]
fn test_killswitch_latch_is_monotonic_until_idle_drift() {
    let mut rig = Rig::furnace(99).at(1990.0);
    rig.enhancers.insert(Enhancer::Killswitch, 1).unwrap();
    rig.medium = Some(MediumStack::with_heat_factor(-50.0, 0));

    rig.tick(false);
    assert!(rig.regulator.is_killswitch_active());

    let mut released = false;
    for _ in 0..500 {
        let was_idle = rig.regulator.temperature() <= AMBIENT_CEILING;
        let drift_tick = (rig.regulator.tick_count() + 1) % AMBIENT_DRIFT_INTERVAL == 0;
        rig.tick(false);
        if !rig.regulator.is_killswitch_active() {
            assert!(was_idle && drift_tick);
            released = true;
            break;
        }
    }
    assert!(released);
}

#[test]
fn test_killswitch_never_trips_without_enhancer() {
    let mut rig = Rig::furnace(4).at(1990.0);
    for _ in 0..20 {
        rig.tick(true);
    }
    assert!(!rig.regulator.is_killswitch_active());
}

// ---------------------------------------------------------------------------
// 5. Queries and persistence
// ---------------------------------------------------------------------------

#[test]
fn test_full_efficiency_query_is_idempotent() {
    let mut rig = Rig::furnace(6).at(1500.0);
    for _ in 0..50 {
        let demand = rig.rng.gen_bool(0.5);
        rig.tick(demand);
        let first = rig.regulator.is_full_efficiency();
        assert_eq!(first, rig.regulator.is_full_efficiency());
        assert_eq!(first, rig.regulator.reading().full_efficiency);
    }
}

#[test]
fn test_snapshot_restore_after_running() {
    let mut rig = Rig::furnace(55);
    rig.enhancers.insert(Enhancer::Killswitch, 1).unwrap();
    for _ in 0..2_500 {
        rig.tick(true);
    }

    let snapshot = rig.regulator.snapshot();
    let bytes = snapshot.to_bytes();
    let json = serde_json::to_string(&snapshot).unwrap();

    let decoded = ThermalSnapshot::from_bytes(&bytes);
    let from_bytes = ThermalRegulator::from_snapshot(ELECTRIC_FURNACE_THERMAL, Some(&decoded));
    let from_json: ThermalSnapshot = serde_json::from_str(&json).unwrap();

    assert_eq!(from_bytes.temperature(), rig.regulator.temperature());
    assert_eq!(
        from_bytes.is_killswitch_active(),
        rig.regulator.is_killswitch_active()
    );
    assert_eq!(from_bytes.tick_count(), 0);
    assert!((from_json.temperature - snapshot.temperature).abs() < 1e-9);
    assert_eq!(from_json.killswitch_active, snapshot.killswitch_active);
}

#[test]
fn test_same_seed_same_trajectory() {
    let mut a = Rig::furnace(1234);
    let mut b = Rig::furnace(1234);
    for step in 0..1_000 {
        let demand = step % 7 != 0;
        a.tick(demand);
        b.tick(demand);
        assert_eq!(a.regulator.temperature(), b.regulator.temperature());
    }
}

#[test]
fn test_config_invariant_holds_for_random_inputs() {
    let mut rng = ChaCha8Rng::seed_from_u64(400);
    for _ in 0..1_000 {
        let low = rng.gen_range(-500..3000);
        let high = rng.gen_range(-500..3000);
        let limit = rng.gen_range(-500..3000);
        let rate = rng.gen_range(-1.0..2.0);
        let result = ThermalConfig::new(rate, low..=high, limit, true);
        let valid = rate >= 0.0 && low <= high && high < limit;
        assert_eq!(result.is_ok(), valid, "({rate}, {low}..={high}, {limit})");
        if let Ok(config) = result {
            assert!(config.optimal_low() <= config.optimal_high());
            assert!(config.optimal_high() < config.limit());
        }
    }
}

// ---------------------------------------------------------------------------
// 6. Full plugin in the FixedUpdate schedule
// ---------------------------------------------------------------------------

#[test]
fn test_simulation_plugin_runs_fixed_update_pipeline() {
    let mut app = App::new();
    app.add_plugins(SimulationPlugin);

    let furnace = MachinePreset::electric_furnace();
    let mut hot = ThermalMachineBundle::from_preset(1, &furnace);
    hot.machine.regulator.restore(&ThermalSnapshot {
        temperature: 2000.0,
        killswitch_active: false,
    });
    hot.demand = HeatDemand(true);
    hot.coolant = CoolantSlot(Some(MediumStack::with_heat_factor(4.0, 0)));
    let doomed = app.world_mut().spawn(hot).id();

    let mut heated = ThermalMachineBundle::from_preset(2, &furnace);
    heated.demand = HeatDemand(true);
    let survivor = app.world_mut().spawn(heated).id();

    app.world_mut().run_schedule(FixedUpdate);

    assert!(app.world().get::<ThermalMachine>(doomed).is_none());
    let machine = app
        .world()
        .get::<ThermalMachine>(survivor)
        .expect("survivor still present");
    assert!(machine.regulator.temperature() >= AMBIENT_CEILING - 5.0);
    assert_eq!(machine.regulator.tick_count(), 1);

    let stats = app.world().resource::<ThermalStats>();
    assert_eq!(stats.machine_count, 2, "stats run before destruction");
    assert_eq!(
        app.world().resource::<Events<MachineFailureEvent>>().len(),
        1
    );
}
