//! Deterministic ordering of the thermal simulation via `SystemSet` phases.
//!
//! ```text
//! PreSim  →  Simulation  →  PostSim
//! ```
//!
//! * **PreSim** – Anything that sets a machine's heat demand or medium for
//!   the coming step.
//! * **Simulation** – Regulator ticks. Each machine's regulator runs exactly
//!   once per `FixedUpdate`.
//! * **PostSim** – Failure handling and aggregate stats. These read what the
//!   regulators produced this step.

use bevy::prelude::*;

/// Ordered phases for systems running in the `FixedUpdate` schedule.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    PreSim,
    Simulation,
    PostSim,
}

pub struct SimulationSetsPlugin;

impl Plugin for SimulationSetsPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::PreSim,
                SimulationSet::Simulation,
                SimulationSet::PostSim,
            )
                .chain(),
        );
    }
}
