use std::path::PathBuf;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thermal_simulation::SaveableRegistry;

use crate::atomic_write::atomic_write;
use crate::machine_save::{apply_save_data, collect_save_data, decode_save, encode_save, ApplyReport};
use crate::save_error::SaveError;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Where saves go. With no path, saves live only in [`SaveSlot`].
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveSettings {
    pub path: Option<PathBuf>,
}

/// Bytes of the most recent save, kept in memory.
#[derive(Resource, Debug, Clone, Default)]
pub struct SaveSlot(pub Option<Vec<u8>>);

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Event, Debug, Clone, Copy, Default)]
pub struct SaveMachinesEvent;

#[derive(Event, Debug, Clone, Copy, Default)]
pub struct LoadMachinesEvent;

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

pub struct MachineSavePlugin;

impl Plugin for MachineSavePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<SaveMachinesEvent>()
            .add_event::<LoadMachinesEvent>()
            .init_resource::<SaveSettings>()
            .init_resource::<SaveSlot>()
            .init_resource::<SaveableRegistry>();

        // Save before load so a save+load in one frame reloads what was just written.
        app.add_systems(Update, (exclusive_save, exclusive_load).chain());
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Collect, encode and store every machine. Returns the record count.
pub fn save_machines(world: &mut World) -> Result<usize, SaveError> {
    let data = collect_save_data(world);
    let bytes = encode_save(&data);

    if let Some(path) = world.get_resource::<SaveSettings>().and_then(|s| s.path.clone()) {
        atomic_write(&path, &bytes)?;
        info!(
            "Saved {} machines ({} bytes) to {}",
            data.machines.len(),
            bytes.len(),
            path.display()
        );
    }
    world.get_resource_or_insert_with(SaveSlot::default).0 = Some(bytes);

    Ok(data.machines.len())
}

/// Read the current save (file if configured, else the in-memory slot) and
/// restore it onto live machines.
pub fn load_machines(world: &mut World) -> Result<ApplyReport, SaveError> {
    let path = world.get_resource::<SaveSettings>().and_then(|s| s.path.clone());
    let bytes = match path {
        Some(path) => std::fs::read(path)?,
        None => world
            .get_resource::<SaveSlot>()
            .and_then(|slot| slot.0.clone())
            .ok_or(SaveError::NoData)?,
    };

    let data = decode_save(&bytes)?;
    Ok(apply_save_data(world, &data))
}

// ---------------------------------------------------------------------------
// Exclusive systems
// ---------------------------------------------------------------------------

/// Drains all pending events of type `E`. Returns whether there were any.
fn take_events<E: Event>(world: &mut World) -> bool {
    world
        .get_resource_mut::<Events<E>>()
        .is_some_and(|mut events| events.drain().count() > 0)
}

fn exclusive_save(world: &mut World) {
    if !take_events::<SaveMachinesEvent>(world) {
        return;
    }
    match save_machines(world) {
        Ok(count) => debug!("Save complete: {} machines", count),
        Err(e) => error!("Save failed: {e}"),
    }
}

fn exclusive_load(world: &mut World) {
    if !take_events::<LoadMachinesEvent>(world) {
        return;
    }
    match load_machines(world) {
        Ok(report) => info!(
            "Loaded machines: {} restored, {} unknown, {} mismatched, {} reset",
            report.restored, report.unknown, report.kind_mismatch, report.reset
        ),
        Err(e) => error!("Load failed: {e}"),
    }
}
