//! Machine thermal records and the on-disk codec.
//!
//! A save holds one [`MachineThermalRecord`] per machine plus the
//! `SaveableRegistry` extension map. Only the persisted regulator state is
//! written; configuration comes from the machine's preset on load.

use std::collections::{BTreeMap, HashMap};

use bevy::prelude::*;
use bitcode::{Decode, Encode};

use thermal_simulation::machine_presets::MachineKind;
use thermal_simulation::machines::{MachineId, ThermalMachine};
use thermal_simulation::thermal::ThermalSnapshot;
use thermal_simulation::SaveableRegistry;

use crate::file_header::{unwrap_header, wrap_with_header, FileHeader, FLAG_COMPRESSED};
use crate::save_error::SaveError;

/// Current payload schema version.
pub const SAVE_VERSION: u32 = 1;

/// Payloads at least this large are LZ4-compressed.
pub const COMPRESSION_THRESHOLD: usize = 4 * 1024;

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct MachineThermalRecord {
    pub machine_id: u32,
    pub kind: MachineKind,
    pub snapshot: ThermalSnapshot,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct MachineSaveData {
    pub version: u32,
    pub machines: Vec<MachineThermalRecord>,
    pub extensions: BTreeMap<String, Vec<u8>>,
}

impl Default for MachineSaveData {
    fn default() -> Self {
        Self {
            version: SAVE_VERSION,
            machines: Vec::new(),
            extensions: BTreeMap::new(),
        }
    }
}

/// Outcome of applying a save to the live world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub restored: usize,
    /// Records whose machine id has no live machine.
    pub unknown: usize,
    /// Records whose id matched a machine of a different kind.
    pub kind_mismatch: usize,
    /// Live machines with no usable record, set to the zero state.
    pub reset: usize,
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Encode a save into header-wrapped bytes, compressing large payloads.
pub fn encode_save(data: &MachineSaveData) -> Vec<u8> {
    let raw = bitcode::encode(data);
    let uncompressed_size = raw.len();
    let (flags, payload) = if uncompressed_size >= COMPRESSION_THRESHOLD {
        (FLAG_COMPRESSED, lz4_flex::compress_prepend_size(&raw))
    } else {
        (0, raw)
    };
    let header = FileHeader::new(&payload, flags, uncompressed_size, data.machines.len());
    wrap_with_header(&header, &payload)
}

/// Validate and decode header-wrapped bytes.
///
/// # Errors
///
/// Any header error from [`unwrap_header`], plus [`SaveError::Decompress`]
/// for a bad LZ4 block, [`SaveError::Decode`] for an undecodable payload or
/// a record count that disagrees with the header, and
/// [`SaveError::UnsupportedVersion`] for payloads from a newer build.
pub fn decode_save(bytes: &[u8]) -> Result<MachineSaveData, SaveError> {
    let (header, payload) = unwrap_header(bytes)?;

    let raw = if header.is_compressed() {
        let raw = lz4_flex::decompress_size_prepended(payload)?;
        if raw.len() != header.uncompressed_size as usize {
            return Err(SaveError::Decompress(format!(
                "expected {} bytes, got {}",
                header.uncompressed_size,
                raw.len()
            )));
        }
        raw
    } else {
        payload.to_vec()
    };

    let data: MachineSaveData = bitcode::decode(&raw)?;

    if data.version > SAVE_VERSION {
        return Err(SaveError::UnsupportedVersion {
            found: data.version,
            supported: SAVE_VERSION,
        });
    }
    if data.machines.len() != header.record_count as usize {
        return Err(SaveError::Decode(format!(
            "header lists {} machines, payload has {}",
            header.record_count,
            data.machines.len()
        )));
    }

    Ok(data)
}

// ---------------------------------------------------------------------------
// World <-> save data
// ---------------------------------------------------------------------------

/// Snapshot every machine (sorted by id) and every registered saveable resource.
pub fn collect_save_data(world: &mut World) -> MachineSaveData {
    let mut machines: Vec<MachineThermalRecord> = {
        let mut q = world.query::<(&MachineId, &ThermalMachine)>();
        q.iter(world)
            .map(|(id, machine)| MachineThermalRecord {
                machine_id: id.0,
                kind: machine.kind,
                snapshot: machine.regulator.snapshot(),
            })
            .collect()
    };
    machines.sort_by_key(|record| record.machine_id);

    let extensions = world
        .get_resource::<SaveableRegistry>()
        .map(|registry| registry.save_all(world))
        .unwrap_or_default();

    MachineSaveData {
        version: SAVE_VERSION,
        machines,
        extensions,
    }
}

/// Restore saved snapshots onto live machines with matching ids.
///
/// A live machine with no record of its kind has no persisted state, so it
/// takes the zero state (temperature 0.0, killswitch clear). Records for
/// unknown ids or for a machine of a different kind are skipped with a warning.
pub fn apply_save_data(world: &mut World, data: &MachineSaveData) -> ApplyReport {
    let mut report = ApplyReport::default();
    let mut pending: HashMap<u32, &MachineThermalRecord> = data
        .machines
        .iter()
        .map(|record| (record.machine_id, record))
        .collect();

    let mut q = world.query::<(&MachineId, &mut ThermalMachine)>();
    for (id, mut machine) in q.iter_mut(world) {
        match pending.remove(&id.0) {
            Some(record) if record.kind == machine.kind => {
                machine.regulator.restore(&record.snapshot);
                report.restored += 1;
            }
            Some(record) => {
                warn!(
                    "Save: machine {} is {:?} but record is {:?}, skipping",
                    id.0, machine.kind, record.kind
                );
                report.kind_mismatch += 1;
                machine.regulator.restore(&ThermalSnapshot::default());
                report.reset += 1;
            }
            None => {
                machine.regulator.restore(&ThermalSnapshot::default());
                report.reset += 1;
            }
        }
    }
    if report.reset > 0 {
        debug!("Save: {} machines had no record, reset to zero state", report.reset);
    }

    let mut unknown: Vec<u32> = pending.into_keys().collect();
    unknown.sort_unstable();
    for id in &unknown {
        warn!("Save: no machine with id {}, skipping its record", id);
    }
    report.unknown = unknown.len();

    if let Some(registry) = world.remove_resource::<SaveableRegistry>() {
        registry.load_all(world, &data.extensions);
        world.insert_resource(registry);
    }

    report
}
