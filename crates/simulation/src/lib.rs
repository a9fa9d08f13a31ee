use bevy::prelude::*;
use std::collections::BTreeMap;

pub mod energy;
pub mod enhancers;
pub mod machine_presets;
pub mod machines;
pub mod medium;
pub mod sim_rng;
pub mod simulation_sets;
pub mod thermal;
pub mod thermal_config;

pub use simulation_sets::SimulationSet;

// ---------------------------------------------------------------------------
// Saveable trait + registry for the extension map save pattern
// ---------------------------------------------------------------------------

/// Trait for resources that can be saved/loaded via the extension map.
///
/// Each implementing resource provides its own serialization logic; a plugin
/// only has to register the type with [`SaveableRegistry`].
pub trait Saveable: Resource + Default + Send + Sync + 'static {
    /// Unique key for this resource in the save file's extension map.
    /// Must be stable across versions.
    const SAVE_KEY: &'static str;

    /// Serialize this resource. `None` skips it (e.g. default state).
    fn save_to_bytes(&self) -> Option<Vec<u8>>;

    /// Deserialize from bytes, returning the restored resource.
    fn load_from_bytes(bytes: &[u8]) -> Self;
}

/// Decode bytes via `bitcode::decode`, logging a warning and returning `Default` on failure.
pub fn decode_or_warn<T: bitcode::DecodeOwned + Default>(key: &str, bytes: &[u8]) -> T {
    match bitcode::decode(bytes) {
        Ok(v) => v,
        Err(e) => {
            warn!(
                "Saveable {}: failed to decode {} bytes, falling back to default: {}",
                key,
                bytes.len(),
                e
            );
            T::default()
        }
    }
}

pub type SaveFn = Box<dyn Fn(&World) -> Option<Vec<u8>> + Send + Sync>;
pub type LoadFn = Box<dyn Fn(&mut World, &[u8]) + Send + Sync>;

/// Type-erased save/load operations for a single registered resource.
pub struct SaveableEntry {
    pub key: String,
    pub save_fn: SaveFn,
    pub load_fn: LoadFn,
}

/// Registry of all saveable resources, populated during plugin setup.
#[derive(Resource, Default)]
pub struct SaveableRegistry {
    pub entries: Vec<SaveableEntry>,
}

impl SaveableRegistry {
    /// Register a resource type that implements `Saveable`.
    ///
    /// Duplicate keys are ignored with a warning (and panic in debug builds).
    pub fn register<T: Saveable>(&mut self) {
        let key = T::SAVE_KEY.to_string();
        if self.entries.iter().any(|e| e.key == key) {
            warn!(
                "SaveableRegistry: duplicate key '{}', ignoring second registration",
                key
            );
            debug_assert!(false, "SaveableRegistry: duplicate key '{}'", key);
            return;
        }
        self.entries.push(SaveableEntry {
            key,
            save_fn: Box::new(|world: &World| {
                world.get_resource::<T>().and_then(|r| r.save_to_bytes())
            }),
            load_fn: Box::new(|world: &mut World, bytes: &[u8]| {
                world.insert_resource(T::load_from_bytes(bytes));
            }),
        });
    }

    pub fn save_all(&self, world: &World) -> BTreeMap<String, Vec<u8>> {
        let mut extensions = BTreeMap::new();
        for entry in &self.entries {
            if let Some(bytes) = (entry.save_fn)(world) {
                extensions.insert(entry.key.clone(), bytes);
            }
        }
        extensions
    }

    /// Resources whose key is absent keep their current value.
    pub fn load_all(&self, world: &mut World, extensions: &BTreeMap<String, Vec<u8>>) {
        for entry in &self.entries {
            if let Some(bytes) = extensions.get(&entry.key) {
                (entry.load_fn)(world, bytes);
            }
        }
    }
}

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SaveableRegistry>();

        app.add_plugins((
            simulation_sets::SimulationSetsPlugin,
            sim_rng::SimRngPlugin,
            machines::ThermalMachinesPlugin,
        ));
    }
}
