//! Deterministic simulation RNG resource.
//!
//! Every regulator draws its jitter and heater targets from this one
//! `ChaCha8Rng`, so a given seed and tick sequence always reproduces the
//! same temperatures. The full generator state is saved, not just the seed.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::thermal::RandomSource;

/// Default seed used when no explicit seed is provided.
const DEFAULT_SEED: u64 = 42;

// ---------------------------------------------------------------------------
// Serializable snapshot of ChaCha8Rng state
// ---------------------------------------------------------------------------

#[derive(Encode, Decode)]
struct RngSnapshot {
    seed: [u8; 32],
    word_pos: u128,
    stream: u64,
}

impl RngSnapshot {
    fn capture(rng: &ChaCha8Rng) -> Self {
        Self {
            seed: rng.get_seed(),
            word_pos: rng.get_word_pos(),
            stream: rng.get_stream(),
        }
    }

    fn rebuild(&self) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::from_seed(self.seed);
        rng.set_stream(self.stream);
        rng.set_word_pos(self.word_pos);
        rng
    }
}

// ---------------------------------------------------------------------------
// SimRng resource
// ---------------------------------------------------------------------------

/// Shared RNG for thermal ticks. Systems take `ResMut<SimRng>`.
#[derive(Resource)]
pub struct SimRng(pub ChaCha8Rng);

impl Default for SimRng {
    fn default() -> Self {
        Self::from_seed_u64(DEFAULT_SEED)
    }
}

impl SimRng {
    pub fn from_seed_u64(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    /// The generator as a regulator randomness capability.
    pub fn source(&mut self) -> &mut dyn RandomSource {
        &mut self.0
    }
}

impl crate::Saveable for SimRng {
    const SAVE_KEY: &'static str = "sim_rng";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(&RngSnapshot::capture(&self.0)))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        match bitcode::decode::<RngSnapshot>(bytes) {
            Ok(snapshot) => Self(snapshot.rebuild()),
            Err(e) => {
                warn!(
                    "SimRng: failed to decode save data, falling back to default seed: {}",
                    e
                );
                Self::default()
            }
        }
    }
}

pub struct SimRngPlugin;

impl Plugin for SimRngPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimRng>();

        app.init_resource::<crate::SaveableRegistry>();
        app.world_mut()
            .resource_mut::<crate::SaveableRegistry>()
            .register::<SimRng>();
    }
}
