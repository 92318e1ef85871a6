//! Deterministic identifiers.
//!
//! Every id handed out during a run is derived from the simulation seed, an
//! id domain and a per-domain counter, so two runs with the same seed and the
//! same sequence of operations produce the same ids.

use std::collections::HashMap;
use uuid::Uuid;

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Derive a UUID from a seed, domain, and counter.
pub fn deterministic_uuid(seed: u64, domain: u64, counter: u64) -> Uuid {
    let x0 = seed ^ domain ^ counter;
    let lo = splitmix64(x0);
    let hi = splitmix64(x0.wrapping_add(0xD1B5_4A32_D192_ED03));
    Uuid::from_u128(((hi as u128) << 64) | (lo as u128))
}

pub const UUID_DOMAIN_TASK: u64 = 0x5441_534B_5F49_445F; // "TASK_ID_"
pub const UUID_DOMAIN_PROCESS: u64 = 0x5052_4F43_4553_535F; // "PROCESS_"

/// Per-simulation id source, owned by the scheduler.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    seed: u64,
    counters: HashMap<u64, u64>,
}

impl IdGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            counters: HashMap::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Next id in `domain`. Counters start at 1 in every domain.
    pub fn next(&mut self, domain: u64) -> Uuid {
        let counter = self.counters.entry(domain).or_insert(0);
        *counter += 1;
        deterministic_uuid(self.seed, domain, *counter)
    }
}
