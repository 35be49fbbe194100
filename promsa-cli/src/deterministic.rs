//! Deterministic mode support for reproducible results

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Once;

use promsa_core::{MsaConfig, Sequence};

static INIT_DETERMINISTIC: Once = Once::new();

/// Announce deterministic mode once per process
pub fn init_deterministic_mode() {
    INIT_DETERMINISTIC.call_once(|| {
        log::info!("Deterministic mode: single worker thread, serial DP fill");
    });
}

/// Force the settings that make a run bit-reproducible
pub fn apply(config: &mut MsaConfig) {
    init_deterministic_mode();
    if config.degree_of_parallelism != 1 || config.partitions != 1 {
        log::debug!(
            "Overriding {} threads and {} partitions with 1",
            config.degree_of_parallelism,
            config.partitions
        );
    }
    config.degree_of_parallelism = 1;
    config.partitions = 1;
}

/// Stable checksum of aligned rows, for comparing runs
pub fn alignment_fingerprint(sequences: &[Sequence]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for sequence in sequences {
        sequence.id.hash(&mut hasher);
        sequence.data.hash(&mut hasher);
    }
    hasher.finish()
}
