//! Weighted rendezvous hashing for remote shard selection (spec §4.7
//! "Shard selection").
//!
//! Ground truth for the exact algorithm (hash input order, unit-interval
//! conversion, tie-breaking) is ccache's own
//! `examples/original_source/src/ccache/storage/storage.cpp`
//! (`get_shard_url`/`to_half_open_unit_interval`), since spec.md names the
//! formula but not byte-level ordering.

use xxhash_rust::xxh3::xxh3_64;

/// A configured shard: a name and a non-negative weight.
#[derive(Debug, Clone)]
pub struct Shard {
    pub name: String,
    pub weight: f64,
}

/// Convert a 64-bit hash into a half-open `[0, 1)` double using its low 53
/// bits (the significand width of an `f64`), matching
/// `to_half_open_unit_interval` in the original implementation.
fn to_half_open_unit_interval(hash: u64) -> f64 {
    const SIGNIFICAND_BITS: u32 = 53;
    let denominator = 1u64 << SIGNIFICAND_BITS;
    let mask = denominator - 1;
    (hash & mask) as f64 / denominator as f64
}

/// Pick the shard with the highest weighted score for `key`. Ties are
/// broken by earliest position in `shards` (first-in-list wins, matching
/// the original's strict `>` comparison). A single-shard list skips the
/// computation entirely, per spec.
pub fn select_shard<'a>(key: &[u8], shards: &'a [Shard]) -> Option<&'a Shard> {
    if shards.len() == 1 {
        return shards.first();
    }
    let mut best: Option<(&Shard, f64)> = None;
    for shard in shards {
        let mut hasher_input = Vec::with_capacity(key.len() + shard.name.len());
        hasher_input.extend_from_slice(key);
        hasher_input.extend_from_slice(shard.name.as_bytes());
        let hash = xxh3_64(&hasher_input);
        let unit = to_half_open_unit_interval(hash);
        let score = if unit == 0.0 {
            0.0
        } else {
            shard.weight / -unit.ln()
        };
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((shard, score)),
        }
    }
    best.map(|(shard, _)| shard)
}

#[cfg(test)]
#[path = "rendezvous_tests.rs"]
mod tests;
