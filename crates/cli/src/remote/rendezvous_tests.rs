#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;

#[test]
fn single_shard_skips_computation() {
    let shards = [Shard {
        name: "only".to_string(),
        weight: 1.0,
    }];
    let picked = select_shard(b"any-key", &shards).unwrap();
    assert_eq!(picked.name, "only");
}

#[test]
fn selection_is_deterministic_for_a_fixed_key() {
    let shards = [
        Shard { name: "a".to_string(), weight: 1.0 },
        Shard { name: "b".to_string(), weight: 1.0 },
        Shard { name: "c".to_string(), weight: 1.0 },
    ];
    let first = select_shard(b"stable-key", &shards).unwrap().name.clone();
    let second = select_shard(b"stable-key", &shards).unwrap().name.clone();
    assert_eq!(first, second);
}

#[test]
fn different_keys_spread_across_shards() {
    let shards = [
        Shard { name: "a".to_string(), weight: 1.0 },
        Shard { name: "b".to_string(), weight: 1.0 },
        Shard { name: "c".to_string(), weight: 1.0 },
    ];
    let mut picks = std::collections::HashSet::new();
    for i in 0..200u32 {
        let key = format!("key-{i}");
        picks.insert(select_shard(key.as_bytes(), &shards).unwrap().name.clone());
    }
    assert!(picks.len() > 1, "expected keys to spread across more than one shard");
}

#[test]
fn zero_weight_shard_is_never_picked_over_nonzero_peers() {
    let shards = [
        Shard { name: "zero".to_string(), weight: 0.0 },
        Shard { name: "normal".to_string(), weight: 1.0 },
    ];
    for i in 0..50u32 {
        let key = format!("k{i}");
        let picked = select_shard(key.as_bytes(), &shards).unwrap();
        assert_eq!(picked.name, "normal");
    }
}
