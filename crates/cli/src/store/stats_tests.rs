#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;

#[test]
fn counters_start_at_zero() {
    let c = Counters::new();
    for counter in StatCounter::all() {
        assert_eq!(c.get(counter), 0);
    }
    assert_eq!(c.zeroed_at_unix_secs, 0);
}

#[test]
fn increment_and_add() {
    let mut c = Counters::new();
    c.increment(StatCounter::DirectCacheHit);
    c.add(StatCounter::DirectCacheHit, 4);
    assert_eq!(c.get(StatCounter::DirectCacheHit), 5);
    assert_eq!(c.get(StatCounter::DirectCacheMiss), 0);
}

#[test]
fn merge_sums_across_shards() {
    let mut a = Counters::new();
    a.add(StatCounter::DirectCacheHit, 3);
    a.zeroed_at_unix_secs = 10;

    let mut b = Counters::new();
    b.add(StatCounter::DirectCacheHit, 7);
    b.add(StatCounter::RemoteCacheMiss, 2);
    b.zeroed_at_unix_secs = 20;

    a.merge(&b);

    assert_eq!(a.get(StatCounter::DirectCacheHit), 10);
    assert_eq!(a.get(StatCounter::RemoteCacheMiss), 2);
    assert_eq!(a.zeroed_at_unix_secs, 20);
}

#[test]
fn zero_resets_all_counters_and_stamps_timestamp() {
    let mut c = Counters::new();
    c.add(StatCounter::CacheMiss, 9);
    c.zero(42);
    assert_eq!(c.get(StatCounter::CacheMiss), 0);
    assert_eq!(c.zeroed_at_unix_secs, 42);
}

#[test]
fn name_round_trips_through_all() {
    for counter in StatCounter::all() {
        assert!(!counter.name().is_empty());
        assert_eq!(counter.to_string(), counter.name());
    }
}
