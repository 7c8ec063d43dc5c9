//! Local content-addressed storage (spec §4.8).
//!
//! `local` implements the on-disk layout, atomic writes, eviction and
//! recompression described there; `stats` implements the per-shard
//! statistics counters both `local` and the remote orchestrator report
//! into.

pub mod local;
pub mod stats;

pub use stats::{Counters, StatCounter};
