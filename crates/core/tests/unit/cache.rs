//! Set-Associative Cache Primitive Unit Tests.
//!
//! Verifies the generic tag-to-value store underlying every cache in the
//! simulator: LRU victim selection, dirty tracking, write-back eviction
//! reporting, and access counters.

use memsim_core::mem::cache::SetAssociativeCache;

// ──────────────────────────────────────────────────────────
// Helper: a small deterministic cache
// ──────────────────────────────────────────────────────────

/// 4 sets x 2 ways. With u64 tags, set index = tag & 3, so tags
/// 0, 4, 8, 12 all live in set 0.
fn test_cache() -> SetAssociativeCache<u64, u64> {
    SetAssociativeCache::new("test", 4, 2)
}

// ══════════════════════════════════════════════════════════
// 1. Lookup and insert basics
// ══════════════════════════════════════════════════════════

#[test]
fn lookup_miss_on_empty() {
    let mut cache = test_cache();
    assert_eq!(cache.lookup(0x10).copied(), None);
    assert_eq!(cache.accesses(), 1);
    assert_eq!(cache.hits(), 0);
}

/// A lookup immediately after an insert of the same tag always hits and
/// returns the stored value.
#[test]
fn insert_then_lookup_hits() {
    let mut cache = test_cache();
    cache.insert(0x10, 77, false);
    assert_eq!(cache.lookup(0x10).copied(), Some(77));
    assert_eq!(cache.accesses(), 1);
    assert_eq!(cache.hits(), 1);
}

/// Re-inserting an existing tag overwrites the value in place.
#[test]
fn insert_overwrites_existing_value() {
    let mut cache = test_cache();
    cache.insert(0x10, 1, false);
    cache.insert(0x10, 2, false);
    assert_eq!(cache.lookup(0x10).copied(), Some(2));
}

// ══════════════════════════════════════════════════════════
// 2. Victim selection
// ══════════════════════════════════════════════════════════

/// Invalid ways are preferred over valid ones: two inserts into a 2-way
/// set evict nothing.
#[test]
fn invalid_ways_fill_before_eviction() {
    let mut cache = test_cache();
    cache.insert(0, 10, false);
    cache.insert(4, 11, false);
    assert_eq!(cache.lookup(0).copied(), Some(10));
    assert_eq!(cache.lookup(4).copied(), Some(11));
}

/// The LRU way is the victim: touching the older entry flips which one a
/// conflicting insert displaces.
#[test]
fn lru_way_is_victim() {
    let mut cache = test_cache();
    cache.insert(0, 10, false); // set 0, older
    cache.insert(4, 11, true); // set 0, newer, dirty
    cache.lookup(0); // refresh tag 0; tag 4 is now LRU

    // The displaced entry must be the dirty tag 4, reported for write-back.
    let victim = cache.insert(8, 12, false).expect("dirty victim expected");
    assert_eq!(victim.tag, 4);
    assert_eq!(victim.value, 11);

    assert_eq!(cache.lookup(0).copied(), Some(10), "refreshed entry survives");
    assert_eq!(cache.lookup(4).copied(), None, "LRU entry was evicted");
}

// ══════════════════════════════════════════════════════════
// 3. Dirty tracking and write-back
// ══════════════════════════════════════════════════════════

/// Clean victims are dropped silently.
#[test]
fn clean_eviction_is_silent() {
    let mut cache = SetAssociativeCache::<u64, u64>::new("tiny", 1, 1);
    cache.insert(0, 1, false);
    assert!(cache.insert(1, 2, false).is_none());
}

/// A write insert makes the entry dirty; its eviction is reported exactly
/// once.
#[test]
fn dirty_eviction_reported_once() {
    let mut cache = SetAssociativeCache::<u64, u64>::new("tiny", 1, 1);
    cache.insert(0, 1, true);
    let victim = cache.insert(1, 2, false).expect("dirty victim expected");
    assert_eq!(victim.tag, 0);
    // The dirty bit left with the victim; the new entry is clean.
    assert!(cache.insert(2, 3, false).is_none());
}

/// A hit-update with `is_write` marks an existing clean entry dirty.
#[test]
fn write_update_marks_dirty() {
    let mut cache = SetAssociativeCache::<u64, u64>::new("tiny", 1, 1);
    cache.insert(0, 1, false);
    cache.insert(0, 1, true);
    let victim = cache.insert(1, 2, false).expect("entry became dirty");
    assert_eq!(victim.tag, 0);
}

/// A clean re-insert does not clear an existing dirty bit; only eviction
/// discharges dirt.
#[test]
fn clean_update_keeps_dirty() {
    let mut cache = SetAssociativeCache::<u64, u64>::new("tiny", 1, 1);
    cache.insert(0, 1, true);
    cache.insert(0, 2, false);
    assert!(cache.insert(1, 3, false).is_some(), "entry stayed dirty");
}

// ══════════════════════════════════════════════════════════
// 4. Counters
// ══════════════════════════════════════════════════════════

#[test]
fn hit_rate_tracks_lookups() {
    let mut cache = test_cache();
    cache.insert(0, 1, false);
    cache.lookup(0);
    cache.lookup(0);
    cache.lookup(4);
    assert_eq!(cache.accesses(), 3);
    assert_eq!(cache.hits(), 2);
    assert!((cache.hit_rate() - 2.0 / 3.0).abs() < 1e-12);
}

#[test]
fn geometry_accessors() {
    let cache = test_cache();
    assert_eq!(cache.num_sets(), 4);
    assert_eq!(cache.num_ways(), 2);
    assert_eq!(cache.capacity(), 8);
    assert_eq!(cache.name(), "test");
}
