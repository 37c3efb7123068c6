//! Data Cache Hierarchy Unit Tests.
//!
//! Verifies the inclusive L1/L2/L3 chain: demand and translation entry
//! points, inclusive fills, write-back propagation under the evicted tag,
//! the main-memory counter invariant, and miss classification bounds.

use memsim_core::common::addr::PhysAddr;
use memsim_core::config::CacheHierarchyConfig;
use memsim_core::mem::hierarchy::CacheHierarchy;

/// A deliberately tiny hierarchy so evictions are easy to force:
/// L1 = 1 set x 1 way, L2 = 1 set x 2 ways, L3 = 1 set x 4 ways,
/// 64-byte lines throughout.
fn tiny_config() -> CacheHierarchyConfig {
    CacheHierarchyConfig {
        l1_size: 64,
        l1_ways: 1,
        l1_line: 64,
        l2_size: 128,
        l2_ways: 2,
        l2_line: 64,
        l3_size: 256,
        l3_ways: 4,
        l3_line: 64,
    }
}

fn addr(i: u64) -> PhysAddr {
    PhysAddr::new(i * 64)
}

// ══════════════════════════════════════════════════════════
// 1. Demand path
// ══════════════════════════════════════════════════════════

#[test]
fn cold_miss_then_hit() {
    let mut caches = CacheHierarchy::new(&tiny_config());
    assert!(!caches.access(addr(1), false));
    assert!(caches.access(addr(1), false));
    assert_eq!(caches.l1().accesses(), 2);
    assert_eq!(caches.l1().hits(), 1);
    assert_eq!(caches.mem_accesses(), 1);
}

/// Fills are inclusive: a line pushed out of L1 is still present in L2.
#[test]
fn inclusive_fill_backstops_l1_eviction() {
    let mut caches = CacheHierarchy::new(&tiny_config());
    caches.access(addr(1), false);
    caches.access(addr(2), false); // displaces line 1 from the 1-entry L1
    let mem_before = caches.mem_accesses();
    assert!(caches.access(addr(1), false), "line 1 should survive in L2");
    assert_eq!(caches.mem_accesses(), mem_before);
}

/// A dirty line chains outward on eviction: L1 victim becomes a dirty L2
/// insert, counted as an L1 writeback.
#[test]
fn dirty_eviction_chains_to_next_level() {
    let mut caches = CacheHierarchy::new(&tiny_config());
    caches.access(addr(1), true); // L1 line 1 dirty
    caches.access(addr(2), false); // evicts it into L2
    assert_eq!(caches.l1().writebacks(), 1);
    assert_eq!(caches.l2().writebacks(), 0);
    assert_eq!(caches.l3().writebacks(), 0);
}

// ══════════════════════════════════════════════════════════
// 2. Translation path
// ══════════════════════════════════════════════════════════

/// Page-walk reads enter at L2; the demand L1 never sees them.
#[test]
fn translate_lookup_bypasses_l1() {
    let mut caches = CacheHierarchy::new(&tiny_config());
    assert!(!caches.translate_lookup(addr(1)));
    assert_eq!(caches.l1().accesses(), 0);
    assert_eq!(caches.l2().accesses(), 1);
    assert_eq!(caches.l3().accesses(), 1);
    assert_eq!(caches.mem_accesses(), 1);

    // The miss filled L2 and L3; the next walk read hits.
    assert!(caches.translate_lookup(addr(1)));
    assert_eq!(caches.l2().hits(), 1);
}

/// An L3 hit on the translation path refills L2 clean.
#[test]
fn translate_l3_hit_refills_l2() {
    let mut caches = CacheHierarchy::new(&tiny_config());
    caches.translate_lookup(addr(1));
    caches.translate_lookup(addr(2));
    caches.translate_lookup(addr(3)); // L2 (2 ways) has lost line 1; L3 has it
    let mem_before = caches.mem_accesses();
    assert!(caches.translate_lookup(addr(1)));
    assert_eq!(caches.mem_accesses(), mem_before);
}

// ══════════════════════════════════════════════════════════
// 3. Memory counter invariant
// ══════════════════════════════════════════════════════════

/// The main-memory counter equals L3 misses plus L3 writebacks at every
/// point of a mixed access sequence.
#[test]
fn memory_counter_matches_l3_misses_plus_writebacks() {
    let mut caches = CacheHierarchy::new(&tiny_config());
    for i in 0..200u64 {
        let write = i % 3 == 0;
        caches.access(addr(i % 23), write);
        if i % 5 == 0 {
            caches.translate_lookup(addr(100 + i % 7));
        }
        let l3 = caches.l3();
        assert_eq!(
            caches.mem_accesses(),
            (l3.accesses() - l3.hits()) + l3.writebacks(),
            "invariant broken after access {}",
            i
        );
    }
}

// ══════════════════════════════════════════════════════════
// 4. Miss classification
// ══════════════════════════════════════════════════════════

/// Cold misses are bounded by the cache capacity.
#[test]
fn cold_misses_bounded_by_capacity() {
    let mut caches = CacheHierarchy::new(&tiny_config());
    for i in 0..500u64 {
        caches.access(addr(i), false);
    }
    assert!(caches.l1().cold_misses() <= 1);
    assert!(caches.l2().cold_misses() <= 2);
    assert!(caches.l3().cold_misses() <= 4);
}

/// Read and write accounting splits by access type.
#[test]
fn read_write_accounting() {
    let mut caches = CacheHierarchy::new(&tiny_config());
    caches.access(addr(1), false);
    caches.access(addr(1), false);
    caches.access(addr(1), true);
    let l1 = caches.l1();
    assert_eq!(l1.read_accesses(), 2);
    assert_eq!(l1.write_accesses(), 1);
    assert!((l1.read_hit_rate() - 0.5).abs() < 1e-12);
    assert!((l1.write_hit_rate() - 1.0).abs() < 1e-12);
}
