//! TLB Unit Tests.
//!
//! Verifies the translation lookaside buffer wrapper: lookup, insertion,
//! aliasing eviction, and counters. TLB entries are never dirty, so all
//! evictions are silent.

use memsim_core::mmu::tlb::Tlb;

#[test]
fn lookup_miss_on_empty() {
    let mut tlb = Tlb::new("TLB", 16, 4);
    assert_eq!(tlb.lookup(0x400), None);
}

#[test]
fn insert_and_lookup_hit() {
    let mut tlb = Tlb::new("TLB", 16, 4);
    tlb.insert(0x400, 0x99);
    assert_eq!(tlb.lookup(0x400), Some(0x99));
}

/// Re-inserting a VPN updates its frame number.
#[test]
fn reinsert_updates_mapping() {
    let mut tlb = Tlb::new("TLB", 16, 4);
    tlb.insert(0x400, 1);
    tlb.insert(0x400, 2);
    assert_eq!(tlb.lookup(0x400), Some(2));
}

/// Filling a set beyond its ways evicts the least recently used VPN.
#[test]
fn aliasing_evicts_lru() {
    // 4 entries, 2 ways -> 2 sets; even VPNs alias set 0.
    let mut tlb = Tlb::new("TLB", 4, 2);
    tlb.insert(0, 10);
    tlb.insert(2, 11);
    tlb.lookup(0); // keep VPN 0 warm
    tlb.insert(4, 12); // displaces VPN 2

    assert_eq!(tlb.lookup(0), Some(10));
    assert_eq!(tlb.lookup(2), None);
    assert_eq!(tlb.lookup(4), Some(12));
}

#[test]
fn counters_and_summary() {
    let mut tlb = Tlb::new("L1 TLB", 64, 4);
    tlb.insert(7, 70);
    tlb.lookup(7);
    tlb.lookup(8);
    assert_eq!(tlb.accesses(), 2);
    assert_eq!(tlb.hits(), 1);

    let summary = tlb.summary();
    assert_eq!(summary.name, "L1 TLB");
    assert_eq!(summary.entries, 64);
    assert_eq!(summary.sets, 16);
    assert_eq!(summary.ways, 4);
    assert!((summary.hit_rate() - 0.5).abs() < 1e-12);
}
