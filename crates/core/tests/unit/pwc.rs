//! Page-Walk Cache Unit Tests.
//!
//! Verifies high-bit tag extraction, plain lookup/insert, and the TOC
//! extension: sub-slot indexed hits, misses on valid tags with invalid
//! slots, sub-table replacement on eviction, and counter semantics.

use memsim_core::mmu::pwc::PageWalkCache;

/// PMD-style slice: bits [47:21], one 2 MiB region per tag.
const LOW: u32 = 21;
const HIGH: u32 = 47;

fn region(i: u64) -> u64 {
    i << LOW
}

// ══════════════════════════════════════════════════════════
// 1. Plain mode
// ══════════════════════════════════════════════════════════

/// Addresses that differ only below the tag slice share an entry.
#[test]
fn tag_ignores_low_bits() {
    let mut pwc = PageWalkCache::new("PMD PWC", 16, 4, LOW, HIGH, 0);
    pwc.insert(region(2), 0x55);
    assert_eq!(pwc.lookup(region(2) + 0xABC), Some(0x55));
    assert_eq!(pwc.lookup(region(2) + 63 * 4096), Some(0x55));
    assert_eq!(pwc.lookup(region(3)), None);
}

#[test]
fn tag_extraction_bit_range() {
    let pwc = PageWalkCache::new("PMD PWC", 16, 4, LOW, HIGH, 0);
    assert_eq!(pwc.low_bit(), LOW);
    assert_eq!(pwc.high_bit(), HIGH);
    assert_eq!(pwc.tag(0x40_0000), 2);
    // Bits at and above 48 are outside the slice.
    assert_eq!(pwc.tag(1 << 48), 0);
}

#[test]
fn plain_insert_refreshes_lru() {
    // 2 entries, 1 way -> 2 sets; even tags alias set 0.
    let mut pwc = PageWalkCache::new("PWC", 2, 1, LOW, HIGH, 0);
    pwc.insert(region(0), 1);
    pwc.insert(region(0), 1); // refresh in place, no self-eviction
    assert_eq!(pwc.lookup(region(0)), Some(1));
    pwc.insert(region(2), 2); // conflicting tag displaces
    assert_eq!(pwc.lookup(region(0)), None);
    assert_eq!(pwc.lookup(region(2)), Some(2));
}

// ══════════════════════════════════════════════════════════
// 2. TOC mode
// ══════════════════════════════════════════════════════════

/// With TOC size T, the tag covers T regions; sub-slots resolve within it.
#[test]
fn toc_multiplies_reach() {
    // 4 entries, 4 ways -> 1 set; TOC of 4 -> 16 regions reachable.
    let mut pwc = PageWalkCache::new("PMD PWC", 4, 4, LOW, HIGH, 4);
    for i in 0..16 {
        pwc.insert(region(i), 100 + i);
    }
    for i in 0..16 {
        assert_eq!(
            pwc.lookup(region(i)),
            Some(100 + i),
            "region {} fell out of a 16-region reach",
            i
        );
    }
}

/// A tag match with an unwritten sub-slot is a miss.
#[test]
fn toc_invalid_subslot_misses() {
    let mut pwc = PageWalkCache::new("PMD PWC", 4, 4, LOW, HIGH, 4);
    pwc.insert(region(0), 7); // tag 0, sub-slot 0
    assert_eq!(pwc.lookup(region(1)), None, "sub-slot 1 was never written");
    assert_eq!(pwc.lookup(region(0)), Some(7));
}

/// Counters follow the sub-slot outcome, not the tag match.
#[test]
fn toc_counters_follow_subslot() {
    let mut pwc = PageWalkCache::new("PMD PWC", 4, 4, LOW, HIGH, 4);
    pwc.insert(region(0), 7);
    pwc.lookup(region(1)); // tag hit, slot miss
    pwc.lookup(region(0)); // slot hit
    assert_eq!(pwc.accesses(), 2);
    assert_eq!(pwc.hits(), 1);
}

/// Evicting an entry drops its sub-table; a re-inserted tag starts from a
/// zeroed table.
#[test]
fn toc_eviction_drops_subtable() {
    // 1 entry total: every distinct tag evicts the previous one.
    let mut pwc = PageWalkCache::new("PMD PWC", 1, 1, LOW, HIGH, 4);
    pwc.insert(region(0), 10); // tag 0, slot 0
    pwc.insert(region(1), 11); // tag 0, slot 1
    pwc.insert(region(4), 20); // tag 1 evicts tag 0 and its table

    assert_eq!(pwc.lookup(region(4)), Some(20));
    assert_eq!(pwc.lookup(region(0)), None);

    pwc.insert(region(0), 30); // tag 0 returns with a fresh table
    assert_eq!(pwc.lookup(region(0)), Some(30));
    assert_eq!(
        pwc.lookup(region(1)),
        None,
        "slot 1 must not survive the eviction of its table"
    );
}
