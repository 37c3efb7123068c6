//! Inclusive three-level data cache hierarchy.
//!
//! Two entry points: demand accesses enter at L1, translation accesses (page
//! walk entry reads) enter at L2 so walks do not pollute the demand L1. A
//! shared main-memory counter increments on every L3 miss and every dirty L3
//! eviction; only L3 talks to memory.
//!
//! Write policy is write-back, write-allocate. Dirty victims chain outward
//! through the hierarchy, each forwarded under the evicting level's own tag.

use crate::common::addr::PhysAddr;
use crate::config::CacheHierarchyConfig;
use crate::mem::cache::{EvictedEntry, SetAssociativeCache, Tag};
use crate::stats::CacheSummary;

/// Placeholder block value; the simulator models placement, not contents.
const BLOCK: u64 = 0;

/// One level of the data cache: the set-associative primitive plus
/// demand-access accounting and miss classification.
pub struct DataCache {
    cache: SetAssociativeCache<u64, u64>,
    line_bytes: u64,
    offset_bits: u32,
    read_accesses: u64,
    read_hits: u64,
    write_accesses: u64,
    write_hits: u64,
    writebacks: u64,
    cold_misses: u64,
    capacity_misses: u64,
    conflict_misses: u64,
}

impl DataCache {
    /// Creates a level of `total_bytes` capacity.
    ///
    /// # Arguments
    ///
    /// * `name` - Cache name used in reports.
    /// * `total_bytes` - Total capacity in bytes.
    /// * `ways` - Associativity.
    /// * `line_bytes` - Line size in bytes; a power of two, validated by
    ///   configuration.
    pub fn new(name: &str, total_bytes: u64, ways: u64, line_bytes: u64) -> Self {
        let num_sets = total_bytes / (ways * line_bytes);
        Self {
            cache: SetAssociativeCache::new(name, num_sets, ways),
            line_bytes,
            offset_bits: line_bytes.trailing_zeros(),
            read_accesses: 0,
            read_hits: 0,
            write_accesses: 0,
            write_hits: 0,
            writebacks: 0,
            cold_misses: 0,
            capacity_misses: 0,
            conflict_misses: 0,
        }
    }

    /// Tag of the line holding `paddr` at this level's line size.
    #[inline(always)]
    pub fn tag_of(&self, paddr: u64) -> u64 {
        paddr >> self.offset_bits
    }

    /// Looks up a tag, recording read/write accounting and classifying the
    /// miss when it is one.
    pub fn lookup(&mut self, tag: u64, is_write: bool) -> bool {
        let hit = self.cache.lookup(tag).is_some();
        if is_write {
            self.write_accesses += 1;
            if hit {
                self.write_hits += 1;
            }
        } else {
            self.read_accesses += 1;
            if hit {
                self.read_hits += 1;
            }
        }
        if !hit {
            self.classify_miss(tag);
        }
        hit
    }

    /// Miss classification heuristic: cold while fewer stamps have been
    /// handed out than the cache has entries (warm-up), then capacity when
    /// the set's LRU victim is not way 0, else conflict. Advisory only.
    fn classify_miss(&mut self, tag: u64) {
        if self.cache.stamp_count() < self.cache.capacity() {
            self.cold_misses += 1;
        } else {
            let set = tag.set_index(self.cache.num_sets() as usize);
            if self.cache.victim_way(set) != 0 {
                self.capacity_misses += 1;
            } else {
                self.conflict_misses += 1;
            }
        }
    }

    /// Installs a line, counting the write-back when a dirty victim is
    /// displaced. The victim is returned for the hierarchy to forward.
    fn insert(&mut self, tag: u64, value: u64, is_write: bool) -> Option<EvictedEntry<u64, u64>> {
        let evicted = self.cache.insert(tag, value, is_write);
        if evicted.is_some() {
            self.writebacks += 1;
        }
        evicted
    }

    /// Line size in bytes.
    pub fn line_bytes(&self) -> u64 {
        self.line_bytes
    }

    /// log2 of the line size; the tag shift at this level.
    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    /// Total lookups.
    pub fn accesses(&self) -> u64 {
        self.cache.accesses()
    }

    /// Lookups that hit.
    pub fn hits(&self) -> u64 {
        self.cache.hits()
    }

    /// Hit rate in [0, 1].
    pub fn hit_rate(&self) -> f64 {
        self.cache.hit_rate()
    }

    /// Demand read lookups.
    pub fn read_accesses(&self) -> u64 {
        self.read_accesses
    }

    /// Demand write lookups.
    pub fn write_accesses(&self) -> u64 {
        self.write_accesses
    }

    /// Read hit rate in [0, 1].
    pub fn read_hit_rate(&self) -> f64 {
        if self.read_accesses > 0 {
            self.read_hits as f64 / self.read_accesses as f64
        } else {
            0.0
        }
    }

    /// Write hit rate in [0, 1].
    pub fn write_hit_rate(&self) -> f64 {
        if self.write_accesses > 0 {
            self.write_hits as f64 / self.write_accesses as f64
        } else {
            0.0
        }
    }

    /// Dirty victims displaced from this level.
    pub fn writebacks(&self) -> u64 {
        self.writebacks
    }

    /// Misses classified as cold (warm-up phase).
    pub fn cold_misses(&self) -> u64 {
        self.cold_misses
    }

    /// Misses classified as capacity.
    pub fn capacity_misses(&self) -> u64 {
        self.capacity_misses
    }

    /// Misses classified as conflict.
    pub fn conflict_misses(&self) -> u64 {
        self.conflict_misses
    }

    /// Geometry and hit counters for the report.
    pub fn summary(&self) -> CacheSummary {
        CacheSummary {
            name: self.cache.name().to_string(),
            entries: self.cache.capacity(),
            sets: self.cache.num_sets(),
            ways: self.cache.num_ways(),
            accesses: self.cache.accesses(),
            hits: self.cache.hits(),
        }
    }
}

/// The three data cache levels plus the main-memory access counter.
///
/// The hierarchy owns all levels; eviction chaining routes through it, so a
/// dirty victim from L1 becomes a write-allocate insert into L2, and so on
/// down to the memory counter.
pub struct CacheHierarchy {
    l1: DataCache,
    l2: DataCache,
    l3: DataCache,
    mem_access_count: u64,
}

impl CacheHierarchy {
    /// Builds the three levels from validated configuration.
    pub fn new(config: &CacheHierarchyConfig) -> Self {
        Self {
            l1: DataCache::new("L1 Cache", config.l1_size, config.l1_ways, config.l1_line),
            l2: DataCache::new("L2 Cache", config.l2_size, config.l2_ways, config.l2_line),
            l3: DataCache::new("L3 Cache", config.l3_size, config.l3_ways, config.l3_line),
            mem_access_count: 0,
        }
    }

    fn fill_l1(&mut self, tag: u64, value: u64, is_write: bool) {
        if let Some(victim) = self.l1.insert(tag, value, is_write) {
            self.fill_l2(victim.tag, victim.value, true);
        }
    }

    fn fill_l2(&mut self, tag: u64, value: u64, is_write: bool) {
        if let Some(victim) = self.l2.insert(tag, value, is_write) {
            self.fill_l3(victim.tag, victim.value, true);
        }
    }

    fn fill_l3(&mut self, tag: u64, value: u64, is_write: bool) {
        if self.l3.insert(tag, value, is_write).is_some() {
            self.mem_access_count += 1;
        }
    }

    /// Demand access, entering at L1.
    ///
    /// Fills are inclusive: a miss at level N installs the block at every
    /// level from N down to L1, clean except for the L1 copy of a write.
    ///
    /// # Arguments
    ///
    /// * `paddr` - Translated physical address of the access.
    /// * `is_write` - Whether the access is a store.
    ///
    /// # Returns
    ///
    /// `true` when any level hit; `false` on a miss to main memory.
    pub fn access(&mut self, paddr: PhysAddr, is_write: bool) -> bool {
        let addr = paddr.val();
        let l1_tag = self.l1.tag_of(addr);

        if self.l1.lookup(l1_tag, is_write) {
            if is_write {
                self.fill_l1(l1_tag, BLOCK, true);
            }
            return true;
        }

        let l2_tag = self.l2.tag_of(addr);
        if self.l2.lookup(l2_tag, is_write) {
            self.fill_l1(l1_tag, BLOCK, is_write);
            if is_write {
                self.fill_l2(l2_tag, BLOCK, true);
            }
            return true;
        }

        let l3_tag = self.l3.tag_of(addr);
        if self.l3.lookup(l3_tag, is_write) {
            self.fill_l2(l2_tag, BLOCK, false);
            self.fill_l1(l1_tag, BLOCK, is_write);
            return true;
        }

        self.mem_access_count += 1;
        self.fill_l3(l3_tag, BLOCK, false);
        self.fill_l2(l2_tag, BLOCK, false);
        self.fill_l1(l1_tag, BLOCK, is_write);
        false
    }

    /// Translation access, entering at L2. Page walks never touch L1.
    ///
    /// # Returns
    ///
    /// `true` when L2 or L3 held the entry's line; `false` on a miss to
    /// main memory.
    pub fn translate_lookup(&mut self, paddr: PhysAddr) -> bool {
        let addr = paddr.val();
        let l2_tag = self.l2.tag_of(addr);
        if self.l2.lookup(l2_tag, false) {
            return true;
        }
        let l3_tag = self.l3.tag_of(addr);
        if self.l3.lookup(l3_tag, false) {
            self.fill_l2(l2_tag, BLOCK, false);
            return true;
        }
        self.mem_access_count += 1;
        self.fill_l3(l3_tag, BLOCK, false);
        self.fill_l2(l2_tag, BLOCK, false);
        false
    }

    /// The L1 level.
    pub fn l1(&self) -> &DataCache {
        &self.l1
    }

    /// The L2 level.
    pub fn l2(&self) -> &DataCache {
        &self.l2
    }

    /// The L3 level.
    pub fn l3(&self) -> &DataCache {
        &self.l3
    }

    /// Main-memory accesses: L3 read misses plus dirty L3 write-backs.
    pub fn mem_accesses(&self) -> u64 {
        self.mem_access_count
    }

    /// Synthetic cycle cost of all accesses:
    /// `l1 * 1 + l2 * 4 + l3 * 10 + memory * 100`.
    pub fn total_cycle_cost(&self) -> u64 {
        self.l1.accesses() + self.l2.accesses() * 4 + self.l3.accesses() * 10
            + self.mem_access_count * 100
    }
}
