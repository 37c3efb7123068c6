//! Page-walk cache.
//!
//! Caches partial walk results keyed by a high-bit slice of the virtual
//! address: the PGD-level instance maps bits `[47:pgd_shift]` to the PUD
//! table frame, and so on down to the PMD-level instance naming PTE tables.
//!
//! In table-of-contents (TOC) mode each entry carries an inline table of
//! `T` sub-slots, indexed by the `log2(T)` address bits immediately below
//! the tag. The tag then covers a `T`-times larger region at unchanged tag
//! storage, and hit/access counters follow the sub-slot outcome, not the
//! tag match. The sub-table is owned by its entry and dropped with it on
//! eviction.

use crate::mem::cache::{CacheEntry, SetAssociativeCache, Tag};
use crate::stats::CacheSummary;

/// One TOC sub-slot: a next-level table frame, valid once written.
#[derive(Clone, Copy, Default)]
struct TocSlot {
    valid: bool,
    next_pfn: u64,
}

/// PWC entry value: the next-level table frame, or in TOC mode the inline
/// sub-table (and the frame field unused).
#[derive(Default)]
struct PwcValue {
    next_pfn: u64,
    toc: Option<Box<[TocSlot]>>,
}

/// One page-walk cache instance.
pub struct PageWalkCache {
    cache: SetAssociativeCache<u64, PwcValue>,
    /// Lowest vaddr bit covered by this level's slice (TOC bits included).
    low_bit: u32,
    /// Highest vaddr bit covered (bit 47).
    high_bit: u32,
    /// Lowest vaddr bit of the tag proper; `low_bit + log2(toc_size)`.
    tag_low_bit: u32,
    /// Sub-slots per entry; 0 disables TOC mode.
    toc_size: u64,
}

impl PageWalkCache {
    /// Creates a PWC over vaddr bits `[high_bit:low_bit]`.
    ///
    /// # Arguments
    ///
    /// * `name` - Cache name used in reports.
    /// * `entries` - Total entries.
    /// * `ways` - Associativity.
    /// * `low_bit` - Lowest vaddr bit of this level's slice.
    /// * `high_bit` - Highest vaddr bit of the slice (bit 47).
    /// * `toc_size` - Sub-table slots per entry; 0 disables TOC mode.
    ///   Otherwise a validated power of two, and the tag gives up its
    ///   `log2(toc_size)` low bits to the sub-index.
    pub fn new(
        name: &str,
        entries: u64,
        ways: u64,
        low_bit: u32,
        high_bit: u32,
        toc_size: u64,
    ) -> Self {
        let toc_bits = if toc_size > 0 {
            toc_size.trailing_zeros()
        } else {
            0
        };
        Self {
            cache: SetAssociativeCache::new(name, entries / ways, ways),
            low_bit,
            high_bit,
            tag_low_bit: low_bit + toc_bits,
            toc_size,
        }
    }

    /// Extracts this level's tag from a virtual address.
    pub fn tag(&self, vaddr: u64) -> u64 {
        let width = self.high_bit - self.tag_low_bit + 1;
        let mask = ((1u64 << width) - 1) << self.tag_low_bit;
        (vaddr & mask) >> self.tag_low_bit
    }

    fn toc_index(&self, vaddr: u64) -> usize {
        ((vaddr >> self.low_bit) & (self.toc_size - 1)) as usize
    }

    /// Looks up the next-level table frame for `vaddr`.
    ///
    /// In TOC mode the entry is located by tag, then the sub-slot decides:
    /// an invalid sub-slot is a miss and leaves the LRU order untouched.
    ///
    /// # Returns
    ///
    /// The next-level table frame, or `None` on a miss.
    ///
    /// # Panics
    ///
    /// This function will not panic. The `expect` on the sub-table is
    /// guarded by construction: every valid TOC-mode entry is created with
    /// its table attached, and `find_way` only returns valid entries.
    pub fn lookup(&mut self, vaddr: u64) -> Option<u64> {
        let tag = self.tag(vaddr);
        if self.toc_size == 0 {
            return self.cache.lookup(tag).map(|v| v.next_pfn);
        }

        self.cache.record_access();
        let set = tag.set_index(self.cache.num_sets() as usize);
        let way = self.cache.find_way(set, tag)?;
        let slot = self.toc_index(vaddr);
        let table = self
            .cache
            .entry(set, way)
            .value
            .toc
            .as_ref()
            .expect("TOC-mode PWC entry without a sub-table");
        if !table[slot].valid {
            return None;
        }
        let pfn = table[slot].next_pfn;
        self.cache.record_hit();
        self.cache.touch(set, way);
        Some(pfn)
    }

    /// Installs the next-level table frame for `vaddr`.
    ///
    /// Re-inserting a present mapping refreshes its LRU stamp, which the
    /// walker relies on to keep hot entries warm. In TOC mode a fresh entry
    /// gets a zeroed sub-table; the victim's table is dropped with it.
    pub fn insert(&mut self, vaddr: u64, next_pfn: u64) {
        let tag = self.tag(vaddr);
        if self.toc_size == 0 {
            self.cache.insert(
                tag,
                PwcValue {
                    next_pfn,
                    toc: None,
                },
                false,
            );
            return;
        }

        let set = tag.set_index(self.cache.num_sets() as usize);
        let slot = self.toc_index(vaddr);

        if let Some(way) = self.cache.find_way(set, tag) {
            let table = self
                .cache
                .entry_mut(set, way)
                .value
                .toc
                .as_mut()
                .expect("TOC-mode PWC entry without a sub-table");
            table[slot] = TocSlot {
                valid: true,
                next_pfn,
            };
            self.cache.touch(set, way);
            return;
        }

        let mut table = vec![TocSlot::default(); self.toc_size as usize].into_boxed_slice();
        table[slot] = TocSlot {
            valid: true,
            next_pfn,
        };
        let way = self.cache.victim_way(set);
        *self.cache.entry_mut(set, way) = CacheEntry {
            tag,
            value: PwcValue {
                next_pfn: 0,
                toc: Some(table),
            },
            valid: true,
            dirty: false,
            lru_stamp: 0,
        };
        self.cache.touch(set, way);
    }

    /// Lowest vaddr bit of the tag (after the TOC sub-index, when enabled).
    pub fn low_bit(&self) -> u32 {
        self.tag_low_bit
    }

    /// Highest vaddr bit of the tag.
    pub fn high_bit(&self) -> u32 {
        self.high_bit
    }

    /// Lookups performed.
    pub fn accesses(&self) -> u64 {
        self.cache.accesses()
    }

    /// Lookups that resolved to a valid mapping.
    pub fn hits(&self) -> u64 {
        self.cache.hits()
    }

    /// Hit rate in [0, 1].
    pub fn hit_rate(&self) -> f64 {
        self.cache.hit_rate()
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
