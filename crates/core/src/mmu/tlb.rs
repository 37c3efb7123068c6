//! Translation Lookaside Buffer.
//!
//! A set-associative cache of completed translations, keyed by virtual page
//! number with the physical frame number as the value. TLB entries are never
//! dirty; evictions are silent.

use crate::mem::cache::SetAssociativeCache;
use crate::stats::CacheSummary;

/// One TLB level. The translator holds two (L1 and L2).
pub struct Tlb {
    cache: SetAssociativeCache<u64, u64>,
}

impl Tlb {
    /// Creates a TLB of `entries` total entries at the given associativity.
    ///
    /// # Arguments
    ///
    /// * `name` - Cache name used in reports.
    /// * `entries` - Total entries; divided by `ways` to give the set count.
    /// * `ways` - Associativity.
    pub fn new(name: &str, entries: u64, ways: u64) -> Self {
        Self {
            cache: SetAssociativeCache::new(name, entries / ways, ways),
        }
    }

    /// Looks up the frame number for a virtual page number.
    ///
    /// # Returns
    ///
    /// `Some(pfn)` when the VPN is cached, otherwise `None`.
    #[inline(always)]
    pub fn lookup(&mut self, vpn: u64) -> Option<u64> {
        self.cache.lookup(vpn).copied()
    }

    /// Installs a translation. Displaced entries are dropped.
    pub fn insert(&mut self, vpn: u64, pfn: u64) {
        self.cache.insert(vpn, pfn, false);
    }

    /// Lookups performed.
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
