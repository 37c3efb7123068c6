//! Statistics collection for the simulator.
//!
//! This module holds the counter structures shared across components:
//! 1. **Translation stats:** which structure resolved each reference, and
//!    how page-walk entry reads fared against the data cache.
//! 2. **Per-level page-table stats:** accesses, table allocations, entries
//!    written, and average fill.
//! 3. **Cache summaries:** geometry plus access/hit counters for reporting.
//!
//! Report rendering lives with the orchestrator; these types only count.

/// Names of the report sections accepted by the stats printer.
///
/// Pass an empty slice to print everything.
pub const STATS_SECTIONS: &[&str] = &["summary", "translation", "pagetable", "cache"];

/// Counters for the translation pipeline.
///
/// The six resolution counters partition the references: every translated
/// address bumps exactly one of them.
#[derive(Clone, Default)]
pub struct TranslationStats {
    /// References resolved by the L1 TLB.
    pub l1_tlb_hits: u64,
    /// References resolved by the L2 TLB.
    pub l2_tlb_hits: u64,
    /// References resolved by the PMD-level page-walk cache.
    pub pmd_cache_hits: u64,
    /// References resolved by the PUD-level page-walk cache.
    pub pud_cache_hits: u64,
    /// References resolved by the PGD-level page-walk cache.
    pub pgd_cache_hits: u64,
    /// References that needed a full walk from the root.
    pub full_walks: u64,

    /// PTE-level entry reads that hit the data cache.
    pub pte_entry_hits: u64,
    /// PTE-level entry reads that missed the data cache.
    pub pte_entry_misses: u64,
    /// Upper-level (PGD/PUD/PMD) entry reads that hit the data cache.
    pub upper_entry_hits: u64,
    /// Upper-level entry reads that missed the data cache.
    pub upper_entry_misses: u64,

    /// Entry reads that went to memory (cache miss or uncachable).
    pub page_walk_mem_accesses: u64,
}

impl TranslationStats {
    /// Total references translated: the sum of the six resolution counters.
    pub fn total_translations(&self) -> u64 {
        self.l1_tlb_hits
            + self.l2_tlb_hits
            + self.pmd_cache_hits
            + self.pud_cache_hits
            + self.pgd_cache_hits
            + self.full_walks
    }

    /// Fraction of references resolved by either TLB level.
    pub fn tlb_efficiency(&self) -> f64 {
        let total = self.total_translations();
        if total > 0 {
            (self.l1_tlb_hits + self.l2_tlb_hits) as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Hit ratio of cached page-table entry reads, all levels.
    pub fn entry_cache_hit_rate(&self) -> f64 {
        let hits = self.pte_entry_hits + self.upper_entry_hits;
        let total = hits + self.pte_entry_misses + self.upper_entry_misses;
        if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Per-level page-table statistics.
#[derive(Clone)]
pub struct LevelStats {
    /// Level name for reporting.
    pub name: &'static str,
    /// Entry reads at this level that reached memory.
    pub accesses: u64,
    /// Tables allocated at this level.
    pub allocations: u64,
    /// Entries written into this level's tables.
    pub entries: u64,
    /// Entries per table at this level.
    pub table_entries: u64,
}

impl LevelStats {
    /// Creates zeroed stats for a level with `table_entries` per table.
    pub fn new(name: &'static str, table_entries: u64) -> Self {
        Self {
            name,
            accesses: 0,
            allocations: 0,
            entries: 0,
            table_entries,
        }
    }

    /// Average fill of this level's tables, as a percentage.
    pub fn avg_fill_percent(&self) -> f64 {
        if self.allocations == 0 {
            return 0.0;
        }
        (self.entries as f64 / self.allocations as f64) / self.table_entries as f64 * 100.0
    }
}

/// Geometry and hit counters of one cache, for the report.
#[derive(Clone)]
pub struct CacheSummary {
    /// Cache name.
    pub name: String,
    /// Total entries.
    pub entries: u64,
    /// Number of sets.
    pub sets: u64,
    /// Associativity.
    pub ways: u64,
    /// Lookups performed.
    pub accesses: u64,
    /// Lookups that hit.
    pub hits: u64,
}

impl CacheSummary {
    /// Hit rate in [0, 1].
    pub fn hit_rate(&self) -> f64 {
        if self.accesses > 0 {
            self.hits as f64 / self.accesses as f64
        } else {
            0.0
        }
    }
}
