//! Statistics Structure Unit Tests.
//!
//! Verifies default initialization and derived-metric computation for the
//! translation and per-level counter structures.

use memsim_core::stats::{CacheSummary, LevelStats, TranslationStats, STATS_SECTIONS};

#[test]
fn default_translation_stats_all_zero() {
    let ts = TranslationStats::default();
    assert_eq!(ts.l1_tlb_hits, 0);
    assert_eq!(ts.l2_tlb_hits, 0);
    assert_eq!(ts.pmd_cache_hits, 0);
    assert_eq!(ts.pud_cache_hits, 0);
    assert_eq!(ts.pgd_cache_hits, 0);
    assert_eq!(ts.full_walks, 0);
    assert_eq!(ts.page_walk_mem_accesses, 0);
    assert_eq!(ts.total_translations(), 0);
    assert_eq!(ts.tlb_efficiency(), 0.0);
    assert_eq!(ts.entry_cache_hit_rate(), 0.0);
}

#[test]
fn resolution_counters_sum_to_total() {
    let mut ts = TranslationStats::default();
    ts.l1_tlb_hits = 40;
    ts.l2_tlb_hits = 20;
    ts.pmd_cache_hits = 15;
    ts.pud_cache_hits = 10;
    ts.pgd_cache_hits = 10;
    ts.full_walks = 5;
    assert_eq!(ts.total_translations(), 100);
    assert!((ts.tlb_efficiency() - 0.6).abs() < 1e-12);
}

#[test]
fn entry_cache_hit_rate_spans_levels() {
    let mut ts = TranslationStats::default();
    ts.pte_entry_hits = 30;
    ts.pte_entry_misses = 10;
    ts.upper_entry_hits = 20;
    ts.upper_entry_misses = 40;
    assert!((ts.entry_cache_hit_rate() - 0.5).abs() < 1e-12);
}

#[test]
fn level_fill_averages_over_tables() {
    let mut level = LevelStats::new("PTE (Page Table Entry)", 512);
    assert_eq!(level.avg_fill_percent(), 0.0);

    level.allocations = 2;
    level.entries = 512; // two half-full tables
    assert!((level.avg_fill_percent() - 50.0).abs() < 1e-9);
}

#[test]
fn cache_summary_hit_rate() {
    let summary = CacheSummary {
        name: "L1 Cache".to_string(),
        entries: 512,
        sets: 64,
        ways: 8,
        accesses: 200,
        hits: 150,
    };
    assert!((summary.hit_rate() - 0.75).abs() < 1e-12);
}

#[test]
fn report_sections_are_stable() {
    assert_eq!(
        STATS_SECTIONS,
        &["summary", "translation", "pagetable", "cache"]
    );
}
