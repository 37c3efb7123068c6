//! Orchestrator: drives each reference through translation and the data
//! caches, and renders the final report.
//!
//! Strictly single-threaded: one reference is fully resolved (TLBs, PWCs,
//! page table, and caches updated, counters advanced) before the next
//! begins.

use std::collections::HashMap;

use crate::common::addr::VirtAddr;
use crate::common::constants::PAGE_SHIFT;
use crate::common::error::SimError;
use crate::config::{AllocatorKind, Config};
use crate::mem::hierarchy::{CacheHierarchy, DataCache};
use crate::mem::phys::{FrameAllocator, SequentialAllocator, TwoChoiceAllocator};
use crate::mmu::page_table::PageTable;
use crate::sim::trace::MemRef;
use crate::stats::CacheSummary;

/// Top-level simulator: frame allocator, cache hierarchy, and page table,
/// plus global reference accounting.
pub struct Simulator {
    phys_mem: FrameAllocator,
    caches: CacheHierarchy,
    page_table: PageTable,
    access_count: u64,
    virtual_pages: HashMap<u64, u64>,
    physical_pages: HashMap<u64, u64>,
}

impl Simulator {
    /// Validates the configuration and builds all components.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] when validation rejects the
    /// configuration, or [`SimError::OutOfFrames`] if the root table frame
    /// cannot be allocated.
    pub fn new(config: &Config) -> Result<Self, SimError> {
        config.validate()?;

        let frames = config.memory.total_frames();
        let mut phys_mem = match config.memory.allocator {
            AllocatorKind::Sequential => {
                FrameAllocator::Sequential(SequentialAllocator::new(frames))
            }
            AllocatorKind::TwoChoice => FrameAllocator::TwoChoice(TwoChoiceAllocator::new(frames)),
        };

        let caches = CacheHierarchy::new(&config.cache);
        let page_table = PageTable::new(config, &mut phys_mem)?;

        Ok(Self {
            phys_mem,
            caches,
            page_table,
            access_count: 0,
            virtual_pages: HashMap::new(),
            physical_pages: HashMap::new(),
        })
    }

    /// Processes one reference: translate, then the demand cache access.
    ///
    /// Counters advance only after the reference completes; on error the
    /// run aborts with no partial update for this reference.
    ///
    /// # Errors
    ///
    /// Returns the translation failure (allocator exhaustion, tiny-pointer
    /// corruption); all are fatal.
    pub fn process(&mut self, reference: &MemRef) -> Result<(), SimError> {
        let paddr = self.page_table.translate(
            VirtAddr::new(reference.vaddr),
            &mut self.phys_mem,
            &mut self.caches,
        )?;
        self.caches.access(paddr, reference.is_write);

        self.access_count += 1;
        *self
            .virtual_pages
            .entry(reference.vaddr >> PAGE_SHIFT)
            .or_insert(0) += 1;
        *self.physical_pages.entry(paddr.pfn()).or_insert(0) += 1;
        Ok(())
    }

    /// References processed so far.
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    /// Distinct virtual pages touched.
    pub fn unique_virtual_pages(&self) -> u64 {
        self.virtual_pages.len() as u64
    }

    /// Distinct physical pages touched by demand accesses.
    pub fn unique_physical_pages(&self) -> u64 {
        self.physical_pages.len() as u64
    }

    /// The data cache hierarchy.
    pub fn caches(&self) -> &CacheHierarchy {
        &self.caches
    }

    /// The page table with its TLBs and PWCs.
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    /// The frame allocator.
    pub fn phys_mem(&self) -> &FrameAllocator {
        &self.phys_mem
    }

    /// Prints the requested statistics sections to stdout.
    ///
    /// # Arguments
    ///
    /// * `sections` - Section names to print, each one of `"summary"`,
    ///   `"translation"`, `"pagetable"`, or `"cache"`. An empty slice
    ///   prints all sections.
    pub fn print_stats(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);

        if want("summary") {
            println!("\n==========================================================");
            println!("MEMORY HIERARCHY SIMULATION STATISTICS");
            println!("==========================================================");
            println!("total_accesses           {}", self.access_count);
            println!("unique_virtual_pages     {}", self.virtual_pages.len());
            println!("unique_physical_pages    {}", self.physical_pages.len());
            println!(
                "allocated_frames         {} of {} ({:.2}%)",
                self.phys_mem.allocated_frames(),
                self.phys_mem.total_frames(),
                self.phys_mem.utilization() * 100.0
            );
            println!(
                "page_table_pages         {} ({:.2} MiB)",
                self.page_table.table_count(),
                self.page_table.table_bytes() as f64 / (1024.0 * 1024.0)
            );
            println!("----------------------------------------------------------");
        }

        if want("translation") {
            let ts = self.page_table.stats();
            let total = ts.total_translations().max(1);
            let pct = |v: u64| v as f64 / total as f64 * 100.0;

            println!("TRANSLATION PATH");
            println!(
                "  l1_tlb_hits            {} ({:.2}%)",
                ts.l1_tlb_hits,
                pct(ts.l1_tlb_hits)
            );
            println!(
                "  l2_tlb_hits            {} ({:.2}%)",
                ts.l2_tlb_hits,
                pct(ts.l2_tlb_hits)
            );
            println!(
                "  pmd_pwc_hits           {} ({:.2}%)",
                ts.pmd_cache_hits,
                pct(ts.pmd_cache_hits)
            );
            println!(
                "  pud_pwc_hits           {} ({:.2}%)",
                ts.pud_cache_hits,
                pct(ts.pud_cache_hits)
            );
            println!(
                "  pgd_pwc_hits           {} ({:.2}%)",
                ts.pgd_cache_hits,
                pct(ts.pgd_cache_hits)
            );
            println!(
                "  full_walks             {} ({:.2}%)",
                ts.full_walks,
                pct(ts.full_walks)
            );
            println!("  tlb_efficiency         {:.2}%", ts.tlb_efficiency() * 100.0);
            println!();

            for summary in [
                self.page_table.l1_tlb().summary(),
                self.page_table.l2_tlb().summary(),
                self.page_table.pgd_pwc().summary(),
                self.page_table.pud_pwc().summary(),
                self.page_table.pmd_pwc().summary(),
            ] {
                print_cache_line(&summary);
            }
            println!();
            println!("  tag bit ranges:");
            for pwc in [
                self.page_table.pgd_pwc(),
                self.page_table.pud_pwc(),
                self.page_table.pmd_pwc(),
            ] {
                println!(
                    "    {:<20} [{}:{}]",
                    pwc.summary().name,
                    pwc.high_bit(),
                    pwc.low_bit()
                );
            }
            println!();
            println!("  pte_entry_reads        {} hits / {} misses", ts.pte_entry_hits, ts.pte_entry_misses);
            println!("  upper_entry_reads      {} hits / {} misses", ts.upper_entry_hits, ts.upper_entry_misses);
            println!("  entry_cache_hit_rate   {:.2}%", ts.entry_cache_hit_rate() * 100.0);
            println!("  page_walk_mem_accesses {}", ts.page_walk_mem_accesses);
            println!("----------------------------------------------------------");
        }

        if want("pagetable") {
            println!("PAGE TABLE LEVELS");
            println!(
                "  {:<30} {:>10} {:>10} {:>10} {:>10}",
                "level", "accesses", "tables", "entries", "fill%"
            );
            for level in self.page_table.level_stats() {
                println!(
                    "  {:<30} {:>10} {:>10} {:>10} {:>10.2}",
                    level.name,
                    level.accesses,
                    level.allocations,
                    level.entries,
                    level.avg_fill_percent()
                );
            }
            println!("----------------------------------------------------------");
        }

        if want("cache") {
            println!("DATA CACHE HIERARCHY");
            for cache in [self.caches.l1(), self.caches.l2(), self.caches.l3()] {
                print_data_cache(cache);
            }
            println!("  memory_accesses        {}", self.caches.mem_accesses());
            println!(
                "  total_cycle_cost       {}",
                self.caches.total_cycle_cost()
            );
        }
        println!("==========================================================");
    }
}

fn print_cache_line(summary: &CacheSummary) {
    println!(
        "  {:<10} entries: {:<6} sets: {:<6} ways: {:<3} accesses: {:<12} hits: {:<12} rate: {:.2}%",
        summary.name,
        summary.entries,
        summary.sets,
        summary.ways,
        summary.accesses,
        summary.hits,
        summary.hit_rate() * 100.0
    );
}

fn print_data_cache(cache: &DataCache) {
    let summary = cache.summary();
    println!(
        "  [{}] {} KiB, {}-way, {} B lines",
        summary.name,
        summary.entries * cache.line_bytes() / 1024,
        summary.ways,
        cache.line_bytes()
    );
    println!(
        "    accesses: {}  hits: {}  hit_rate: {:.2}%",
        summary.accesses,
        summary.hits,
        summary.hit_rate() * 100.0
    );
    println!(
        "    reads: {} ({:.2}% hit)  writes: {} ({:.2}% hit)",
        cache.read_accesses(),
        cache.read_hit_rate() * 100.0,
        cache.write_accesses(),
        cache.write_hit_rate() * 100.0
    );
    println!(
        "    misses: cold {}  capacity {}  conflict {}  writebacks: {}",
        cache.cold_misses(),
        cache.capacity_misses(),
        cache.conflict_misses(),
        cache.writebacks()
    );
}
