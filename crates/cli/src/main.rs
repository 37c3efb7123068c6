//! Memory-hierarchy offline analyzer CLI.
//!
//! This binary drives the simulation core over a binary reference trace:
//! 1. **Configuration:** built-in defaults, an optional JSON file, and flag
//!    overrides, applied in that order.
//! 2. **Run loop:** streams trace records through the simulator with a
//!    periodic progress line; a partial record at EOF is a warning, not an
//!    error.
//! 3. **Report:** prints the selected statistics sections and exits.

use std::process;
use std::time::Instant;

use clap::Parser;

use memsim_core::common::error::TraceError;
use memsim_core::config::{AllocatorKind, Config};
use memsim_core::sim::{Simulator, TraceReader};

#[derive(Parser, Debug)]
#[command(
    name = "memsim",
    author,
    version,
    about = "Offline memory-hierarchy analyzer",
    long_about = "Replays a binary reference trace through a two-level TLB, page-walk caches,\n\
                  a four-level radix page table, and an inclusive L1/L2/L3 data cache,\n\
                  then reports hit rates, walk statistics, and memory traffic.\n\n\
                  Examples:\n  \
                  memsim traces/long_trace.dat\n  \
                  memsim --l1-tlb-size 128 --toc-enabled --toc-size 16 traces/gups.dat\n  \
                  memsim --config sweep/base.json --max-refs 10000000 traces/gups.dat"
)]
struct Cli {
    /// Path to the binary trace file (24-byte records).
    trace: String,

    /// JSON configuration file applied before flag overrides.
    #[arg(long)]
    config: Option<String>,

    /// Physical memory size in GiB.
    #[arg(long)]
    phys_mem_gib: Option<u64>,

    /// Frame allocator: sequential or two-choice.
    #[arg(long)]
    allocator: Option<String>,

    /// L1 TLB entries.
    #[arg(long)]
    l1_tlb_size: Option<u64>,

    /// L1 TLB associativity.
    #[arg(long)]
    l1_tlb_ways: Option<u64>,

    /// L2 TLB entries.
    #[arg(long)]
    l2_tlb_size: Option<u64>,

    /// L2 TLB associativity.
    #[arg(long)]
    l2_tlb_ways: Option<u64>,

    /// PGD page-walk cache entries.
    #[arg(long)]
    pgd_pwc_size: Option<u64>,

    /// PGD page-walk cache associativity.
    #[arg(long)]
    pgd_pwc_ways: Option<u64>,

    /// PUD page-walk cache entries.
    #[arg(long)]
    pud_pwc_size: Option<u64>,

    /// PUD page-walk cache associativity.
    #[arg(long)]
    pud_pwc_ways: Option<u64>,

    /// PMD page-walk cache entries.
    #[arg(long)]
    pmd_pwc_size: Option<u64>,

    /// PMD page-walk cache associativity.
    #[arg(long)]
    pmd_pwc_ways: Option<u64>,

    /// Attach a table-of-contents sub-table to each PWC entry.
    #[arg(long)]
    toc_enabled: bool,

    /// TOC sub-table slots (power of two).
    #[arg(long)]
    toc_size: Option<u64>,

    /// L1 cache size in bytes.
    #[arg(long)]
    l1_cache_size: Option<u64>,

    /// L1 cache associativity.
    #[arg(long)]
    l1_ways: Option<u64>,

    /// L1 cache line size in bytes.
    #[arg(long)]
    l1_line: Option<u64>,

    /// L2 cache size in bytes.
    #[arg(long)]
    l2_cache_size: Option<u64>,

    /// L2 cache associativity.
    #[arg(long)]
    l2_ways: Option<u64>,

    /// L2 cache line size in bytes.
    #[arg(long)]
    l2_line: Option<u64>,

    /// L3 cache size in bytes.
    #[arg(long)]
    l3_cache_size: Option<u64>,

    /// L3 cache associativity.
    #[arg(long)]
    l3_ways: Option<u64>,

    /// L3 cache line size in bytes.
    #[arg(long)]
    l3_line: Option<u64>,

    /// PGD entries per table.
    #[arg(long)]
    pgd_entries: Option<u64>,

    /// PUD entries per table.
    #[arg(long)]
    pud_entries: Option<u64>,

    /// PMD entries per table.
    #[arg(long)]
    pmd_entries: Option<u64>,

    /// PTE entries per table.
    #[arg(long)]
    pte_entries: Option<u64>,

    /// PUD entry width in bytes (8, 4, 2, or 1).
    #[arg(long)]
    pud_entry_width: Option<u32>,

    /// PMD entry width in bytes.
    #[arg(long)]
    pmd_entry_width: Option<u32>,

    /// PTE entry width in bytes.
    #[arg(long)]
    pte_entry_width: Option<u32>,

    /// Let page-table entry reads use the data cache.
    #[arg(long)]
    pte_cachable: bool,

    /// Stop after this many references.
    #[arg(long)]
    max_refs: Option<u64>,

    /// Report sections to print (summary, translation, pagetable, cache).
    #[arg(long, value_delimiter = ',')]
    sections: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path).unwrap_or_else(|e| {
            eprintln!("Error reading config {}: {}", path, e);
            process::exit(1);
        }),
        None => Config::default(),
    };
    apply_overrides(&mut config, &cli);

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let mut sim = Simulator::new(&config).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    let reader = TraceReader::from_file(&cli.trace).unwrap_or_else(|e| {
        eprintln!("Error: could not open trace {}: {}", cli.trace, e);
        process::exit(1);
    });

    println!("Starting offline analysis of {}", cli.trace);
    let start = Instant::now();
    let mut last_report = start;

    for record in reader {
        let reference = match record {
            Ok(r) => r,
            Err(TraceError::PartialRecord { bytes }) => {
                eprintln!(
                    "Warning: partial record ({} of 24 bytes) at end of trace, skipping",
                    bytes
                );
                break;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        };

        if let Err(e) = sim.process(&reference) {
            eprintln!("Error: {}", e);
            sim.print_stats(&cli.sections);
            process::exit(1);
        }

        if let Some(limit) = config.general.max_refs {
            if sim.access_count() >= limit {
                println!("Reference limit of {} reached", limit);
                break;
            }
        }

        if last_report.elapsed().as_secs() >= config.general.progress_secs {
            println!("Processed {} accesses", sim.access_count());
            last_report = Instant::now();
        }
    }

    println!(
        "Analysis complete: {} accesses in {:.1} s",
        sim.access_count(),
        start.elapsed().as_secs_f64()
    );
    sim.print_stats(&cli.sections);
}

/// Applies flag overrides on top of the loaded configuration.
fn apply_overrides(config: &mut Config, cli: &Cli) {
    macro_rules! set {
        ($dst:expr, $src:expr) => {
            if let Some(v) = $src {
                $dst = v;
            }
        };
    }

    set!(config.memory.phys_mem_gib, cli.phys_mem_gib);
    if let Some(kind) = &cli.allocator {
        config.memory.allocator = match kind.to_ascii_lowercase().as_str() {
            "sequential" => AllocatorKind::Sequential,
            "two-choice" | "twochoice" => AllocatorKind::TwoChoice,
            other => {
                eprintln!(
                    "Error: unknown allocator '{}', expected sequential or two-choice",
                    other
                );
                process::exit(1);
            }
        };
    }

    set!(config.tlb.l1_size, cli.l1_tlb_size);
    set!(config.tlb.l1_ways, cli.l1_tlb_ways);
    set!(config.tlb.l2_size, cli.l2_tlb_size);
    set!(config.tlb.l2_ways, cli.l2_tlb_ways);

    set!(config.pwc.pgd_size, cli.pgd_pwc_size);
    set!(config.pwc.pgd_ways, cli.pgd_pwc_ways);
    set!(config.pwc.pud_size, cli.pud_pwc_size);
    set!(config.pwc.pud_ways, cli.pud_pwc_ways);
    set!(config.pwc.pmd_size, cli.pmd_pwc_size);
    set!(config.pwc.pmd_ways, cli.pmd_pwc_ways);
    if cli.toc_enabled {
        config.pwc.toc_enabled = true;
    }
    set!(config.pwc.toc_size, cli.toc_size);

    set!(config.cache.l1_size, cli.l1_cache_size);
    set!(config.cache.l1_ways, cli.l1_ways);
    set!(config.cache.l1_line, cli.l1_line);
    set!(config.cache.l2_size, cli.l2_cache_size);
    set!(config.cache.l2_ways, cli.l2_ways);
    set!(config.cache.l2_line, cli.l2_line);
    set!(config.cache.l3_size, cli.l3_cache_size);
    set!(config.cache.l3_ways, cli.l3_ways);
    set!(config.cache.l3_line, cli.l3_line);

    set!(config.page_table.pgd_entries, cli.pgd_entries);
    set!(config.page_table.pud_entries, cli.pud_entries);
    set!(config.page_table.pmd_entries, cli.pmd_entries);
    set!(config.page_table.pte_entries, cli.pte_entries);
    if cli.pud_entry_width.is_some() {
        config.page_table.pud_entry_width = cli.pud_entry_width;
    }
    if cli.pmd_entry_width.is_some() {
        config.page_table.pmd_entry_width = cli.pmd_entry_width;
    }
    if cli.pte_entry_width.is_some() {
        config.page_table.pte_entry_width = cli.pte_entry_width;
    }
    if cli.pte_cachable {
        config.page_table.pte_cachable = true;
    }

    if cli.max_refs.is_some() {
        config.general.max_refs = cli.max_refs;
    }
}
