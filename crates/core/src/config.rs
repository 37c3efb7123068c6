//! Configuration system for the memory-hierarchy simulator.
//!
//! This module defines all configuration structures used to parameterize a
//! run. It provides:
//! 1. **Defaults:** Baseline hardware constants (TLBs, PWCs, caches, page table).
//! 2. **Structures:** Hierarchical config for memory, TLB, PWC, cache, and page table.
//! 3. **Validation:** Geometry checks performed once, before construction.
//!
//! Configuration is supplied via JSON (`Config::from_json_file`) with CLI
//! overrides applied on top, or use `Config::default()`.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::constants::{PAGE_SHIFT, PAGE_SIZE, VADDR_BITS};
use crate::common::error::ConfigError;

/// Default configuration constants.
///
/// These values define the baseline hardware configuration when not
/// explicitly overridden.
mod defaults {
    /// Physical memory size in GiB.
    pub const PHYS_MEM_GIB: u64 = 1;

    /// L1 TLB entry count.
    pub const L1_TLB_SIZE: u64 = 64;

    /// L1 TLB associativity.
    pub const L1_TLB_WAYS: u64 = 4;

    /// L2 TLB entry count.
    pub const L2_TLB_SIZE: u64 = 1024;

    /// L2 TLB associativity.
    pub const L2_TLB_WAYS: u64 = 8;

    /// Page-walk cache entry count (each of PGD/PUD/PMD).
    pub const PWC_SIZE: u64 = 16;

    /// Page-walk cache associativity.
    pub const PWC_WAYS: u64 = 4;

    /// L1 data cache size in bytes (32 KiB).
    pub const L1_CACHE_SIZE: u64 = 32 * 1024;

    /// L1 data cache associativity.
    pub const L1_CACHE_WAYS: u64 = 8;

    /// L2 data cache size in bytes (256 KiB).
    pub const L2_CACHE_SIZE: u64 = 256 * 1024;

    /// L2 data cache associativity.
    pub const L2_CACHE_WAYS: u64 = 16;

    /// L3 data cache size in bytes (8 MiB).
    pub const L3_CACHE_SIZE: u64 = 8 * 1024 * 1024;

    /// L3 data cache associativity.
    pub const L3_CACHE_WAYS: u64 = 16;

    /// Cache line size in bytes, all levels.
    pub const CACHE_LINE: u64 = 64;

    /// Entries per page-table level (512 x 8 bytes fills a 4 KiB page).
    pub const LEVEL_ENTRIES: u64 = 512;

    /// Seconds between progress lines while processing a trace.
    pub const PROGRESS_SECS: u64 = 5;
}

/// Frame allocator variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum AllocatorKind {
    /// Bump allocator issuing frames in order. Cannot produce tiny pointers.
    #[default]
    Sequential,
    /// Two-choice hashed bin allocator with tiny-pointer side-band encoding.
    /// Required whenever a page-table level uses an entry width below 8.
    TwoChoice,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use memsim_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.tlb.l1_size, 64);
/// assert_eq!(config.cache.l1_size, 32 * 1024);
/// assert!(config.validate().is_ok());
/// ```
///
/// Deserializing a partial override from JSON:
///
/// ```
/// use memsim_core::config::Config;
///
/// let json = r#"{
///     "page_table": { "pte_entries": 1024, "pmd_entries": 256 },
///     "memory": { "allocator": "TwoChoice" }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.page_table.pte_entries, 1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Physical memory and allocator selection.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Two-level TLB geometry.
    #[serde(default)]
    pub tlb: TlbConfig,
    /// Page-walk cache geometry and TOC mode.
    #[serde(default)]
    pub pwc: PwcConfig,
    /// Three-level data cache geometry.
    #[serde(default)]
    pub cache: CacheHierarchyConfig,
    /// Radix page-table geometry.
    #[serde(default)]
    pub page_table: PageTableConfig,
    /// Run control.
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Physical memory configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Physical memory size in GiB.
    #[serde(default = "MemoryConfig::default_phys_mem_gib")]
    pub phys_mem_gib: u64,

    /// Frame allocator variant.
    #[serde(default)]
    pub allocator: AllocatorKind,
}

impl MemoryConfig {
    /// Returns the default physical memory size in GiB.
    fn default_phys_mem_gib() -> u64 {
        defaults::PHYS_MEM_GIB
    }

    /// Total physical memory in bytes.
    pub fn phys_mem_bytes(&self) -> u64 {
        self.phys_mem_gib * 1024 * 1024 * 1024
    }

    /// Total physical frames.
    pub fn total_frames(&self) -> u64 {
        self.phys_mem_bytes() / PAGE_SIZE
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            phys_mem_gib: defaults::PHYS_MEM_GIB,
            allocator: AllocatorKind::default(),
        }
    }
}

/// Two-level TLB configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TlbConfig {
    /// L1 TLB total entries.
    #[serde(default = "TlbConfig::default_l1_size")]
    pub l1_size: u64,

    /// L1 TLB associativity.
    #[serde(default = "TlbConfig::default_l1_ways")]
    pub l1_ways: u64,

    /// L2 TLB total entries.
    #[serde(default = "TlbConfig::default_l2_size")]
    pub l2_size: u64,

    /// L2 TLB associativity.
    #[serde(default = "TlbConfig::default_l2_ways")]
    pub l2_ways: u64,
}

impl TlbConfig {
    /// Returns the default L1 TLB entry count.
    fn default_l1_size() -> u64 {
        defaults::L1_TLB_SIZE
    }

    /// Returns the default L1 TLB associativity.
    fn default_l1_ways() -> u64 {
        defaults::L1_TLB_WAYS
    }

    /// Returns the default L2 TLB entry count.
    fn default_l2_size() -> u64 {
        defaults::L2_TLB_SIZE
    }

    /// Returns the default L2 TLB associativity.
    fn default_l2_ways() -> u64 {
        defaults::L2_TLB_WAYS
    }
}

impl Default for TlbConfig {
    fn default() -> Self {
        Self {
            l1_size: defaults::L1_TLB_SIZE,
            l1_ways: defaults::L1_TLB_WAYS,
            l2_size: defaults::L2_TLB_SIZE,
            l2_ways: defaults::L2_TLB_WAYS,
        }
    }
}

/// Page-walk cache configuration, one set of knobs per level plus TOC mode.
#[derive(Debug, Clone, Deserialize)]
pub struct PwcConfig {
    /// PGD-level PWC total entries.
    #[serde(default = "PwcConfig::default_size")]
    pub pgd_size: u64,

    /// PGD-level PWC associativity.
    #[serde(default = "PwcConfig::default_ways")]
    pub pgd_ways: u64,

    /// PUD-level PWC total entries.
    #[serde(default = "PwcConfig::default_size")]
    pub pud_size: u64,

    /// PUD-level PWC associativity.
    #[serde(default = "PwcConfig::default_ways")]
    pub pud_ways: u64,

    /// PMD-level PWC total entries.
    #[serde(default = "PwcConfig::default_size")]
    pub pmd_size: u64,

    /// PMD-level PWC associativity.
    #[serde(default = "PwcConfig::default_ways")]
    pub pmd_ways: u64,

    /// Attach a table-of-contents sub-table to every PWC entry.
    #[serde(default)]
    pub toc_enabled: bool,

    /// Slots per TOC sub-table. Power of two; 0 when disabled.
    #[serde(default)]
    pub toc_size: u64,
}

impl PwcConfig {
    /// Returns the default PWC entry count, shared by all three levels.
    fn default_size() -> u64 {
        defaults::PWC_SIZE
    }

    /// Returns the default PWC associativity, shared by all three levels.
    fn default_ways() -> u64 {
        defaults::PWC_WAYS
    }
}

impl Default for PwcConfig {
    fn default() -> Self {
        Self {
            pgd_size: defaults::PWC_SIZE,
            pgd_ways: defaults::PWC_WAYS,
            pud_size: defaults::PWC_SIZE,
            pud_ways: defaults::PWC_WAYS,
            pmd_size: defaults::PWC_SIZE,
            pmd_ways: defaults::PWC_WAYS,
            toc_enabled: false,
            toc_size: 0,
        }
    }
}

/// Data cache hierarchy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheHierarchyConfig {
    /// L1 total size in bytes.
    #[serde(default = "CacheHierarchyConfig::default_l1_size")]
    pub l1_size: u64,

    /// L1 associativity.
    #[serde(default = "CacheHierarchyConfig::default_l1_ways")]
    pub l1_ways: u64,

    /// L1 line size in bytes.
    #[serde(default = "CacheHierarchyConfig::default_line")]
    pub l1_line: u64,

    /// L2 total size in bytes.
    #[serde(default = "CacheHierarchyConfig::default_l2_size")]
    pub l2_size: u64,

    /// L2 associativity.
    #[serde(default = "CacheHierarchyConfig::default_l2_ways")]
    pub l2_ways: u64,

    /// L2 line size in bytes.
    #[serde(default = "CacheHierarchyConfig::default_line")]
    pub l2_line: u64,

    /// L3 total size in bytes.
    #[serde(default = "CacheHierarchyConfig::default_l3_size")]
    pub l3_size: u64,

    /// L3 associativity.
    #[serde(default = "CacheHierarchyConfig::default_l3_ways")]
    pub l3_ways: u64,

    /// L3 line size in bytes.
    #[serde(default = "CacheHierarchyConfig::default_line")]
    pub l3_line: u64,
}

impl CacheHierarchyConfig {
    /// Returns the default L1 cache size in bytes.
    fn default_l1_size() -> u64 {
        defaults::L1_CACHE_SIZE
    }

    /// Returns the default L1 cache associativity.
    fn default_l1_ways() -> u64 {
        defaults::L1_CACHE_WAYS
    }

    /// Returns the default L2 cache size in bytes.
    fn default_l2_size() -> u64 {
        defaults::L2_CACHE_SIZE
    }

    /// Returns the default L2 cache associativity.
    fn default_l2_ways() -> u64 {
        defaults::L2_CACHE_WAYS
    }

    /// Returns the default L3 cache size in bytes.
    fn default_l3_size() -> u64 {
        defaults::L3_CACHE_SIZE
    }

    /// Returns the default L3 cache associativity.
    fn default_l3_ways() -> u64 {
        defaults::L3_CACHE_WAYS
    }

    /// Returns the default cache line size in bytes, shared by all levels.
    fn default_line() -> u64 {
        defaults::CACHE_LINE
    }
}

impl Default for CacheHierarchyConfig {
    fn default() -> Self {
        Self {
            l1_size: defaults::L1_CACHE_SIZE,
            l1_ways: defaults::L1_CACHE_WAYS,
            l1_line: defaults::CACHE_LINE,
            l2_size: defaults::L2_CACHE_SIZE,
            l2_ways: defaults::L2_CACHE_WAYS,
            l2_line: defaults::CACHE_LINE,
            l3_size: defaults::L3_CACHE_SIZE,
            l3_ways: defaults::L3_CACHE_WAYS,
            l3_line: defaults::CACHE_LINE,
        }
    }
}

/// Radix page-table configuration.
///
/// Entry widths may be given per level; when absent they are derived so a
/// fully-populated table fills its 4 KiB page (`4096 / entries`, at most 8).
/// The PGD always uses 8-byte entries.
#[derive(Debug, Clone, Deserialize)]
pub struct PageTableConfig {
    /// PGD entries.
    #[serde(default = "PageTableConfig::default_entries")]
    pub pgd_entries: u64,

    /// PUD entries.
    #[serde(default = "PageTableConfig::default_entries")]
    pub pud_entries: u64,

    /// PMD entries.
    #[serde(default = "PageTableConfig::default_entries")]
    pub pmd_entries: u64,

    /// PTE entries.
    #[serde(default = "PageTableConfig::default_entries")]
    pub pte_entries: u64,

    /// PUD entry width in bytes, derived from `pud_entries` when absent.
    #[serde(default)]
    pub pud_entry_width: Option<u32>,

    /// PMD entry width in bytes, derived when absent.
    #[serde(default)]
    pub pmd_entry_width: Option<u32>,

    /// PTE entry width in bytes, derived when absent.
    #[serde(default)]
    pub pte_entry_width: Option<u32>,

    /// When false, page-table entry reads bypass the data cache.
    #[serde(default)]
    pub pte_cachable: bool,
}

impl PageTableConfig {
    /// Returns the default entry count, shared by all four levels.
    fn default_entries() -> u64 {
        defaults::LEVEL_ENTRIES
    }

    /// Resolved PUD entry width in bytes.
    pub fn pud_width(&self) -> u32 {
        self.pud_entry_width
            .unwrap_or_else(|| derived_width(self.pud_entries))
    }

    /// Resolved PMD entry width in bytes.
    pub fn pmd_width(&self) -> u32 {
        self.pmd_entry_width
            .unwrap_or_else(|| derived_width(self.pmd_entries))
    }

    /// Resolved PTE entry width in bytes.
    pub fn pte_width(&self) -> u32 {
        self.pte_entry_width
            .unwrap_or_else(|| derived_width(self.pte_entries))
    }
}

impl Default for PageTableConfig {
    fn default() -> Self {
        Self {
            pgd_entries: defaults::LEVEL_ENTRIES,
            pud_entries: defaults::LEVEL_ENTRIES,
            pmd_entries: defaults::LEVEL_ENTRIES,
            pte_entries: defaults::LEVEL_ENTRIES,
            pud_entry_width: None,
            pmd_entry_width: None,
            pte_entry_width: None,
            pte_cachable: false,
        }
    }
}

/// Run control configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Stop after this many references; `None` runs to trace exhaustion.
    #[serde(default)]
    pub max_refs: Option<u64>,

    /// Seconds between progress lines.
    #[serde(default = "GeneralConfig::default_progress_secs")]
    pub progress_secs: u64,
}

impl GeneralConfig {
    /// Returns the default interval between progress lines, in seconds.
    fn default_progress_secs() -> u64 {
        defaults::PROGRESS_SECS
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_refs: None,
            progress_secs: defaults::PROGRESS_SECS,
        }
    }
}

/// Entry width that fills a 4 KiB table page at the given fan-out, capped
/// at the classical 8-byte entry. Yields 0 for fan-outs above 4096, which
/// validation rejects.
fn derived_width(entries: u64) -> u32 {
    if entries == 0 {
        return 0;
    }
    ((PAGE_SIZE / entries) as u32).min(8)
}

fn is_pow2(v: u64) -> bool {
    v != 0 && v & (v - 1) == 0
}

fn log2(v: u64) -> u32 {
    63 - v.leading_zeros()
}

/// Checks one set-associative structure: total entries divisible by ways,
/// and the resulting set count a power of two.
fn check_sets(field: &'static str, size: u64, ways: u64) -> Result<(), ConfigError> {
    if ways == 0 || size % ways != 0 {
        return Err(ConfigError::IndivisibleSets { field, size, ways });
    }
    if !is_pow2(size / ways) {
        return Err(ConfigError::NotPowerOfTwo {
            field,
            value: size / ways,
        });
    }
    Ok(())
}

fn check_cache(
    field: &'static str,
    line_field: &'static str,
    size: u64,
    ways: u64,
    line: u64,
) -> Result<(), ConfigError> {
    if !is_pow2(line) {
        return Err(ConfigError::NotPowerOfTwo {
            field: line_field,
            value: line,
        });
    }
    check_sets(field, size, ways * line)
}

fn check_level(
    level: &'static str,
    entries: u64,
    width: u32,
    allocator: AllocatorKind,
) -> Result<(), ConfigError> {
    if !is_pow2(entries) {
        return Err(ConfigError::NotPowerOfTwo {
            field: level,
            value: entries,
        });
    }
    if !matches!(width, 1 | 2 | 4 | 8) {
        return Err(ConfigError::EntryWidth { level, width });
    }
    if entries * width as u64 > PAGE_SIZE {
        return Err(ConfigError::TableOverflow {
            level,
            entries,
            width,
        });
    }
    if width < 8 && allocator != AllocatorKind::TwoChoice {
        return Err(ConfigError::AllocatorMismatch { level });
    }
    Ok(())
}

impl Config {
    /// Loads a configuration from a JSON file. Absent fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be read, or the
    /// serde_json error if it does not parse as a configuration.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Validates the whole configuration.
    ///
    /// Every structural constraint is checked here, once; the components
    /// assume validated geometry.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first violated constraint:
    /// a set count, entry count, line size, or TOC size that is not a power
    /// of two; a size not divisible by its associativity; an entry width
    /// outside {1, 2, 4, 8} or overflowing the 4 KiB table page; a narrow
    /// entry width combined with the sequential allocator; or per-level
    /// index widths that do not span the 48-bit virtual address.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory.phys_mem_gib < 1 {
            return Err(ConfigError::PhysMemTooSmall {
                gib: self.memory.phys_mem_gib,
            });
        }

        check_sets("L1 TLB", self.tlb.l1_size, self.tlb.l1_ways)?;
        check_sets("L2 TLB", self.tlb.l2_size, self.tlb.l2_ways)?;

        check_sets("PGD PWC", self.pwc.pgd_size, self.pwc.pgd_ways)?;
        check_sets("PUD PWC", self.pwc.pud_size, self.pwc.pud_ways)?;
        check_sets("PMD PWC", self.pwc.pmd_size, self.pwc.pmd_ways)?;

        if self.pwc.toc_enabled {
            if !is_pow2(self.pwc.toc_size) {
                return Err(ConfigError::TocSize {
                    size: self.pwc.toc_size,
                    enabled: true,
                });
            }
        } else if self.pwc.toc_size != 0 {
            return Err(ConfigError::TocSize {
                size: self.pwc.toc_size,
                enabled: false,
            });
        }

        let c = &self.cache;
        check_cache("L1 cache", "L1 line", c.l1_size, c.l1_ways, c.l1_line)?;
        check_cache("L2 cache", "L2 line", c.l2_size, c.l2_ways, c.l2_line)?;
        check_cache("L3 cache", "L3 line", c.l3_size, c.l3_ways, c.l3_line)?;

        let pt = &self.page_table;
        let alloc = self.memory.allocator;
        check_level("PGD", pt.pgd_entries, 8, alloc)?;
        check_level("PUD", pt.pud_entries, pt.pud_width(), alloc)?;
        check_level("PMD", pt.pmd_entries, pt.pmd_width(), alloc)?;
        check_level("PTE", pt.pte_entries, pt.pte_width(), alloc)?;

        let span = PAGE_SHIFT
            + log2(pt.pgd_entries)
            + log2(pt.pud_entries)
            + log2(pt.pmd_entries)
            + log2(pt.pte_entries);
        if span != VADDR_BITS {
            return Err(ConfigError::AddressSpan { bits: span });
        }

        Ok(())
    }
}
