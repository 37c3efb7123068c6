//! Four-level radix page table and walker.
//!
//! The table spans virtual address bits `[47:12]` across four levels (PGD,
//! PUD, PMD, PTE) with configurable fan-out per level. Each level's table
//! occupies one 4 KiB page of entries whose width is 8, 4, 2, or 1 bytes;
//! the PGD always uses the classical 8-byte entry. Narrow entries hold a
//! tiny pointer instead of a frame number and decode it against the
//! containing table's address through the two-choice allocator.
//!
//! Tables are allocated on first touch and never freed during a run. The
//! walker consults, in order: L1 TLB, L2 TLB, PMD PWC, PUD PWC, PGD PWC,
//! and finally the full walk from `cr3`; every step that consults a table
//! issues a translation-path data-cache access for the entry just read.

use std::collections::HashMap;

use crate::common::addr::{PhysAddr, VirtAddr};
use crate::common::constants::{PAGE_SHIFT, PAGE_SIZE, VADDR_TOP_BIT};
use crate::common::error::SimError;
use crate::config::Config;
use crate::mem::hierarchy::CacheHierarchy;
use crate::mem::phys::FrameAllocator;
use crate::mmu::pwc::PageWalkCache;
use crate::mmu::tlb::Tlb;
use crate::stats::{LevelStats, TranslationStats};

/// Present bit, common to every entry width (bit 0).
const PTE_PRESENT_BIT: u64 = 1;

/// Writable bit of the 8-byte entry (bit 1).
const PTE_WRITABLE_BIT: u64 = 1 << 1;

/// Frame number position in the 8-byte entry (bits 3..=54).
const PTE_PFN_SHIFT: u32 = 3;

/// Frame number width in the 8-byte entry.
const PTE_PFN_MASK: u64 = (1 << 52) - 1;

/// The classical 8-byte page-table entry:
/// `present:1, writable:1, user:1, pfn:52, unused:9`.
#[derive(Clone, Copy)]
struct Pte8(u64);

impl Pte8 {
    fn new(raw: u64) -> Self {
        Self(raw)
    }

    fn raw(&self) -> u64 {
        self.0
    }

    fn is_present(&self) -> bool {
        self.0 & PTE_PRESENT_BIT != 0
    }

    fn pfn(&self) -> u64 {
        (self.0 >> PTE_PFN_SHIFT) & PTE_PFN_MASK
    }

    /// A present, writable entry pointing at `pfn`.
    fn table(pfn: u64) -> Self {
        Self(PTE_PRESENT_BIT | PTE_WRITABLE_BIT | ((pfn & PTE_PFN_MASK) << PTE_PFN_SHIFT))
    }
}

/// Tiny-pointer field width for a narrow entry width:
/// 4-byte and 2-byte entries carry 8 pointer bits, 1-byte entries carry 6.
fn tiny_ptr_bits(width: u32) -> u32 {
    if width == 1 {
        6
    } else {
        8
    }
}

/// The tiny pointer occupies the top bits of a narrow entry, above the
/// present bit and the control field.
fn tiny_ptr_shift(width: u32) -> u32 {
    width * 8 - tiny_ptr_bits(width)
}

fn narrow_tiny_ptr(raw: u64, width: u32) -> u8 {
    ((raw >> tiny_ptr_shift(width)) & ((1 << tiny_ptr_bits(width)) - 1)) as u8
}

/// A present narrow entry with zeroed control bits and the given pointer.
fn narrow_entry(ptr: u8, width: u32) -> u64 {
    PTE_PRESENT_BIT | ((ptr as u64) << tiny_ptr_shift(width))
}

/// One 4 KiB page of page-table entries, viewed through width-aware
/// accessors. Kept as raw bytes so the wire layout stays exact.
pub(crate) struct PageTablePage {
    bytes: Box<[u8; PAGE_SIZE as usize]>,
}

impl PageTablePage {
    fn new() -> Self {
        Self {
            bytes: Box::new([0; PAGE_SIZE as usize]),
        }
    }

    fn read_entry(&self, index: u64, width: u32) -> u64 {
        let at = (index * width as u64) as usize;
        let b = &self.bytes;
        match width {
            8 => u64::from_le_bytes(b[at..at + 8].try_into().unwrap()),
            4 => u32::from_le_bytes(b[at..at + 4].try_into().unwrap()) as u64,
            2 => u16::from_le_bytes(b[at..at + 2].try_into().unwrap()) as u64,
            _ => b[at] as u64,
        }
    }

    fn write_entry(&mut self, index: u64, width: u32, raw: u64) {
        let at = (index * width as u64) as usize;
        match width {
            8 => self.bytes[at..at + 8].copy_from_slice(&raw.to_le_bytes()),
            4 => self.bytes[at..at + 4].copy_from_slice(&(raw as u32).to_le_bytes()),
            2 => self.bytes[at..at + 2].copy_from_slice(&(raw as u16).to_le_bytes()),
            _ => self.bytes[at] = raw as u8,
        }
    }
}

/// The four radix levels, most significant first.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Level {
    /// Page Global Directory.
    Pgd,
    /// Page Upper Directory.
    Pud,
    /// Page Middle Directory.
    Pmd,
    /// Page Table Entry level.
    Pte,
}

impl Level {
    fn idx(self) -> usize {
        self as usize
    }

    /// The level below, or `None` at the PTE level (whose children are data
    /// frames, not tables).
    fn child(self) -> Option<Level> {
        match self {
            Level::Pgd => Some(Level::Pud),
            Level::Pud => Some(Level::Pmd),
            Level::Pmd => Some(Level::Pte),
            Level::Pte => None,
        }
    }
}

/// The radix page table with its TLBs and page-walk caches.
pub struct PageTable {
    tables: HashMap<u64, PageTablePage>,
    /// Physical byte address of the root (PGD) table page.
    cr3: u64,
    pte_cachable: bool,

    l1_tlb: Tlb,
    l2_tlb: Tlb,

    pgd_pwc: PageWalkCache,
    pud_pwc: PageWalkCache,
    pmd_pwc: PageWalkCache,

    /// Entries per level, PGD first.
    entries: [u64; 4],
    /// Entry width in bytes per level.
    widths: [u32; 4],
    /// Index shift per level; `shifts[3]` is the page shift.
    shifts: [u32; 4],
    /// Index mask per level.
    masks: [u64; 4],

    stats: TranslationStats,
    level_stats: [LevelStats; 4],
}

impl PageTable {
    /// Builds the table from validated configuration, allocating the root
    /// table page.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration; geometry is not re-checked.
    /// * `alloc` - Frame allocator used for the root table page.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfFrames`] if the allocator cannot issue the
    /// root frame.
    pub fn new(config: &Config, alloc: &mut FrameAllocator) -> Result<Self, SimError> {
        let pt = &config.page_table;
        let entries = [
            pt.pgd_entries,
            pt.pud_entries,
            pt.pmd_entries,
            pt.pte_entries,
        ];
        let widths = [8, pt.pud_width(), pt.pmd_width(), pt.pte_width()];

        let pmd_shift = PAGE_SHIFT + log2(pt.pte_entries);
        let pud_shift = pmd_shift + log2(pt.pmd_entries);
        let pgd_shift = pud_shift + log2(pt.pud_entries);
        let shifts = [pgd_shift, pud_shift, pmd_shift, PAGE_SHIFT];
        let masks = [
            pt.pgd_entries - 1,
            pt.pud_entries - 1,
            pt.pmd_entries - 1,
            pt.pte_entries - 1,
        ];

        let cr3 = alloc.allocate_frame(0)? * PAGE_SIZE;
        let mut tables = HashMap::new();
        tables.insert(cr3, PageTablePage::new());

        let mut level_stats = [
            LevelStats::new("PGD (Page Global Directory)", pt.pgd_entries),
            LevelStats::new("PUD (Page Upper Directory)", pt.pud_entries),
            LevelStats::new("PMD (Page Middle Directory)", pt.pmd_entries),
            LevelStats::new("PTE (Page Table Entry)", pt.pte_entries),
        ];
        level_stats[Level::Pgd.idx()].allocations = 1;

        let pwc = &config.pwc;
        let toc = if pwc.toc_enabled { pwc.toc_size } else { 0 };

        Ok(Self {
            tables,
            cr3,
            pte_cachable: pt.pte_cachable,
            l1_tlb: Tlb::new("L1 TLB", config.tlb.l1_size, config.tlb.l1_ways),
            l2_tlb: Tlb::new("L2 TLB", config.tlb.l2_size, config.tlb.l2_ways),
            pgd_pwc: PageWalkCache::new(
                "PGD PWC",
                pwc.pgd_size,
                pwc.pgd_ways,
                pgd_shift,
                VADDR_TOP_BIT,
                toc,
            ),
            pud_pwc: PageWalkCache::new(
                "PUD PWC",
                pwc.pud_size,
                pwc.pud_ways,
                pud_shift,
                VADDR_TOP_BIT,
                toc,
            ),
            pmd_pwc: PageWalkCache::new(
                "PMD PWC",
                pwc.pmd_size,
                pwc.pmd_ways,
                pmd_shift,
                VADDR_TOP_BIT,
                toc,
            ),
            entries,
            widths,
            shifts,
            masks,
            stats: TranslationStats::default(),
            level_stats,
        })
    }

    /// Translates a virtual address, updating TLBs, PWCs, the page table,
    /// and the data caches along the way.
    ///
    /// # Arguments
    ///
    /// * `vaddr` - Virtual address to translate.
    /// * `alloc` - Frame allocator for tables and data frames touched for
    ///   the first time.
    /// * `caches` - Data cache hierarchy receiving the translation-path
    ///   accesses of the walk.
    ///
    /// # Returns
    ///
    /// The physical address: the mapped frame combined with the page
    /// offset. Exactly one resolution counter is incremented per call.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfFrames`] on allocator exhaustion, or a
    /// tiny-pointer error if a stored entry decodes inconsistently. Both
    /// are fatal to the run.
    pub fn translate(
        &mut self,
        vaddr: VirtAddr,
        alloc: &mut FrameAllocator,
        caches: &mut CacheHierarchy,
    ) -> Result<PhysAddr, SimError> {
        let va = vaddr.val();
        let vpn = vaddr.vpn();
        let offset = vaddr.page_offset();

        if let Some(pfn) = self.l1_tlb.lookup(vpn) {
            self.stats.l1_tlb_hits += 1;
            return Ok(PhysAddr::new((pfn << PAGE_SHIFT) | offset));
        }

        if let Some(pfn) = self.l2_tlb.lookup(vpn) {
            self.stats.l2_tlb_hits += 1;
            self.l1_tlb.insert(vpn, pfn);
            return Ok(PhysAddr::new((pfn << PAGE_SHIFT) | offset));
        }

        if let Some(pte_table) = self.pmd_pwc.lookup(va) {
            self.stats.pmd_cache_hits += 1;
            let paddr = self.walk_from_pte(va, pte_table, alloc, caches)?;
            self.install_tlbs(vpn, paddr);
            return Ok(PhysAddr::new(paddr));
        }

        if let Some(pmd_table) = self.pud_pwc.lookup(va) {
            self.stats.pud_cache_hits += 1;
            let paddr = self.walk_from_pmd(va, pmd_table, alloc, caches)?;
            self.install_tlbs(vpn, paddr);
            return Ok(PhysAddr::new(paddr));
        }

        if let Some(pud_table) = self.pgd_pwc.lookup(va) {
            self.stats.pgd_cache_hits += 1;
            let paddr = self.walk_from_pud(va, pud_table, alloc, caches)?;
            self.install_tlbs(vpn, paddr);
            return Ok(PhysAddr::new(paddr));
        }

        self.stats.full_walks += 1;
        let paddr = self.walk_from_pgd(va, alloc, caches)?;
        self.install_tlbs(vpn, paddr);
        Ok(PhysAddr::new(paddr))
    }

    fn install_tlbs(&mut self, vpn: u64, paddr: u64) {
        let pfn = paddr >> PAGE_SHIFT;
        self.l1_tlb.insert(vpn, pfn);
        self.l2_tlb.insert(vpn, pfn);
    }

    /// Full walk from the root: consult the PGD, install the PGD PWC, and
    /// continue down.
    fn walk_from_pgd(
        &mut self,
        va: u64,
        alloc: &mut FrameAllocator,
        caches: &mut CacheHierarchy,
    ) -> Result<u64, SimError> {
        let index = self.index(va, Level::Pgd);
        let entry_addr = self.cr3 + index * 8;
        self.entry_read(entry_addr, Level::Pgd, caches);
        let pud_table = self.child_frame(self.cr3, index, Level::Pgd, alloc)?;
        self.pgd_pwc.insert(va, pud_table);
        self.walk_from_pud(va, pud_table, alloc, caches)
    }

    /// Resume with a known PUD table (PGD PWC hit path).
    fn walk_from_pud(
        &mut self,
        va: u64,
        pud_table: u64,
        alloc: &mut FrameAllocator,
        caches: &mut CacheHierarchy,
    ) -> Result<u64, SimError> {
        let table_addr = pud_table << PAGE_SHIFT;
        let index = self.index(va, Level::Pud);
        let entry_addr = table_addr + index * self.widths[Level::Pud.idx()] as u64;
        self.entry_read(entry_addr, Level::Pud, caches);
        let pmd_table = self.child_frame(table_addr, index, Level::Pud, alloc)?;
        self.pud_pwc.insert(va, pmd_table);
        self.walk_from_pmd(va, pmd_table, alloc, caches)
    }

    /// Resume with a known PMD table (PUD PWC hit path).
    fn walk_from_pmd(
        &mut self,
        va: u64,
        pmd_table: u64,
        alloc: &mut FrameAllocator,
        caches: &mut CacheHierarchy,
    ) -> Result<u64, SimError> {
        let table_addr = pmd_table << PAGE_SHIFT;
        let index = self.index(va, Level::Pmd);
        let entry_addr = table_addr + index * self.widths[Level::Pmd.idx()] as u64;
        self.entry_read(entry_addr, Level::Pmd, caches);
        let pte_table = self.child_frame(table_addr, index, Level::Pmd, alloc)?;
        self.pmd_pwc.insert(va, pte_table);
        self.walk_from_pte(va, pte_table, alloc, caches)
    }

    /// Final step with a known PTE table (PMD PWC hit path).
    fn walk_from_pte(
        &mut self,
        va: u64,
        pte_table: u64,
        alloc: &mut FrameAllocator,
        caches: &mut CacheHierarchy,
    ) -> Result<u64, SimError> {
        let table_addr = pte_table << PAGE_SHIFT;
        let index = self.index(va, Level::Pte);
        let entry_addr = table_addr + index * self.widths[Level::Pte.idx()] as u64;
        self.entry_read(entry_addr, Level::Pte, caches);
        let frame = self.child_frame(table_addr, index, Level::Pte, alloc)?;
        Ok((frame << PAGE_SHIFT) | (va & (PAGE_SIZE - 1)))
    }

    /// Index into a level's table for `va`.
    fn index(&self, va: u64, level: Level) -> u64 {
        (va >> self.shifts[level.idx()]) & self.masks[level.idx()]
    }

    /// Issues the translation-path cache access for a just-consulted entry
    /// and tallies the outcome. The access goes to the entry's 8-byte
    /// aligned physical address; uncachable entry reads skip the cache and
    /// count straight against memory.
    fn entry_read(&mut self, entry_addr: u64, level: Level, caches: &mut CacheHierarchy) {
        let hit = self.pte_cachable && caches.translate_lookup(PhysAddr::new(entry_addr & !7));
        if hit {
            if level == Level::Pte {
                self.stats.pte_entry_hits += 1;
            } else {
                self.stats.upper_entry_hits += 1;
            }
        } else {
            if self.pte_cachable {
                if level == Level::Pte {
                    self.stats.pte_entry_misses += 1;
                } else {
                    self.stats.upper_entry_misses += 1;
                }
            }
            self.stats.page_walk_mem_accesses += 1;
            self.level_stats[level.idx()].accesses += 1;
        }
    }

    /// Reads the entry at `(table_addr, index)` and returns the child frame
    /// it names, allocating the child on first touch.
    fn child_frame(
        &mut self,
        table_addr: u64,
        index: u64,
        level: Level,
        alloc: &mut FrameAllocator,
    ) -> Result<u64, SimError> {
        let width = self.widths[level.idx()];
        let raw = self.page(table_addr).read_entry(index, width);

        if width == 8 {
            let entry = Pte8::new(raw);
            if entry.is_present() {
                return Ok(entry.pfn());
            }
            let pfn = alloc.allocate_frame(table_addr)?;
            self.page_mut(table_addr)
                .write_entry(index, width, Pte8::table(pfn).raw());
            self.note_allocation(level, pfn);
            Ok(pfn)
        } else {
            let ptr_bits = tiny_ptr_bits(width);
            if raw & PTE_PRESENT_BIT != 0 {
                let ptr = narrow_tiny_ptr(raw, width);
                return alloc.decode_frame(table_addr, ptr, ptr_bits);
            }
            let (ptr, pfn) = alloc.allocate_tiny_ptr_frame(table_addr, ptr_bits)?;
            self.page_mut(table_addr)
                .write_entry(index, width, narrow_entry(ptr, width));
            self.note_allocation(level, pfn);
            Ok(pfn)
        }
    }

    /// Books a fresh child under `level`: the current level gains an entry,
    /// and below the PTE level the child page-table page is created and
    /// counted. PTE-level children are data frames, not tables.
    fn note_allocation(&mut self, level: Level, child_pfn: u64) {
        self.level_stats[level.idx()].entries += 1;
        if let Some(child) = level.child() {
            self.level_stats[child.idx()].allocations += 1;
            self.tables
                .insert(child_pfn << PAGE_SHIFT, PageTablePage::new());
        }
    }

    fn page(&self, table_addr: u64) -> &PageTablePage {
        self.tables
            .get(&table_addr)
            .expect("walk reached a table page that was never allocated")
    }

    fn page_mut(&mut self, table_addr: u64) -> &mut PageTablePage {
        self.tables
            .get_mut(&table_addr)
            .expect("walk reached a table page that was never allocated")
    }

    /// Physical byte address of the root table.
    pub fn cr3(&self) -> u64 {
        self.cr3
    }

    /// Translation counters.
    pub fn stats(&self) -> &TranslationStats {
        &self.stats
    }

    /// Per-level counters, PGD first.
    pub fn level_stats(&self) -> &[LevelStats; 4] {
        &self.level_stats
    }

    /// The L1 TLB.
    pub fn l1_tlb(&self) -> &Tlb {
        &self.l1_tlb
    }

    /// The L2 TLB.
    pub fn l2_tlb(&self) -> &Tlb {
        &self.l2_tlb
    }

    /// The PGD-level page-walk cache.
    pub fn pgd_pwc(&self) -> &PageWalkCache {
        &self.pgd_pwc
    }

    /// The PUD-level page-walk cache.
    pub fn pud_pwc(&self) -> &PageWalkCache {
        &self.pud_pwc
    }

    /// The PMD-level page-walk cache.
    pub fn pmd_pwc(&self) -> &PageWalkCache {
        &self.pmd_pwc
    }

    /// Page-table pages allocated so far.
    pub fn table_count(&self) -> u64 {
        self.tables.len() as u64
    }

    /// Bytes held in page-table pages.
    pub fn table_bytes(&self) -> u64 {
        self.table_count() * PAGE_SIZE
    }

    /// Entries per level, PGD first.
    pub fn level_entries(&self) -> [u64; 4] {
        self.entries
    }

    /// Entry widths per level in bytes, PGD first.
    pub fn level_widths(&self) -> [u32; 4] {
        self.widths
    }
}

fn log2(v: u64) -> u32 {
    63 - v.leading_zeros()
}
