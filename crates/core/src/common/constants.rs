//! Constants shared across the simulator.

/// Page size in bytes (4 KiB pages throughout).
pub const PAGE_SIZE: u64 = 4096;

/// log2 of the page size.
pub const PAGE_SHIFT: u32 = 12;

/// Mask for the byte offset within a page.
pub const PAGE_MASK: u64 = PAGE_SIZE - 1;

/// Number of low virtual-address bits spanned by the four radix levels
/// plus the page offset (canonical 48-bit virtual addresses).
pub const VADDR_BITS: u32 = 48;

/// Highest virtual-address bit consumed by page-table indexing.
pub const VADDR_TOP_BIT: u32 = VADDR_BITS - 1;
