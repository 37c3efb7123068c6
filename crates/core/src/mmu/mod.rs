//! Address translation: TLBs, page-walk caches, and the radix page table.
//!
//! The translation pipeline for one reference runs through this module:
//! the two TLB levels first, then the three page-walk caches from the
//! deepest (PMD) up, and finally the full walk from the table root. Each
//! structure that resolves a translation installs it into everything above.

/// Radix page table and walker.
pub mod page_table;

/// Page-walk caches, with optional table-of-contents extension.
pub mod pwc;

/// Translation lookaside buffers.
pub mod tlb;

pub use page_table::{Level, PageTable};
pub use pwc::PageWalkCache;
pub use tlb::Tlb;
