//! Memory-hierarchy simulation library.
//!
//! This crate implements an offline, functional simulator of the address
//! translation and data cache subsystem of a modern CPU:
//! 1. **Translation:** two-level TLB, three page-walk caches (optionally
//!    with per-entry table-of-contents sub-tables), and a four-level radix
//!    page table with configurable fan-out and entry widths of 8/4/2/1
//!    bytes, narrow widths backed by a two-choice tiny-pointer allocator.
//! 2. **Caches:** an inclusive L1/L2/L3 data hierarchy with separate demand
//!    and translation entry points and a main-memory access counter.
//! 3. **Simulation:** binary trace decoding, the per-reference orchestrator,
//!    and sectioned statistics reporting.
//!
//! The simulator models where accesses hit and miss, not data values.

/// Common types and constants (addresses, page geometry, errors).
pub mod common;
/// Simulator configuration (defaults, validation, JSON loading).
pub mod config;
/// Memory-side components (cache primitive, data hierarchy, frame allocators).
pub mod mem;
/// Address translation (TLBs, page-walk caches, radix page table).
pub mod mmu;
/// Simulation driving (trace reader, orchestrator, reporting).
pub mod sim;
/// Statistics structures shared across components.
pub mod stats;

/// Root configuration type; use `Config::default()` or load from JSON.
pub use crate::config::Config;
/// Top-level simulator; construct with `Simulator::new`.
pub use crate::sim::Simulator;
/// Binary trace reader yielding decoded references.
pub use crate::sim::{MemRef, TraceReader};
