//! Simulation driving: trace decoding and the per-reference orchestrator.

/// Top-level simulator and report printing.
pub mod simulator;

/// Binary reference-trace reader.
pub mod trace;

pub use simulator::Simulator;
pub use trace::{MemRef, TraceReader};
