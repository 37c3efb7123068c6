//! # Unit Components
//!
//! Central hub for the component-level tests of the simulation core.

/// Tests for the generic set-associative cache primitive.
pub mod cache;

/// Tests for configuration defaults and validation.
pub mod config;

/// Tests for the inclusive data cache hierarchy.
pub mod hierarchy;



/// Tests for the page-walk caches, plain and TOC mode.
pub mod pwc;


/// Tests for the statistics structures and derived metrics.
pub mod stats;

/// Tests for the translation lookaside buffers.
pub mod tlb;
