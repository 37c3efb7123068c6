//! Error definitions for the simulator.
//!
//! Three families of failures, matching how they surface:
//! 1. **Configuration errors:** impossible geometry detected before anything runs.
//! 2. **Simulation errors:** resource exhaustion or state corruption mid-run.
//! 3. **Trace errors:** I/O failures and the non-fatal partial record at EOF.

use std::fmt;
use std::io;

/// A configuration rejected at construction time.
///
/// None of these are recoverable: the run never starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field that must be a power of two is not.
    NotPowerOfTwo {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: u64,
    },

    /// A cache size is not divisible by its way count (and line size).
    IndivisibleSets {
        /// Name of the offending cache.
        field: &'static str,
        /// Total size or entry count.
        size: u64,
        /// Associativity it was to be divided by.
        ways: u64,
    },

    /// The per-level index widths plus the page offset do not span 48 bits.
    AddressSpan {
        /// The number of bits actually spanned.
        bits: u32,
    },

    /// A page-table entry width outside {1, 2, 4, 8}.
    EntryWidth {
        /// Level name.
        level: &'static str,
        /// The rejected width in bytes.
        width: u32,
    },

    /// A level's entries at its entry width exceed the 4 KiB table page.
    TableOverflow {
        /// Level name.
        level: &'static str,
        /// Configured entry count.
        entries: u64,
        /// Entry width in bytes.
        width: u32,
    },

    /// A narrow entry width requires tiny pointers, but the sequential
    /// allocator was selected.
    AllocatorMismatch {
        /// Level name of the narrow-width level.
        level: &'static str,
    },

    /// TOC size inconsistent with the TOC enable flag.
    TocSize {
        /// The rejected size.
        size: u64,
        /// Whether TOC mode was enabled.
        enabled: bool,
    },

    /// Physical memory size below the minimum of one GiB.
    PhysMemTooSmall {
        /// The rejected size in GiB.
        gib: u64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotPowerOfTwo { field, value } => {
                write!(f, "{} is {} but must be a power of two", field, value)
            }
            ConfigError::IndivisibleSets { field, size, ways } => {
                write!(f, "{} of {} does not divide into {} ways", field, size, ways)
            }
            ConfigError::AddressSpan { bits } => {
                write!(
                    f,
                    "page-table index widths span {} bits, expected 48",
                    bits
                )
            }
            ConfigError::EntryWidth { level, width } => {
                write!(
                    f,
                    "{} entry width is {} bytes, must be one of 1, 2, 4, 8",
                    level, width
                )
            }
            ConfigError::TableOverflow {
                level,
                entries,
                width,
            } => {
                write!(
                    f,
                    "{} table needs {} x {} bytes, more than a 4 KiB page",
                    level, entries, width
                )
            }
            ConfigError::AllocatorMismatch { level } => {
                write!(
                    f,
                    "{} uses a narrow entry width, which needs the two-choice allocator",
                    level
                )
            }
            ConfigError::TocSize { size, enabled } => {
                if *enabled {
                    write!(f, "TOC enabled with invalid size {}", size)
                } else {
                    write!(f, "TOC size {} given but TOC is disabled", size)
                }
            }
            ConfigError::PhysMemTooSmall { gib } => {
                write!(f, "physical memory is {} GiB, minimum is 1", gib)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A failure during a run. All variants are fatal: the orchestrator prints
/// the diagnostic and stops.
#[derive(Debug)]
pub enum SimError {
    /// Configuration rejected while constructing the simulator.
    Config(ConfigError),

    /// The frame allocator ran out of physical frames.
    OutOfFrames {
        /// Which allocator variant was exhausted.
        allocator: &'static str,
        /// Frames issued up to the failure.
        allocated: u64,
    },

    /// A tiny-pointer operation was invoked on the sequential allocator.
    TinyPointerUnsupported,

    /// A stored tiny pointer decoded to an impossible slot.
    TinyPointerRange {
        /// The corrupt pointer value.
        ptr: u8,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Config(e) => write!(f, "configuration error: {}", e),
            SimError::OutOfFrames {
                allocator,
                allocated,
            } => {
                write!(
                    f,
                    "{} frame allocator exhausted after {} frames",
                    allocator, allocated
                )
            }
            SimError::TinyPointerUnsupported => {
                write!(
                    f,
                    "tiny-pointer operation on the sequential frame allocator"
                )
            }
            SimError::TinyPointerRange { ptr } => {
                write!(f, "tiny pointer {:#04x} decodes to no valid slot", ptr)
            }
        }
    }
}

impl std::error::Error for SimError {}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        SimError::Config(e)
    }
}

/// A failure while reading the reference trace.
#[derive(Debug)]
pub enum TraceError {
    /// Underlying I/O error.
    Io(io::Error),

    /// A partial record at end of file. The tail is skipped; processing
    /// ends with the statistics accumulated so far.
    PartialRecord {
        /// Bytes present in the truncated record.
        bytes: usize,
    },
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::Io(e) => write!(f, "trace read error: {}", e),
            TraceError::PartialRecord { bytes } => {
                write!(
                    f,
                    "partial record ({} of 24 bytes) at end of trace, skipping",
                    bytes
                )
            }
        }
    }
}

impl std::error::Error for TraceError {}

impl From<io::Error> for TraceError {
    fn from(e: io::Error) -> Self {
        TraceError::Io(e)
    }
}
