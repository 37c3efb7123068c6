//! Configuration Unit Tests.
//!
//! Verifies defaults, derived entry widths, and every validation rule.

use memsim_core::common::error::ConfigError;
use memsim_core::config::{AllocatorKind, Config};

#[test]
fn default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.tlb.l1_size, 64);
    assert_eq!(config.tlb.l2_size, 1024);
    assert_eq!(config.pwc.pgd_size, 16);
    assert_eq!(config.cache.l3_size, 8 * 1024 * 1024);
    assert_eq!(config.page_table.pte_entries, 512);
    assert!(!config.page_table.pte_cachable);
    assert!(!config.pwc.toc_enabled);
}

/// Widths derive from the fan-out so a full table fills its 4 KiB page.
#[test]
fn entry_widths_derive_from_fanout() {
    let mut config = Config::default();
    assert_eq!(config.page_table.pud_width(), 8);

    config.page_table.pmd_entries = 1024;
    assert_eq!(config.page_table.pmd_width(), 4);

    config.page_table.pte_entries = 4096;
    assert_eq!(config.page_table.pte_width(), 1);

    config.page_table.pud_entry_width = Some(2);
    assert_eq!(config.page_table.pud_width(), 2);
}

#[test]
fn rejects_non_power_of_two_sets() {
    let mut config = Config::default();
    config.tlb.l1_size = 96; // 96 / 4 ways = 24 sets
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotPowerOfTwo { .. })
    ));
}

#[test]
fn rejects_indivisible_ways() {
    let mut config = Config::default();
    config.pwc.pmd_size = 16;
    config.pwc.pmd_ways = 3;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::IndivisibleSets { .. })
    ));
}

#[test]
fn rejects_non_power_of_two_line() {
    let mut config = Config::default();
    config.cache.l1_line = 48;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotPowerOfTwo { .. })
    ));
}

/// The four index widths plus the page offset must span exactly 48 bits.
#[test]
fn rejects_bad_address_span() {
    let mut config = Config::default();
    config.page_table.pgd_entries = 256;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::AddressSpan { bits: 47 })
    ));
}

#[test]
fn rejects_invalid_entry_width() {
    let mut config = Config::default();
    config.memory.allocator = AllocatorKind::TwoChoice;
    config.page_table.pmd_entry_width = Some(3);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::EntryWidth { .. })
    ));
}

/// A level's entries at its width must fit the table page.
#[test]
fn rejects_table_overflow() {
    let mut config = Config::default();
    config.page_table.pte_entry_width = Some(8);
    config.page_table.pte_entries = 1024;
    config.page_table.pmd_entries = 256; // keep the 48-bit span
    assert!(matches!(
        config.validate(),
        Err(ConfigError::TableOverflow { .. })
    ));
}

/// Narrow widths need tiny pointers, which the sequential allocator
/// cannot produce.
#[test]
fn rejects_narrow_width_with_sequential_allocator() {
    let mut config = Config::default();
    config.page_table.pud_entry_width = Some(4);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::AllocatorMismatch { .. })
    ));

    config.memory.allocator = AllocatorKind::TwoChoice;
    assert!(config.validate().is_ok());
}

#[test]
fn rejects_inconsistent_toc_size() {
    let mut config = Config::default();
    config.pwc.toc_enabled = true;
    config.pwc.toc_size = 12;
    assert!(matches!(config.validate(), Err(ConfigError::TocSize { .. })));

    config.pwc.toc_size = 16;
    assert!(config.validate().is_ok());

    config.pwc.toc_enabled = false;
    assert!(matches!(config.validate(), Err(ConfigError::TocSize { .. })));
}

#[test]
fn rejects_zero_phys_mem() {
    let mut config = Config::default();
    config.memory.phys_mem_gib = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::PhysMemTooSmall { .. })
    ));
}

/// Partial JSON overrides keep defaults for everything else.
#[test]
fn json_overrides_merge_with_defaults() {
    let json = r#"{
        "tlb": { "l1_size": 128 },
        "pwc": { "toc_enabled": true, "toc_size": 8 }
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();
    assert_eq!(config.tlb.l1_size, 128);
    assert_eq!(config.tlb.l1_ways, 4);
    assert!(config.pwc.toc_enabled);
    assert_eq!(config.pwc.toc_size, 8);
    assert!(config.validate().is_ok());
}
