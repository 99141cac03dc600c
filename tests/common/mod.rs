// Common test utilities for integration tests
//
// Builders for arenas under either policy, backed by a fresh simulated
// conventional memory so tests never share platform state.

#![allow(dead_code)]

use realmode::dos::{ConventionalMemory, ConventionalMemoryConfig};
use realmode::{Arena, Backing, ParagraphBacking, Policy};

/// Both backing policies, for tests that must hold under either.
pub const POLICIES: [Policy; 2] = [Policy::Heap, Policy::PlatformQuantized];

/// Segment of the first control header in [`small_config`] images.
pub const SMALL_BASE: u16 = 0x2000;

/// A 4K-paragraph image at [`SMALL_BASE`].
pub fn small_config() -> ConventionalMemoryConfig {
    ConventionalMemoryConfig::default()
        .with_base_segment(SMALL_BASE)
        .with_paragraphs(0x1000)
        .with_program_name("TESTS")
}

/// A backing over a fresh [`small_config`] image.
pub fn small_backing() -> ParagraphBacking {
    ParagraphBacking::new(ConventionalMemory::new(small_config()).expect("valid test config"))
}

/// A backing over a fresh default (640K) image.
pub fn conventional_backing() -> ParagraphBacking {
    ParagraphBacking::new(
        ConventionalMemory::new(ConventionalMemoryConfig::default()).expect("default config"),
    )
}

/// The backing a test arena under `policy` is created from.
pub fn backing_for(policy: Policy) -> Backing {
    match policy {
        Policy::Heap => Backing::Heap,
        Policy::PlatformQuantized => Backing::Platform(conventional_backing()),
    }
}

/// Creates an arena of `bytes` under `policy`.
pub fn create_arena(policy: Policy, bytes: usize) -> Arena {
    Arena::create(backing_for(policy), bytes).expect("Failed to create test arena")
}

/// Capacity `policy` grants for a request of `bytes`.
pub fn expected_capacity(policy: Policy, bytes: usize) -> usize {
    match policy {
        Policy::Heap => bytes,
        Policy::PlatformQuantized => bytes.div_ceil(16) * 16,
    }
}

/// Asserts `used + available == capacity`.
pub fn assert_accounting(arena: &Arena) {
    assert_eq!(
        arena.used() + arena.available(),
        arena.capacity(),
        "accounting broken for {arena:?}"
    );
}
