//! `realmode`: bump arenas for real-mode style memory
//!
//! `realmode` pairs the arena core with a simulated platform memory service:
//!
//! - **Arenas** over the process heap or whole 16-byte paragraphs
//! - **Segmented addresses** with `unit:offset` and linear views
//! - **Conventional memory** with a DOS-style control block chain, so the
//!   paragraph policy runs on any host
//!
//! # Example
//!
//! ```rust
//! use realmode::dos::{ConventionalMemory, ConventionalMemoryConfig};
//! use realmode::{Arena, ParagraphBacking};
//!
//! let memory = ConventionalMemory::new(ConventionalMemoryConfig::default()).unwrap();
//! let backing = ParagraphBacking::new(memory);
//!
//! let mut arena = Arena::platform(&backing, 1000).unwrap();
//! assert_eq!(arena.capacity(), 1008);
//!
//! let block = arena.allocate(100).unwrap();
//! assert_eq!(block, arena.base_address());
//! println!("arena at {}", arena.segment().unwrap());
//! ```

pub mod dos;

pub use realmode_log as log;

// Re-export the core
pub use realmode_mem::{
    Address, Arena, ArenaReport, Backing, DosErrorCode, Error, McbHeader, ParagraphBacking,
    ParagraphBlock, PlatformMemory, Policy, ReserveFailure, Result, diff_pointers, difference,
    dump, dump_mcb,
};
pub use realmode_mem::{address, arena, constants, heap, mcb, paragraph, platform};
#[cfg(feature = "file-tools")]
pub use realmode_mem::tools;
