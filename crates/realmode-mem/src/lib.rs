//! Bump arenas over the process heap or a paragraph-quantized platform
//! memory service.
//!
//! This crate provides:
//!
//! - **Arenas**: linear allocation with stack-discipline rewind
//!   ([`arena`])
//! - **Backing policies**: exact-size heap blocks ([`heap`]) and whole
//!   16-byte paragraphs from a [`PlatformMemory`] service ([`paragraph`])
//! - **Segmented addresses**: `unit:offset` and linear views ([`address`])
//! - **Diagnostics**: arena state dumps ([`dump`]) and control header
//!   decoding ([`mcb`])
//! - **File tools**: raw memory load/save (`file-tools` feature)
//!
//! # Example
//!
//! ```
//! use realmode_mem::{Arena, Error};
//!
//! let mut arena = Arena::heap(256).unwrap();
//! arena.allocate(200).unwrap();
//! assert!(matches!(
//!     arena.allocate(100),
//!     Err(Error::CapacityExceeded { requested: 100, available: 56 })
//! ));
//! ```

pub mod address;
pub mod arena;
pub mod constants;
pub mod dump;
pub mod error;
pub mod heap;
pub mod mcb;
pub mod paragraph;
pub mod platform;
#[cfg(feature = "file-tools")]
pub mod tools;

pub use address::{Address, diff_pointers, difference};
pub use arena::{Arena, Backing, Policy};
pub use dump::{ArenaReport, dump};
pub use error::{Error, Result};
pub use mcb::{McbHeader, dump_mcb};
pub use paragraph::{ParagraphBacking, ParagraphBlock};
pub use platform::{DosErrorCode, PlatformMemory, ReserveFailure};
