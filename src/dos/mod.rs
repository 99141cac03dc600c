//! A hosted stand-in for the DOS memory services.
//!
//! [`ConventionalMemory`] implements [`PlatformMemory`](realmode_mem::PlatformMemory)
//! with the semantics of INT 21h functions 48h (allocate) and 49h (free):
//! first-fit paragraph blocks, a control header before each, error 8 with the
//! largest free block on refusal and error 9 for a bad release.

pub mod config;
pub mod memory;

pub use config::{ConfigError, ConventionalMemoryConfig};
pub use memory::ConventionalMemory;
