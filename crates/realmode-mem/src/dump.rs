//! Human-readable arena state.
//!
//! ```text
//! Arena @0x5581e2c0
//! Policy: MEM_POLICY_PLATFORM
//! Range: [0x7f3a10 - 0x7f3e10]
//! Capacity: 1024 bytes
//! Used: 128 bytes
//! Free: 896 bytes
//! MCB: 07FF:0000
//! ```

use std::fmt;
use std::io::Write;

use crate::arena::{Arena, Policy};

/// Display adapter over an arena's state.
#[derive(Debug, Clone, Copy)]
pub struct ArenaReport<'a> {
    arena: &'a Arena,
}

impl<'a> ArenaReport<'a> {
    /// Wraps `arena`.
    #[must_use]
    pub fn new(arena: &'a Arena) -> Self {
        Self { arena }
    }
}

impl fmt::Display for ArenaReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.arena;
        writeln!(f, "Arena @{:p}", arena)?;
        writeln!(f, "Policy: {}", arena.policy())?;
        writeln!(
            f,
            "Range: [{:p} - {:p}]",
            arena.base_address(),
            arena.end_address()
        )?;
        writeln!(f, "Capacity: {} bytes", arena.capacity())?;
        writeln!(f, "Used: {} bytes", arena.used())?;
        writeln!(f, "Free: {} bytes", arena.available())?;

        if arena.policy() == Policy::PlatformQuantized {
            match arena.control_header_address() {
                Some(mcb) => writeln!(f, "MCB: {mcb}")?,
                None => writeln!(f, "MCB: none")?,
            }
        }
        Ok(())
    }
}

/// Writes the state of `arena` to `stream`.
///
/// A missing stream or arena makes this a no-op, and write errors are
/// dropped: diagnostics never fail the caller.
pub fn dump(stream: Option<&mut dyn Write>, arena: Option<&Arena>) {
    let (Some(stream), Some(arena)) = (stream, arena) else {
        return;
    };
    let _ = write!(stream, "\n{}", ArenaReport::new(arena));
    let _ = stream.flush();
}
