//! The platform memory service consumed by the quantized backing policy.
//!
//! The service hands out memory in paragraphs and identifies every block by
//! the unit (segment) of its first byte. It keeps a control header in the
//! paragraph just before each block. On a real-mode machine this is
//! INT 21h functions 48h and 49h. The crate only consumes the interface;
//! `realmode::dos::ConventionalMemory` is the bundled implementation.

use std::fmt;
use std::ptr::NonNull;

/// An error code reported by the platform memory service.
///
/// Codes are passed through untranslated. The named constants cover the
/// ones the memory functions are documented to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DosErrorCode(pub u16);

impl DosErrorCode {
    /// The chain of control headers is corrupt.
    pub const MCB_DESTROYED: DosErrorCode = DosErrorCode(7);
    /// No free block is large enough.
    pub const INSUFFICIENT_MEMORY: DosErrorCode = DosErrorCode(8);
    /// The unit does not start a block.
    pub const INVALID_BLOCK: DosErrorCode = DosErrorCode(9);

    /// The raw code.
    #[must_use]
    pub const fn code(self) -> u16 {
        self.0
    }

    /// Human-readable message for the code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self.0 {
            0 => "No error",
            1 => "Invalid function number",
            7 => "Memory control blocks destroyed",
            8 => "Insufficient memory",
            9 => "Invalid memory block address",
            _ => "Unknown error",
        }
    }
}

impl fmt::Display for DosErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:02X}h)", self.message(), self.0)
    }
}

/// A refused reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveFailure {
    /// Why the service refused.
    pub code: DosErrorCode,
    /// Largest contiguous run of paragraphs free at the time of the call.
    pub largest_available: u16,
}

/// A paragraph-granular memory provider.
///
/// Calls are synchronous and blocking. Implementations need not be
/// reentrant; the policy never issues a call while another is in flight.
pub trait PlatformMemory {
    /// Reserves `paragraphs` contiguous paragraphs and returns the unit of
    /// the first one.
    fn reserve(&mut self, paragraphs: u16) -> Result<u16, ReserveFailure>;

    /// Releases the block that starts at `unit`.
    ///
    /// What happens for a unit that was never reserved, or was already
    /// released, is up to the implementation; its error is reported as is.
    fn release(&mut self, unit: u16) -> Result<(), DosErrorCode>;

    /// Maps the first byte of `unit` to host memory.
    ///
    /// On real hardware this is the segment register doing its job. A
    /// hosted implementation returns a pointer into its memory image, valid
    /// for at least the paragraphs the service manages past `unit`, or
    /// `None` if `unit` is outside that image. The image must hold
    /// initialised bytes; arenas expose it as `&[u8]`.
    fn host_ptr(&mut self, unit: u16) -> Option<NonNull<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(DosErrorCode::INSUFFICIENT_MEMORY.code(), 8);
        assert_eq!(
            DosErrorCode::MCB_DESTROYED.message(),
            "Memory control blocks destroyed"
        );
        assert_eq!(DosErrorCode(0x55).message(), "Unknown error");
    }

    #[test]
    fn test_display_has_hex_code() {
        assert_eq!(
            DosErrorCode::INVALID_BLOCK.to_string(),
            "Invalid memory block address (09h)"
        );
    }
}
