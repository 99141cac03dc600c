//! Error types for arena and backing-policy operations.
//!
//! Every failure is recoverable: operations return `Err` and leave the arena
//! exactly as it was. Nothing here retries.

use std::fmt;

use crate::platform::DosErrorCode;

/// Errors returned by arenas and their backing policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Zero-byte request to allocate, reserve or rewind.
    InvalidRequest {
        /// The operation that was asked for nothing.
        operation: &'static str,
    },

    /// The request does not fit the width of a platform call.
    RequestTooLarge {
        /// Requested size in bytes.
        requested: usize,
        /// Largest request the policy accepts.
        max: usize,
    },

    /// Allocation larger than the space left in the arena.
    CapacityExceeded {
        /// Requested size in bytes.
        requested: usize,
        /// Bytes still available.
        available: usize,
    },

    /// Rewind larger than the space currently in use.
    UnderflowRewind {
        /// Requested rewind in bytes.
        requested: usize,
        /// Bytes currently in use.
        used: usize,
    },

    /// The process heap could not provide the range.
    OutOfMemory {
        /// Requested size in bytes.
        requested: usize,
    },

    /// The platform memory service refused the reservation.
    BackingExhausted {
        /// Paragraphs asked for.
        requested_units: u16,
        /// Largest contiguous run the service reported as free.
        largest_available_units: u16,
        /// Error code reported by the service.
        code: DosErrorCode,
    },

    /// The platform memory service failed a release.
    Platform {
        /// Error code reported by the service, untranslated.
        code: DosErrorCode,
    },

    /// A backing range was released twice, or was never reserved here.
    DoubleRelease {
        /// Base unit of the offending release.
        unit: u16,
    },

    /// An operation reached an arena whose backing was already released.
    UseAfterDestroy,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRequest { operation } => {
                write!(f, "Invalid request: zero-byte {operation}")
            }
            Error::RequestTooLarge { requested, max } => {
                write!(
                    f,
                    "Request too large: {requested} bytes, maximum {max} bytes"
                )
            }
            Error::CapacityExceeded {
                requested,
                available,
            } => {
                write!(
                    f,
                    "Allocation failed: requested {requested} bytes, available {available} bytes"
                )
            }
            Error::UnderflowRewind { requested, used } => {
                write!(
                    f,
                    "Rewind failed: requested {requested} bytes, used {used} bytes"
                )
            }
            Error::OutOfMemory { requested } => {
                write!(f, "Out of memory: heap refused {requested} bytes")
            }
            Error::BackingExhausted {
                requested_units,
                largest_available_units,
                code,
            } => {
                write!(
                    f,
                    "{code}: requested {requested_units} paragraphs, largest available block = {largest_available_units} paragraphs"
                )
            }
            Error::Platform { code } => write!(f, "Platform release failed: {code}"),
            Error::DoubleRelease { unit } => {
                write!(f, "Double release of block at {unit:04X}:0000")
            }
            Error::UseAfterDestroy => write!(f, "Arena used after destroy"),
        }
    }
}

impl std::error::Error for Error {}

/// Result alias for arena operations.
pub type Result<T> = std::result::Result<T, Error>;
