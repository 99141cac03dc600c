//! Paragraph-quantized reservations from a [`PlatformMemory`] service.
//!
//! Byte requests are rounded up to whole paragraphs:
//!
//! ```text
//!   paragraphs = ceil(bytes / 16)
//!
//!   bytes  1..=16   ->  1 paragraph   (16 bytes)
//!   bytes 17..=32   ->  2 paragraphs  (32 bytes)
//!   bytes 1_048_560 -> 0xFFFF paragraphs, the widest request there is
//! ```
//!
//! A granted block starts at `unit:0000`. The service keeps a 16-byte
//! control header in the unit just before it:
//!
//! ```text
//!   unit-1          unit                              unit+paragraphs
//!   ┌─────────────┬─────────────────────────────────┐
//!   │ MCB header  │ block (arena range)             │
//!   └─────────────┴─────────────────────────────────┘
//! ```
//!
//! [`ParagraphBacking`] is a shared, single-threaded handle. Every arena
//! created from it holds a clone, so the service stays alive until the last
//! arena is gone.

use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

use hashbrown::HashSet;

use crate::address::Address;
use crate::constants::{MAX_PARAGRAPHS, MAX_PLATFORM_REQUEST, MCB_SIZE, PARAGRAPH_SIZE};
use crate::error::{Error, Result};
use crate::platform::{DosErrorCode, PlatformMemory};

/// Value written over the first header byte of a released block.
pub const RELEASED_SENTINEL: u8 = 0x00;

/// Number of paragraphs needed to hold `byte_count` bytes.
///
/// # Errors
///
/// - [`Error::InvalidRequest`] if `byte_count` is zero
/// - [`Error::RequestTooLarge`] above [`MAX_PLATFORM_REQUEST`]
pub fn paragraphs_for(byte_count: usize) -> Result<u16> {
    if byte_count == 0 {
        return Err(Error::InvalidRequest {
            operation: "reserve",
        });
    }
    if byte_count > MAX_PLATFORM_REQUEST {
        return Err(Error::RequestTooLarge {
            requested: byte_count,
            max: MAX_PLATFORM_REQUEST,
        });
    }
    Ok(byte_count.div_ceil(PARAGRAPH_SIZE) as u16)
}

/// A block granted by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphBlock {
    /// `unit:0000` of the first byte.
    pub base: Address,
    /// Size in paragraphs.
    pub paragraphs: u16,
    /// Host view of the first byte.
    pub host: NonNull<u8>,
}

impl ParagraphBlock {
    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paragraphs as usize * PARAGRAPH_SIZE
    }

    /// Always `false`: zero-paragraph reservations are refused.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

struct Inner {
    service: Box<dyn PlatformMemory>,
    /// Units granted through this handle and not yet released.
    live: HashSet<u16>,
}

/// Shared handle reserving arena ranges from a platform memory service.
#[derive(Clone)]
pub struct ParagraphBacking {
    inner: Rc<RefCell<Inner>>,
}

impl std::fmt::Debug for ParagraphBacking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParagraphBacking")
            .field("live", &self.inner.borrow().live.len())
            .finish_non_exhaustive()
    }
}

impl ParagraphBacking {
    /// Wraps a platform memory service.
    pub fn new(service: impl PlatformMemory + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                service: Box::new(service),
                live: HashSet::new(),
            })),
        }
    }

    /// Reserves enough paragraphs for `byte_count` bytes.
    ///
    /// # Errors
    ///
    /// See [`paragraphs_for`] and [`ParagraphBacking::reserve_units`].
    pub fn reserve(&self, byte_count: usize) -> Result<ParagraphBlock> {
        let paragraphs = paragraphs_for(byte_count)?;
        self.reserve_units(paragraphs)
    }

    /// Reserves exactly `paragraphs` paragraphs.
    ///
    /// There is no retry with a smaller size: on refusal the largest free
    /// run is reported in the error and the caller decides.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] if `paragraphs` is zero, before any call
    /// - [`Error::BackingExhausted`] if the service refuses
    pub fn reserve_units(&self, paragraphs: u16) -> Result<ParagraphBlock> {
        if paragraphs == 0 {
            return Err(Error::InvalidRequest {
                operation: "reserve",
            });
        }

        let mut inner = self.inner.borrow_mut();
        let unit = inner.service.reserve(paragraphs).map_err(|failure| {
            realmode_log::diag!(
                "{} largest available block = {} paragraphs",
                failure.code,
                failure.largest_available
            );
            Error::BackingExhausted {
                requested_units: paragraphs,
                largest_available_units: failure.largest_available,
                code: failure.code,
            }
        })?;

        let Some(host) = inner.service.host_ptr(unit) else {
            // A block we cannot address is useless; hand it straight back.
            if let Err(code) = inner.service.release(unit) {
                realmode_log::error!("unmapped block {unit:04X} not released: {code}");
            }
            return Err(Error::Platform {
                code: DosErrorCode::INVALID_BLOCK,
            });
        };

        inner.live.insert(unit);
        realmode_log::trace!("reserved {paragraphs} paragraphs at {unit:04X}:0000");

        Ok(ParagraphBlock {
            base: Address::from_unit(unit),
            paragraphs,
            host,
        })
    }

    /// Releases the block starting at `base` and stamps its control header
    /// with [`RELEASED_SENTINEL`].
    ///
    /// `base` is normalized first, so `1000:0010` releases the block at
    /// unit `1001`.
    ///
    /// Releasing a block this handle did not grant, or granted and already
    /// released, trips a debug assertion. Release builds forward the call
    /// anyway and report whatever the service says.
    ///
    /// # Errors
    ///
    /// - [`Error::Platform`] with the service's own code
    pub fn release(&self, base: Address) -> Result<()> {
        let base = base.normalized();
        let unit = base.unit();
        let mut inner = self.inner.borrow_mut();

        let was_live = inner.live.remove(&unit);
        debug_assert!(
            was_live,
            "{}",
            Error::DoubleRelease { unit }
        );

        let outcome = inner.service.release(unit);

        if let Some(header) = base.unit_before() {
            if let Some(ptr) = inner.service.host_ptr(header.unit()) {
                // SAFETY: the service maps at least one paragraph at `ptr`.
                unsafe { ptr.as_ptr().write(RELEASED_SENTINEL) };
            }
        }

        outcome.map_err(|code| {
            realmode_log::diag!("{code} {unit:04X}");
            Error::Platform { code }
        })
    }

    /// Largest contiguous run of free paragraphs.
    ///
    /// Asks for [`MAX_PARAGRAPHS`] and reads the answer from the refusal.
    /// If the service ever grants that request, the block is released at
    /// once and `MAX_PARAGRAPHS` is reported.
    #[must_use]
    pub fn max_available_units(&self) -> u16 {
        let mut inner = self.inner.borrow_mut();
        match inner.service.reserve(MAX_PARAGRAPHS) {
            Err(failure) => failure.largest_available,
            Ok(unit) => {
                realmode_log::warn!(
                    "probe for {MAX_PARAGRAPHS} paragraphs succeeded at {unit:04X}:0000; releasing"
                );
                if let Err(code) = inner.service.release(unit) {
                    realmode_log::error!("probe block {unit:04X} not released: {code}");
                }
                MAX_PARAGRAPHS
            }
        }
    }

    /// Copy of the control header kept one unit before `base`.
    #[must_use]
    pub fn control_header(&self, base: Address) -> Option<[u8; MCB_SIZE]> {
        let header = base.normalized().unit_before()?;
        let ptr = self.inner.borrow_mut().service.host_ptr(header.unit())?;
        let mut bytes = [0u8; MCB_SIZE];
        // SAFETY: the service maps at least one paragraph at `ptr`.
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.as_ptr(), bytes.as_mut_ptr(), MCB_SIZE);
        }
        Some(bytes)
    }

    /// Host view of the first byte of `unit`.
    #[must_use]
    pub fn host_ptr(&self, unit: u16) -> Option<NonNull<u8>> {
        self.inner.borrow_mut().service.host_ptr(unit)
    }

    /// Number of blocks granted through this handle and not yet released.
    #[must_use]
    pub fn live_blocks(&self) -> usize {
        self.inner.borrow().live.len()
    }
}
