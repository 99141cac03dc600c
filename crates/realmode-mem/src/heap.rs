//! Heap-backed reservations.
//!
//! The range comes straight from the global allocator. It is zeroed on
//! reservation so every byte an arena hands out is initialised, and aligned
//! to a paragraph so heap and platform arenas start on the same boundary.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::constants::HEAP_ALIGNMENT;
use crate::error::{Error, Result};

/// A contiguous byte range owned by a heap-backed arena.
///
/// Not `Clone`: releasing consumes the block, so a range can only be
/// handed back once.
#[derive(Debug)]
pub struct HeapBlock {
    base: NonNull<u8>,
    layout: Layout,
}

impl HeapBlock {
    /// First byte of the range.
    #[must_use]
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Size of the range in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    /// Always `false`: zero-byte reservations are refused.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// One past the last byte of the range.
    #[must_use]
    pub fn end(&self) -> NonNull<u8> {
        // SAFETY: one past the end of a live allocation is in bounds for
        // pointer arithmetic, and non-null because the base is.
        unsafe { self.base.add(self.layout.size()) }
    }
}

/// Reserves and releases arena ranges on the process heap.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapBacking;

impl HeapBacking {
    /// Reserves exactly `byte_count` bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] if `byte_count` is zero
    /// - [`Error::OutOfMemory`] if the heap cannot provide the range
    pub fn reserve(self, byte_count: usize) -> Result<HeapBlock> {
        if byte_count == 0 {
            return Err(Error::InvalidRequest {
                operation: "reserve",
            });
        }

        let layout = Layout::from_size_align(byte_count, HEAP_ALIGNMENT)
            .map_err(|_| Error::OutOfMemory {
                requested: byte_count,
            })?;

        // SAFETY: the layout has a non-zero size (checked above).
        let base = unsafe { alloc::alloc_zeroed(layout) };
        let base = NonNull::new(base).ok_or(Error::OutOfMemory {
            requested: byte_count,
        })?;

        realmode_log::trace!("heap reserved {byte_count} bytes at {base:p}");
        Ok(HeapBlock { base, layout })
    }

    /// Returns the range to the heap. Never fails.
    pub fn release(self, block: HeapBlock) {
        realmode_log::trace!(
            "heap released {} bytes at {:p}",
            block.layout.size(),
            block.base
        );
        // SAFETY: `block` was produced by `reserve` with this exact layout,
        // and consuming it here means it cannot be released again.
        unsafe {
            alloc::dealloc(block.base.as_ptr(), block.layout);
        }
    }
}
