//! Linear arenas over a heap or platform reservation.
//!
//! An [`Arena`] owns one contiguous range and hands out pieces of it by
//! bumping a cursor:
//!
//! ```text
//!   base                 free                              end
//!   ┌──────┬──────┬──────┬─────────────────────────────────┐
//!   │  A1  │  A2  │  A3  │            available            │
//!   └──────┴──────┴──────┴─────────────────────────────────┘
//!   ◄──────── used ──────►◄─────────── available ──────────►
//!   ◄───────────────────────── capacity ───────────────────►
//! ```
//!
//! - [`Arena::allocate`] returns `free` and moves it forward.
//! - [`Arena::rewind`] moves it back by a caller-supplied count.
//!
//! Nothing is recorded per allocation. Rewinding is stack discipline: the
//! caller must rewind exactly the sizes it allocated, newest first. The
//! arena only checks that the cursor stays inside `[base, end]`.
//!
//! # Lifecycle
//!
//! ```text
//!   Arena::create ──► Live ──► destroy() / drop ──► Destroyed
//! ```
//!
//! [`Arena::destroy`] consumes the arena, so no call can reach a destroyed
//! one. Pointers handed out before are dangling afterwards.
//!
//! # Example
//!
//! ```
//! use realmode_mem::arena::Arena;
//!
//! let mut arena = Arena::heap(1024).unwrap();
//! let header = arena.allocate(64).unwrap();
//! let body = arena.allocate_zeroed(16).unwrap();
//!
//! assert_eq!(body.as_ptr(), header.as_ptr().wrapping_add(64));
//! assert_eq!(arena.used(), 80);
//!
//! arena.rewind(16).unwrap();
//! assert_eq!(arena.free_address(), body);
//! assert_eq!(arena.destroy().unwrap(), 1024);
//! ```

use std::fmt;
use std::ptr::NonNull;

use crate::address::{Address, diff_pointers};
use crate::constants::MCB_SIZE;
use crate::error::{Error, Result};
use crate::heap::{HeapBacking, HeapBlock};
use crate::paragraph::{ParagraphBacking, ParagraphBlock};

/// Where an arena's range comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// The process heap.
    Heap,
    /// A paragraph-quantized platform memory service.
    PlatformQuantized,
}

impl Policy {
    /// Name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Policy::Heap => "MEM_POLICY_HEAP",
            Policy::PlatformQuantized => "MEM_POLICY_PLATFORM",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Backing policy selected at creation.
#[derive(Debug, Clone)]
pub enum Backing {
    /// Reserve exactly the requested bytes from the process heap.
    Heap,
    /// Reserve whole paragraphs from a platform memory service.
    Platform(ParagraphBacking),
}

impl Backing {
    /// The policy tag this backing produces.
    #[must_use]
    pub fn policy(&self) -> Policy {
        match self {
            Backing::Heap => Policy::Heap,
            Backing::Platform(_) => Policy::PlatformQuantized,
        }
    }
}

enum Reservation {
    Heap(HeapBlock),
    Platform {
        backing: ParagraphBacking,
        block: ParagraphBlock,
    },
}

enum State {
    Live(Reservation),
    Destroyed,
}

/// A bump allocator over one contiguous range.
///
/// Single-owner and single-threaded: the raw cursor makes `Arena` neither
/// `Send` nor `Sync`.
pub struct Arena {
    state: State,
    policy: Policy,
    /// First byte of the owned range.
    base: NonNull<u8>,
    /// First unallocated byte.
    free: NonNull<u8>,
    /// One past the last owned byte.
    end: NonNull<u8>,
}

impl Arena {
    /// Creates an arena of at least `byte_request` bytes.
    ///
    /// The heap policy reserves exactly `byte_request`; the platform policy
    /// rounds up to whole paragraphs.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] if `byte_request` is zero
    /// - [`Error::RequestTooLarge`] beyond a single platform request
    /// - [`Error::OutOfMemory`] / [`Error::BackingExhausted`] if the backing
    ///   cannot provide the range
    pub fn create(backing: Backing, byte_request: usize) -> Result<Self> {
        let policy = backing.policy();
        let reserved = match backing {
            Backing::Heap => HeapBacking.reserve(byte_request).map(|block| {
                let (base, end) = (block.base(), block.end());
                (Reservation::Heap(block), base, end)
            }),
            Backing::Platform(backing) => backing.reserve(byte_request).map(|block| {
                let base = block.host;
                // SAFETY: the service maps the whole block at `host`.
                let end = unsafe { base.add(block.len()) };
                (Reservation::Platform { backing, block }, base, end)
            }),
        };

        let (reservation, base, end) = reserved.inspect_err(|err| {
            realmode_log::diag!(
                "{policy} arena of {byte_request} bytes not created: {err}"
            );
        })?;

        let arena = Arena {
            state: State::Live(reservation),
            policy,
            base,
            free: base,
            end,
        };
        realmode_log::debug!(
            "created {policy} arena of {} bytes at {base:p}",
            arena.capacity()
        );
        Ok(arena)
    }

    /// Creates a heap-backed arena of exactly `byte_request` bytes.
    ///
    /// # Errors
    ///
    /// See [`Arena::create`].
    pub fn heap(byte_request: usize) -> Result<Self> {
        Self::create(Backing::Heap, byte_request)
    }

    /// Creates a platform-backed arena of `ceil(byte_request / 16) * 16` bytes.
    ///
    /// # Errors
    ///
    /// See [`Arena::create`].
    pub fn platform(backing: &ParagraphBacking, byte_request: usize) -> Result<Self> {
        Self::create(Backing::Platform(backing.clone()), byte_request)
    }

    /// Hands out the next `byte_request` bytes.
    ///
    /// The returned pointer is the free address before the call. It stays
    /// valid until the arena is destroyed or a rewind moves back past it.
    /// No alignment is applied.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] if `byte_request` is zero
    /// - [`Error::CapacityExceeded`] if more than [`Arena::available`]
    pub fn allocate(&mut self, byte_request: usize) -> Result<NonNull<u8>> {
        let available = self.available();
        if byte_request == 0 {
            realmode_log::diag!(
                "Allocation failed: Requested 0, Available {available}"
            );
            return Err(Error::InvalidRequest {
                operation: "allocate",
            });
        }
        if byte_request > available {
            realmode_log::diag!(
                "Allocation failed: Requested {byte_request}, Available {available}"
            );
            return Err(Error::CapacityExceeded {
                requested: byte_request,
                available,
            });
        }

        let ptr = self.free;
        // SAFETY: `byte_request <= end - free`, so the result is within the
        // owned range or one past its end.
        self.free = unsafe { self.free.add(byte_request) };
        realmode_log::trace!("allocated {byte_request} bytes at {ptr:p}");
        Ok(ptr)
    }

    /// Like [`Arena::allocate`], and zero-fills the bytes handed out.
    ///
    /// # Errors
    ///
    /// See [`Arena::allocate`].
    pub fn allocate_zeroed(&mut self, byte_request: usize) -> Result<NonNull<u8>> {
        let ptr = self.allocate(byte_request)?;
        // SAFETY: `ptr` starts `byte_request` bytes this arena owns.
        unsafe {
            ptr.as_ptr().write_bytes(0, byte_request);
        }
        Ok(ptr)
    }

    /// Allocates `bytes.len()` bytes and copies `bytes` into them.
    ///
    /// # Errors
    ///
    /// See [`Arena::allocate`].
    pub fn allocate_copy(&mut self, bytes: &[u8]) -> Result<NonNull<u8>> {
        let ptr = self.allocate(bytes.len())?;
        // SAFETY: the destination is freshly allocated arena memory of
        // `bytes.len()` bytes and cannot overlap a borrowed slice.
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
        }
        Ok(ptr)
    }

    /// Moves the cursor back by `byte_request` bytes and returns the new
    /// free address.
    ///
    /// Whether the count matches earlier allocations is not checked.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] if `byte_request` is zero
    /// - [`Error::UnderflowRewind`] if more than [`Arena::used`]
    pub fn rewind(&mut self, byte_request: usize) -> Result<NonNull<u8>> {
        let used = self.used();
        if byte_request == 0 {
            realmode_log::diag!("Deallocation failed: Requested 0, Used {used}");
            return Err(Error::InvalidRequest {
                operation: "rewind",
            });
        }
        if byte_request > used {
            realmode_log::diag!(
                "Deallocation failed: Requested {byte_request}, Used {used}"
            );
            return Err(Error::UnderflowRewind {
                requested: byte_request,
                used,
            });
        }

        // SAFETY: `byte_request <= free - base`, so the result is not
        // before `base`.
        self.free = unsafe { self.free.sub(byte_request) };
        Ok(self.free)
    }

    /// Rewinds everything: the free address goes back to the base.
    pub fn reset(&mut self) {
        self.free = self.base;
    }

    /// Size of the owned range in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        diff_pointers(self.end.as_ptr(), self.base.as_ptr()) as usize
    }

    /// Bytes handed out and not rewound.
    #[must_use]
    pub fn used(&self) -> usize {
        diff_pointers(self.free.as_ptr(), self.base.as_ptr()) as usize
    }

    /// Bytes left to hand out.
    #[must_use]
    pub fn available(&self) -> usize {
        diff_pointers(self.end.as_ptr(), self.free.as_ptr()) as usize
    }

    /// The backing policy.
    #[must_use]
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// First byte of the owned range.
    #[must_use]
    pub fn base_address(&self) -> NonNull<u8> {
        self.base
    }

    /// First unallocated byte.
    #[must_use]
    pub fn free_address(&self) -> NonNull<u8> {
        self.free
    }

    /// One past the last owned byte.
    #[must_use]
    pub fn end_address(&self) -> NonNull<u8> {
        self.end
    }

    /// `unit:0000` of the owned range, for platform-backed arenas.
    #[must_use]
    pub fn segment(&self) -> Option<Address> {
        match &self.state {
            State::Live(Reservation::Platform { block, .. }) => Some(block.base),
            _ => None,
        }
    }

    /// Address of the platform's control header, one unit before the range.
    #[must_use]
    pub fn control_header_address(&self) -> Option<Address> {
        self.segment()?.unit_before()
    }

    /// Copy of the platform's control header bytes.
    #[must_use]
    pub fn control_header(&self) -> Option<[u8; MCB_SIZE]> {
        match &self.state {
            State::Live(Reservation::Platform { backing, block }) => {
                backing.control_header(block.base)
            }
            _ => None,
        }
    }

    /// The bytes handed out so far, `[base, free)`.
    #[must_use]
    pub fn used_bytes(&self) -> &[u8] {
        // SAFETY: `[base, free)` lies inside the owned range, whose bytes are
        // initialised by both backings, and `&self` keeps the cursor still.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.used()) }
    }

    /// Mutable view of `[base, free)`.
    #[must_use]
    pub fn used_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as `used_bytes`, with exclusive access through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr(), self.used()) }
    }

    /// Releases the range and returns the capacity that was freed.
    ///
    /// # Errors
    ///
    /// - [`Error::Platform`] if the platform service fails the release.
    ///   The arena is gone either way.
    pub fn destroy(mut self) -> Result<usize> {
        let freed = self.capacity();
        self.release()?;
        realmode_log::debug!("destroyed {} arena, {freed} bytes freed", self.policy);
        Ok(freed)
    }

    fn release(&mut self) -> Result<()> {
        let reservation = match std::mem::replace(&mut self.state, State::Destroyed) {
            State::Live(reservation) => reservation,
            State::Destroyed => {
                debug_assert!(false, "{}", Error::UseAfterDestroy);
                return Err(Error::UseAfterDestroy);
            }
        };

        self.free = self.base;
        match reservation {
            Reservation::Heap(block) => {
                HeapBacking.release(block);
                Ok(())
            }
            Reservation::Platform { backing, block } => backing.release(block.base),
        }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if matches!(self.state, State::Live(_)) {
            if let Err(err) = self.release() {
                realmode_log::error!("arena release on drop failed: {err}");
            }
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("policy", &self.policy)
            .field("base", &self.base)
            .field("free", &self.free)
            .field("end", &self.end)
            .field("segment", &self.segment())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paragraph::tests::TestPlatform;

    const TEST_ARENA_SIZE: usize = crate::constants::SIZE_1K;

    fn check_accounting(arena: &Arena) {
        assert_eq!(arena.used() + arena.available(), arena.capacity());
    }

    #[test]
    fn test_heap_arena_creation() {
        let arena = Arena::heap(TEST_ARENA_SIZE).unwrap();
        assert_eq!(arena.policy(), Policy::Heap);
        assert_eq!(arena.capacity(), TEST_ARENA_SIZE);
        assert_eq!(arena.available(), TEST_ARENA_SIZE);
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.free_address(), arena.base_address());
        assert!(arena.segment().is_none());
        assert!(arena.control_header().is_none());
    }

    #[test]
    fn test_platform_arena_rounds_to_paragraphs() {
        let backing = ParagraphBacking::new(TestPlatform::new(64));
        let small = Arena::platform(&backing, 10).unwrap();
        assert_eq!(small.capacity(), 16);
        let odd = Arena::platform(&backing, 17).unwrap();
        assert_eq!(odd.capacity(), 32);
        assert_eq!(odd.policy(), Policy::PlatformQuantized);
        assert_eq!(backing.live_blocks(), 2);

        assert_eq!(small.destroy().unwrap(), 16);
        drop(odd);
        assert_eq!(backing.live_blocks(), 0);
    }

    #[test]
    fn test_platform_arena_header_precedes_base() {
        let backing = ParagraphBacking::new(TestPlatform::new(64));
        let arena = Arena::platform(&backing, 32).unwrap();
        let segment = arena.segment().unwrap();
        let header = arena.control_header_address().unwrap();
        assert!(crate::address::difference(header, segment) < 0);
        assert_eq!(arena.control_header().unwrap()[0], b'M');
    }

    #[test]
    fn test_basic_allocation() {
        let mut arena = Arena::heap(TEST_ARENA_SIZE).unwrap();

        let block1 = arena.allocate(64).unwrap();
        assert_eq!(block1, arena.base_address());
        assert_eq!(arena.used(), 64);
        assert_eq!(arena.available(), TEST_ARENA_SIZE - 64);

        let block2 = arena.allocate(16 * std::mem::size_of::<i32>()).unwrap();
        assert_eq!(block2.as_ptr(), block1.as_ptr().wrapping_add(64));
        assert_eq!(arena.used(), 64 + 16 * std::mem::size_of::<i32>());
        check_accounting(&arena);
    }

    #[test]
    fn test_allocation_limits() {
        let mut arena = Arena::heap(TEST_ARENA_SIZE).unwrap();
        arena.allocate(TEST_ARENA_SIZE).unwrap();
        assert_eq!(arena.available(), 0);
        assert_eq!(
            arena.allocate(1),
            Err(Error::CapacityExceeded {
                requested: 1,
                available: 0
            })
        );
        check_accounting(&arena);
    }

    #[test]
    fn test_rewind_restores_cursor() {
        let mut arena = Arena::heap(TEST_ARENA_SIZE).unwrap();
        let block = arena.allocate(256).unwrap();
        let free = arena.rewind(256).unwrap();
        assert_eq!(free, arena.base_address());
        assert_eq!(arena.available(), TEST_ARENA_SIZE);
        assert_eq!(arena.allocate(256).unwrap(), block);
    }

    #[test]
    fn test_zero_requests_fail() {
        let mut arena = Arena::heap(TEST_ARENA_SIZE).unwrap();
        assert_eq!(
            arena.allocate(0),
            Err(Error::InvalidRequest {
                operation: "allocate"
            })
        );
        assert_eq!(
            arena.rewind(0),
            Err(Error::InvalidRequest { operation: "rewind" })
        );
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_rewind_underflow() {
        let mut arena = Arena::heap(TEST_ARENA_SIZE).unwrap();
        arena.allocate(8).unwrap();
        assert_eq!(
            arena.rewind(9),
            Err(Error::UnderflowRewind {
                requested: 9,
                used: 8
            })
        );
        assert_eq!(arena.used(), 8);
    }

    #[test]
    fn test_allocate_zeroed_clears_reused_bytes() {
        let mut arena = Arena::heap(64).unwrap();
        let first = arena.allocate_copy(&[0xAB; 32]).unwrap();
        assert!(arena.used_bytes().iter().all(|&b| b == 0xAB));

        arena.rewind(32).unwrap();
        let again = arena.allocate_zeroed(32).unwrap();
        assert_eq!(again, first);
        assert!(arena.used_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_used_bytes_mut_writes_through() {
        let mut arena = Arena::heap(16).unwrap();
        let ptr = arena.allocate(4).unwrap();
        arena.used_bytes_mut().copy_from_slice(b"MZ\x90\x00");
        assert_eq!(unsafe { *ptr.as_ptr() }, b'M');
    }

    #[test]
    fn test_reset() {
        let mut arena = Arena::heap(128).unwrap();
        arena.allocate(100).unwrap();
        arena.reset();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.free_address(), arena.base_address());
    }

    #[test]
    fn test_create_zero_fails_for_both_policies() {
        assert!(matches!(
            Arena::heap(0),
            Err(Error::InvalidRequest { .. })
        ));
        let backing = ParagraphBacking::new(TestPlatform::new(8));
        assert!(matches!(
            Arena::platform(&backing, 0),
            Err(Error::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_platform_exhaustion_reports_hint() {
        let backing = ParagraphBacking::new(TestPlatform::new(8));
        let err = Arena::platform(&backing, 1024).unwrap_err();
        assert!(matches!(
            err,
            Error::BackingExhausted {
                requested_units: 64,
                largest_available_units: 7,
                ..
            }
        ));
    }

    #[test]
    fn test_destroy_passes_platform_error_through() {
        let mut platform = TestPlatform::new(64);
        platform.failing_release = Some(crate::platform::DosErrorCode::MCB_DESTROYED);
        let backing = ParagraphBacking::new(platform);
        let arena = Arena::platform(&backing, 32).unwrap();

        assert_eq!(
            arena.destroy(),
            Err(Error::Platform {
                code: crate::platform::DosErrorCode::MCB_DESTROYED
            })
        );
        assert_eq!(backing.live_blocks(), 0);
    }

    #[test]
    fn test_backing_policy_tag() {
        assert_eq!(Backing::Heap.policy(), Policy::Heap);
        assert_eq!(Policy::PlatformQuantized.to_string(), "MEM_POLICY_PLATFORM");
    }
}
