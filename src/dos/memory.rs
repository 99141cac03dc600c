//! Conventional memory with a DOS-style control block chain.
//!
//! The image is a run of paragraphs starting at a base segment. Every block
//! is preceded by a one-paragraph control header, and the headers chain the
//! whole image:
//!
//! ```text
//!   base                                                         end
//!   ┌───┬──────────────┬───┬────────────┬───┬──────────────────────┐
//!   │ M │ owned block  │ M │ free block │ Z │ owned block          │
//!   └───┴──────────────┴───┴────────────┴───┴──────────────────────┘
//!     ▲                  ▲                ▲
//!     header segment     next = header + 1 + size
//! ```
//!
//! Reservation is first fit and splits the free block it lands in.
//! Releasing merges the block with free neighbours on both sides. The chain
//! is kept in an ordered map and rewritten into the image after every change,
//! so the image always reads like the real thing.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::ptr::NonNull;

use realmode_mem::constants::{MCB_SIZE, PARAGRAPH_SIZE};
use realmode_mem::mcb::{ChainMarker, McbHeader, Owner, dump_mcb};
use realmode_mem::{Address, DosErrorCode, PlatformMemory, ReserveFailure};

use super::config::{ConfigError, ConventionalMemoryConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block {
    owner: u16,
    paragraphs: u16,
    name: [u8; 8],
}

impl Block {
    const fn free(paragraphs: u16) -> Self {
        Self {
            owner: Owner::FREE_TAG,
            paragraphs,
            name: [0; 8],
        }
    }

    const fn is_free(&self) -> bool {
        self.owner == Owner::FREE_TAG
    }

    fn header(&self, last: bool) -> McbHeader {
        McbHeader {
            marker: if last {
                ChainMarker::Last
            } else {
                ChainMarker::Middle
            },
            owner: Owner::from_tag(self.owner),
            paragraphs: self.paragraphs,
            name: self.name,
        }
    }
}

/// A simulated conventional memory area serving paragraph requests.
pub struct ConventionalMemory {
    config: ConventionalMemoryConfig,
    image: NonNull<[u8]>,
    /// Blocks keyed by the segment of their control header.
    chain: BTreeMap<u16, Block>,
}

impl ConventionalMemory {
    /// Builds a zeroed image holding a single free block.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] if `config` does not validate.
    pub fn new(config: ConventionalMemoryConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let len = config.paragraphs as usize * PARAGRAPH_SIZE;
        let image = NonNull::from(Box::leak(vec![0u8; len].into_boxed_slice()));

        let mut chain = BTreeMap::new();
        chain.insert(config.base_segment, Block::free(config.paragraphs - 1));

        let memory = Self {
            config,
            image,
            chain,
        };
        memory.sync_image();
        realmode_log::debug!(
            "conventional memory: {} paragraphs at {:04X}:0000",
            memory.config.paragraphs,
            memory.config.base_segment
        );
        Ok(memory)
    }

    /// The layout this image was built from.
    #[must_use]
    pub fn config(&self) -> &ConventionalMemoryConfig {
        &self.config
    }

    /// Total free paragraphs, fragmentation ignored.
    #[must_use]
    pub fn free_paragraphs(&self) -> u32 {
        self.chain
            .values()
            .filter(|block| block.is_free())
            .map(|block| u32::from(block.paragraphs))
            .sum()
    }

    /// Largest contiguous free block in paragraphs.
    #[must_use]
    pub fn largest_free(&self) -> u16 {
        self.chain
            .values()
            .filter(|block| block.is_free())
            .map(|block| block.paragraphs)
            .max()
            .unwrap_or(0)
    }

    /// Walks the chain, yielding each header segment with its header.
    pub fn blocks(&self) -> impl Iterator<Item = (u16, McbHeader)> + '_ {
        let last = self.chain.keys().next_back().copied();
        self.chain
            .iter()
            .map(move |(&segment, block)| (segment, block.header(Some(segment) == last)))
    }

    /// Decodes the header bytes currently in the image at `segment`.
    ///
    /// This reads memory, not the chain: stale and overwritten headers show
    /// up as they are.
    #[must_use]
    pub fn read_header(&self, segment: u16) -> Option<McbHeader> {
        let offset = self.offset_of(segment)?;
        let mut bytes = [0u8; MCB_SIZE];
        // SAFETY: `offset_of` keeps a whole paragraph inside the image.
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.image.cast::<u8>().as_ptr().add(offset),
                bytes.as_mut_ptr(),
                MCB_SIZE,
            );
        }
        Some(McbHeader::decode(&bytes))
    }

    /// Writes every header of the chain to `stream`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from `stream`.
    pub fn dump_chain<W: Write + ?Sized>(&self, stream: &mut W) -> io::Result<()> {
        for (segment, header) in self.blocks() {
            dump_mcb(stream, Address::from_unit(segment), &header)?;
        }
        Ok(())
    }

    fn end_segment(&self) -> u32 {
        u32::from(self.config.base_segment) + u32::from(self.config.paragraphs)
    }

    fn offset_of(&self, segment: u16) -> Option<usize> {
        if segment < self.config.base_segment || u32::from(segment) >= self.end_segment() {
            return None;
        }
        Some((segment - self.config.base_segment) as usize * PARAGRAPH_SIZE)
    }

    fn next_segment(segment: u16, block: &Block) -> Option<u16> {
        u16::try_from(u32::from(segment) + 1 + u32::from(block.paragraphs)).ok()
    }

    fn sync_image(&self) {
        let last = self.chain.keys().next_back().copied();
        for (&segment, block) in &self.chain {
            let Some(offset) = self.offset_of(segment) else {
                continue;
            };
            let bytes = block.header(Some(segment) == last).encode();
            // SAFETY: `offset_of` keeps a whole paragraph inside the image,
            // and no reference into the image outlives a call.
            unsafe {
                std::ptr::copy_nonoverlapping(
                    bytes.as_ptr(),
                    self.image.cast::<u8>().as_ptr().add(offset),
                    MCB_SIZE,
                );
            }
        }
    }
}

impl PlatformMemory for ConventionalMemory {
    fn reserve(&mut self, paragraphs: u16) -> Result<u16, ReserveFailure> {
        let found = self
            .chain
            .iter()
            .find(|(_, block)| block.is_free() && block.paragraphs >= paragraphs)
            .map(|(&segment, &block)| (segment, block));

        let Some((segment, free)) = found else {
            let largest_available = self.largest_free();
            realmode_log::trace!(
                "refused {paragraphs} paragraphs, largest free {largest_available}"
            );
            return Err(ReserveFailure {
                code: DosErrorCode::INSUFFICIENT_MEMORY,
                largest_available,
            });
        };

        if free.paragraphs > paragraphs {
            // rest < segment + 1 + free.paragraphs <= end, so it fits a u16
            let rest = (u32::from(segment) + 1 + u32::from(paragraphs)) as u16;
            self.chain
                .insert(rest, Block::free(free.paragraphs - paragraphs - 1));
        }
        self.chain.insert(
            segment,
            Block {
                owner: self.config.owner,
                paragraphs,
                name: self.config.name_bytes(),
            },
        );
        self.sync_image();

        let unit = segment + 1;
        realmode_log::trace!("granted {paragraphs} paragraphs at {unit:04X}:0000");
        Ok(unit)
    }

    fn release(&mut self, unit: u16) -> Result<(), DosErrorCode> {
        let segment = unit.checked_sub(1).ok_or(DosErrorCode::INVALID_BLOCK)?;
        let mut block = match self.chain.get(&segment) {
            Some(block) if !block.is_free() => Block::free(block.paragraphs),
            _ => return Err(DosErrorCode::INVALID_BLOCK),
        };

        if let Some(next) = Self::next_segment(segment, &block) {
            if let Some(&following) = self.chain.get(&next).filter(|b| b.is_free()) {
                self.chain.remove(&next);
                block.paragraphs += following.paragraphs + 1;
            }
        }

        let previous = self
            .chain
            .range(..segment)
            .next_back()
            .filter(|(_, b)| b.is_free())
            .map(|(&s, _)| s);
        match previous {
            Some(previous) => {
                self.chain.remove(&segment);
                if let Some(prior) = self.chain.get_mut(&previous) {
                    prior.paragraphs += block.paragraphs + 1;
                }
            }
            None => {
                self.chain.insert(segment, block);
            }
        }

        self.sync_image();
        realmode_log::trace!("released block at {unit:04X}:0000");
        Ok(())
    }

    fn host_ptr(&mut self, unit: u16) -> Option<NonNull<u8>> {
        let offset = self.offset_of(unit)?;
        // SAFETY: `offset_of` keeps the offset inside the image.
        Some(unsafe { self.image.cast::<u8>().add(offset) })
    }
}

impl Drop for ConventionalMemory {
    fn drop(&mut self) {
        // SAFETY: `image` came from `Box::leak` in `new` and is freed once.
        drop(unsafe { Box::from_raw(self.image.as_ptr()) });
    }
}

impl fmt::Debug for ConventionalMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConventionalMemory")
            .field("config", &self.config)
            .field("blocks", &self.chain.len())
            .field("free_paragraphs", &self.free_paragraphs())
            .finish()
    }
}
