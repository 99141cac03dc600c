//! Read-only decoder for platform memory control blocks.
//!
//! Every block the platform grants is preceded by a one-paragraph header:
//!
//! ```text
//!   offset  size    field
//!   00h     byte    chain marker: 'M' middle block, 'Z' last block
//!   01h     word    owner: 0000h free, 0008h system, else owning program
//!   03h     word    size in paragraphs (header excluded)
//!   05h     3 bytes reserved
//!   08h     8 bytes program name, not NUL-terminated when 8 long
//! ```

use std::fmt;
use std::io::{self, Write};

use crate::address::Address;
use crate::constants::{MCB_SIZE, PARAGRAPH_SIZE};

/// Position of a block in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMarker {
    /// More blocks follow.
    Middle,
    /// Last block of the chain.
    Last,
    /// Anything else, including a released block's sentinel.
    Invalid(u8),
}

impl ChainMarker {
    /// Marker byte for a block followed by others.
    pub const MIDDLE: u8 = b'M';
    /// Marker byte for the final block.
    pub const LAST: u8 = b'Z';

    /// Classifies a marker byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            Self::MIDDLE => ChainMarker::Middle,
            Self::LAST => ChainMarker::Last,
            other => ChainMarker::Invalid(other),
        }
    }

    /// The marker byte.
    #[must_use]
    pub const fn byte(self) -> u8 {
        match self {
            ChainMarker::Middle => Self::MIDDLE,
            ChainMarker::Last => Self::LAST,
            ChainMarker::Invalid(byte) => byte,
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            ChainMarker::Middle => "Middle block",
            ChainMarker::Last => "Last block",
            ChainMarker::Invalid(_) => "Invalid",
        }
    }
}

/// Who owns a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    /// Unallocated.
    Free,
    /// Held by the system itself.
    System,
    /// Held by the program whose prefix segment is given.
    Program(u16),
}

impl Owner {
    /// Owner tag of free blocks.
    pub const FREE_TAG: u16 = 0x0000;
    /// Owner tag of system blocks.
    pub const SYSTEM_TAG: u16 = 0x0008;

    /// Classifies an owner tag.
    #[must_use]
    pub const fn from_tag(tag: u16) -> Self {
        match tag {
            Self::FREE_TAG => Owner::Free,
            Self::SYSTEM_TAG => Owner::System,
            psp => Owner::Program(psp),
        }
    }

    /// The owner tag.
    #[must_use]
    pub const fn tag(self) -> u16 {
        match self {
            Owner::Free => Self::FREE_TAG,
            Owner::System => Self::SYSTEM_TAG,
            Owner::Program(psp) => psp,
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            Owner::Free => "Free",
            Owner::System => "DOS System",
            Owner::Program(_) => "Program Owned",
        }
    }
}

/// A decoded control header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McbHeader {
    /// Position in the chain.
    pub marker: ChainMarker,
    /// Owning program or state.
    pub owner: Owner,
    /// Block size in paragraphs.
    pub paragraphs: u16,
    /// Program name, space- or NUL-padded.
    pub name: [u8; 8],
}

impl McbHeader {
    const OWNER_OFFSET: usize = 1;
    const SIZE_OFFSET: usize = 3;
    const NAME_OFFSET: usize = 8;

    /// Decodes a header paragraph.
    #[must_use]
    pub fn decode(bytes: &[u8; MCB_SIZE]) -> Self {
        let word = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let mut name = [0u8; 8];
        name.copy_from_slice(&bytes[Self::NAME_OFFSET..Self::NAME_OFFSET + 8]);

        Self {
            marker: ChainMarker::from_byte(bytes[0]),
            owner: Owner::from_tag(word(Self::OWNER_OFFSET)),
            paragraphs: word(Self::SIZE_OFFSET),
            name,
        }
    }

    /// Encodes into a header paragraph; reserved bytes are zero.
    #[must_use]
    pub fn encode(&self) -> [u8; MCB_SIZE] {
        let mut bytes = [0u8; MCB_SIZE];
        bytes[0] = self.marker.byte();
        bytes[Self::OWNER_OFFSET..Self::OWNER_OFFSET + 2]
            .copy_from_slice(&self.owner.tag().to_le_bytes());
        bytes[Self::SIZE_OFFSET..Self::SIZE_OFFSET + 2]
            .copy_from_slice(&self.paragraphs.to_le_bytes());
        bytes[Self::NAME_OFFSET..].copy_from_slice(&self.name);
        bytes
    }

    /// Block size in bytes.
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.paragraphs as usize * PARAGRAPH_SIZE
    }

    /// The name up to the first NUL, lossily decoded.
    #[must_use]
    pub fn name_lossy(&self) -> String {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..len]).into_owned()
    }
}

impl fmt::Display for McbHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Offset\tSize\tValue")?;
        writeln!(
            f,
            "00h\tbyte\t{} ({})",
            self.marker.byte().escape_ascii(),
            self.marker.describe()
        )?;
        writeln!(
            f,
            "01h\tword\t{:04X} ({})",
            self.owner.tag(),
            self.owner.describe()
        )?;
        writeln!(
            f,
            "03h\tword\t{} paragraphs ({} bytes)",
            self.paragraphs,
            self.bytes()
        )?;
        writeln!(f, "08h\t8bytes\t\"{}\"", self.name_lossy())
    }
}

/// Writes a decoded header, as found at `at`, to `stream`.
///
/// # Errors
///
/// Returns any I/O error from `stream`.
pub fn dump_mcb<W: Write + ?Sized>(
    stream: &mut W,
    at: Address,
    header: &McbHeader,
) -> io::Result<()> {
    writeln!(stream)?;
    writeln!(stream, "MCB - Memory Control Block @{at}")?;
    write!(stream, "{header}")?;
    stream.flush()
}
