//! Layout of the simulated conventional memory.

use std::fmt;

use realmode_mem::mcb::Owner;

/// Shape of a [`ConventionalMemory`](super::ConventionalMemory) image.
///
/// The default mirrors a freshly booted machine: the arena starts at
/// segment `0800h` and runs up to the 640K line at `A000h`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalMemoryConfig {
    /// Segment of the first control header.
    pub base_segment: u16,
    /// Size of the image in paragraphs, headers included.
    pub paragraphs: u16,
    /// Owner tag stamped on granted blocks.
    pub owner: u16,
    /// Program name stamped on granted blocks, at most 8 bytes.
    pub program_name: String,
}

impl Default for ConventionalMemoryConfig {
    fn default() -> Self {
        Self {
            base_segment: 0x0800,
            paragraphs: 0x9800,
            owner: 0x0800,
            program_name: String::from("REALMODE"),
        }
    }
}

impl ConventionalMemoryConfig {
    /// Longest program name a control header holds.
    pub const NAME_LEN: usize = 8;

    /// Sets the segment of the first control header.
    #[must_use]
    pub fn with_base_segment(mut self, base_segment: u16) -> Self {
        self.base_segment = base_segment;
        self
    }

    /// Sets the image size in paragraphs.
    #[must_use]
    pub fn with_paragraphs(mut self, paragraphs: u16) -> Self {
        self.paragraphs = paragraphs;
        self
    }

    /// Sets the owner tag of granted blocks.
    #[must_use]
    pub fn with_owner(mut self, owner: u16) -> Self {
        self.owner = owner;
        self
    }

    /// Sets the program name of granted blocks.
    #[must_use]
    pub fn with_program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = name.into();
        self
    }

    /// Checks that the layout describes a usable image.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paragraphs == 0 {
            return Err(ConfigError::EmptyImage);
        }
        if u32::from(self.base_segment) + u32::from(self.paragraphs) > 0x1_0000 {
            return Err(ConfigError::PastAddressSpace {
                base_segment: self.base_segment,
                paragraphs: self.paragraphs,
            });
        }
        if self.owner == Owner::FREE_TAG {
            return Err(ConfigError::FreeOwner);
        }
        if self.program_name.len() > Self::NAME_LEN {
            return Err(ConfigError::NameTooLong {
                len: self.program_name.len(),
            });
        }
        Ok(())
    }

    /// The program name as stored in a header, NUL-padded.
    pub(crate) fn name_bytes(&self) -> [u8; 8] {
        let mut name = [0u8; 8];
        let bytes = self.program_name.as_bytes();
        let len = bytes.len().min(Self::NAME_LEN);
        name[..len].copy_from_slice(&bytes[..len]);
        name
    }
}

/// Rejected simulator layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Zero paragraphs requested.
    EmptyImage,

    /// The image would run past segment `FFFFh`.
    PastAddressSpace {
        /// First segment of the image.
        base_segment: u16,
        /// Image size in paragraphs.
        paragraphs: u16,
    },

    /// Owner tag `0000h` would make granted blocks look free.
    FreeOwner,

    /// Program name longer than a header holds.
    NameTooLong {
        /// Length of the rejected name in bytes.
        len: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyImage => write!(f, "Memory image has no paragraphs"),
            ConfigError::PastAddressSpace {
                base_segment,
                paragraphs,
            } => write!(
                f,
                "{paragraphs} paragraphs from segment {base_segment:04X} cross FFFF:0000"
            ),
            ConfigError::FreeOwner => write!(f, "Owner tag 0000 marks blocks free"),
            ConfigError::NameTooLong { len } => {
                write!(f, "Program name of {len} bytes exceeds 8")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reaches_640k_line() {
        let config = ConventionalMemoryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            u32::from(config.base_segment) + u32::from(config.paragraphs),
            0xA000
        );
    }

    #[test]
    fn test_rejects_empty_and_wrapping_images() {
        let empty = ConventionalMemoryConfig::default().with_paragraphs(0);
        assert_eq!(empty.validate(), Err(ConfigError::EmptyImage));

        let wrapping = ConventionalMemoryConfig::default()
            .with_base_segment(0xF000)
            .with_paragraphs(0x2000);
        assert!(matches!(
            wrapping.validate(),
            Err(ConfigError::PastAddressSpace { .. })
        ));

        let top = ConventionalMemoryConfig::default()
            .with_base_segment(0xF000)
            .with_paragraphs(0x1000);
        assert!(top.validate().is_ok());
    }

    #[test]
    fn test_rejects_free_owner_and_long_name() {
        let config = ConventionalMemoryConfig::default().with_owner(0);
        assert_eq!(config.validate(), Err(ConfigError::FreeOwner));

        let config = ConventionalMemoryConfig::default().with_program_name("TOOLONGNAME");
        assert_eq!(config.validate(), Err(ConfigError::NameTooLong { len: 11 }));
    }

    #[test]
    fn test_name_bytes_are_nul_padded() {
        let config = ConventionalMemoryConfig::default().with_program_name("ARENA");
        assert_eq!(&config.name_bytes(), b"ARENA\0\0\0");
    }
}
