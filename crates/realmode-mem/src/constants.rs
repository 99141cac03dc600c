//! Size constants shared by the backing policies.

/// One kibibyte.
pub const SIZE_1K: usize = 1024;
/// Two kibibytes.
pub const SIZE_2K: usize = SIZE_1K * 2;
/// Four kibibytes.
pub const SIZE_4K: usize = SIZE_2K * 2;
/// Eight kibibytes.
pub const SIZE_8K: usize = SIZE_4K * 2;
/// Sixteen kibibytes.
pub const SIZE_16K: usize = SIZE_8K * 2;
/// Thirty-two kibibytes.
pub const SIZE_32K: usize = SIZE_16K * 2;
/// Sixty-four kibibytes, one real-mode segment.
pub const SIZE_64K: usize = SIZE_32K * 2;

/// Bytes per paragraph, the quantum of the platform memory service.
///
/// Incrementing a segment register by one moves the address by this much.
pub const PARAGRAPH_SIZE: usize = 16;

/// Largest paragraph count a single platform request can carry (a 16-bit word).
pub const MAX_PARAGRAPHS: u16 = 0xFFFF;

/// Largest byte request the quantized policy accepts: 0xFFFF paragraphs,
/// one paragraph short of 1 MiB.
pub const MAX_PLATFORM_REQUEST: usize = MAX_PARAGRAPHS as usize * PARAGRAPH_SIZE;

/// Size of a memory control block header. It occupies the paragraph just
/// before every block the platform hands out.
pub const MCB_SIZE: usize = 16;

/// Alignment of heap-backed arena ranges.
pub const HEAP_ALIGNMENT: usize = PARAGRAPH_SIZE;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_request_is_one_paragraph_short_of_a_mebibyte() {
        assert_eq!(MAX_PLATFORM_REQUEST, 1_048_560);
        assert_eq!(MAX_PLATFORM_REQUEST + PARAGRAPH_SIZE, 1024 * SIZE_1K);
    }

    #[test]
    fn test_size_ladder() {
        assert_eq!(SIZE_64K, 65536);
        assert_eq!(MCB_SIZE, PARAGRAPH_SIZE);
    }
}
