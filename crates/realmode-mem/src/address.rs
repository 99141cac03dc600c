//! Segmented and linear views of a 20-bit real-mode address.
//!
//! An [`Address`] names a byte either as a linear offset or as a
//! `(unit, offset)` pair where each unit is one 16-byte paragraph:
//!
//! ```text
//!   linear = unit * 16 + offset
//!
//!   unit    0x1234  ->  0x12340
//!   offset  0x0005  ->  0x00005
//!                       -------
//!   linear              0x12345
//! ```
//!
//! Many pairs name the same byte (`1234:0005` and `1230:0045` are equal).
//! Equality and ordering therefore compare the linear value.
//!
//! Addresses produced by the quantized backing policy always have offset 0.
//! The heap policy never produces an `Address` at all; it hands out host
//! pointers, which [`diff_pointers`] compares.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::constants::PARAGRAPH_SIZE;

const UNIT_SHIFT: u32 = 4;
const UNIT_MASK: u32 = (PARAGRAPH_SIZE as u32) - 1;
const MAX_LINEAR: u32 = ((u16::MAX as u32) << UNIT_SHIFT) + u16::MAX as u32;

/// A real-mode address as a `(unit, offset)` pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct Address {
    unit: u16,
    offset: u16,
}

impl Address {
    /// Linear address `0`.
    pub const NULL: Address = Address { unit: 0, offset: 0 };

    /// Builds an address from its unit and offset.
    #[must_use]
    pub const fn from_unit_offset(unit: u16, offset: u16) -> Self {
        Self { unit, offset }
    }

    /// Builds the address of the first byte of `unit`.
    #[must_use]
    pub const fn from_unit(unit: u16) -> Self {
        Self { unit, offset: 0 }
    }

    /// Builds the normalized pair for a linear address: offset below 16,
    /// except above `FFFF:000F` where the unit is pinned at `FFFF`.
    ///
    /// Returns `None` above the highest address a pair can name
    /// (`FFFF:FFFF`, linear `0x10FFEF`).
    #[must_use]
    pub const fn from_linear(linear: u32) -> Option<Self> {
        if linear > MAX_LINEAR {
            return None;
        }
        let unit = linear >> UNIT_SHIFT;
        if unit > u16::MAX as u32 {
            return Some(Self {
                unit: u16::MAX,
                offset: (linear - ((u16::MAX as u32) << UNIT_SHIFT)) as u16,
            });
        }
        Some(Self {
            unit: unit as u16,
            offset: (linear & UNIT_MASK) as u16,
        })
    }

    /// Unpacks a far pointer, segment in the high word and offset in the low.
    #[must_use]
    pub const fn from_far(far: u32) -> Self {
        Self {
            unit: (far >> 16) as u16,
            offset: far as u16,
        }
    }

    /// Packs into a far pointer, segment in the high word and offset in the low.
    #[must_use]
    pub const fn to_far(self) -> u32 {
        ((self.unit as u32) << 16) | self.offset as u32
    }

    /// The flat address.
    #[must_use]
    pub const fn to_linear(self) -> u32 {
        ((self.unit as u32) << UNIT_SHIFT) + self.offset as u32
    }

    /// The paragraph component.
    #[must_use]
    pub const fn unit(self) -> u16 {
        self.unit
    }

    /// The byte offset component.
    #[must_use]
    pub const fn offset(self) -> u16 {
        self.offset
    }

    /// The same byte with as much of the offset as fits folded into the unit.
    #[must_use]
    pub const fn normalized(self) -> Self {
        match Self::from_linear(self.to_linear()) {
            Some(address) => address,
            None => self,
        }
    }

    /// The address `bytes` further on, normalized.
    ///
    /// Returns `None` past `FFFF:FFFF`.
    #[must_use]
    pub fn add_bytes(self, bytes: u32) -> Option<Self> {
        self.to_linear()
            .checked_add(bytes)
            .and_then(Self::from_linear)
    }

    /// The first byte of the unit before this one: where the platform keeps
    /// the control header of a block starting here.
    ///
    /// Returns `None` for unit 0.
    #[must_use]
    pub const fn unit_before(self) -> Option<Self> {
        match self.unit.checked_sub(1) {
            Some(unit) => Some(Self::from_unit(unit)),
            None => None,
        }
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.to_linear() == other.to_linear()
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_linear().hash(state);
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_linear().cmp(&other.to_linear())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{:04X}", self.unit, self.offset)
    }
}

/// Signed byte distance `a - b` between two linear addresses.
///
/// Only meaningful for addresses inside the same owned range.
#[must_use]
pub fn difference(a: Address, b: Address) -> i32 {
    a.to_linear().wrapping_sub(b.to_linear()) as i32
}

/// Signed byte distance `p1 - p2` between two host pointers.
///
/// Only meaningful for pointers into the same allocation.
#[must_use]
pub fn diff_pointers<T, U>(p1: *const T, p2: *const U) -> isize {
    p1.addr().wrapping_sub(p2.addr()) as isize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_from_pair() {
        let address = Address::from_unit_offset(0x1234, 0x0005);
        assert_eq!(address.to_linear(), 0x12345);
    }

    #[test]
    fn test_from_linear_normalizes() {
        let address = Address::from_linear(0x12345).unwrap();
        assert_eq!(address.unit(), 0x1234);
        assert_eq!(address.offset(), 0x0005);
        let top = Address::from_linear(0x10FFEF).unwrap();
        assert_eq!((top.unit(), top.offset()), (0xFFFF, 0xFFFF));
        assert!(Address::from_linear(0x10FFF0).is_none());
    }

    #[test]
    fn test_aliased_pairs_are_equal() {
        let a = Address::from_unit_offset(0x1000, 0x0010);
        let b = Address::from_unit(0x1001);
        assert_eq!(a, b);
        assert_eq!(a.normalized().offset(), 0);
        assert_eq!(a.normalized().unit(), 0x1001);
    }

    #[test]
    fn test_far_packing() {
        let address = Address::from_unit_offset(0xB800, 0x00A0);
        assert_eq!(address.to_far(), 0xB800_00A0);
        let back = Address::from_far(0xB800_00A0);
        assert_eq!(back.unit(), 0xB800);
        assert_eq!(back.offset(), 0x00A0);
    }

    #[test]
    fn test_difference() {
        let base = Address::from_unit(0x2000);
        let later = base.add_bytes(100).unwrap();
        assert_eq!(difference(later, base), 100);
        assert_eq!(difference(base, later), -100);
        assert_eq!(difference(base, base), 0);
    }

    #[test]
    fn test_diff_pointers() {
        let buffer = [0u8; 100];
        let p1 = &buffer[10] as *const u8;
        let p2 = &buffer[30] as *const u8;
        assert_eq!(diff_pointers(p1, p2), -20);
        assert_eq!(diff_pointers(p2, p1), 20);

        let words = [0i32; 10];
        assert_eq!(
            diff_pointers(&words[5] as *const i32, &words[2] as *const i32),
            3 * std::mem::size_of::<i32>() as isize
        );
    }

    #[test]
    fn test_unit_before() {
        assert_eq!(
            Address::from_unit(0x0800).unit_before(),
            Some(Address::from_unit(0x07FF))
        );
        assert_eq!(Address::NULL.unit_before(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Address::from_unit_offset(0x07FF, 0).to_string(), "07FF:0000");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn linear_round_trips_through_normalized_pair(unit in 0u16..0xF000, offset in any::<u16>()) {
                let address = Address::from_unit_offset(unit, offset);
                let normal = address.normalized();
                prop_assert!(normal.offset() < 16);
                prop_assert_eq!(normal.to_linear(), address.to_linear());
            }

            #[test]
            fn add_bytes_moves_linear(unit in 0u16..0x8000, bytes in 0u32..0x10000) {
                let base = Address::from_unit(unit);
                let moved = base.add_bytes(bytes).unwrap();
                prop_assert_eq!(difference(moved, base), bytes as i32);
            }
        }
    }
}
