use std::ops::{BitOr, BitOrAssign};

/// A set of levels at which a cell stores a distinct higher hash.
///
/// Bit `i` marks participation in level `i + 1`. Ordinary cells inherit
/// the union of their children's masks, merkle cells shift it down by one.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct LevelMask(u8);

impl LevelMask {
    pub const EMPTY: Self = LevelMask(0);
    pub const MAX_LEVEL: u8 = 3;

    /// Wraps a raw mask, ignoring bits past the third.
    #[inline]
    pub const fn new(mask: u8) -> Self {
        Self(mask & 0b111)
    }

    /// Returns the smallest mask which covers all levels up to `level`.
    #[inline]
    pub const fn from_level(level: u8) -> Self {
        Self(match level {
            0 => 0b000,
            1 => 0b001,
            2 => 0b011,
            _ => 0b111,
        })
    }

    /// Returns the cell level, i.e. the number of higher hashes present.
    #[inline]
    pub const fn level(self) -> u8 {
        self.0.count_ones() as u8
    }

    /// Returns whether the mask participates in the specified level.
    #[inline]
    pub const fn contains(self, level: u8) -> bool {
        level == 0 || self.0 & (1 << (level - 1)) != 0
    }

    /// Maps a level to an index into the stored hash list.
    #[inline]
    pub const fn hash_index(self, level: u8) -> u8 {
        Self(self.0 & Self::from_level(level).0).level()
    }

    /// Shifts the mask down, as seen through `offset` merkle layers.
    #[inline]
    pub const fn virtualize(self, offset: u8) -> Self {
        Self(self.0 >> offset)
    }

    /// Returns the raw mask byte.
    #[inline]
    pub const fn to_byte(self) -> u8 {
        self.0
    }
}

impl BitOr for LevelMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LevelMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::fmt::Debug for LevelMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{:03b}", self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_counts_bits() {
        const LEVEL: [u8; 8] = [0, 1, 1, 2, 1, 2, 2, 3];
        for mask in 0b000..=0b111 {
            assert_eq!(LevelMask::new(mask).level(), LEVEL[mask as usize]);
        }
    }

    #[test]
    fn hash_index_skips_absent_levels() {
        // Rows are mask bits, columns are the queried level.
        const TABLE: [[u8; 4]; 8] = [
            [0, 0, 0, 0], // 000
            [0, 1, 1, 1], // 001
            [0, 0, 1, 1], // 010
            [0, 1, 2, 2], // 011
            [0, 0, 0, 1], // 100
            [0, 1, 1, 2], // 101
            [0, 0, 1, 2], // 110
            [0, 1, 2, 3], // 111
        ];

        for mask in 0b000..=0b111 {
            for level in 0..=3 {
                assert_eq!(
                    LevelMask::new(mask).hash_index(level),
                    TABLE[mask as usize][level as usize],
                );
            }
        }
    }

    #[test]
    fn contains_and_virtualize() {
        let mask = LevelMask::new(0b101);
        assert!(mask.contains(0));
        assert!(mask.contains(1));
        assert!(!mask.contains(2));
        assert!(mask.contains(3));

        assert_eq!(mask.virtualize(1), LevelMask::new(0b010));
        assert_eq!(LevelMask::from_level(2), LevelMask::new(0b011));
    }
}
