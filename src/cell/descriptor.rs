use crate::cell::level_mask::LevelMask;

/// Two descriptor bytes which prefix every serialized cell.
///
/// `d1` packs the reference count, the exotic flag, the store-hashes flag
/// and the level mask. `d2` encodes the data length in half-bytes, its
/// parity doubles as the byte-alignment flag.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CellDescriptor {
    pub d1: u8,
    pub d2: u8,
}

impl CellDescriptor {
    pub const REF_COUNT_MASK: u8 = 0b0000_0111;
    pub const IS_EXOTIC_MASK: u8 = 0b0000_1000;
    pub const STORE_HASHES_MASK: u8 = 0b0001_0000;
    pub const LEVEL_MASK: u8 = 0b1110_0000;

    #[inline]
    pub const fn new(d1: u8, d2: u8) -> Self {
        Self { d1, d2 }
    }

    /// Builds a descriptor from cell parts.
    pub const fn compute(
        ref_count: u8,
        is_exotic: bool,
        level_mask: LevelMask,
        bit_len: u16,
    ) -> Self {
        let mut d1 = ref_count & Self::REF_COUNT_MASK;
        if is_exotic {
            d1 |= Self::IS_EXOTIC_MASK;
        }
        d1 |= level_mask.to_byte() << 5;
        let d2 = (bit_len / 8) as u8 + bit_len.div_ceil(8) as u8;
        Self { d1, d2 }
    }

    /// Returns the number of child references.
    #[inline]
    pub const fn reference_count(self) -> u8 {
        self.d1 & Self::REF_COUNT_MASK
    }

    /// Returns whether the cell is not ordinary.
    #[inline]
    pub const fn is_exotic(self) -> bool {
        self.d1 & Self::IS_EXOTIC_MASK != 0
    }

    /// Returns whether hashes are stored inline in the serialized form.
    #[inline]
    pub const fn store_hashes(self) -> bool {
        self.d1 & Self::STORE_HASHES_MASK != 0
    }

    /// Returns the level mask encoded in the three high bits of `d1`.
    #[inline]
    pub const fn level_mask(self) -> LevelMask {
        LevelMask::new(self.d1 >> 5)
    }

    /// Returns whether the data ends exactly on a byte boundary.
    #[inline]
    pub const fn is_aligned(self) -> bool {
        self.d2 & 1 == 0
    }

    /// Returns the length of the data in bytes, including the
    /// completion-tag byte of unaligned cells.
    #[inline]
    pub const fn byte_len(self) -> u8 {
        (self.d2 & 1) + (self.d2 >> 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_round_trip() {
        let d = CellDescriptor::compute(3, false, LevelMask::EMPTY, 1023);
        assert_eq!(d.d1, 3);
        assert_eq!(d.d2, 127 + 128);
        assert_eq!(d.reference_count(), 3);
        assert!(!d.is_exotic());
        assert!(!d.is_aligned());
        assert_eq!(d.byte_len(), 128);

        let d = CellDescriptor::compute(0, true, LevelMask::new(0b001), 288);
        assert_eq!(d.d1, 0b0010_1000);
        assert_eq!(d.d2, 72);
        assert!(d.is_exotic());
        assert!(d.is_aligned());
        assert_eq!(d.level_mask(), LevelMask::new(0b001));
        assert_eq!(d.byte_len(), 36);
    }
}
