use num_bigint::{BigInt, BigUint};
use smallvec::SmallVec;

use crate::address::Address;
use crate::bitstring::BitString;
use crate::cell::hasher::{self, CellParts};
use crate::cell::slice::CellSlice;
use crate::cell::{Cell, MAX_REF_COUNT};
use crate::error::Error;
use crate::util;

/// Builds a new cell incrementally.
///
/// All `store_*` methods check the 1023-bit and 4-reference limits and
/// leave the builder untouched on failure. [`build`] consumes the builder,
/// validates exotic layouts and computes the hashes.
///
/// [`build`]: CellBuilder::build
#[derive(Default)]
pub struct CellBuilder {
    bits: BitString,
    references: SmallVec<[Cell; 4]>,
    is_exotic: bool,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of bits stored so far.
    #[inline]
    pub fn bit_len(&self) -> u16 {
        self.bits.used_bits()
    }

    /// Returns the remaining data capacity in bits.
    #[inline]
    pub fn spare_bits(&self) -> u16 {
        self.bits.available_bits()
    }

    /// Returns the number of references stored so far.
    #[inline]
    pub fn reference_count(&self) -> u8 {
        self.references.len() as u8
    }

    /// Marks the cell as exotic. The first data byte must then carry
    /// a valid exotic type tag.
    #[inline]
    pub fn set_exotic(&mut self, is_exotic: bool) {
        self.is_exotic = is_exotic;
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<(), Error> {
        self.bits.write_bit(bit)
    }

    pub fn store_zeros(&mut self, bits: u16) -> Result<(), Error> {
        self.bits.write_zeros(bits)
    }

    pub fn store_uint(&mut self, value: u64, bits: u16) -> Result<(), Error> {
        self.bits.write_uint(value, bits)
    }

    pub fn store_int(&mut self, value: i64, bits: u16) -> Result<(), Error> {
        self.bits.write_int(value, bits)
    }

    pub fn store_big_uint(&mut self, value: &BigUint, bits: u16) -> Result<(), Error> {
        self.bits.write_big_uint(value, bits)
    }

    pub fn store_big_int(&mut self, value: &BigInt, bits: u16) -> Result<(), Error> {
        self.bits.write_big_int(value, bits)
    }

    pub fn store_byte(&mut self, value: u8) -> Result<(), Error> {
        self.bits.write_byte(value)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.bits.write_bytes(bytes)
    }

    /// Appends the unread remainder of a bit string.
    pub fn store_bit_string(&mut self, bits: &BitString) -> Result<(), Error> {
        self.bits.write_bit_string(bits)
    }

    pub fn store_var_uint(&mut self, value: &BigUint, len_bits: u16) -> Result<(), Error> {
        self.bits.write_var_uint(value, len_bits)
    }

    pub fn store_coins(&mut self, amount: &BigUint) -> Result<(), Error> {
        self.bits.write_coins(amount)
    }

    pub fn store_address(&mut self, address: Option<&Address>) -> Result<(), Error> {
        self.bits.write_address(address)
    }

    /// Appends a child reference.
    pub fn store_reference(&mut self, cell: Cell) -> Result<(), Error> {
        if self.references.len() < MAX_REF_COUNT {
            self.references.push(cell);
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Appends a `Maybe ^Cell`: a presence bit, then the reference.
    pub fn store_maybe_reference(&mut self, cell: Option<Cell>) -> Result<(), Error> {
        match cell {
            None => self.store_bit(false),
            Some(cell) => {
                if self.references.len() >= MAX_REF_COUNT || self.bits.available_bits() == 0 {
                    return Err(Error::CellOverflow);
                }
                ok!(self.store_bit(true));
                self.store_reference(cell)
            }
        }
    }

    /// Appends a dictionary root, `None` marks the empty dictionary.
    #[inline]
    pub fn store_dict(&mut self, root: Option<&Cell>) -> Result<(), Error> {
        self.store_maybe_reference(root.cloned())
    }

    /// Appends the unread remainder of a slice, data bits and references.
    pub fn store_slice(&mut self, slice: &CellSlice<'_>) -> Result<(), Error> {
        if slice.remaining_bits() > self.bits.available_bits()
            || slice.remaining_refs() as usize + self.references.len() > MAX_REF_COUNT
        {
            return Err(Error::CellOverflow);
        }
        for i in 0..slice.remaining_bits() {
            // Bounds were checked above.
            ok!(self.store_bit(slice.get_bit(i)));
        }
        for i in 0..slice.remaining_refs() {
            match slice.reference(i) {
                Some(child) => ok!(self.store_reference(child.clone())),
                None => return Err(Error::CellUnderflow),
            }
        }
        Ok(())
    }

    /// Finalizes the cell, computing its hashes and depths.
    pub fn build(self) -> Result<Cell, Error> {
        let bit_len = self.bits.used_bits();
        let mut data = self.bits.as_raw_bytes().to_vec();
        data.truncate(bit_len.div_ceil(8) as usize);
        if bit_len % 8 != 0 {
            // Completion tag: a single one bit, zero-padded to the byte end.
            let last = data.len() - 1;
            data[last] |= 1 << (7 - bit_len % 8);
        }
        hasher::finalize(CellParts {
            data,
            bit_len,
            is_exotic: self.is_exotic,
            references: self.references,
        })
    }
}

impl std::fmt::Debug for CellBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellBuilder")
            .field("bits", &util::encode_bits_hex(self.bits.as_raw_bytes(), self.bits.used_bits()))
            .field("refs", &self.references.len())
            .field("is_exotic", &self.is_exotic)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_enforced() {
        let mut b = CellBuilder::new();
        b.store_zeros(1023).unwrap();
        assert_eq!(b.store_bit(true), Err(Error::CellOverflow));
        assert_eq!(b.build().unwrap().bit_len(), 1023);

        let mut b = CellBuilder::new();
        for _ in 0..4 {
            b.store_reference(Cell::empty().clone()).unwrap();
        }
        assert_eq!(
            b.store_reference(Cell::empty().clone()),
            Err(Error::CellOverflow)
        );
    }

    #[test]
    fn completion_tag_is_applied() {
        let mut b = CellBuilder::new();
        b.store_uint(0b0101010, 7).unwrap();
        let cell = b.build().unwrap();
        assert_eq!(cell.data(), [0b0101_0101]);
        assert_eq!(cell.bit_len(), 7);
        assert_eq!(cell.descriptor().d2, 1);
    }

    #[test]
    fn store_slice_copies_the_remainder() {
        let mut b = CellBuilder::new();
        b.store_uint(0xabcd, 16).unwrap();
        b.store_reference(Cell::empty().clone()).unwrap();
        let cell = b.build().unwrap();

        let mut slice = cell.as_slice().unwrap();
        slice.load_uint(8).unwrap();

        let mut b = CellBuilder::new();
        b.store_slice(&slice).unwrap();
        let copy = b.build().unwrap();
        assert_eq!(copy.data(), [0xcd]);
        assert_eq!(copy.reference_count(), 1);
    }

    #[test]
    fn maybe_reference() {
        let mut b = CellBuilder::new();
        b.store_maybe_reference(None).unwrap();
        b.store_maybe_reference(Some(Cell::empty().clone())).unwrap();
        let cell = b.build().unwrap();

        let mut slice = cell.as_slice().unwrap();
        assert!(!slice.load_bit().unwrap());
        assert!(slice.load_bit().unwrap());
        assert_eq!(slice.load_reference().unwrap(), Cell::empty());
    }
}
