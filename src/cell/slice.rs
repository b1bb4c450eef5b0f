use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};

use crate::address::Address;
use crate::bitstring::BitString;
use crate::cell::Cell;
use crate::error::Error;
use crate::util;

/// A read cursor over a borrowed cell.
///
/// A slice is a cheap window into the cell's data bits and references,
/// `load_*` methods shrink it from the front. Copying a slice forks an
/// independent cursor.
#[derive(Clone, Copy)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bits_start: u16,
    bits_end: u16,
    refs_start: u8,
    refs_end: u8,
}

impl<'a> CellSlice<'a> {
    pub(crate) fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            bits_start: 0,
            bits_end: cell.bit_len(),
            refs_start: 0,
            refs_end: cell.reference_count(),
        }
    }

    /// Returns the underlying cell.
    #[inline]
    pub fn cell(&self) -> &'a Cell {
        self.cell
    }

    /// Returns the number of unread data bits.
    #[inline]
    pub fn remaining_bits(&self) -> u16 {
        self.bits_end - self.bits_start
    }

    /// Returns the number of unread references.
    #[inline]
    pub fn remaining_refs(&self) -> u8 {
        self.refs_end - self.refs_start
    }

    /// Returns whether both data and references are exhausted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits_start == self.bits_end && self.refs_start == self.refs_end
    }

    fn ensure_remaining(&self, bits: u16) -> Result<(), Error> {
        if util::unlikely(self.bits_start as u32 + bits as u32 > self.bits_end as u32) {
            Err(Error::CellUnderflow)
        } else {
            Ok(())
        }
    }

    /// Reads the bit at the given offset relative to the cursor.
    /// The caller keeps the offset within the remaining window.
    pub(crate) fn get_bit(&self, offset: u16) -> bool {
        util::get_bit(self.cell.data(), self.bits_start + offset)
    }

    pub(crate) fn skip_first_bits(&mut self, bits: u16) {
        self.bits_start = std::cmp::min(self.bits_start + bits, self.bits_end);
    }

    /// Advances past `bits` data bits.
    pub fn skip_bits(&mut self, bits: u16) -> Result<(), Error> {
        ok!(self.ensure_remaining(bits));
        self.bits_start += bits;
        Ok(())
    }

    /// Reads the next bit without advancing.
    pub fn peek_bit(&self) -> Result<bool, Error> {
        ok!(self.ensure_remaining(1));
        Ok(util::get_bit(self.cell.data(), self.bits_start))
    }

    /// Reads the next bit.
    pub fn load_bit(&mut self) -> Result<bool, Error> {
        let bit = ok!(self.peek_bit());
        self.bits_start += 1;
        Ok(bit)
    }

    /// Reads an unsigned integer of `bits` bits.
    pub fn load_uint(&mut self, bits: u16) -> Result<u64, Error> {
        if bits > 64 {
            return Err(Error::IntOverflow);
        }
        ok!(self.ensure_remaining(bits));
        let value = util::read_uint(self.cell.data(), self.bits_start, bits);
        self.bits_start += bits;
        Ok(value)
    }

    /// Reads a two's complement signed integer of `bits` bits.
    pub fn load_int(&mut self, bits: u16) -> Result<i64, Error> {
        let value = ok!(self.load_uint(bits));
        Ok(if bits > 0 && bits < 64 && value >> (bits - 1) & 1 != 0 {
            (value | !((1u64 << bits) - 1)) as i64
        } else {
            value as i64
        })
    }

    /// Reads an arbitrarily wide unsigned integer of `bits` bits.
    pub fn load_big_uint(&mut self, bits: u16) -> Result<BigUint, Error> {
        ok!(self.ensure_remaining(bits));
        let mut result = BigUint::zero();
        let mut rem = bits;
        while rem > 0 {
            let take = std::cmp::min(rem, 32);
            let chunk = ok!(self.load_uint(take));
            result = (result << take) | BigUint::from(chunk);
            rem -= take;
        }
        Ok(result)
    }

    /// Reads an arbitrarily wide two's complement integer of `bits` bits.
    pub fn load_big_int(&mut self, bits: u16) -> Result<BigInt, Error> {
        let unsigned = ok!(self.load_big_uint(bits));
        Ok(if bits > 0 && unsigned.bit(bits as u64 - 1) {
            BigInt::from(unsigned) - (BigInt::one() << bits)
        } else {
            BigInt::from(unsigned)
        })
    }

    /// Reads a single byte.
    #[inline]
    pub fn load_byte(&mut self) -> Result<u8, Error> {
        Ok(ok!(self.load_uint(8)) as u8)
    }

    /// Reads `len` bytes.
    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::with_capacity(len);
        for _ in 0..len {
            bytes.push(ok!(self.load_byte()));
        }
        Ok(bytes)
    }

    /// Reads `bits` bits into a new bit string.
    pub fn load_bits(&mut self, bits: u16) -> Result<BitString, Error> {
        ok!(self.ensure_remaining(bits));
        let mut result = BitString::new();
        for _ in 0..bits {
            let bit = util::get_bit(self.cell.data(), self.bits_start);
            self.bits_start += 1;
            ok!(result.write_bit(bit));
        }
        Ok(result)
    }

    /// Reads a length-prefixed unsigned integer.
    pub fn load_var_uint(&mut self, len_bits: u16) -> Result<BigUint, Error> {
        let byte_len = ok!(self.load_uint(len_bits));
        if byte_len > self.remaining_bits() as u64 / 8 {
            return Err(Error::CellUnderflow);
        }
        self.load_big_uint(byte_len as u16 * 8)
    }

    /// Reads a monetary amount (`VarUInteger 16`).
    #[inline]
    pub fn load_coins(&mut self) -> Result<BigUint, Error> {
        self.load_var_uint(4)
    }

    /// Reads an optional internal address.
    pub fn load_address(&mut self) -> Result<Option<Address>, Error> {
        match ok!(self.load_uint(2)) {
            0b00 => Ok(None),
            0b10 => {
                if ok!(self.load_bit()) {
                    return Err(Error::InvalidData);
                }
                let workchain = ok!(self.load_int(8)) as i8;
                let bytes = ok!(self.load_bytes(32));
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&bytes);
                Ok(Some(Address::new(workchain, hash)))
            }
            _ => Err(Error::InvalidTag),
        }
    }

    /// Returns the reference at the given offset relative to the cursor
    /// without advancing.
    pub fn reference(&self, offset: u8) -> Option<&'a Cell> {
        if self.refs_start + offset < self.refs_end {
            self.cell.reference(self.refs_start + offset)
        } else {
            None
        }
    }

    /// Reads the next reference.
    pub fn load_reference(&mut self) -> Result<&'a Cell, Error> {
        match self.cell.reference(self.refs_start) {
            Some(cell) if self.refs_start < self.refs_end => {
                self.refs_start += 1;
                Ok(cell)
            }
            _ => Err(Error::CellUnderflow),
        }
    }

    /// Reads a dictionary root: a presence bit, then the root reference.
    pub fn load_dict(&mut self) -> Result<Option<Cell>, Error> {
        if ok!(self.load_bit()) {
            Ok(Some(ok!(self.load_reference()).clone()))
        } else {
            Ok(None)
        }
    }
}

impl std::fmt::Debug for CellSlice<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellSlice")
            .field("bits", &(self.bits_start..self.bits_end))
            .field("refs", &(self.refs_start..self.refs_end))
            .finish()
    }
}
