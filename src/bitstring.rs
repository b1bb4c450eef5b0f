//! A growable bit buffer with independent read and write cursors.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Zero};

use crate::address::Address;
use crate::error::Error;
use crate::util;

/// Default capacity matching the cell payload limit.
const CELL_CAPACITY: u16 = 1023;

/// An append-only bit buffer with an independent read cursor.
///
/// Bits are packed big-endian (most significant bit first). Writing past
/// the capacity or reading past the write cursor fails with a typed error,
/// values are never truncated silently.
#[derive(Clone)]
pub struct BitString {
    data: Vec<u8>,
    capacity: u16,
    write_cursor: u16,
    read_cursor: u16,
}

impl Default for BitString {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl BitString {
    /// Creates an empty bit string with the 1023-bit cell capacity.
    pub fn new() -> Self {
        Self::with_capacity(CELL_CAPACITY)
    }

    /// Creates an empty bit string with an explicit capacity in bits.
    pub fn with_capacity(bits: u16) -> Self {
        Self {
            data: Vec::with_capacity(bits.div_ceil(8) as usize),
            capacity: bits,
            write_cursor: 0,
            read_cursor: 0,
        }
    }

    /// Wraps an existing bit-packed buffer.
    ///
    /// Unused bits of the last byte must be zero, otherwise the buffer
    /// is rejected with [`Error::InvalidData`].
    pub fn from_raw(mut data: Vec<u8>, bit_len: u16) -> Result<Self, Error> {
        let byte_len = bit_len.div_ceil(8) as usize;
        if data.len() < byte_len {
            return Err(Error::CellUnderflow);
        }
        data.truncate(byte_len);
        if bit_len % 8 != 0 && data[byte_len - 1] & (0xff >> (bit_len % 8)) != 0 {
            return Err(Error::InvalidData);
        }
        Ok(Self {
            data,
            capacity: std::cmp::max(bit_len, CELL_CAPACITY),
            write_cursor: bit_len,
            read_cursor: 0,
        })
    }

    /// Parses a bit string from its tagged hex form (inverse of [`to_hex`]).
    ///
    /// [`to_hex`]: BitString::to_hex
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let (data, bit_len) = util::decode_bits_hex(s)?;
        Self::from_raw(data, bit_len)
    }

    /// Returns the number of bits written so far.
    #[inline]
    pub fn used_bits(&self) -> u16 {
        self.write_cursor
    }

    /// Returns the remaining writable capacity in bits.
    #[inline]
    pub fn available_bits(&self) -> u16 {
        self.capacity - self.write_cursor
    }

    /// Returns the number of unread bits.
    #[inline]
    pub fn remaining_bits(&self) -> u16 {
        self.write_cursor - self.read_cursor
    }

    /// Returns the underlying bytes, zero-padded to a byte boundary.
    #[inline]
    pub fn as_raw_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the bit at the specified absolute index.
    pub fn get(&self, index: u16) -> Option<bool> {
        if index < self.write_cursor {
            Some(util::get_bit(&self.data, index))
        } else {
            None
        }
    }

    /// Moves the read cursor back to the beginning.
    #[inline]
    pub fn reset_read_cursor(&mut self) {
        self.read_cursor = 0;
    }

    // === Write side ===

    fn ensure_capacity(&mut self, bits: u16) -> Result<(), Error> {
        if util::unlikely(self.write_cursor as u32 + bits as u32 > self.capacity as u32) {
            Err(Error::CellOverflow)
        } else {
            Ok(())
        }
    }

    #[inline]
    fn push_bit(&mut self, bit: bool) {
        let q = (self.write_cursor / 8) as usize;
        let r = self.write_cursor % 8;
        if q == self.data.len() {
            self.data.push(0);
        }
        if bit {
            self.data[q] |= 1 << (7 - r);
        }
        self.write_cursor += 1;
    }

    /// Appends a single bit.
    pub fn write_bit(&mut self, bit: bool) -> Result<(), Error> {
        ok!(self.ensure_capacity(1));
        self.push_bit(bit);
        Ok(())
    }

    /// Appends the specified number of zero bits.
    pub fn write_zeros(&mut self, bits: u16) -> Result<(), Error> {
        ok!(self.ensure_capacity(bits));
        for _ in 0..bits {
            self.push_bit(false);
        }
        Ok(())
    }

    /// Appends an unsigned integer of exactly `bits` bits (big-endian).
    pub fn write_uint(&mut self, value: u64, bits: u16) -> Result<(), Error> {
        if bits > 64 || (bits < 64 && value >> bits != 0) {
            return Err(Error::IntOverflow);
        }
        ok!(self.ensure_capacity(bits));
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 != 0);
        }
        Ok(())
    }

    /// Appends a signed integer as two's complement of exactly `bits` bits.
    pub fn write_int(&mut self, value: i64, bits: u16) -> Result<(), Error> {
        if bits == 0 {
            return if value == 0 {
                Ok(())
            } else {
                Err(Error::IntOverflow)
            };
        }
        if bits > 64 {
            return Err(Error::IntOverflow);
        }
        if bits < 64 {
            let half = 1i64 << (bits - 1);
            if value < -half || value >= half {
                return Err(Error::IntOverflow);
            }
        }
        ok!(self.ensure_capacity(bits));
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 != 0);
        }
        Ok(())
    }

    /// Appends an arbitrarily wide unsigned integer of exactly `bits` bits.
    pub fn write_big_uint(&mut self, value: &BigUint, bits: u16) -> Result<(), Error> {
        let value_bits = value.bits();
        if value_bits > bits as u64 {
            return Err(Error::IntOverflow);
        }
        ok!(self.ensure_capacity(bits));
        ok!(self.write_zeros(bits - value_bits as u16));
        if !value.is_zero() {
            let bytes = value.to_bytes_be();
            let first_bits = value_bits as u16 - (bytes.len() as u16 - 1) * 8;
            ok!(self.write_uint(bytes[0] as u64, first_bits));
            for byte in &bytes[1..] {
                ok!(self.write_uint(*byte as u64, 8));
            }
        }
        Ok(())
    }

    /// Appends an arbitrarily wide signed integer as two's complement
    /// of exactly `bits` bits.
    pub fn write_big_int(&mut self, value: &BigInt, bits: u16) -> Result<(), Error> {
        if bits == 0 {
            return if value.is_zero() {
                Ok(())
            } else {
                Err(Error::IntOverflow)
            };
        }
        let half = BigInt::one() << (bits - 1);
        if *value < -half.clone() || *value >= half {
            return Err(Error::IntOverflow);
        }
        let unsigned = if value.sign() == Sign::Minus {
            (BigInt::one() << bits) + value
        } else {
            value.clone()
        };
        let unsigned = match unsigned.to_biguint() {
            Some(value) => value,
            None => return Err(Error::IntOverflow),
        };
        self.write_big_uint(&unsigned, bits)
    }

    /// Appends a single byte.
    #[inline]
    pub fn write_byte(&mut self, value: u8) -> Result<(), Error> {
        self.write_uint(value as u64, 8)
    }

    /// Appends a byte slice.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if bytes.len() as u64 * 8 > self.available_bits() as u64 {
            return Err(Error::CellOverflow);
        }
        for byte in bytes {
            ok!(self.write_uint(*byte as u64, 8));
        }
        Ok(())
    }

    /// Appends the unread remainder of another bit string
    /// without advancing its read cursor.
    pub fn write_bit_string(&mut self, other: &BitString) -> Result<(), Error> {
        ok!(self.ensure_capacity(other.remaining_bits()));
        for i in other.read_cursor..other.write_cursor {
            self.push_bit(util::get_bit(&other.data, i));
        }
        Ok(())
    }

    /// Appends a length-prefixed unsigned integer: a `len_bits`-wide byte
    /// count followed by that many bytes. Zero encodes as a zero count.
    pub fn write_var_uint(&mut self, value: &BigUint, len_bits: u16) -> Result<(), Error> {
        if value.is_zero() {
            return self.write_uint(0, len_bits);
        }
        let byte_len = value.bits().div_ceil(8);
        if (len_bits < 64 && byte_len >= 1 << len_bits) || byte_len * 8 > u16::MAX as u64 {
            return Err(Error::IntOverflow);
        }
        ok!(self.write_uint(byte_len, len_bits));
        self.write_big_uint(value, byte_len as u16 * 8)
    }

    /// Appends a monetary amount (`VarUInteger 16`, at most 2^120 - 1).
    #[inline]
    pub fn write_coins(&mut self, amount: &BigUint) -> Result<(), Error> {
        self.write_var_uint(amount, 4)
    }

    /// Appends an internal address, `None` encodes `addr_none$00`.
    pub fn write_address(&mut self, address: Option<&Address>) -> Result<(), Error> {
        match address {
            None => self.write_uint(0, 2),
            Some(address) => {
                // addr_std$10, no anycast.
                ok!(self.write_uint(0b100, 3));
                ok!(self.write_int(address.workchain as i64, 8));
                self.write_bytes(&address.hash)
            }
        }
    }

    // === Read side ===

    fn ensure_remaining(&self, bits: u16) -> Result<(), Error> {
        if util::unlikely(self.read_cursor as u32 + bits as u32 > self.write_cursor as u32) {
            Err(Error::CellUnderflow)
        } else {
            Ok(())
        }
    }

    /// Reads the next bit without advancing the read cursor.
    pub fn preread_bit(&self) -> Result<bool, Error> {
        ok!(self.ensure_remaining(1));
        Ok(util::get_bit(&self.data, self.read_cursor))
    }

    /// Reads the next bit.
    pub fn read_bit(&mut self) -> Result<bool, Error> {
        let bit = ok!(self.preread_bit());
        self.read_cursor += 1;
        Ok(bit)
    }

    /// Reads an unsigned integer of `bits` bits.
    pub fn read_uint(&mut self, bits: u16) -> Result<u64, Error> {
        if bits > 64 {
            return Err(Error::IntOverflow);
        }
        ok!(self.ensure_remaining(bits));
        let result = util::read_uint(&self.data, self.read_cursor, bits);
        self.read_cursor += bits;
        Ok(result)
    }

    /// Reads a two's complement signed integer of `bits` bits.
    pub fn read_int(&mut self, bits: u16) -> Result<i64, Error> {
        let value = ok!(self.read_uint(bits));
        Ok(sign_extend(value, bits))
    }

    /// Reads an arbitrarily wide unsigned integer of `bits` bits.
    pub fn read_big_uint(&mut self, bits: u16) -> Result<BigUint, Error> {
        ok!(self.ensure_remaining(bits));
        let mut result = BigUint::zero();
        let mut rem = bits;
        while rem > 0 {
            let take = std::cmp::min(rem, 32);
            let chunk = ok!(self.read_uint(take));
            result = (result << take) | BigUint::from(chunk);
            rem -= take;
        }
        Ok(result)
    }

    /// Reads an arbitrarily wide two's complement integer of `bits` bits.
    pub fn read_big_int(&mut self, bits: u16) -> Result<BigInt, Error> {
        let unsigned = ok!(self.read_big_uint(bits));
        Ok(if bits > 0 && unsigned.bit(bits as u64 - 1) {
            BigInt::from(unsigned) - (BigInt::one() << bits)
        } else {
            BigInt::from(unsigned)
        })
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self) -> Result<u8, Error> {
        Ok(ok!(self.read_uint(8)) as u8)
    }

    /// Reads `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::with_capacity(len);
        for _ in 0..len {
            bytes.push(ok!(self.read_byte()));
        }
        Ok(bytes)
    }

    /// Reads `bits` bits into a new bit string.
    pub fn read_bits(&mut self, bits: u16) -> Result<BitString, Error> {
        ok!(self.ensure_remaining(bits));
        let mut result = BitString::with_capacity(std::cmp::max(bits, CELL_CAPACITY));
        for _ in 0..bits {
            result.push_bit(util::get_bit(&self.data, self.read_cursor));
            self.read_cursor += 1;
        }
        Ok(result)
    }

    /// Reads a length-prefixed unsigned integer (see [`write_var_uint`]).
    ///
    /// [`write_var_uint`]: BitString::write_var_uint
    pub fn read_var_uint(&mut self, len_bits: u16) -> Result<BigUint, Error> {
        let byte_len = ok!(self.read_uint(len_bits));
        if byte_len > self.remaining_bits() as u64 / 8 {
            return Err(Error::CellUnderflow);
        }
        self.read_big_uint(byte_len as u16 * 8)
    }

    /// Reads a monetary amount (see [`write_coins`]).
    ///
    /// [`write_coins`]: BitString::write_coins
    #[inline]
    pub fn read_coins(&mut self) -> Result<BigUint, Error> {
        self.read_var_uint(4)
    }

    /// Reads an optional internal address (see [`write_address`]).
    ///
    /// [`write_address`]: BitString::write_address
    pub fn read_address(&mut self) -> Result<Option<Address>, Error> {
        match ok!(self.read_uint(2)) {
            0b00 => Ok(None),
            0b10 => {
                if ok!(self.read_bit()) {
                    // Anycast addresses are not supported.
                    return Err(Error::InvalidData);
                }
                let workchain = ok!(self.read_int(8)) as i8;
                let bytes = ok!(self.read_bytes(32));
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&bytes);
                Ok(Some(Address::new(workchain, hash)))
            }
            _ => Err(Error::InvalidTag),
        }
    }

    // === Rendering ===

    /// Renders the content as uppercase hex with the Fift completion-tag
    /// convention (a trailing `_` marks a partial last nibble).
    pub fn to_hex(&self) -> String {
        util::encode_bits_hex(&self.data, self.write_cursor)
    }

    /// Renders the content as an ASCII string of `0` and `1`.
    pub fn to_bit_string(&self) -> String {
        let mut result = String::with_capacity(self.write_cursor as usize);
        for i in 0..self.write_cursor {
            result.push(if util::get_bit(&self.data, i) { '1' } else { '0' });
        }
        result
    }
}

#[inline]
fn sign_extend(value: u64, bits: u16) -> i64 {
    if bits == 0 || bits == 64 {
        value as i64
    } else if value >> (bits - 1) & 1 != 0 {
        (value | !((1u64 << bits) - 1)) as i64
    } else {
        value as i64
    }
}

impl PartialEq for BitString {
    fn eq(&self, other: &Self) -> bool {
        self.write_cursor == other.write_cursor
            && self.data[..self.write_cursor.div_ceil(8) as usize]
                == other.data[..other.write_cursor.div_ceil(8) as usize]
    }
}

impl Eq for BitString {}

impl std::hash::Hash for BitString {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.write_cursor.hash(state);
        self.data[..self.write_cursor.div_ceil(8) as usize].hash(state);
    }
}

impl std::fmt::Debug for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("BitString({})", self.to_bit_string()))
    }
}

impl std::fmt::Display for BitString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_discipline() {
        let mut bits = BitString::new();
        assert_eq!(bits.write_uint(256, 8), Err(Error::IntOverflow));
        bits.write_uint(255, 8).unwrap();
        assert_eq!(bits.read_uint(8).unwrap(), 255);

        let mut bits = BitString::new();
        bits.write_int(-1, 8).unwrap();
        assert_eq!(bits.as_raw_bytes(), [0xff]);

        let mut bits = BitString::new();
        assert_eq!(bits.write_int(-129, 8), Err(Error::IntOverflow));
        bits.write_int(-129, 9).unwrap();
        assert_eq!(bits.read_int(9).unwrap(), -129);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut bits = BitString::with_capacity(8);
        bits.write_uint(0xab, 8).unwrap();
        assert_eq!(bits.write_bit(true), Err(Error::CellOverflow));

        // Reads never run past the write cursor.
        assert_eq!(bits.read_uint(9), Err(Error::CellUnderflow));
        assert_eq!(bits.read_uint(8).unwrap(), 0xab);
        assert_eq!(bits.read_bit(), Err(Error::CellUnderflow));
    }

    #[test]
    fn hex_with_completion_tag() {
        let mut bits = BitString::new();
        bits.write_uint(0b0101010, 7).unwrap();
        assert_eq!(bits.to_hex(), "55_");

        let parsed = BitString::from_hex("55_").unwrap();
        assert_eq!(parsed, bits);
        assert_eq!(parsed.to_bit_string(), "0101010");
    }

    #[test]
    fn raw_padding_must_be_clean() {
        assert_eq!(
            BitString::from_raw(vec![0b0101_0101], 7).unwrap_err(),
            Error::InvalidData
        );

        // A clean buffer stays writable past the wrapped content.
        let mut bits = BitString::from_raw(vec![0b0101_0100], 7).unwrap();
        bits.write_bit(true).unwrap();
        assert_eq!(bits.as_raw_bytes(), [0b0101_0101]);
        assert_eq!(
            BitString::from_raw(vec![0b0101_0100], 9).unwrap_err(),
            Error::CellUnderflow
        );
    }

    #[test]
    fn big_int_two_complement() {
        let value: BigInt = "-1000000000000000000000000239".parse().unwrap();
        let mut bits = BitString::new();
        bits.write_big_int(&value, 91).unwrap();
        assert_eq!(bits.to_hex(), "989A386C05EFF862FFFFE23_");
        assert_eq!(bits.read_big_int(91).unwrap(), value);

        let mut bits = BitString::new();
        bits.write_big_int(&BigInt::from(-1), 8).unwrap();
        assert_eq!(bits.as_raw_bytes(), [0xff]);
    }

    #[test]
    fn big_uint_bounds() {
        let mut bits = BitString::new();
        let value = BigUint::from(0b101u8);
        assert_eq!(bits.write_big_uint(&value, 2), Err(Error::IntOverflow));
        bits.write_big_uint(&value, 3).unwrap();
        bits.write_big_uint(&value, 11).unwrap();
        assert_eq!(bits.read_big_uint(3).unwrap(), value);
        assert_eq!(bits.read_big_uint(11).unwrap(), value);
    }

    #[test]
    fn coins_round_trip() {
        for value in ["0", "1", "1000000000", "1329227995784915872903807060280344575"] {
            let amount: BigUint = value.parse().unwrap();
            let mut bits = BitString::new();
            bits.write_coins(&amount).unwrap();
            assert_eq!(bits.read_coins().unwrap(), amount);
        }

        // 2^120 needs a 16-byte body which does not fit the 4-bit prefix.
        let too_big = BigUint::one() << 120u32;
        let mut bits = BitString::new();
        assert_eq!(bits.write_coins(&too_big), Err(Error::IntOverflow));
    }

    #[test]
    fn address_round_trip() {
        let address = Address::new(-1, [0x33; 32]);

        let mut bits = BitString::new();
        bits.write_address(Some(&address)).unwrap();
        bits.write_address(None).unwrap();

        assert_eq!(bits.used_bits(), 267 + 2);
        assert_eq!(bits.read_address().unwrap(), Some(address));
        assert_eq!(bits.read_address().unwrap(), None);
    }

    #[test]
    fn concatenation_preserves_bits() {
        let mut left = BitString::new();
        left.write_uint(0b101, 3).unwrap();

        let mut right = BitString::new();
        right.write_uint(0b0110, 4).unwrap();

        left.write_bit_string(&right).unwrap();
        assert_eq!(left.to_bit_string(), "1010110");
    }

    #[test]
    fn var_uint_zero_is_empty() {
        let mut bits = BitString::new();
        bits.write_var_uint(&BigUint::zero(), 5).unwrap();
        assert_eq!(bits.used_bits(), 5);
        assert_eq!(bits.read_var_uint(5).unwrap(), BigUint::zero());
    }
}
