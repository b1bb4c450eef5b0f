use crate::error::Error;

/// Brings [unlikely](core::intrinsics::unlikely) to stable rust.
#[inline(always)]
pub(crate) const fn unlikely(b: bool) -> bool {
    #[allow(clippy::needless_bool)]
    if (1i32).checked_div(if b { 0 } else { 1 }).is_none() {
        true
    } else {
        false
    }
}

/// Reads a single bit from a big-endian bit-packed buffer.
#[inline]
pub(crate) fn get_bit(data: &[u8], index: u16) -> bool {
    let byte = data[(index / 8) as usize];
    (byte >> (7 - index % 8)) & 1 != 0
}

/// Reads up to 64 bits starting at the specified bit offset.
///
/// The caller must ensure that `offset + bits` does not run past the buffer.
pub(crate) fn read_uint(data: &[u8], offset: u16, bits: u16) -> u64 {
    debug_assert!(bits <= 64);

    let mut result = 0u64;
    let mut index = offset;
    let mut rem = bits;
    while rem > 0 {
        let r = index % 8;
        let take = std::cmp::min(8 - r, rem);
        let byte = data[(index / 8) as usize];
        let chunk = (byte >> (8 - r - take)) & ((1u16 << take) - 1) as u8;
        result = (result << take) | chunk as u64;
        index += take;
        rem -= take;
    }
    result
}

/// Encodes bit content as uppercase hex using the Fift completion-tag
/// convention: a bit length which is not a multiple of four is padded
/// with a single `1` bit and zeroes, and marked with a trailing `_`.
pub(crate) fn encode_bits_hex(data: &[u8], bit_len: u16) -> String {
    if bit_len == 0 {
        return String::new();
    }

    let rem = bit_len % 4;
    let nibbles = (bit_len / 4 + (rem != 0) as u16) as usize;

    let mut padded = data[..bit_len.div_ceil(8) as usize].to_vec();
    if rem != 0 {
        // Append the completion tag right after the content bits.
        let tag_index = bit_len;
        let byte = &mut padded[(tag_index / 8) as usize];
        let tag_mask = 1 << (7 - tag_index % 8);
        let keep_mask = !(tag_mask - 1);
        *byte = (*byte & keep_mask) | tag_mask;
    }

    let mut result = hex::encode_upper(padded);
    result.truncate(nibbles);
    if rem != 0 {
        result.push('_');
    }
    result
}

/// Inverse of [`encode_bits_hex`]: restores the exact bit content.
pub(crate) fn decode_bits_hex(s: &str) -> Result<(Vec<u8>, u16), Error> {
    let (digits, tagged) = match s.strip_suffix('_') {
        Some(digits) => (digits, true),
        None => (s, false),
    };

    let mut padded = digits.to_owned();
    if padded.len() % 2 != 0 {
        padded.push('0');
    }
    let mut data = match hex::decode(padded) {
        Ok(data) => data,
        Err(_) => return Err(Error::InvalidData),
    };

    let mut bit_len = digits.len() as u16 * 4;
    if tagged {
        // Drop the completion tag: everything past the last `1` bit.
        loop {
            if bit_len == 0 {
                return Err(Error::InvalidData);
            }
            bit_len -= 1;
            if get_bit(&data, bit_len) {
                break;
            }
        }

        // Clear the tag bits so the buffer is canonical again.
        let last = (bit_len / 8) as usize;
        if let Some(byte) = data.get_mut(last) {
            let rem = bit_len % 8;
            if rem != 0 {
                *byte &= !(0xffu16 >> rem) as u8;
            } else {
                *byte = 0;
            }
        }
        data.truncate(bit_len.div_ceil(8) as usize);
    }
    Ok((data, bit_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_hex_round_trip() {
        // 0101010 (7 bits) -> 55_
        assert_eq!(encode_bits_hex(&[0b0101_0100], 7), "55_");
        let (data, bit_len) = decode_bits_hex("55_").unwrap();
        assert_eq!(bit_len, 7);
        assert_eq!(data, vec![0b0101_0100]);

        assert_eq!(encode_bits_hex(&[0xde, 0xad], 16), "DEAD");
        assert_eq!(decode_bits_hex("DEAD").unwrap(), (vec![0xde, 0xad], 16));

        // 12 bits keep a whole number of nibbles without a tag.
        assert_eq!(encode_bits_hex(&[0xab, 0xc0], 12), "ABC");
        assert_eq!(decode_bits_hex("ABC").unwrap(), (vec![0xab, 0xc0], 12));
    }

    #[test]
    fn read_uint_across_bytes() {
        let data = [0b1010_1010, 0b1100_1100];
        assert_eq!(read_uint(&data, 0, 8), 0b1010_1010);
        assert_eq!(read_uint(&data, 4, 8), 0b1010_1100);
        assert_eq!(read_uint(&data, 7, 3), 0b011);
        assert_eq!(read_uint(&data, 0, 0), 0);
    }
}
