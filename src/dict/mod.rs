//! `HashmapE`-style dictionaries: binary prefix trees keyed by fixed
//! width bit strings, stored as cells.
//!
//! Keys and values stay caller-defined: every entry point takes closures
//! which write or read them, the module owns only the tree shape and the
//! edge label encoding.

use crate::bitstring::BitString;
use crate::cell::{Cell, CellBuilder, CellSlice};
use crate::error::Error;

pub use self::aug::{parse_aug_dict, serialize_aug_dict};
pub use self::pfx::{parse_pfx_dict, serialize_pfx_dict};

pub mod aug;
pub mod pfx;

/// Serializes entries into a non-empty dictionary root (`Hashmap n X`).
///
/// Every key must occupy exactly `key_bit_len` bits. Duplicate keys fail
/// with [`Error::InvalidData`], an empty input with [`Error::EmptyDict`].
pub fn serialize_dict<K, V>(
    entries: &[(K, V)],
    key_bit_len: u16,
    mut write_key: impl FnMut(&K, &mut BitString) -> Result<(), Error>,
    mut write_value: impl FnMut(&V, &mut CellBuilder) -> Result<(), Error>,
) -> Result<Cell, Error> {
    if entries.is_empty() {
        return Err(Error::EmptyDict);
    }
    let mut items = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        items.push((ok!(build_key_bits(key, key_bit_len, &mut write_key)), value));
    }
    build_node(items, 0, key_bit_len, &mut write_value)
}

/// Serializes entries into a `HashmapE n X` root, `None` when empty.
pub fn serialize_dict_e<K, V>(
    entries: &[(K, V)],
    key_bit_len: u16,
    write_key: impl FnMut(&K, &mut BitString) -> Result<(), Error>,
    write_value: impl FnMut(&V, &mut CellBuilder) -> Result<(), Error>,
) -> Result<Option<Cell>, Error> {
    if entries.is_empty() {
        Ok(None)
    } else {
        Ok(Some(ok!(serialize_dict(
            entries,
            key_bit_len,
            write_key,
            write_value
        ))))
    }
}

/// Parses a non-empty dictionary, yielding entries in ascending key order.
pub fn parse_dict<K, V>(
    root: &Cell,
    key_bit_len: u16,
    mut read_key: impl FnMut(&mut BitString) -> Result<K, Error>,
    mut read_value: impl FnMut(&mut CellSlice<'_>) -> Result<V, Error>,
) -> Result<Vec<(K, V)>, Error> {
    let mut result = Vec::new();
    let mut prefix = Vec::with_capacity(key_bit_len as usize);
    ok!(walk(
        root,
        &mut prefix,
        key_bit_len,
        &mut read_key,
        &mut read_value,
        &mut result,
    ));
    Ok(result)
}

/// Parses an optional dictionary root (see [`parse_dict`]).
pub fn parse_dict_e<K, V>(
    root: Option<&Cell>,
    key_bit_len: u16,
    read_key: impl FnMut(&mut BitString) -> Result<K, Error>,
    read_value: impl FnMut(&mut CellSlice<'_>) -> Result<V, Error>,
) -> Result<Vec<(K, V)>, Error> {
    match root {
        None => Ok(Vec::new()),
        Some(root) => parse_dict(root, key_bit_len, read_key, read_value),
    }
}

fn build_node<V>(
    items: Vec<(Vec<bool>, &V)>,
    from: u16,
    m: u16,
    write_value: &mut impl FnMut(&V, &mut CellBuilder) -> Result<(), Error>,
) -> Result<Cell, Error> {
    let lcp = common_prefix_len(&items, from, m);
    let mut builder = CellBuilder::new();
    {
        let label = &items[0].0[from as usize..(from + lcp) as usize];
        ok!(write_label(label, m, &mut builder));
    }

    if lcp == m {
        let [(_, value)] = items.as_slice() else {
            // Several entries share the whole key.
            return Err(Error::InvalidData);
        };
        ok!(write_value(value, &mut builder));
    } else {
        let split = (from + lcp) as usize;
        let (right, left): (Vec<_>, Vec<_>) = items.into_iter().partition(|(key, _)| key[split]);
        let from = from + lcp + 1;
        let m = m - lcp - 1;
        ok!(builder.store_reference(ok!(build_node(left, from, m, write_value))));
        ok!(builder.store_reference(ok!(build_node(right, from, m, write_value))));
    }
    builder.build()
}

/// Renders a key through the caller's writer and checks its exact width.
pub(crate) fn build_key_bits<K>(
    key: &K,
    key_bit_len: u16,
    write_key: &mut impl FnMut(&K, &mut BitString) -> Result<(), Error>,
) -> Result<Vec<bool>, Error> {
    let mut bits = BitString::with_capacity(key_bit_len);
    ok!(write_key(key, &mut bits));
    if bits.used_bits() != key_bit_len {
        return Err(Error::KeyLengthMismatch);
    }
    let mut result = Vec::with_capacity(key_bit_len as usize);
    for i in 0..key_bit_len {
        match bits.get(i) {
            Some(bit) => result.push(bit),
            None => return Err(Error::KeyLengthMismatch),
        }
    }
    Ok(result)
}

/// Length of the longest common prefix of all suffixes starting at `from`.
pub(crate) fn common_prefix_len(items: &[(Vec<bool>, impl Sized)], from: u16, m: u16) -> u16 {
    let first = &items[0].0;
    let mut len = 0;
    'outer: while len < m {
        let index = (from + len) as usize;
        for (key, _) in &items[1..] {
            if key.get(index) != first.get(index) {
                break 'outer;
            }
        }
        len += 1;
    }
    len
}

/// Writes an edge label, choosing the shortest of the three encodings.
pub(crate) fn write_label(
    label: &[bool],
    m: u16,
    builder: &mut CellBuilder,
) -> Result<(), Error> {
    let n = label.len() as u16;
    let bits_for_len = bits_for_len(m);

    let short_size = 2 + 2 * n;
    let long_size = 2 + bits_for_len + n;
    let uniform = label.windows(2).all(|w| w[0] == w[1]);
    let same_size = if n > 0 && uniform {
        3 + bits_for_len
    } else {
        u16::MAX
    };

    if same_size < short_size && same_size < long_size {
        // hml_same$11 v:Bit n:(#<= m)
        ok!(builder.store_uint(0b11, 2));
        ok!(builder.store_bit(label[0]));
        builder.store_uint(n as u64, bits_for_len)
    } else if short_size <= long_size {
        // hml_short$0 {n:#} len:(Unary ~n) s:(n * Bit)
        ok!(builder.store_bit(false));
        for _ in 0..n {
            ok!(builder.store_bit(true));
        }
        ok!(builder.store_bit(false));
        store_bits(builder, label)
    } else {
        // hml_long$10 n:(#<= m) s:(n * Bit)
        ok!(builder.store_uint(0b10, 2));
        ok!(builder.store_uint(n as u64, bits_for_len));
        store_bits(builder, label)
    }
}

/// Reads an edge label of at most `m` bits.
pub(crate) fn read_label(slice: &mut CellSlice<'_>, m: u16) -> Result<Vec<bool>, Error> {
    let bits_for_len = bits_for_len(m);
    if !ok!(slice.load_bit()) {
        // Unary length: ones terminated by a zero.
        let mut n = 0;
        while ok!(slice.load_bit()) {
            n += 1;
            if n > m {
                return Err(Error::InvalidData);
            }
        }
        load_bits(slice, n)
    } else if !ok!(slice.load_bit()) {
        let n = ok!(slice.load_uint(bits_for_len)) as u16;
        if n > m {
            return Err(Error::InvalidData);
        }
        load_bits(slice, n)
    } else {
        let bit = ok!(slice.load_bit());
        let n = ok!(slice.load_uint(bits_for_len)) as u16;
        if n > m {
            return Err(Error::InvalidData);
        }
        Ok(vec![bit; n as usize])
    }
}

/// Number of bits of the `#<= m` length field.
#[inline]
pub(crate) fn bits_for_len(m: u16) -> u16 {
    16 - m.leading_zeros() as u16
}

pub(crate) fn store_bits(builder: &mut CellBuilder, bits: &[bool]) -> Result<(), Error> {
    for bit in bits {
        ok!(builder.store_bit(*bit));
    }
    Ok(())
}

fn load_bits(slice: &mut CellSlice<'_>, n: u16) -> Result<Vec<bool>, Error> {
    let mut result = Vec::with_capacity(n as usize);
    for _ in 0..n {
        result.push(ok!(slice.load_bit()));
    }
    Ok(result)
}

pub(crate) fn key_bits_to_bit_string(bits: &[bool]) -> Result<BitString, Error> {
    let mut result = BitString::with_capacity(std::cmp::max(bits.len() as u16, 1023));
    for bit in bits {
        ok!(result.write_bit(*bit));
    }
    Ok(result)
}

fn walk<K, V>(
    cell: &Cell,
    prefix: &mut Vec<bool>,
    m: u16,
    read_key: &mut impl FnMut(&mut BitString) -> Result<K, Error>,
    read_value: &mut impl FnMut(&mut CellSlice<'_>) -> Result<V, Error>,
    result: &mut Vec<(K, V)>,
) -> Result<(), Error> {
    let mut slice = ok!(cell.as_slice());
    let label = ok!(read_label(&mut slice, m));
    let n = label.len() as u16;
    prefix.extend_from_slice(&label);

    if n == m {
        let mut key_bits = ok!(key_bits_to_bit_string(prefix));
        let key = ok!(read_key(&mut key_bits));
        let value = ok!(read_value(&mut slice));
        result.push((key, value));
    } else {
        let left = ok!(slice.load_reference());
        let right = ok!(slice.load_reference());
        for (bit, child) in [(false, left), (true, right)] {
            prefix.push(bit);
            ok!(walk(child, prefix, m - n - 1, read_key, read_value, result));
            prefix.pop();
        }
    }

    prefix.truncate(prefix.len() - n as usize);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uint_key(bits: u16) -> impl FnMut(&u64, &mut BitString) -> Result<(), Error> {
        move |key, dest| dest.write_uint(*key, bits)
    }

    fn uint_value(bits: u16) -> impl FnMut(&u64, &mut CellBuilder) -> Result<(), Error> {
        move |value, dest| dest.store_uint(*value, bits)
    }

    fn read_uint_key(bits: u16) -> impl FnMut(&mut BitString) -> Result<u64, Error> {
        move |key| key.read_uint(bits)
    }

    fn read_uint_value(bits: u16) -> impl FnMut(&mut CellSlice<'_>) -> Result<u64, Error> {
        move |value| value.load_uint(bits)
    }

    #[test]
    fn fixed_key_round_trip() {
        let entries = [(100u64, 1u64), (200, 2), (300, 3), (400, 4)];
        let root = serialize_dict(&entries, 9, uint_key(9), uint_value(3)).unwrap();

        let mut parsed = parse_dict(&root, 9, read_uint_key(9), read_uint_value(3)).unwrap();
        parsed.sort_unstable();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn entries_come_back_in_key_order() {
        let entries = [(42u64, 0u64), (7, 1), (300, 2), (8, 3)];
        let root = serialize_dict(&entries, 16, uint_key(16), uint_value(8)).unwrap();

        let parsed = parse_dict(&root, 16, read_uint_key(16), read_uint_value(8)).unwrap();
        assert_eq!(parsed, [(7, 1), (8, 3), (42, 0), (300, 2)]);
    }

    #[test]
    fn single_entry_is_a_leaf_root() {
        let root = serialize_dict(&[(5u64, 9u64)], 8, uint_key(8), uint_value(8)).unwrap();
        assert_eq!(root.reference_count(), 0);

        let parsed = parse_dict(&root, 8, read_uint_key(8), read_uint_value(8)).unwrap();
        assert_eq!(parsed, [(5, 9)]);
    }

    #[test]
    fn rejected_inputs() {
        assert_eq!(
            serialize_dict::<u64, u64>(&[], 8, uint_key(8), uint_value(8)).unwrap_err(),
            Error::EmptyDict,
        );
        assert_eq!(
            serialize_dict(&[(1u64, 1u64), (1, 2)], 8, uint_key(8), uint_value(8)).unwrap_err(),
            Error::InvalidData,
        );
        // The writer must fill the key width exactly.
        assert_eq!(
            serialize_dict(&[(1u64, 1u64)], 8, uint_key(4), uint_value(8)).unwrap_err(),
            Error::KeyLengthMismatch,
        );
    }

    #[test]
    fn empty_dict_is_absent() {
        let root = serialize_dict_e::<u64, u64>(&[], 8, uint_key(8), uint_value(8)).unwrap();
        assert_eq!(root, None);
        assert_eq!(
            parse_dict_e(None, 8, read_uint_key(8), read_uint_value(8)).unwrap(),
            [],
        );
    }

    #[test]
    fn store_and_load_through_a_cell() {
        let entries = [(1u64, 10u64), (2, 20)];
        let root = serialize_dict_e(&entries, 32, uint_key(32), uint_value(32)).unwrap();

        let mut b = CellBuilder::new();
        b.store_dict(root.as_ref()).unwrap();
        let wrapper = b.build().unwrap();

        let loaded = wrapper.as_slice().unwrap().load_dict().unwrap();
        let parsed =
            parse_dict_e(loaded.as_ref(), 32, read_uint_key(32), read_uint_value(32)).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn long_uniform_labels_compress() {
        // Keys differing only in the last bit force a 63-bit uniform label.
        let entries = [(0u64, 1u64), (1, 2)];
        let root = serialize_dict(&entries, 64, uint_key(64), uint_value(8)).unwrap();

        // hml_same: 2 tag bits + value bit + 7-bit length.
        assert_eq!(root.bit_len(), 10);
        let parsed = parse_dict(&root, 64, read_uint_key(64), read_uint_value(8)).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn reserialization_is_canonical() {
        let entries = [(3u64, 5u64), (17, 6), (1000, 7), (65535, 8)];
        let root = serialize_dict(&entries, 16, uint_key(16), uint_value(16)).unwrap();

        let parsed = parse_dict(&root, 16, read_uint_key(16), read_uint_value(16)).unwrap();
        let rebuilt = serialize_dict(&parsed, 16, uint_key(16), uint_value(16)).unwrap();
        assert_eq!(rebuilt.repr_hash(), root.repr_hash());
    }

    #[test]
    fn label_codec_round_trip() {
        for (label, m) in [
            (vec![], 7),
            (vec![true], 7),
            (vec![false; 20], 40),
            (vec![true, false, true, true], 4),
        ] {
            let mut b = CellBuilder::new();
            write_label(&label, m, &mut b).unwrap();
            let cell = b.build().unwrap();
            assert_eq!(read_label(&mut cell.as_slice().unwrap(), m).unwrap(), label);
        }
    }
}
