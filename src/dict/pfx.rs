//! `PfxHashmap`: a dictionary over variable-length, prefix-free keys.
//!
//! Every node carries an explicit leaf/fork tag bit after its label, so
//! a key may end mid-tree. The flip side is that no key may be a prefix
//! of another.

use crate::bitstring::BitString;
use crate::cell::{Cell, CellBuilder, CellSlice};
use crate::dict::{key_bits_to_bit_string, read_label, write_label};
use crate::error::Error;

/// Serializes entries into a non-empty prefix dictionary root.
///
/// Keys are variable-length up to `max_key_bits`. Duplicate keys and key
/// sets where one key prefixes another fail with [`Error::NonPrefixKeys`].
pub fn serialize_pfx_dict<K, V>(
    entries: &[(K, V)],
    max_key_bits: u16,
    mut write_key: impl FnMut(&K, &mut BitString) -> Result<(), Error>,
    mut write_value: impl FnMut(&V, &mut CellBuilder) -> Result<(), Error>,
) -> Result<Cell, Error> {
    if entries.is_empty() {
        return Err(Error::EmptyDict);
    }
    let mut items = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let mut bits = BitString::with_capacity(max_key_bits);
        ok!(write_key(key, &mut bits));
        if bits.used_bits() > max_key_bits {
            return Err(Error::KeyLengthMismatch);
        }
        let mut key_bits = Vec::with_capacity(bits.used_bits() as usize);
        for i in 0..bits.used_bits() {
            match bits.get(i) {
                Some(bit) => key_bits.push(bit),
                None => return Err(Error::KeyLengthMismatch),
            }
        }
        items.push((key_bits, value));
    }
    build_node(items, 0, max_key_bits, &mut write_value)
}

/// Parses a non-empty prefix dictionary, yielding entries in
/// lexicographic key-bit order.
pub fn parse_pfx_dict<K, V>(
    root: &Cell,
    max_key_bits: u16,
    mut read_key: impl FnMut(&mut BitString) -> Result<K, Error>,
    mut read_value: impl FnMut(&mut CellSlice<'_>) -> Result<V, Error>,
) -> Result<Vec<(K, V)>, Error> {
    let mut result = Vec::new();
    let mut prefix = Vec::with_capacity(max_key_bits as usize);
    ok!(walk(
        root,
        &mut prefix,
        max_key_bits,
        &mut read_key,
        &mut read_value,
        &mut result,
    ));
    Ok(result)
}

fn build_node<V>(
    items: Vec<(Vec<bool>, &V)>,
    from: u16,
    m: u16,
    write_value: &mut impl FnMut(&V, &mut CellBuilder) -> Result<(), Error>,
) -> Result<Cell, Error> {
    // Longest run shared by every remaining suffix, capped by the
    // shortest of them.
    let mut lcp = items
        .iter()
        .map(|(key, _)| key.len() as u16 - from)
        .min()
        .unwrap_or(0);
    let first = &items[0].0;
    let mut len = 0;
    while len < lcp {
        let index = (from + len) as usize;
        if items[1..].iter().any(|(key, _)| key[index] != first[index]) {
            lcp = len;
            break;
        }
        len += 1;
    }

    let mut builder = CellBuilder::new();
    {
        let label = &first[from as usize..(from + lcp) as usize];
        ok!(write_label(label, m, &mut builder));
    }

    let ends_here = items
        .iter()
        .filter(|(key, _)| key.len() as u16 == from + lcp)
        .count();
    if ends_here > 0 {
        // A finished key may not coexist with longer ones below it.
        let [(_, value)] = items.as_slice() else {
            return Err(Error::NonPrefixKeys);
        };
        // phmn_leaf$0
        ok!(builder.store_bit(false));
        ok!(write_value(value, &mut builder));
    } else {
        let split = (from + lcp) as usize;
        let (right, left): (Vec<_>, Vec<_>) = items.into_iter().partition(|(key, _)| key[split]);
        let from = from + lcp + 1;
        let m = m - lcp - 1;
        // phmn_fork$1
        ok!(builder.store_bit(true));
        ok!(builder.store_reference(ok!(build_node(left, from, m, write_value))));
        ok!(builder.store_reference(ok!(build_node(right, from, m, write_value))));
    }
    builder.build()
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

    if !ok!(slice.load_bit()) {
        let mut key_bits = ok!(key_bits_to_bit_string(prefix));
        let key = ok!(read_key(&mut key_bits));
        let value = ok!(read_value(&mut slice));
        result.push((key, value));
    } else {
        if n >= m {
            return Err(Error::InvalidData);
        }
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

    fn ascii_key(key: &&str, dest: &mut BitString) -> Result<(), Error> {
        dest.write_bytes(key.as_bytes())
    }

    fn read_ascii_key(key: &mut BitString) -> Result<String, Error> {
        let len = key.remaining_bits() as usize / 8;
        let bytes = key.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| Error::InvalidData)
    }

    #[test]
    fn variable_length_keys() {
        let entries = [("ab", 1u64), ("cdef", 2), ("x", 3)];
        let root = serialize_pfx_dict(&entries, 64, ascii_key, |value, dest| {
            dest.store_uint(*value, 16)
        })
        .unwrap();

        let parsed = parse_pfx_dict(&root, 64, read_ascii_key, |value| value.load_uint(16))
            .unwrap();
        let mut parsed: Vec<(String, u64)> = parsed;
        parsed.sort_unstable();
        assert_eq!(
            parsed,
            [
                ("ab".to_owned(), 1),
                ("cdef".to_owned(), 2),
                ("x".to_owned(), 3),
            ],
        );
    }

    #[test]
    fn prefix_keys_are_rejected() {
        // "a" is a prefix of "ab".
        let entries = [("a", 1u64), ("ab", 2)];
        assert_eq!(
            serialize_pfx_dict(&entries, 64, ascii_key, |value, dest| {
                dest.store_uint(*value, 16)
            })
            .unwrap_err(),
            Error::NonPrefixKeys,
        );

        let entries = [("a", 1u64), ("a", 2)];
        assert_eq!(
            serialize_pfx_dict(&entries, 64, ascii_key, |value, dest| {
                dest.store_uint(*value, 16)
            })
            .unwrap_err(),
            Error::NonPrefixKeys,
        );
    }

    #[test]
    fn single_empty_key() {
        let root = serialize_pfx_dict(&[("", 7u64)], 16, ascii_key, |value, dest| {
            dest.store_uint(*value, 8)
        })
        .unwrap();

        let parsed =
            parse_pfx_dict(&root, 16, read_ascii_key, |value| value.load_uint(8)).unwrap();
        assert_eq!(parsed, [(String::new(), 7)]);
    }
}
