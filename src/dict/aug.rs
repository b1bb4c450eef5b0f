//! `HashmapAug`: a dictionary whose forks carry an aggregated extra.
//!
//! Leaves store `extra` then `value` after the label, forks store the
//! combination of their children's extras. The aggregation function is
//! caller-supplied, so the same tree shape serves sums, maxima or any
//! other monoid.

use crate::bitstring::BitString;
use crate::cell::{Cell, CellBuilder, CellSlice};
use crate::dict::{build_key_bits, common_prefix_len, key_bits_to_bit_string, read_label, write_label};
use crate::error::Error;

/// Serializes entries into a non-empty augmented dictionary root.
///
/// `combine` folds two extras into the one stored at their fork.
pub fn serialize_aug_dict<K, A: Clone, V>(
    entries: &[(K, A, V)],
    key_bit_len: u16,
    mut write_key: impl FnMut(&K, &mut BitString) -> Result<(), Error>,
    mut write_extra: impl FnMut(&A, &mut CellBuilder) -> Result<(), Error>,
    mut write_value: impl FnMut(&V, &mut CellBuilder) -> Result<(), Error>,
    mut combine: impl FnMut(&A, &A) -> Result<A, Error>,
) -> Result<Cell, Error> {
    if entries.is_empty() {
        return Err(Error::EmptyDict);
    }
    let mut items = Vec::with_capacity(entries.len());
    for (key, extra, value) in entries {
        items.push((
            ok!(build_key_bits(key, key_bit_len, &mut write_key)),
            (extra, value),
        ));
    }
    let (root, _) = ok!(build_node(
        items,
        0,
        key_bit_len,
        &mut write_extra,
        &mut write_value,
        &mut combine,
    ));
    Ok(root)
}

/// Parses a non-empty augmented dictionary, yielding leaf entries
/// in ascending key order. Fork extras are consumed but not returned.
pub fn parse_aug_dict<K, A, V>(
    root: &Cell,
    key_bit_len: u16,
    mut read_key: impl FnMut(&mut BitString) -> Result<K, Error>,
    mut read_extra: impl FnMut(&mut CellSlice<'_>) -> Result<A, Error>,
    mut read_value: impl FnMut(&mut CellSlice<'_>) -> Result<V, Error>,
) -> Result<Vec<(K, A, V)>, Error> {
    let mut result = Vec::new();
    let mut prefix = Vec::with_capacity(key_bit_len as usize);
    ok!(walk(
        root,
        &mut prefix,
        key_bit_len,
        &mut read_key,
        &mut read_extra,
        &mut read_value,
        &mut result,
    ));
    Ok(result)
}

#[allow(clippy::type_complexity)]
fn build_node<A: Clone, V>(
    items: Vec<(Vec<bool>, (&A, &V))>,
    from: u16,
    m: u16,
    write_extra: &mut impl FnMut(&A, &mut CellBuilder) -> Result<(), Error>,
    write_value: &mut impl FnMut(&V, &mut CellBuilder) -> Result<(), Error>,
    combine: &mut impl FnMut(&A, &A) -> Result<A, Error>,
) -> Result<(Cell, A), Error> {
    let lcp = common_prefix_len(&items, from, m);
    let mut builder = CellBuilder::new();
    {
        let label = &items[0].0[from as usize..(from + lcp) as usize];
        ok!(write_label(label, m, &mut builder));
    }

    let extra;
    if lcp == m {
        let [(_, (leaf_extra, value))] = items.as_slice() else {
            return Err(Error::InvalidData);
        };
        extra = A::clone(leaf_extra);
        ok!(write_extra(&extra, &mut builder));
        ok!(write_value(value, &mut builder));
    } else {
        let split = (from + lcp) as usize;
        let (right, left): (Vec<_>, Vec<_>) = items.into_iter().partition(|(key, _)| key[split]);
        let from = from + lcp + 1;
        let m = m - lcp - 1;
        let (left, left_extra) =
            ok!(build_node(left, from, m, write_extra, write_value, combine));
        let (right, right_extra) =
            ok!(build_node(right, from, m, write_extra, write_value, combine));
        ok!(builder.store_reference(left));
        ok!(builder.store_reference(right));
        extra = ok!(combine(&left_extra, &right_extra));
        ok!(write_extra(&extra, &mut builder));
    }
    Ok((ok!(builder.build()), extra))
}

fn walk<K, A, V>(
    cell: &Cell,
    prefix: &mut Vec<bool>,
    m: u16,
    read_key: &mut impl FnMut(&mut BitString) -> Result<K, Error>,
    read_extra: &mut impl FnMut(&mut CellSlice<'_>) -> Result<A, Error>,
    read_value: &mut impl FnMut(&mut CellSlice<'_>) -> Result<V, Error>,
    result: &mut Vec<(K, A, V)>,
) -> Result<(), Error> {
    let mut slice = ok!(cell.as_slice());
    let label = ok!(read_label(&mut slice, m));
    let n = label.len() as u16;
    prefix.extend_from_slice(&label);

    if n == m {
        let mut key_bits = ok!(key_bits_to_bit_string(prefix));
        let key = ok!(read_key(&mut key_bits));
        let extra = ok!(read_extra(&mut slice));
        let value = ok!(read_value(&mut slice));
        result.push((key, extra, value));
    } else {
        let left = ok!(slice.load_reference());
        let right = ok!(slice.load_reference());
        // The fork aggregate is positional data, it must still parse.
        let _ = ok!(read_extra(&mut slice));
        for (bit, child) in [(false, left), (true, right)] {
            prefix.push(bit);
            ok!(walk(
                child,
                prefix,
                m - n - 1,
                read_key,
                read_extra,
                read_value,
                result,
            ));
            prefix.pop();
        }
    }

    prefix.truncate(prefix.len() - n as usize);
    Ok(())
}
