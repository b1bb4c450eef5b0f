use std::collections::HashMap;

use crate::boc::BocTag;
use crate::cell::{Cell, CellDescriptor, CellHash};

/// Intermediate BoC state: deduplicated cells in reverse topological
/// order (children first), with the index of each cell in that order.
pub struct BocHeader<'a> {
    root_rev_indices: Vec<u32>,
    rev_cells: Vec<&'a Cell>,
    rev_indices: HashMap<CellHash, u32, ahash::RandomState>,
    total_data_size: u64,
    reference_count: u64,
}

impl<'a> BocHeader<'a> {
    /// Collects the unique cells of a tree.
    pub fn new(root: &'a Cell) -> Self {
        let mut result = Self {
            root_rev_indices: Vec::new(),
            rev_cells: Vec::new(),
            rev_indices: HashMap::default(),
            total_data_size: 0,
            reference_count: 0,
        };
        result.add_root(root);
        result
    }

    /// Adds another root, sharing cells collected so far.
    pub fn add_root(&mut self, root: &'a Cell) {
        // Iterative postorder: a cell lands in `rev_cells` only after all
        // of its children, so reversing the list puts parents first.
        let mut stack: Vec<(&'a Cell, u8)> = vec![(root, 0)];
        while let Some((cell, child_idx)) = stack.last_mut() {
            let cell = *cell;
            if let Some(child) = cell.reference(*child_idx) {
                *child_idx += 1;
                if !self.rev_indices.contains_key(&child.repr_hash()) {
                    stack.push((child, 0));
                }
                continue;
            }
            stack.pop();
            let repr_hash = cell.repr_hash();
            if !self.rev_indices.contains_key(&repr_hash) {
                self.rev_indices
                    .insert(repr_hash, self.rev_cells.len() as u32);
                self.rev_cells.push(cell);
                self.total_data_size += 2 + cell.data().len() as u64;
                self.reference_count += cell.reference_count() as u64;
            }
        }
        self.root_rev_indices
            .push(self.rev_indices[&root.repr_hash()]);
    }

    /// Returns the number of unique cells.
    #[inline]
    pub fn cell_count(&self) -> u32 {
        self.rev_cells.len() as u32
    }

    /// Encodes the collected cells into the generic BoC format.
    pub fn encode(&self, has_index: bool, has_crc: bool) -> Vec<u8> {
        let cell_count = self.cell_count();
        let ref_size = number_of_bytes_to_fit(cell_count as u64);
        let total_cells_size = self.total_data_size + self.reference_count * ref_size as u64;
        let offset_size = number_of_bytes_to_fit(total_cells_size);

        let mut target = Vec::with_capacity(
            4 + 2
                + ref_size as usize * (3 + self.root_rev_indices.len())
                + 1
                + offset_size as usize
                + if has_index {
                    cell_count as usize * offset_size as usize
                } else {
                    0
                }
                + total_cells_size as usize
                + if has_crc { 4 } else { 0 },
        );

        target.extend_from_slice(&BocTag::GENERIC);
        target.push(((has_index as u8) << 7) | ((has_crc as u8) << 6) | ref_size);
        target.push(offset_size);
        write_be(&mut target, cell_count as u64, ref_size);
        write_be(&mut target, self.root_rev_indices.len() as u64, ref_size);
        write_be(&mut target, 0, ref_size); // absent cells
        write_be(&mut target, total_cells_size, offset_size);
        for rev_index in &self.root_rev_indices {
            write_be(&mut target, (cell_count - 1 - rev_index) as u64, ref_size);
        }

        if has_index {
            // Cumulative end offset of each cell within the cell table.
            let mut offset = 0u64;
            for cell in self.rev_cells.iter().rev() {
                offset += 2 + cell.data().len() as u64 + cell.reference_count() as u64 * ref_size as u64;
                write_be(&mut target, offset, offset_size);
            }
        }

        for cell in self.rev_cells.iter().rev() {
            let descriptor = cell.descriptor();
            target.push(descriptor.d1 & !CellDescriptor::STORE_HASHES_MASK);
            target.push(descriptor.d2);
            target.extend_from_slice(cell.data());
            for child in cell.references() {
                let child_index = cell_count - 1 - self.rev_indices[&child.repr_hash()];
                write_be(&mut target, child_index as u64, ref_size);
            }
        }

        if has_crc {
            let checksum = crc32c::crc32c(&target);
            target.extend_from_slice(&checksum.to_le_bytes());
        }
        target
    }
}

fn write_be(target: &mut Vec<u8>, value: u64, size: u8) {
    target.extend_from_slice(&value.to_be_bytes()[8 - size as usize..]);
}

fn number_of_bytes_to_fit(value: u64) -> u8 {
    std::cmp::max(1, (64 - value.leading_zeros()).div_ceil(8) as u8)
}
