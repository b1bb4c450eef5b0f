//! Cell finalization: exotic validation and per-level hash computation.

use sha2::{Digest, Sha256};
use smallvec::SmallVec;

use crate::cell::descriptor::CellDescriptor;
use crate::cell::level_mask::LevelMask;
use crate::cell::{Cell, CellHash, CellInner, CellType, MAX_BIT_LEN, MAX_DEPTH, MAX_REF_COUNT};
use crate::error::Error;

/// Raw parts collected by a builder, not yet validated.
pub(crate) struct CellParts {
    /// Data bytes with the completion tag already applied.
    pub data: Vec<u8>,
    pub bit_len: u16,
    pub is_exotic: bool,
    pub references: SmallVec<[Cell; 4]>,
}

/// Validates the parts and computes all hashes and depths up front.
pub(crate) fn finalize(parts: CellParts) -> Result<Cell, Error> {
    if parts.bit_len > MAX_BIT_LEN || parts.references.len() > MAX_REF_COUNT {
        return Err(Error::InvalidCell);
    }

    let (cell_type, level_mask) = if parts.is_exotic {
        ok!(validate_exotic(&parts))
    } else {
        let mut mask = LevelMask::EMPTY;
        for child in &parts.references {
            mask |= child.level_mask();
        }
        (CellType::Ordinary, mask)
    };

    let descriptor = CellDescriptor::compute(
        parts.references.len() as u8,
        parts.is_exotic,
        level_mask,
        parts.bit_len,
    );

    let is_pruned = cell_type.is_pruned_branch();
    let level_offset = cell_type.is_merkle() as u8;

    let mut hashes = SmallVec::<[(CellHash, u16); 1]>::new();
    for level in 0..4 {
        // Levels absent from the mask reuse the previous hash. A pruned
        // branch computes only its own pair, the rest lives in its payload.
        if level != 0 && (is_pruned || !level_mask.contains(level)) {
            continue;
        }
        let hash_index = hashes.len();

        let level_mask = if is_pruned {
            level_mask
        } else {
            LevelMask::from_level(level)
        };
        let d1 = (descriptor.d1
            & !(CellDescriptor::LEVEL_MASK | CellDescriptor::STORE_HASHES_MASK))
            | (level_mask.to_byte() << 5);

        let mut depth = 0u16;
        let mut hasher = Sha256::new();
        hasher.update([d1, descriptor.d2]);
        if hash_index == 0 {
            hasher.update(&parts.data);
        } else {
            hasher.update(hashes[hash_index - 1].0);
        }
        for child in &parts.references {
            let child_depth = child.depth(level + level_offset);
            if child_depth >= MAX_DEPTH {
                return Err(Error::DepthOverflow);
            }
            depth = std::cmp::max(depth, child_depth + 1);
            hasher.update(child_depth.to_be_bytes());
        }
        for child in &parts.references {
            hasher.update(child.hash(level + level_offset));
        }

        hashes.push((hasher.finalize().into(), depth));
    }

    Ok(Cell::from_inner(CellInner {
        descriptor,
        bit_len: parts.bit_len,
        data: parts.data,
        cell_type,
        references: parts.references,
        hashes,
    }))
}

fn validate_exotic(parts: &CellParts) -> Result<(CellType, LevelMask), Error> {
    if parts.bit_len < 8 {
        return Err(Error::InvalidCell);
    }
    let Some(cell_type) = CellType::from_byte_exotic(parts.data[0]) else {
        return Err(Error::InvalidTag);
    };
    match cell_type {
        CellType::PrunedBranch => {
            if parts.bit_len < 16 || !parts.references.is_empty() {
                return Err(Error::InvalidCell);
            }
            let mask = LevelMask::new(parts.data[1]);
            let level = mask.level();
            if level == 0
                || mask.to_byte() != parts.data[1]
                || parts.bit_len != 16 + level as u16 * (256 + 16)
            {
                return Err(Error::InvalidCell);
            }
            Ok((cell_type, mask))
        }
        CellType::LibraryReference => {
            if parts.bit_len != 8 + 256 || !parts.references.is_empty() {
                return Err(Error::InvalidCell);
            }
            Ok((cell_type, LevelMask::EMPTY))
        }
        CellType::MerkleProof => {
            if parts.bit_len != 8 + 256 + 16 || parts.references.len() != 1 {
                return Err(Error::InvalidCell);
            }
            let child = &parts.references[0];
            // The stored pair must describe the virtualized child.
            if parts.data[1..33] != child.hash(0)
                || parts.data[33..35] != child.depth(0).to_be_bytes()
            {
                return Err(Error::InvalidCell);
            }
            Ok((cell_type, child.level_mask().virtualize(1)))
        }
        CellType::MerkleUpdate => {
            if parts.bit_len != 8 + 2 * (256 + 16) || parts.references.len() != 2 {
                return Err(Error::InvalidCell);
            }
            let old = &parts.references[0];
            let new = &parts.references[1];
            if parts.data[1..33] != old.hash(0)
                || parts.data[33..65] != new.hash(0)
                || parts.data[65..67] != old.depth(0).to_be_bytes()
                || parts.data[67..69] != new.depth(0).to_be_bytes()
            {
                return Err(Error::InvalidCell);
            }
            Ok((
                cell_type,
                (old.level_mask() | new.level_mask()).virtualize(1),
            ))
        }
        CellType::Ordinary => Err(Error::InvalidTag),
    }
}
