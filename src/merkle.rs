//! Merkle proof construction helpers.

use crate::cell::{Cell, CellBuilder, CellType};
use crate::error::Error;

/// Replaces a cell with a pruned branch carrying its hashes and depths
/// for every level up to the cell's own.
pub fn make_pruned_branch(cell: &Cell, merkle_depth: u8) -> Result<Cell, Error> {
    let level_mask = crate::cell::LevelMask::new(
        cell.level_mask().to_byte() | (1 << merkle_depth),
    );

    let mut builder = CellBuilder::new();
    builder.set_exotic(true);
    ok!(builder.store_byte(CellType::PrunedBranch.to_byte()));
    ok!(builder.store_byte(level_mask.to_byte()));
    for level in 0..level_mask.level() {
        ok!(builder.store_bytes(&cell.hash(level)));
    }
    for level in 0..level_mask.level() {
        ok!(builder.store_uint(cell.depth(level) as u64, 16));
    }
    builder.build()
}

/// Wraps a cell into a merkle proof root.
///
/// The proof stores the virtualized hash and depth of its child, so the
/// child is usually a partially pruned copy of the proven tree.
pub fn make_merkle_proof(child: Cell) -> Result<Cell, Error> {
    let mut builder = CellBuilder::new();
    builder.set_exotic(true);
    ok!(builder.store_byte(CellType::MerkleProof.to_byte()));
    ok!(builder.store_bytes(&child.hash(0)));
    ok!(builder.store_uint(child.depth(0) as u64, 16));
    ok!(builder.store_reference(child));
    builder.build()
}

/// Wraps an old/new pair of (partially pruned) trees into a merkle
/// update root committing to both.
pub fn make_merkle_update(old: Cell, new: Cell) -> Result<Cell, Error> {
    let mut builder = CellBuilder::new();
    builder.set_exotic(true);
    ok!(builder.store_byte(CellType::MerkleUpdate.to_byte()));
    ok!(builder.store_bytes(&old.hash(0)));
    ok!(builder.store_bytes(&new.hash(0)));
    ok!(builder.store_uint(old.depth(0) as u64, 16));
    ok!(builder.store_uint(new.depth(0) as u64, 16));
    ok!(builder.store_reference(old));
    ok!(builder.store_reference(new));
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pruned_branch_answers_for_the_cell() {
        let cell = {
            let mut builder = CellBuilder::new();
            builder.store_uint(0xdeaf_beaf_1231_23, 64).unwrap();
            builder.store_reference(Cell::empty().clone()).unwrap();
            builder.build().unwrap()
        };

        let pruned = make_pruned_branch(&cell, 0).unwrap();
        assert_eq!(pruned.cell_type(), CellType::PrunedBranch);
        assert_eq!(pruned.level(), 1);
        assert_eq!(pruned.hash(0), cell.repr_hash());
        assert_eq!(pruned.depth(0), cell.repr_depth());
        // Its own identity differs from the replaced subtree.
        assert_ne!(pruned.repr_hash(), cell.repr_hash());

        // Pruned payloads are not readable as data.
        assert_eq!(pruned.as_slice().unwrap_err(), Error::PrunedBranchAccess);
    }

    #[test]
    fn proof_descends_one_level() {
        let leaf = {
            let mut builder = CellBuilder::new();
            builder.store_uint(42, 32).unwrap();
            builder.build().unwrap()
        };
        let root = {
            let mut builder = CellBuilder::new();
            builder.store_uint(1, 8).unwrap();
            builder.store_reference(leaf.clone()).unwrap();
            builder.build().unwrap()
        };

        // Prove the root while pruning away the leaf.
        let pruned_leaf = make_pruned_branch(&leaf, 0).unwrap();
        let body = {
            let mut builder = CellBuilder::new();
            builder.store_uint(1, 8).unwrap();
            builder.store_reference(pruned_leaf).unwrap();
            builder.build().unwrap()
        };
        let proof = make_merkle_proof(body.clone()).unwrap();

        assert_eq!(proof.cell_type(), CellType::MerkleProof);
        assert_eq!(proof.level(), 0);
        // The proof commits to the original tree through the virtual hash.
        assert_eq!(body.hash(0), root.repr_hash());
        assert_eq!(body.depth(0), root.repr_depth());
    }

    #[test]
    fn update_commits_to_both_trees() {
        let leaf = {
            let mut builder = CellBuilder::new();
            builder.store_uint(42, 32).unwrap();
            builder.build().unwrap()
        };
        let wrap = |tag: u64, child: Cell| {
            let mut builder = CellBuilder::new();
            builder.store_uint(tag, 8).unwrap();
            builder.store_reference(child).unwrap();
            builder.build().unwrap()
        };

        // Both sides keep only a pruned stand-in for the shared leaf.
        let pruned_leaf = make_pruned_branch(&leaf, 0).unwrap();
        let old = wrap(1, pruned_leaf.clone());
        let new = wrap(2, pruned_leaf);
        assert_eq!(old.level(), 1);

        let update = make_merkle_update(old.clone(), new.clone()).unwrap();
        assert_eq!(update.cell_type(), CellType::MerkleUpdate);
        // One merkle layer virtualizes the children's masks away.
        assert_eq!(update.level(), 0);

        // The stored pairs commit to the full original trees.
        assert_eq!(old.hash(0), wrap(1, leaf.clone()).repr_hash());
        assert_eq!(new.hash(0), wrap(2, leaf).repr_hash());

        let bytes = crate::boc::Boc::encode(&update);
        let decoded = crate::boc::Boc::decode(&bytes).unwrap();
        assert_eq!(decoded.cell_type(), CellType::MerkleUpdate);
        assert_eq!(decoded.repr_hash(), update.repr_hash());
    }

    #[test]
    fn update_rejects_a_stale_pair() {
        let mut builder = CellBuilder::new();
        builder.store_uint(1, 8).unwrap();
        let old = builder.build().unwrap();
        let mut builder = CellBuilder::new();
        builder.store_uint(2, 8).unwrap();
        let new = builder.build().unwrap();

        let mut builder = CellBuilder::new();
        builder.set_exotic(true);
        builder.store_byte(CellType::MerkleUpdate.to_byte()).unwrap();
        builder.store_bytes(&[0; 68]).unwrap();
        builder.store_reference(old).unwrap();
        builder.store_reference(new).unwrap();
        assert_eq!(builder.build().unwrap_err(), Error::InvalidCell);
    }

    #[test]
    fn proof_rejects_wrong_layout() {
        let mut builder = CellBuilder::new();
        builder.set_exotic(true);
        builder.store_byte(CellType::MerkleProof.to_byte()).unwrap();
        builder.store_bytes(&[0; 34]).unwrap();
        // Missing child reference.
        assert_eq!(builder.build().unwrap_err(), Error::InvalidCell);

        let mut builder = CellBuilder::new();
        builder.set_exotic(true);
        builder.store_byte(9).unwrap();
        builder.store_bytes(&[0; 34]).unwrap();
        assert_eq!(builder.build().unwrap_err(), Error::InvalidTag);
    }
}
