//! Cell tree primitives.

use std::sync::{Arc, OnceLock};

use smallvec::SmallVec;

use crate::error::Error;

pub use self::builder::CellBuilder;
pub use self::descriptor::CellDescriptor;
pub use self::level_mask::LevelMask;
pub use self::slice::CellSlice;

pub mod builder;
pub mod descriptor;
pub mod level_mask;
pub mod slice;

pub(crate) mod hasher;

/// Maximum number of data bits a cell can hold.
pub const MAX_BIT_LEN: u16 = 1023;
/// Maximum number of child references.
pub const MAX_REF_COUNT: usize = 4;
/// Maximum depth of a cell tree.
pub const MAX_DEPTH: u16 = 1023;

/// SHA-256 based cell hash.
pub type CellHash = [u8; 32];

/// Cell variant tag.
///
/// Exotic variants carry their tag in the first data byte.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CellType {
    /// Plain data cell.
    Ordinary,
    /// Subtree replaced by its hashes and depths.
    PrunedBranch,
    /// Indirection to a library cell by its hash.
    LibraryReference,
    /// Root of a merkle proof with one virtualized child.
    MerkleProof,
    /// Root of a merkle update with two virtualized children.
    MerkleUpdate,
}

impl CellType {
    /// Decodes the tag byte of an exotic cell.
    pub const fn from_byte_exotic(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => Self::PrunedBranch,
            2 => Self::LibraryReference,
            3 => Self::MerkleProof,
            4 => Self::MerkleUpdate,
            _ => return None,
        })
    }

    /// Encodes the tag byte, `0xff` for ordinary cells.
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Ordinary => 0xff,
            Self::PrunedBranch => 1,
            Self::LibraryReference => 2,
            Self::MerkleProof => 3,
            Self::MerkleUpdate => 4,
        }
    }

    #[inline]
    pub const fn is_exotic(self) -> bool {
        !matches!(self, Self::Ordinary)
    }

    #[inline]
    pub const fn is_merkle(self) -> bool {
        matches!(self, Self::MerkleProof | Self::MerkleUpdate)
    }

    #[inline]
    pub const fn is_pruned_branch(self) -> bool {
        matches!(self, Self::PrunedBranch)
    }
}

pub(crate) struct CellInner {
    pub descriptor: CellDescriptor,
    pub bit_len: u16,
    /// Raw data bytes with the completion tag applied.
    pub data: Vec<u8>,
    pub cell_type: CellType,
    pub references: SmallVec<[Cell; 4]>,
    /// Hash and depth per distinct level, lowest first.
    /// Pruned branches store only their own representation pair.
    pub hashes: SmallVec<[(CellHash, u16); 1]>,
}

/// An immutable tree node with up to 1023 data bits and up to 4 children.
///
/// Cells are cheaply cloneable handles, the underlying node is shared and
/// its hashes are computed once on construction.
#[derive(Clone)]
pub struct Cell(Arc<CellInner>);

impl Cell {
    #[inline]
    pub(crate) fn from_inner(inner: CellInner) -> Self {
        Self(Arc::new(inner))
    }

    /// Returns the static empty ordinary cell.
    pub fn empty() -> &'static Cell {
        static EMPTY: OnceLock<Cell> = OnceLock::new();
        EMPTY.get_or_init(|| {
            // An empty builder always finalizes.
            match CellBuilder::new().build() {
                Ok(cell) => cell,
                Err(_) => unreachable!(),
            }
        })
    }

    /// Returns the cell variant.
    #[inline]
    pub fn cell_type(&self) -> CellType {
        self.0.cell_type
    }

    /// Returns whether the cell is not ordinary.
    #[inline]
    pub fn is_exotic(&self) -> bool {
        self.0.cell_type.is_exotic()
    }

    /// Returns the descriptor byte pair.
    #[inline]
    pub fn descriptor(&self) -> CellDescriptor {
        self.0.descriptor
    }

    /// Returns the level mask.
    #[inline]
    pub fn level_mask(&self) -> LevelMask {
        self.0.descriptor.level_mask()
    }

    /// Returns the cell level.
    #[inline]
    pub fn level(&self) -> u8 {
        self.level_mask().level()
    }

    /// Returns the data length in bits, exotic tag byte included.
    #[inline]
    pub fn bit_len(&self) -> u16 {
        self.0.bit_len
    }

    /// Returns the raw data bytes with the completion tag applied.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.0.data
    }

    /// Returns the number of child references.
    #[inline]
    pub fn reference_count(&self) -> u8 {
        self.0.descriptor.reference_count()
    }

    /// Returns the child at the specified index.
    #[inline]
    pub fn reference(&self, index: u8) -> Option<&Cell> {
        self.0.references.get(index as usize)
    }

    /// Returns all children.
    #[inline]
    pub fn references(&self) -> &[Cell] {
        &self.0.references
    }

    /// Returns the hash observed through `level` merkle layers.
    ///
    /// Level 3 and above always map to the representation hash.
    pub fn hash(&self, level: u8) -> CellHash {
        let mask = self.level_mask();
        let index = mask.hash_index(level);
        if self.0.cell_type.is_pruned_branch() && index != mask.level() {
            // Answered from the pruned payload.
            let offset = 2 + index as usize * 32;
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&self.0.data[offset..offset + 32]);
            hash
        } else {
            let index = if self.0.cell_type.is_pruned_branch() {
                0
            } else {
                index as usize
            };
            self.0.hashes[index].0
        }
    }

    /// Returns the depth observed through `level` merkle layers.
    pub fn depth(&self, level: u8) -> u16 {
        let mask = self.level_mask();
        let index = mask.hash_index(level);
        if self.0.cell_type.is_pruned_branch() && index != mask.level() {
            let offset = 2 + mask.level() as usize * 32 + index as usize * 2;
            u16::from_be_bytes([self.0.data[offset], self.0.data[offset + 1]])
        } else {
            let index = if self.0.cell_type.is_pruned_branch() {
                0
            } else {
                index as usize
            };
            self.0.hashes[index].1
        }
    }

    /// Returns the representation hash, the cell identity used
    /// for deduplication and content addressing.
    #[inline]
    pub fn repr_hash(&self) -> CellHash {
        self.hash(LevelMask::MAX_LEVEL)
    }

    /// Returns the depth of the whole tree.
    #[inline]
    pub fn repr_depth(&self) -> u16 {
        self.depth(LevelMask::MAX_LEVEL)
    }

    /// Returns a multi-line rendering of the whole tree, one indented
    /// line per cell.
    pub fn display_tree(&self) -> impl std::fmt::Display + '_ {
        DisplayTree(self)
    }

    /// Begins reading the cell content.
    ///
    /// Fails for exotic cells: pruned branch payloads are hashes, not
    /// data, and merkle cells must be unwrapped explicitly.
    pub fn as_slice(&self) -> Result<CellSlice<'_>, Error> {
        match self.0.cell_type {
            CellType::Ordinary => Ok(CellSlice::new(self)),
            CellType::PrunedBranch => Err(Error::PrunedBranchAccess),
            _ => Err(Error::InvalidCell),
        }
    }

    /// Begins reading the cell content, exotic cells included.
    ///
    /// The slice starts after the type byte of an exotic cell.
    pub fn as_slice_allow_exotic(&self) -> CellSlice<'_> {
        let mut slice = CellSlice::new(self);
        if self.0.cell_type.is_exotic() {
            slice.skip_first_bits(8);
        }
        slice
    }
}

struct DisplayTree<'a>(&'a Cell);

impl std::fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn print(cell: &Cell, depth: usize, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            for _ in 0..depth {
                f.write_str("  ")?;
            }
            if cell.is_exotic() {
                f.write_fmt(format_args!("{:?}:", cell.cell_type()))?;
            }
            f.write_fmt(format_args!("{}\n", cell))?;
            for child in cell.references() {
                print(child, depth + 1, f)?;
            }
            Ok(())
        }
        print(self.0, 0, f)
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
            || self.repr_hash() == other.repr_hash()
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write(&self.repr_hash());
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("ty", &self.0.cell_type)
            .field("bit_len", &self.0.bit_len)
            .field("refs", &self.reference_count())
            .field("repr_hash", &hex::encode(self.repr_hash()))
            .finish()
    }
}

impl std::fmt::Display for Cell {
    /// Renders the data as tagged hex, the way cell dumps print it.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::util::encode_bits_hex(self.data(), self.bit_len()))
    }
}
