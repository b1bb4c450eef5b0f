use smallvec::SmallVec;

use crate::boc::BocTag;
use crate::cell::hasher::{self, CellParts};
use crate::cell::{Cell, CellDescriptor, MAX_REF_COUNT};

/// Deserialization error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BocError {
    #[error("unknown BOC tag: {0:08x}")]
    UnknownBocTag(u32),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),
    #[error("root index out of bounds")]
    RootOutOfBounds,
    #[error("expected more root cells")]
    RootCellNotFound,
    #[error("too many root cells")]
    TooManyRootCells,
    #[error("cell references a cell which has not been read yet")]
    InvalidRefOrder,
    #[error("invalid cell: {0}")]
    InvalidCell(#[from] crate::error::Error),
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("invalid hex or base64 encoding")]
    InvalidEncoding,
}

/// Deserialization limits.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Fail when fewer roots are present.
    pub min_roots: Option<usize>,
    /// Fail when more roots are present.
    pub max_roots: Option<usize>,
}

impl Options {
    /// Absolute root count limit.
    pub const MAX_ROOTS: usize = 32;

    pub fn exact(roots: usize) -> Self {
        Self {
            min_roots: Some(roots),
            max_roots: Some(roots),
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            min_roots: None,
            max_roots: Some(Self::MAX_ROOTS),
        }
    }
}

/// Parses a bag of cells, resolving references and recomputing hashes.
pub fn deserialize(data: &[u8], options: Options) -> Result<Vec<Cell>, BocError> {
    let mut reader = Reader::new(data);

    let magic = ok!(reader.read_array::<4>());
    let Some(tag) = BocTag::from_bytes(magic) else {
        return Err(BocError::UnknownBocTag(u32::from_be_bytes(magic)));
    };

    let (ref_size, has_index, has_crc);
    match tag {
        BocTag::Generic => {
            let flags = ok!(reader.read_byte());
            has_index = flags & 0b1000_0000 != 0;
            has_crc = flags & 0b0100_0000 != 0;
            if flags & 0b0010_0000 != 0 {
                return Err(BocError::InvalidHeader("cache bits are not supported"));
            }
            if flags & 0b0001_1000 != 0 {
                return Err(BocError::InvalidHeader("non-zero flags"));
            }
            ref_size = (flags & 0b0000_0111) as usize;
        }
        BocTag::Indexed | BocTag::IndexedCrc32 => {
            has_index = true;
            has_crc = matches!(tag, BocTag::IndexedCrc32);
            ref_size = ok!(reader.read_byte()) as usize;
        }
    }
    if ref_size == 0 || ref_size > 4 {
        return Err(BocError::InvalidHeader("ref index does not fit in u32"));
    }

    let offset_size = ok!(reader.read_byte()) as usize;
    if offset_size == 0 || offset_size > 8 {
        return Err(BocError::InvalidHeader("offset does not fit in u64"));
    }

    let cell_count = ok!(reader.read_be_uint(ref_size)) as usize;
    let root_count = ok!(reader.read_be_uint(ref_size)) as usize;
    let absent_count = ok!(reader.read_be_uint(ref_size)) as usize;
    let total_cells_size = ok!(reader.read_be_uint(offset_size));

    if root_count == 0 || root_count > cell_count {
        return Err(BocError::InvalidHeader("invalid root count"));
    }
    if absent_count != 0 {
        return Err(BocError::InvalidHeader("absent cells are not supported"));
    }
    if root_count > options.max_roots.unwrap_or(Options::MAX_ROOTS) {
        return Err(BocError::TooManyRootCells);
    }
    if let Some(min_roots) = options.min_roots {
        if root_count < min_roots {
            return Err(BocError::RootCellNotFound);
        }
    }

    // Each cell in the table occupies at least its two descriptor bytes,
    // so an honest header cannot claim more cells than the input can hold.
    if cell_count as u64 * 2 > (data.len() - reader.position) as u64 {
        return Err(BocError::UnexpectedEof);
    }

    let mut root_indices = Vec::with_capacity(root_count);
    match tag {
        BocTag::Generic => {
            for _ in 0..root_count {
                let index = ok!(reader.read_be_uint(ref_size)) as usize;
                if index >= cell_count {
                    return Err(BocError::RootOutOfBounds);
                }
                root_indices.push(index);
            }
        }
        // Legacy encodings always describe a single tree rooted at 0.
        _ => root_indices.push(0),
    }

    if has_index {
        ok!(reader.skip(cell_count * offset_size));
    }

    // First pass: split the cell table into raw entries.
    let cells_start = reader.position;
    let mut raw_cells = Vec::with_capacity(cell_count);
    for _ in 0..cell_count {
        raw_cells.push(ok!(reader.read_raw_cell(ref_size)));
    }
    if (reader.position - cells_start) as u64 != total_cells_size {
        return Err(BocError::InvalidHeader("invalid total cells size"));
    }

    if has_crc {
        let prefix_len = reader.position;
        let checksum = u32::from_le_bytes(ok!(reader.read_array::<4>()));
        if crc32c::crc32c(&data[..prefix_len]) != checksum {
            return Err(BocError::ChecksumMismatch);
        }
    }

    if reader.position != data.len() {
        return Err(BocError::InvalidHeader("unexpected trailing bytes"));
    }

    // Second pass in reverse, so every reference points to a finished cell.
    let mut rev_cells = Vec::<Cell>::with_capacity(cell_count);
    for (index, raw) in raw_cells.into_iter().enumerate().rev() {
        let mut references = SmallVec::new();
        for child_index in raw.references {
            let child_index = child_index as usize;
            if child_index <= index || child_index >= cell_count {
                return Err(BocError::InvalidRefOrder);
            }
            references.push(rev_cells[cell_count - 1 - child_index].clone());
        }
        let cell = hasher::finalize(CellParts {
            data: raw.data,
            bit_len: raw.bit_len,
            is_exotic: raw.descriptor.is_exotic(),
            references,
        });
        rev_cells.push(ok!(cell.map_err(BocError::InvalidCell)));
    }

    let mut roots = Vec::with_capacity(root_count);
    for index in root_indices {
        roots.push(rev_cells[cell_count - 1 - index].clone());
    }
    Ok(roots)
}

struct RawCell {
    descriptor: CellDescriptor,
    data: Vec<u8>,
    bit_len: u16,
    references: SmallVec<[u32; 4]>,
}

struct Reader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn read_byte(&mut self) -> Result<u8, BocError> {
        match self.data.get(self.position) {
            Some(byte) => {
                self.position += 1;
                Ok(*byte)
            }
            None => Err(BocError::UnexpectedEof),
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], BocError> {
        let mut result = [0u8; N];
        result.copy_from_slice(ok!(self.read_slice(N)));
        Ok(result)
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], BocError> {
        match self.data.get(self.position..self.position + len) {
            Some(slice) => {
                self.position += len;
                Ok(slice)
            }
            None => Err(BocError::UnexpectedEof),
        }
    }

    fn skip(&mut self, len: usize) -> Result<(), BocError> {
        if self.position + len <= self.data.len() {
            self.position += len;
            Ok(())
        } else {
            Err(BocError::UnexpectedEof)
        }
    }

    fn read_be_uint(&mut self, size: usize) -> Result<u64, BocError> {
        let mut result = 0u64;
        for byte in ok!(self.read_slice(size)) {
            result = (result << 8) | *byte as u64;
        }
        Ok(result)
    }

    fn read_raw_cell(&mut self, ref_size: usize) -> Result<RawCell, BocError> {
        let descriptor = CellDescriptor::new(ok!(self.read_byte()), ok!(self.read_byte()));
        let ref_count = descriptor.reference_count() as usize;
        if ref_count > MAX_REF_COUNT {
            return Err(BocError::InvalidHeader("invalid reference count"));
        }
        if descriptor.store_hashes() {
            let hash_count = descriptor.level_mask().level() as usize + 1;
            ok!(self.skip(hash_count * (32 + 2)));
        }

        let data = ok!(self.read_slice(descriptor.byte_len() as usize)).to_vec();
        let bit_len = if descriptor.is_aligned() {
            data.len() as u16 * 8
        } else {
            match data.last() {
                Some(last) if *last != 0 => {
                    data.len() as u16 * 8 - last.trailing_zeros() as u16 - 1
                }
                _ => return Err(BocError::InvalidHeader("missing completion tag")),
            }
        };

        let mut references = SmallVec::new();
        for _ in 0..ref_count {
            references.push(ok!(self.read_be_uint(ref_size)) as u32);
        }
        Ok(RawCell {
            descriptor,
            data,
            bit_len,
            references,
        })
    }
}
