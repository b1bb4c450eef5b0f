//! Bag-of-cells serialization: the standard byte encoding of cell trees.

use base64::prelude::{Engine, BASE64_STANDARD, BASE64_URL_SAFE};

use crate::cell::Cell;

pub use self::de::{BocError, Options};
pub use self::ser::BocHeader;

pub mod de;
pub mod ser;

#[cfg(feature = "serde")]
pub mod serde;

/// BoC magic prefix.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BocTag {
    /// Flag-driven encoding, the only one produced on serialization.
    Generic,
    /// Legacy encoding with a mandatory index.
    Indexed,
    /// Legacy indexed encoding with a CRC-32C trailer.
    IndexedCrc32,
}

impl BocTag {
    pub const GENERIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];
    pub const INDEXED: [u8; 4] = [0x68, 0xff, 0x65, 0xf3];
    pub const INDEXED_CRC32: [u8; 4] = [0xac, 0xc3, 0xa7, 0x28];

    pub const fn from_bytes(data: [u8; 4]) -> Option<Self> {
        match data {
            Self::GENERIC => Some(Self::Generic),
            Self::INDEXED => Some(Self::Indexed),
            Self::INDEXED_CRC32 => Some(Self::IndexedCrc32),
            _ => None,
        }
    }
}

/// BoC encoding and decoding entry points.
pub struct Boc;

impl Boc {
    /// Encodes a single tree without index or checksum.
    pub fn encode(root: &Cell) -> Vec<u8> {
        BocHeader::new(root).encode(false, false)
    }

    /// Encodes a single tree with a CRC-32C trailer.
    pub fn encode_with_crc(root: &Cell) -> Vec<u8> {
        BocHeader::new(root).encode(false, true)
    }

    /// Encodes several trees with explicit index and checksum flags.
    /// Shared subtrees are stored once.
    pub fn encode_ext(roots: &[Cell], has_index: bool, has_crc: bool) -> Vec<u8> {
        let mut iter = roots.iter();
        let mut header = match iter.next() {
            Some(root) => BocHeader::new(root),
            None => return Vec::new(),
        };
        for root in iter {
            header.add_root(root);
        }
        header.encode(has_index, has_crc)
    }

    /// Encodes a single tree as lowercase hex.
    pub fn encode_hex(root: &Cell) -> String {
        hex::encode(Self::encode(root))
    }

    /// Encodes a single tree as standard base64.
    pub fn encode_base64(root: &Cell) -> String {
        BASE64_STANDARD.encode(Self::encode(root))
    }

    /// Decodes a single-root bag of cells.
    pub fn decode(data: &[u8]) -> Result<Cell, BocError> {
        let mut roots = ok!(de::deserialize(data, Options::exact(1)));
        match roots.pop() {
            Some(root) => Ok(root),
            None => Err(BocError::RootCellNotFound),
        }
    }

    /// Decodes a bag of cells with explicit limits.
    pub fn decode_ext(data: &[u8], options: Options) -> Result<Vec<Cell>, BocError> {
        de::deserialize(data, options)
    }

    /// Decodes a single-root bag of cells from hex.
    pub fn decode_hex(data: &str) -> Result<Cell, BocError> {
        match hex::decode(data.trim()) {
            Ok(data) => Self::decode(&data),
            Err(_) => Err(BocError::InvalidEncoding),
        }
    }

    /// Decodes a single-root bag of cells from base64,
    /// standard or URL-safe alphabet.
    pub fn decode_base64(data: &str) -> Result<Cell, BocError> {
        let data = data.trim();
        let decoded = BASE64_STANDARD
            .decode(data)
            .or_else(|_| BASE64_URL_SAFE.decode(data));
        match decoded {
            Ok(data) => Self::decode(&data),
            Err(_) => Err(BocError::InvalidEncoding),
        }
    }
}
