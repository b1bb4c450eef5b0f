//! Cell, bag-of-cells and dictionary primitives for TON-compatible tooling.
//!
//! The building blocks, bottom up:
//!
//! - [`BitString`] - a bit buffer with typed writers and readers.
//! - [`Cell`] - an immutable tree node, hashed on construction.
//! - [`CellBuilder`] / [`CellSlice`] - cell construction and traversal.
//! - [`Boc`] - the standard byte encoding of cell trees.
//! - [`dict`] - `Hashmap`-family dictionaries stored as cells.
//!
//! ```
//! use ton_cells::prelude::*;
//!
//! let mut builder = CellBuilder::new();
//! builder.store_uint(0b0101010, 7)?;
//! let cell = builder.build()?;
//!
//! let bytes = Boc::encode_with_crc(&cell);
//! assert_eq!(Boc::decode(&bytes)?, cell);
//! # Ok::<_, anyhow::Error>(())
//! ```

/// Early return on `Err`, a `?` without the `From` conversion.
macro_rules! ok {
    ($e:expr $(,)?) => {
        match $e {
            core::result::Result::Ok(val) => val,
            core::result::Result::Err(err) => return core::result::Result::Err(err),
        }
    };
}

pub mod address;
pub mod bitstring;
pub mod boc;
pub mod cell;
pub mod dict;
pub mod error;
pub mod merkle;

pub(crate) mod util;

pub mod prelude {
    //! The commonly used types under one import.

    pub use crate::address::Address;
    pub use crate::bitstring::BitString;
    pub use crate::boc::Boc;
    pub use crate::cell::{Cell, CellBuilder, CellHash, CellSlice, CellType, LevelMask};
    pub use crate::error::Error;
}

pub use self::address::Address;
pub use self::bitstring::BitString;
pub use self::boc::Boc;
pub use self::cell::{Cell, CellBuilder, CellSlice};
pub use self::error::Error;
