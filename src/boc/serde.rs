//! Serde helpers mapping cells through their BoC form.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct State {
//!     #[serde(with = "ton_cells::boc::serde")]
//!     data: Cell,
//! }
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::boc::Boc;
use crate::cell::Cell;

/// Serializes a cell as base64 text or raw BoC bytes.
pub fn serialize<S>(cell: &Cell, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if serializer.is_human_readable() {
        serializer.serialize_str(&Boc::encode_base64(cell))
    } else {
        serializer.serialize_bytes(&Boc::encode(cell))
    }
}

/// Deserializes a cell from base64 text or raw BoC bytes.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Cell, D::Error>
where
    D: Deserializer<'de>,
{
    if deserializer.is_human_readable() {
        let encoded = String::deserialize(deserializer)?;
        Boc::decode_base64(&encoded).map_err(D::Error::custom)
    } else {
        let encoded = Vec::<u8>::deserialize(deserializer)?;
        Boc::decode(&encoded).map_err(D::Error::custom)
    }
}

/// Same mapping for optional cells.
pub mod option {
    use super::*;

    pub fn serialize<S>(cell: &Option<Cell>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Wrapper<'a>(#[serde(with = "super")] &'a Cell);

        match cell {
            Some(cell) => serializer.serialize_some(&Wrapper(cell)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Cell>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super")] Cell);

        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(cell)| cell))
    }
}

#[cfg(test)]
mod tests {
    use crate::cell::{Cell, CellBuilder};

    #[derive(serde::Serialize, serde::Deserialize)]
    struct State {
        #[serde(with = "crate::boc::serde")]
        data: Cell,
    }

    #[test]
    fn json_round_trip() {
        let mut b = CellBuilder::new();
        b.store_uint(0xdead_beef, 32).unwrap();
        b.store_reference(Cell::empty().clone()).unwrap();
        let cell = b.build().unwrap();

        let json = serde_json::to_string(&State { data: cell.clone() }).unwrap();
        let parsed: State = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.data, cell);
    }
}
