//! Standard internal address.

use std::str::FromStr;

use crate::error::ParseAddrError;

/// Standard internal address (`addr_std$10` without anycast).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    /// Workchain id.
    pub workchain: i8,
    /// Account id within the workchain.
    pub hash: [u8; 32],
}

impl Address {
    /// The masterchain address with a zero account id.
    pub const MASTERCHAIN_ZERO: Self = Self::new(-1, [0; 32]);

    /// The base workchain address with a zero account id.
    pub const BASECHAIN_ZERO: Self = Self::new(0, [0; 32]);

    /// Creates an address from parts.
    #[inline]
    pub const fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }
}

impl FromStr for Address {
    type Err = ParseAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseAddrError::Empty);
        }
        let mut parts = s.split(':');
        let result = match (parts.next(), parts.next()) {
            (Some(workchain), Some(hash)) => {
                let workchain = workchain
                    .parse::<i8>()
                    .map_err(|_| ParseAddrError::InvalidWorkchain)?;
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(hash, &mut bytes)
                    .map_err(|_| ParseAddrError::InvalidAccountId)?;
                Self::new(workchain, bytes)
            }
            _ => return Err(ParseAddrError::UnexpectedPart),
        };
        if parts.next().is_some() {
            return Err(ParseAddrError::UnexpectedPart);
        }
        Ok(result)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{}:{}",
            self.workchain,
            hex::encode(self.hash)
        ))
    }
}
