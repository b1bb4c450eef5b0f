//! Common error types.

/// Error type for cell related errors.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// There were not enough bits or refs in the bit string, cell or slice.
    #[error("cell underflow")]
    CellUnderflow,
    /// There were not enough bits or refs capacity in the bit string or builder.
    #[error("cell overflow")]
    CellOverflow,
    /// The value does not fit into the requested bit width.
    #[error("integer does not fit into the requested bit width")]
    IntOverflow,
    /// Something tried to load a pruned branch cell.
    #[error("pruned branch access")]
    PrunedBranchAccess,
    /// Cell contains invalid descriptor or data.
    #[error("invalid cell")]
    InvalidCell,
    /// Data does not satisfy some constraints.
    #[error("invalid data")]
    InvalidData,
    /// Unknown cell type or constructor tag.
    #[error("invalid tag")]
    InvalidTag,
    /// Tree of cells is too deep.
    #[error("cell depth overflow")]
    DepthOverflow,
    /// Tried to serialize an empty dictionary with a variant that forbids it.
    #[error("dictionary must contain at least one entry")]
    EmptyDict,
    /// Dictionary entries have inconsistent key lengths.
    #[error("dictionary key length mismatch")]
    KeyLengthMismatch,
    /// One prefix dictionary key is a bit-prefix of another.
    #[error("dictionary keys are not prefix-free")]
    NonPrefixKeys,
}

/// Error type for address parsing related errors.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ParseAddrError {
    /// Tried to parse an empty string.
    #[error("cannot parse address from an empty string")]
    Empty,
    /// Workchain id is too large.
    #[error("workchain id is too large to fit in target type")]
    InvalidWorkchain,
    /// Invalid account id hex.
    #[error("cannot parse account id")]
    InvalidAccountId,
    /// Too many address parts.
    #[error("unexpected address part")]
    UnexpectedPart,
}
