//! Error types for the `extendible_buckets` crate

/// Errors raised by table construction and mutation.
///
/// Duplicate inserts and lookup misses are not errors; they are reported
/// through [`InsertOutcome`](crate::InsertOutcome),
/// [`SearchOutcome`](crate::SearchOutcome) and
/// [`DeleteOutcome`](crate::DeleteOutcome).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The input could not be read as a signed 64-bit integer key.
    #[error("invalid key {input:?}, expected an integer")]
    InvalidKey {
        /// The rejected input, verbatim.
        input: String,
    },

    /// Buckets must be able to hold at least one key.
    #[error("invalid bucket capacity {capacity}, must be at least 1")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },

    /// The configured depth limit is larger than the directory can address.
    #[error("invalid depth limit {max_global_depth}, must be at most {limit}")]
    InvalidDepthLimit {
        /// The rejected limit.
        max_global_depth: u32,
        /// The largest accepted limit.
        limit: u32,
    },

    /// Splitting cannot separate the key from the keys it collides with
    /// before the directory reaches its depth limit.
    ///
    /// This happens when more than `capacity` keys agree on every low-order
    /// bit up to the limit, for example `k` and `-k`. The table is left
    /// exactly as it was before the insert.
    #[error("cannot place key {key}: its bucket would need more than {max_global_depth} address bits")]
    DepthExhaustion {
        /// The key whose insert was rejected.
        key: i64,
        /// The depth limit in effect.
        max_global_depth: u32,
    },

    /// The directory could not be grown to `2^global_depth` slots. The
    /// table is left exactly as it was before the insert.
    #[error("cannot allocate a directory of depth {global_depth}")]
    DirectoryAllocation {
        /// The depth that was refused.
        global_depth: u32,
    },

    /// The directory and bucket store disagree. This is a defect, not an
    /// input problem, and the operation that found it was aborted.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
