use thiserror::Error;

/// The base error type for the unstable log.
///
/// None of the log's core operations fail: stale or mismatched acknowledgments are
/// ignored. These errors come from its checked helpers only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The configuration is invalid.
    #[error("{0}")]
    ConfigInvalid(String),

    /// A slice was requested with its lower bound above its upper bound.
    #[error("invalid unstable.slice {lo} > {hi}")]
    InvalidSlice {
        /// The requested lower bound.
        lo: u64,
        /// The requested upper bound.
        hi: u64,
    },

    /// A slice was requested outside the entries held by the log.
    #[error("unstable.slice[{lo}, {hi}) out of bound [{offset}, {upper}]")]
    OutOfBounds {
        /// The requested lower bound.
        lo: u64,
        /// The requested upper bound.
        hi: u64,
        /// The index of the first held entry.
        offset: u64,
        /// One past the index of the last held entry.
        upper: u64,
    },

    /// The log's internal state broke one of its invariants.
    #[error("unstable invariant violated: {0}")]
    InvariantViolated(String),
}

/// A result type that wraps up the unstable log errors.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::Error;

    #[test]
    fn test_error_display() {
        let tests = vec![
            (Error::ConfigInvalid("bad".to_owned()), "bad"),
            (Error::InvalidSlice { lo: 7, hi: 5 }, "invalid unstable.slice 7 > 5"),
            (
                Error::OutOfBounds {
                    lo: 4,
                    hi: 6,
                    offset: 5,
                    upper: 7,
                },
                "unstable.slice[4, 6) out of bound [5, 7]",
            ),
            (
                Error::InvariantViolated("offset 6 > offset_in_progress 5".to_owned()),
                "unstable invariant violated: offset 6 > offset_in_progress 5",
            ),
        ];
        for (err, want) in tests {
            assert_eq!(err.to_string(), want);
        }
    }
}
