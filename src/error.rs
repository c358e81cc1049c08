//! Decoder error types.

use std::io;

use thiserror::Error;

/// Errors produced while parsing or decoding a QOA stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Bad magic tag or a zero value in a field that must be non-zero.
    #[error("Malformed header: {0}")]
    MalformedHeader(&'static str),

    /// The reader returned fewer bytes than the record requires.
    #[error("Truncated {record}: expected {expected} bytes, got {got}")]
    TruncatedInput {
        /// Record being read.
        record: &'static str,
        /// Bytes the record needs.
        expected: usize,
        /// Bytes actually read.
        got: usize,
    },

    /// The slices read for a frame do not form whole channel groups.
    #[error("Inconsistent frame: {slices} slices for {channels} channels")]
    InconsistentFrame {
        /// Number of complete slices read.
        slices: usize,
        /// Channel count of the frame.
        channels: u8,
    },

    /// A frame changed channel count or sample rate where that is not supported.
    #[error("Incompatible frame header")]
    IncompatibleFrame,

    /// I/O error reported by the underlying reader.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// True if the input ended before the first byte of a record.
    pub fn is_clean_eof(&self) -> bool {
        matches!(self, DecodeError::TruncatedInput { got: 0, .. })
    }
}

/// Decoder result type.
pub type Result<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_eof_only_for_empty_reads() {
        let empty = DecodeError::TruncatedInput {
            record: "frame header",
            expected: 8,
            got: 0,
        };
        let partial = DecodeError::TruncatedInput {
            record: "frame header",
            expected: 8,
            got: 3,
        };
        assert!(empty.is_clean_eof());
        assert!(!partial.is_clean_eof());
        assert!(!DecodeError::MalformedHeader("bad magic").is_clean_eof());
    }

    #[test]
    fn test_display() {
        let err = DecodeError::InconsistentFrame {
            slices: 3,
            channels: 2,
        };
        assert_eq!(err.to_string(), "Inconsistent frame: 3 slices for 2 channels");
    }
}
