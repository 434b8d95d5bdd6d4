//! Error types for camroll.
//!
//! This module defines the unified error enum used throughout the crate. All fallible
//! operations return `Result<T, Error>`. Decode failures distinguish an unrecognized
//! file (`InvalidHeader`) from damage inside a recognized one (`CorruptSnapshot`).

/// Unified error type for all camroll operations.
///
/// Each variant represents a distinct failure mode:
///
/// - `InvalidHeader` / `CorruptSnapshot`: the backing file cannot be decoded
/// - `RecordTooLarge`: a record cannot be encoded
/// - `Io`: the filesystem failed during a read or persist
/// - `IndexOutOfBounds`: a mutation targeted a position past the end
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file header is invalid or unrecognized.
    #[error("invalid snapshot header: {0}")]
    InvalidHeader(String),

    /// The snapshot is damaged past the header (e.g., CRC mismatch, truncated data).
    #[error("corrupt snapshot at byte {offset}: {detail}")]
    CorruptSnapshot {
        /// Byte offset into the file where the damage was detected.
        offset: u64,
        /// Human-readable description of the corruption.
        detail: String,
    },

    /// The record payload exceeds the maximum encodable size.
    #[error("record too large: {size} bytes exceeds {max} byte limit")]
    RecordTooLarge {
        /// Actual size of the payload in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },

    /// An I/O error occurred during a file operation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A mutation addressed a position outside the current sequence.
    #[error("index {index} out of bounds for store of length {len}")]
    IndexOutOfBounds {
        /// The position the caller asked for.
        index: usize,
        /// Number of records in the store at the time of the call.
        len: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_header_display() {
        let err = Error::InvalidHeader("bad magic".into());
        let msg = err.to_string();
        assert!(msg.contains("bad magic"), "expected 'bad magic' in: {msg}");
    }

    #[test]
    fn corrupt_snapshot_display() {
        let err = Error::CorruptSnapshot {
            offset: 42,
            detail: "bad crc".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("42"), "expected '42' in: {msg}");
        assert!(msg.contains("bad crc"), "expected 'bad crc' in: {msg}");
    }

    #[test]
    fn record_too_large_display() {
        let err = Error::RecordTooLarge {
            size: 5_000_000_000,
            max: 4_294_967_279,
        };
        let msg = err.to_string();
        assert!(msg.contains("5000000000"), "expected size in: {msg}");
        assert!(msg.contains("4294967279"), "expected max in: {msg}");
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        // Verify it is the Io variant.
        assert!(matches!(err, Error::Io(_)));
        let msg = err.to_string();
        assert!(msg.contains("I/O error"), "expected 'I/O error' in: {msg}");
    }

    #[test]
    fn io_error_question_mark_coercion() {
        fn fallible() -> Result<(), Error> {
            let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
            Err(io_err)?
        }

        let result = fallible();
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), Error::Io(_)));
    }

    #[test]
    fn index_out_of_bounds_display() {
        let err = Error::IndexOutOfBounds { index: 7, len: 3 };
        let msg = err.to_string();
        assert!(msg.contains("7"), "expected '7' in: {msg}");
        assert!(msg.contains("3"), "expected '3' in: {msg}");
    }

    #[test]
    fn all_variants_debug_non_empty() {
        let io_err = std::io::Error::other("test");

        let variants: Vec<Error> = vec![
            Error::InvalidHeader("missing magic".into()),
            Error::CorruptSnapshot {
                offset: 0,
                detail: "truncated".into(),
            },
            Error::RecordTooLarge {
                size: 100_000,
                max: 65_536,
            },
            Error::Io(io_err),
            Error::IndexOutOfBounds { index: 0, len: 0 },
        ];

        for (i, variant) in variants.iter().enumerate() {
            let debug_str = format!("{variant:?}");
            assert!(
                !debug_str.is_empty(),
                "variant {i} produced empty Debug output"
            );
        }
    }
}
