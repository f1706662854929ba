//! Error type for charsniff.
//!
//! Sniffing itself never fails: every stage either yields a signal or
//! abstains. [`Error`] covers the two places where something can go wrong:
//! building a [`Sniffer`](crate::Sniffer) from invalid settings, and decoding
//! a stream whose bytes are malformed for the resolved encoding.

use crate::encoding::StringEncoding;
use std::fmt;

/// The error type for charsniff operations.
///
/// Errors carry a `kind` classification that powers the
/// [`is_builder()`](Error::is_builder) / [`is_decode()`](Error::is_decode)
/// query methods. Decode errors additionally record the encoding that was
/// applied and the byte offset of the first malformed sequence, which is
/// what a caller needs to pick a fallback encoding and retry.
pub struct Error {
    pub(crate) kind: ErrorKind,
    pub(crate) message: String,
    pub(crate) encoding: Option<StringEncoding>,
    pub(crate) offset: Option<usize>,
}

/// Classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// Invalid [`SnifferBuilder`](crate::SnifferBuilder) configuration.
    Builder,
    /// Malformed byte sequence for the resolved encoding.
    Decode,
}

impl Error {
    /// Returns `true` if this is a configuration error from
    /// [`SnifferBuilder::build`](crate::SnifferBuilder::build).
    pub fn is_builder(&self) -> bool {
        matches!(self.kind, ErrorKind::Builder)
    }

    /// Returns `true` if the input could not be decoded with the resolved
    /// encoding.
    pub fn is_decode(&self) -> bool {
        matches!(self.kind, ErrorKind::Decode)
    }

    /// The encoding that was being applied when decoding failed.
    pub fn encoding(&self) -> Option<StringEncoding> {
        self.encoding
    }

    /// Byte offset into the input of the first malformed sequence.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    // -- Internal constructors --

    /// Create a configuration error.
    pub(crate) fn builder(msg: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Builder,
            message: msg.into(),
            encoding: None,
            offset: None,
        }
    }

    /// Create a decode error for `encoding` failing at byte `offset`.
    pub(crate) fn decode(encoding: StringEncoding, offset: usize) -> Self {
        Self {
            kind: ErrorKind::Decode,
            message: format!("malformed {encoding} sequence at byte {offset}"),
            encoding: Some(encoding),
            offset: Some(offset),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Builder => write!(f, "invalid sniffer configuration: {}", self.message),
            ErrorKind::Decode => write!(f, "error decoding input: {}", self.message),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("encoding", &self.encoding)
            .field("offset", &self.offset)
            .finish()
    }
}

impl std::error::Error for Error {}

// Sniffers are shared across threads; their errors must cross too.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_format() {
        let cases: Vec<(&str, Error, &str)> = vec![
            (
                "builder",
                Error::builder("unknown default encoding label \"nope\""),
                "invalid sniffer configuration: unknown default encoding label \"nope\"",
            ),
            (
                "decode",
                Error::decode(StringEncoding::UTF_8, 7),
                "error decoding input: malformed UTF-8 sequence at byte 7",
            ),
        ];

        for (label, err, expected) in &cases {
            assert_eq!(err.to_string(), *expected, "error display: {label}");
        }
    }

    #[test]
    fn error_kind_exclusivity_table() {
        type TestCase<'a> = (Error, fn(&Error) -> bool, &'a str);
        let cases: Vec<TestCase> = vec![
            (Error::builder("b"), Error::is_builder, "builder"),
            (Error::decode(StringEncoding::WINDOWS_1252, 0), Error::is_decode, "decode"),
        ];

        for (err, check, label) in &cases {
            assert!(check(err), "{label}: own is_*() should be true");
            for (_, other_check, other_label) in &cases {
                if *other_label != *label {
                    assert!(!other_check(err), "{label}: is_{other_label}() should be false");
                }
            }
        }
    }

    #[test]
    fn decode_error_accessors() {
        let err = Error::decode(StringEncoding::UTF_16LE, 12);
        assert_eq!(err.encoding(), Some(StringEncoding::UTF_16LE));
        assert_eq!(err.offset(), Some(12));

        let err = Error::builder("zero window");
        assert!(err.encoding().is_none());
        assert!(err.offset().is_none());
    }

    #[test]
    fn error_debug_format() {
        let err = Error::builder("bad config");
        let debug = format!("{err:?}");
        assert!(debug.contains("Builder"));
        assert!(debug.contains("bad config"));
    }
}
