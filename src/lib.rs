#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

#[macro_use]
mod tracing;

/// Byte-order-mark detection.
pub mod bom;
/// `Content-Type` header parsing.
pub mod content_type;
/// Encoding identifiers, capability queries and decoding.
pub mod encoding;
mod error;
/// The `<meta>` charset prescan.
pub mod prescan;
mod sniffer;

pub use bom::sniff_bom;
pub use content_type::ContentTypeHeader;
pub use encoding::{StringEncoding, is_ascii_compatible, uses_lossy_windows_1252_decoding};
pub use error::Error;
pub use prescan::prescan;
pub use sniffer::{
    Confidence, Decoded, EncodingChange, EncodingDecision, Sniffer, SnifferBuilder, Source,
    resolve,
};

/// A `Result` alias where the `Err` case is [`charsniff::Error`](Error).
pub type Result<T> = std::result::Result<T, Error>;
