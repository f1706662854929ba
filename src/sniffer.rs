//! The encoding resolver.
//!
//! [`Sniffer`] is the entry point. Create one via [`Sniffer::builder()`],
//! adjust the default encoding or the prescan window, then call
//! [`resolve()`](Sniffer::resolve) with the raw bytes and the transport
//! layer's `Content-Type` (if any). The result is a [`Decoded`]: the
//! [`EncodingDecision`] together with the text of the *whole* stream decoded
//! from byte 0 under that decision.
//!
//! Signals are consulted in a fixed order:
//!
//! ```text
//! empty input            -> UTF-8, Irrelevant
//! byte-order mark        -> Certain (final)
//! Content-Type charset   -> Tentative
//! <meta> prescan         -> Certain
//! configured default     -> Tentative
//! ```
//!
//! A later signal only replaces the current candidate when its confidence
//! ranks strictly higher; see [`Confidence`].

use crate::bom::sniff_bom;
use crate::content_type::{charset_from_content_type, charset_from_headers};
use crate::encoding::{self, StringEncoding, is_utf16};
use crate::error::Error;
use crate::prescan::{DEFAULT_PRESCAN_WINDOW, prescan};

// ---------------------------------------------------------------------------
// Decision types
// ---------------------------------------------------------------------------

/// How sure the resolver is about an encoding.
///
/// `Tentative` may still be overruled (by a `<meta>` declaration, or later
/// by a parser through [`EncodingDecision::change_to`]). `Certain` and
/// `Irrelevant` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Confidence {
    /// A guess: transport-layer hint or configured default.
    Tentative,
    /// Established by a BOM or an in-document declaration.
    Certain,
    /// There was nothing to decode.
    Irrelevant,
}

impl Confidence {
    fn rank(self) -> u8 {
        match self {
            Confidence::Tentative => 0,
            Confidence::Certain => 1,
            Confidence::Irrelevant => 2,
        }
    }

    /// Returns `true` for `Certain` and `Irrelevant`.
    pub fn is_final(self) -> bool {
        self != Confidence::Tentative
    }
}

/// Which stage produced an [`EncodingDecision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// A byte-order mark at the start of the stream.
    Bom,
    /// The `charset` parameter of the `Content-Type` header.
    TransportLayer,
    /// A `<meta>` declaration, found by the prescan or reported later
    /// through [`EncodingDecision::change_to`].
    MetaPrescan,
    /// The sniffer's configured default encoding.
    Default,
    /// The input was empty.
    Empty,
}

/// The outcome of encoding resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodingDecision {
    encoding: StringEncoding,
    confidence: Confidence,
    source: Source,
}

impl EncodingDecision {
    pub(crate) fn new(encoding: StringEncoding, confidence: Confidence, source: Source) -> Self {
        Self { encoding, confidence, source }
    }

    /// The chosen encoding.
    pub fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    /// How sure the resolver is.
    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    /// Which stage produced this decision.
    pub fn source(&self) -> Source {
        self.source
    }

    /// Merge `signal` into the current candidate. The signal wins when
    /// there is no candidate yet, or when the candidate is still tentative
    /// and the signal ranks strictly higher.
    pub(crate) fn offer(current: Option<Self>, signal: Self) -> Self {
        match current {
            None => signal,
            Some(current) if current.confidence.is_final() => current,
            Some(current) if signal.confidence.rank() > current.confidence.rank() => signal,
            Some(current) => current,
        }
    }

    /// React to a `<meta>` declaration met while parsing, after the prescan
    /// window.
    ///
    /// Final decisions are never revisited. For a tentative one:
    ///
    /// * a UTF-16 decision becomes certain as it is;
    /// * the declared encoding is normalised (UTF-16 to UTF-8,
    ///   `x-user-defined` to windows-1252);
    /// * if that is the encoding already in use, it becomes certain;
    /// * otherwise the caller must decode the stream again from byte 0
    ///   with the returned decision. Text decoded so far is not patched.
    pub fn change_to(self, declared: StringEncoding) -> EncodingChange {
        if self.confidence.is_final() {
            return EncodingChange::Unchanged;
        }
        if is_utf16(self.encoding) {
            return EncodingChange::Confirmed(self.certain());
        }

        let declared = if is_utf16(declared) {
            StringEncoding::UTF_8
        } else if declared == StringEncoding::X_USER_DEFINED {
            StringEncoding::WINDOWS_1252
        } else {
            declared
        };

        if declared == self.encoding {
            EncodingChange::Confirmed(self.certain())
        } else {
            debug!(from = self.encoding.name(), to = declared.name(), "encoding change requires reparse");
            EncodingChange::Reparse(EncodingDecision::new(
                declared,
                Confidence::Certain,
                Source::MetaPrescan,
            ))
        }
    }

    fn certain(self) -> Self {
        Self { confidence: Confidence::Certain, ..self }
    }
}

/// Result of [`EncodingDecision::change_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingChange {
    /// The decision was already final; keep going.
    Unchanged,
    /// Same encoding, now certain; keep going.
    Confirmed(EncodingDecision),
    /// Discard decoded output and decode the whole stream again.
    Reparse(EncodingDecision),
}

/// A resolved and decoded byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    decision: EncodingDecision,
    text: String,
}

impl Decoded {
    /// The encoding decision the text was decoded under.
    pub fn decision(&self) -> EncodingDecision {
        self.decision
    }

    /// Shorthand for `self.decision().encoding()`.
    pub fn encoding(&self) -> StringEncoding {
        self.decision.encoding
    }

    /// The decoded text, without any byte-order mark.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume `self` and return the decoded text.
    pub fn into_text(self) -> String {
        self.text
    }
}

// ---------------------------------------------------------------------------
// Sniffer
// ---------------------------------------------------------------------------

/// A configured encoding resolver.
///
/// `Sniffer` holds only its settings, so it is cheap to [`Clone`] and can be
/// shared between threads. Every call is independent.
///
/// # Example
///
/// ```rust
/// let sniffer = charsniff::Sniffer::builder()
///     .default_encoding("windows-1251")
///     .build()?;
///
/// let decoded = sniffer.resolve(b"<meta charset=koi8-r>\xF0\xD2\xC9", None)?;
/// assert_eq!(decoded.encoding().name(), "KOI8-R");
/// assert!(decoded.text().ends_with("\u{41F}\u{440}\u{438}"));
/// # Ok::<(), charsniff::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Sniffer {
    default_encoding: StringEncoding,
    prescan_window: usize,
    replace_malformed: bool,
}

impl Sniffer {
    /// Create a `Sniffer` with default settings.
    pub fn new() -> Self {
        Self {
            default_encoding: StringEncoding::WINDOWS_1252,
            prescan_window: DEFAULT_PRESCAN_WINDOW,
            replace_malformed: false,
        }
    }

    /// Create a new [`SnifferBuilder`].
    pub fn builder() -> SnifferBuilder {
        SnifferBuilder::new()
    }

    /// Resolve the encoding of `bytes` and decode them.
    ///
    /// `content_type` is the raw transport-layer `Content-Type` value, if
    /// one is known. A malformed header is treated as absent.
    ///
    /// Fails only when the stream is malformed for the resolved encoding
    /// and replacement is not allowed; see [`Error::is_decode`].
    pub fn resolve(&self, bytes: &[u8], content_type: Option<&str>) -> crate::Result<Decoded> {
        let transport = content_type.and_then(charset_from_content_type);
        self.decode(bytes, transport)
    }

    /// Like [`resolve`](Self::resolve), taking the `Content-Type` from
    /// response headers.
    pub fn resolve_with_headers(
        &self,
        bytes: &[u8],
        headers: &http::HeaderMap,
    ) -> crate::Result<Decoded> {
        self.decode(bytes, charset_from_headers(headers))
    }

    /// Resolve the encoding of `bytes` without decoding them.
    pub fn sniff(&self, bytes: &[u8], content_type: Option<&str>) -> EncodingDecision {
        self.decide(bytes, content_type.and_then(charset_from_content_type))
    }

    fn decode(&self, bytes: &[u8], transport: Option<StringEncoding>) -> crate::Result<Decoded> {
        let decision = self.decide(bytes, transport);
        let text = encoding::decode(bytes, decision.encoding, self.replace_malformed)?;
        Ok(Decoded { decision, text })
    }

    fn decide(&self, bytes: &[u8], transport: Option<StringEncoding>) -> EncodingDecision {
        let decision = self.candidate(bytes, transport);
        debug!(
            encoding = decision.encoding.name(),
            confidence = ?decision.confidence,
            source = ?decision.source,
            bytes = bytes.len(),
            "resolved encoding"
        );
        decision
    }

    fn candidate(&self, bytes: &[u8], transport: Option<StringEncoding>) -> EncodingDecision {
        if bytes.is_empty() {
            return EncodingDecision::new(StringEncoding::UTF_8, Confidence::Irrelevant, Source::Empty);
        }

        let mut current: Option<EncodingDecision> = None;

        if let Some(bom) = sniff_bom(bytes) {
            trace!(encoding = bom.name(), "byte-order mark");
            current = Some(EncodingDecision::offer(
                current,
                EncodingDecision::new(bom, Confidence::Certain, Source::Bom),
            ));
        }

        if let Some(hint) = transport {
            current = Some(EncodingDecision::offer(
                current,
                EncodingDecision::new(hint, Confidence::Tentative, Source::TransportLayer),
            ));
        }

        // Runs under any tentative candidate, whatever its byte layout.
        if current.is_none_or(|candidate| !candidate.confidence.is_final()) {
            let window = bytes.get(..self.prescan_window).unwrap_or(bytes);
            if let Some(declared) = prescan(window) {
                current = Some(EncodingDecision::offer(
                    current,
                    EncodingDecision::new(declared, Confidence::Certain, Source::MetaPrescan),
                ));
            }
        }

        EncodingDecision::offer(
            current,
            EncodingDecision::new(self.default_encoding, Confidence::Tentative, Source::Default),
        )
    }
}

impl Default for Sniffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve and decode `bytes` with a default [`Sniffer`].
pub fn resolve(bytes: &[u8], content_type: Option<&str>) -> crate::Result<Decoded> {
    Sniffer::new().resolve(bytes, content_type)
}

// Sniffers are shared across threads.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Sniffer>();
};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`Sniffer`].
///
/// Obtain via [`Sniffer::builder()`]. Invalid settings are reported by
/// [`build()`](Self::build), not by the setter.
#[derive(Debug)]
pub struct SnifferBuilder {
    default_encoding: StringEncoding,
    prescan_window: usize,
    replace_malformed: bool,
    error: Option<Error>,
}

impl Default for SnifferBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnifferBuilder {
    /// Create a new `SnifferBuilder` with default settings.
    pub fn new() -> Self {
        let defaults = Sniffer::new();
        Self {
            default_encoding: defaults.default_encoding,
            prescan_window: defaults.prescan_window,
            replace_malformed: defaults.replace_malformed,
            error: None,
        }
    }

    /// Set the encoding used when no BOM, header or declaration is found,
    /// by WHATWG label (`"windows-1252"`, `"koi8-r"`, `"latin1"`, ...).
    ///
    /// Default: **windows-1252**.
    #[must_use]
    pub fn default_encoding(mut self, label: &str) -> Self {
        match StringEncoding::for_label(label) {
            Some(encoding) => self.default_encoding = encoding,
            None => {
                self.error = Some(Error::builder(format!("unknown default encoding label {label:?}")));
            }
        }
        self
    }

    /// Set how many leading bytes the `<meta>` prescan examines.
    ///
    /// Default: **1024**. Must be non-zero.
    #[must_use]
    pub fn prescan_window(mut self, bytes: usize) -> Self {
        if bytes == 0 {
            self.error = Some(Error::builder("prescan window must be non-zero"));
        } else {
            self.prescan_window = bytes;
        }
        self
    }

    /// Substitute U+FFFD for malformed sequences instead of failing.
    ///
    /// Default: **false**. Streams resolved to `replacement`, and legacy
    /// single-byte code pages when the linked decoder is lossy, are always
    /// decoded with substitution.
    #[must_use]
    pub fn replace_malformed(mut self, replace: bool) -> Self {
        self.replace_malformed = replace;
        self
    }

    /// Build the [`Sniffer`].
    pub fn build(self) -> crate::Result<Sniffer> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Sniffer {
            default_encoding: self.default_encoding,
            prescan_window: self.prescan_window,
            replace_malformed: self.replace_malformed,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
