//! Encoding capability table and the final decode step.
//!
//! [`StringEncoding`] names one of the 40 encodings of the
//! [WHATWG Encoding Standard][whatwg]. Labels are resolved with the standard's
//! label table, including the deliberate aliasing of `ascii` / `latin1` /
//! `iso-8859-1` → windows-1252, so there is no way to hold an encoding the
//! capability table cannot classify.
//!
//! The table answers three questions about an encoding:
//!
//! * **ASCII-compatible** -- the bytes 0x09, 0x0A, 0x0C, 0x0D, 0x20-0x22,
//!   0x26, 0x27, 0x2C-0x3F, 0x41-0x5A and 0x61-0x7A (outside multi-byte
//!   sequences) decode exactly as in windows-1252, which is what makes the
//!   raw-byte `<meta>` prescan meaningful.  Every encoding except UTF-16LE,
//!   UTF-16BE, ISO-2022-JP and `replacement`.
//! * **UTF-16** -- UTF-16LE or UTF-16BE.
//! * **single-byte** -- legacy code pages with one byte per character.
//!
//! plus one process-wide question, [`uses_lossy_windows_1252_decoding`].
//!
//! [whatwg]: https://encoding.spec.whatwg.org/

use crate::Error;
use encoding_rs::{DecoderResult, Encoding};
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// StringEncoding
// ---------------------------------------------------------------------------

/// A character encoding, identified by its canonical WHATWG name.
///
/// Cheap to copy. Equality compares the underlying `encoding_rs` singletons;
/// hashing goes through [`name()`](Self::name), which agrees with it.
#[derive(Clone, Copy)]
pub struct StringEncoding(&'static Encoding);

impl StringEncoding {
    /// UTF-8.
    pub const UTF_8: StringEncoding = StringEncoding(&encoding_rs::UTF_8_INIT);
    /// UTF-16, little-endian.
    pub const UTF_16LE: StringEncoding = StringEncoding(&encoding_rs::UTF_16LE_INIT);
    /// UTF-16, big-endian.
    pub const UTF_16BE: StringEncoding = StringEncoding(&encoding_rs::UTF_16BE_INIT);
    /// windows-1252, which also answers to `iso-8859-1`, `latin1` and `ascii`.
    pub const WINDOWS_1252: StringEncoding = StringEncoding(&encoding_rs::WINDOWS_1252_INIT);
    /// x-user-defined.
    pub const X_USER_DEFINED: StringEncoding = StringEncoding(&encoding_rs::X_USER_DEFINED_INIT);
    /// The `replacement` pseudo-encoding (labels such as `iso-2022-kr`).
    pub const REPLACEMENT: StringEncoding = StringEncoding(&encoding_rs::REPLACEMENT_INIT);

    /// Look up an encoding by WHATWG label.
    ///
    /// Leading and trailing ASCII whitespace is ignored and matching is
    /// ASCII case-insensitive. Returns `None` for unrecognised labels.
    ///
    /// ```text
    /// "utf8"        -> UTF-8
    /// " Latin1 "    -> windows-1252
    /// "sjis"        -> Shift_JIS
    /// "utf-7"       -> None
    /// ```
    pub fn for_label(label: &str) -> Option<StringEncoding> {
        Self::for_label_bytes(label.as_bytes())
    }

    /// Like [`for_label`](Self::for_label), for labels read straight out of
    /// undecoded input.
    pub fn for_label_bytes(label: &[u8]) -> Option<StringEncoding> {
        Encoding::for_label(label).map(StringEncoding)
    }

    /// Canonical name, e.g. `"UTF-8"`, `"windows-1252"`, `"Shift_JIS"`.
    pub fn name(self) -> &'static str {
        self.0.name()
    }

    /// The underlying `encoding_rs` encoding.
    pub fn as_encoding(self) -> &'static Encoding {
        self.0
    }
}

impl From<&'static Encoding> for StringEncoding {
    fn from(encoding: &'static Encoding) -> Self {
        StringEncoding(encoding)
    }
}

impl PartialEq for StringEncoding {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for StringEncoding {}

impl std::hash::Hash for StringEncoding {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Display for StringEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for StringEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StringEncoding").field(&self.name()).finish()
    }
}

// ---------------------------------------------------------------------------
// Capability table
// ---------------------------------------------------------------------------

/// One row per WHATWG encoding: (encoding, ASCII-compatible,
/// single-byte).
///
/// Source: <https://encoding.spec.whatwg.org/#names-and-labels> and
/// <https://html.spec.whatwg.org/multipage/infrastructure.html#ascii-compatible-encoding>
#[rustfmt::skip]
static CAPABILITIES: [(StringEncoding, bool, bool); 40] = [
    // -- Unicode ---------------------------------------------------------
    (StringEncoding(&encoding_rs::UTF_8_INIT), true,  false),
    (StringEncoding(&encoding_rs::UTF_16BE_INIT), false, false),
    (StringEncoding(&encoding_rs::UTF_16LE_INIT), false, false),
    // -- Legacy single-byte ----------------------------------------------
    (StringEncoding(&encoding_rs::IBM866_INIT), true,  true),
    (StringEncoding(&encoding_rs::ISO_8859_2_INIT), true,  true),
    (StringEncoding(&encoding_rs::ISO_8859_3_INIT), true,  true),
    (StringEncoding(&encoding_rs::ISO_8859_4_INIT), true,  true),
    (StringEncoding(&encoding_rs::ISO_8859_5_INIT), true,  true),
    (StringEncoding(&encoding_rs::ISO_8859_6_INIT), true,  true),
    (StringEncoding(&encoding_rs::ISO_8859_7_INIT), true,  true),
    (StringEncoding(&encoding_rs::ISO_8859_8_INIT), true,  true),
    (StringEncoding(&encoding_rs::ISO_8859_8_I_INIT), true,  true),
    (StringEncoding(&encoding_rs::ISO_8859_10_INIT), true,  true),
    (StringEncoding(&encoding_rs::ISO_8859_13_INIT), true,  true),
    (StringEncoding(&encoding_rs::ISO_8859_14_INIT), true,  true),
    (StringEncoding(&encoding_rs::ISO_8859_15_INIT), true,  true),
    (StringEncoding(&encoding_rs::ISO_8859_16_INIT), true,  true),
    (StringEncoding(&encoding_rs::KOI8_R_INIT), true,  true),
    (StringEncoding(&encoding_rs::KOI8_U_INIT), true,  true),
    (StringEncoding(&encoding_rs::MACINTOSH_INIT), true,  true),
    (StringEncoding(&encoding_rs::WINDOWS_874_INIT), true,  true),
    (StringEncoding(&encoding_rs::WINDOWS_1250_INIT), true,  true),
    (StringEncoding(&encoding_rs::WINDOWS_1251_INIT), true,  true),
    (StringEncoding(&encoding_rs::WINDOWS_1252_INIT), true,  true),
    (StringEncoding(&encoding_rs::WINDOWS_1253_INIT), true,  true),
    (StringEncoding(&encoding_rs::WINDOWS_1254_INIT), true,  true),
    (StringEncoding(&encoding_rs::WINDOWS_1255_INIT), true,  true),
    (StringEncoding(&encoding_rs::WINDOWS_1256_INIT), true,  true),
    (StringEncoding(&encoding_rs::WINDOWS_1257_INIT), true,  true),
    (StringEncoding(&encoding_rs::WINDOWS_1258_INIT), true,  true),
    (StringEncoding(&encoding_rs::X_MAC_CYRILLIC_INIT), true,  true),
    // -- Legacy multi-byte CJK -------------------------------------------
    (StringEncoding(&encoding_rs::GBK_INIT), true,  false),
    (StringEncoding(&encoding_rs::GB18030_INIT), true,  false),
    (StringEncoding(&encoding_rs::BIG5_INIT), true,  false),
    (StringEncoding(&encoding_rs::EUC_JP_INIT), true,  false),
    (StringEncoding(&encoding_rs::ISO_2022_JP_INIT), false, false),
    (StringEncoding(&encoding_rs::SHIFT_JIS_INIT), true,  false),
    (StringEncoding(&encoding_rs::EUC_KR_INIT), true,  false),
    // -- Special ---------------------------------------------------------
    (StringEncoding(&encoding_rs::REPLACEMENT_INIT), false, false),
    (StringEncoding(&encoding_rs::X_USER_DEFINED_INIT), true,  true),
];

fn capabilities(encoding: StringEncoding) -> Option<(bool, bool)> {
    CAPABILITIES
        .iter()
        .find(|(row, _, _)| *row == encoding)
        .map(|&(_, ascii, single)| (ascii, single))
}

/// Returns `true` if `encoding` is ASCII-compatible in the HTML sense, i.e.
/// a raw-byte prescan for `<meta charset>` can be trusted under it.
pub fn is_ascii_compatible(encoding: StringEncoding) -> bool {
    capabilities(encoding).is_some_and(|(ascii, _)| ascii)
}

/// Returns `true` if `encoding` is UTF-16LE or UTF-16BE.
pub fn is_utf16(encoding: StringEncoding) -> bool {
    encoding == StringEncoding::UTF_16LE || encoding == StringEncoding::UTF_16BE
}

/// Returns `true` for legacy single-byte code pages (windows-125x,
/// ISO-8859-x, KOI8, ...).
pub fn is_single_byte(encoding: StringEncoding) -> bool {
    capabilities(encoding).is_some_and(|(_, single)| single)
}

/// Returns `true` if the windows-1252 decoder accepts the five bytes the
/// code page leaves unassigned (0x81, 0x8D, 0x8F, 0x90, 0x9D), producing a
/// best-effort character for each instead of failing.
///
/// Probed once on first use and cached for the life of the process. The
/// answer depends only on the linked decoder, so a racing second probe
/// computes the same value.
pub fn uses_lossy_windows_1252_decoding() -> bool {
    static LOSSY: OnceLock<bool> = OnceLock::new();
    *LOSSY.get_or_init(|| {
        const UNUSED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];
        let lossy = StringEncoding::WINDOWS_1252
            .as_encoding()
            .decode_without_bom_handling_and_without_replacement(&UNUSED)
            .is_some();
        debug!(lossy, "probed windows-1252 unused code points");
        lossy
    })
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode the whole of `data` as `encoding`, starting from byte 0.
///
/// A byte-order mark belonging to `encoding` is stripped. Malformed input
/// is replaced with U+FFFD when `replace_malformed` is set, when the
/// encoding is `replacement`, or when it is a single-byte code page and
/// [`uses_lossy_windows_1252_decoding`] holds. Otherwise the first
/// malformed sequence is reported as [`Error::is_decode`] with its offset.
pub(crate) fn decode(
    data: &[u8],
    encoding: StringEncoding,
    replace_malformed: bool,
) -> Result<String, Error> {
    if data.is_empty() {
        return Ok(String::new());
    }

    let bom_len = match crate::bom::sniff_bom(data) {
        Some(bom) if bom == encoding => crate::bom::bom_len(bom),
        _ => 0,
    };
    let body = data.get(bom_len..).unwrap_or_default();

    let offset = match decode_strict(body, encoding) {
        Ok(text) => {
            trace!(encoding = encoding.name(), bytes = data.len(), "decoded without errors");
            return Ok(text);
        }
        Err(offset) => bom_len + offset,
    };

    let lossy = replace_malformed
        || encoding == StringEncoding::REPLACEMENT
        || (is_single_byte(encoding) && uses_lossy_windows_1252_decoding());
    if !lossy {
        return Err(Error::decode(encoding, offset));
    }

    warn!(
        encoding = encoding.name(),
        offset, "malformed input, substituting replacement characters"
    );
    let (text, _had_errors) = encoding.as_encoding().decode_without_bom_handling(body);
    Ok(text.into_owned())
}

/// Decode without replacement. On failure returns the offset (into `data`)
/// of the first malformed byte sequence.
fn decode_strict(data: &[u8], encoding: StringEncoding) -> Result<String, usize> {
    let mut decoder = encoding.as_encoding().new_decoder_without_bom_handling();
    let capacity = decoder
        .max_utf8_buffer_length_without_replacement(data.len())
        .unwrap_or(data.len());
    let mut text = String::with_capacity(capacity);
    let mut consumed = 0usize;

    loop {
        let remaining = data.get(consumed..).unwrap_or_default();
        let (result, read) = decoder.decode_to_string_without_replacement(remaining, &mut text, true);
        consumed += read;
        match result {
            DecoderResult::InputEmpty => return Ok(text),
            DecoderResult::OutputFull => {
                let rest = data.len().saturating_sub(consumed);
                let more = decoder
                    .max_utf8_buffer_length_without_replacement(rest)
                    .unwrap_or(rest)
                    .max(4);
                text.reserve(more);
            }
            DecoderResult::Malformed(bad, extra) => {
                return Err(consumed - usize::from(bad) - usize::from(extra));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
