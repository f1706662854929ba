//! Byte-order-mark detection.
//!
//! A BOM is the strongest signal there is: when one is present the
//! resolver stops looking, regardless of what the transport layer or the
//! document itself claims.

use crate::encoding::StringEncoding;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];

/// Inspect the first bytes of `data` for a byte-order mark.
///
/// ```text
/// EF BB BF ..  -> UTF-8
/// FE FF ..     -> UTF-16BE
/// FF FE ..     -> UTF-16LE
/// anything else -> None
/// ```
pub fn sniff_bom(data: &[u8]) -> Option<StringEncoding> {
    let head = data.get(..data.len().min(4)).unwrap_or(data);
    if head.starts_with(UTF8_BOM) {
        Some(StringEncoding::UTF_8)
    } else if head.starts_with(UTF16BE_BOM) {
        Some(StringEncoding::UTF_16BE)
    } else if head.starts_with(UTF16LE_BOM) {
        Some(StringEncoding::UTF_16LE)
    } else {
        None
    }
}

/// Length in bytes of the BOM that [`sniff_bom`] reports for `encoding`,
/// or 0 for encodings without one.
pub fn bom_len(encoding: StringEncoding) -> usize {
    if encoding == StringEncoding::UTF_8 {
        UTF8_BOM.len()
    } else if encoding == StringEncoding::UTF_16BE || encoding == StringEncoding::UTF_16LE {
        UTF16BE_BOM.len()
    } else {
        0
    }
}
