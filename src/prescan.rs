//! Byte-level prescan for an in-document `<meta>` charset declaration.
//!
//! This runs before any encoding is known, so it never decodes: tag and
//! attribute names are matched against fixed ASCII byte sequences with
//! ASCII case folding, and everything else is opaque bytes. The scan is a
//! single forward pass over a bounded window, following the HTML
//! Standard's [prescan algorithm][prescan]:
//!
//! * `<!-- ... -->` comments are skipped,
//! * `<meta ...>` attributes are collected and evaluated,
//! * other start/end tags have their attributes consumed so that a `>`
//!   inside a quoted value does not end the tag early,
//! * `<!...>`, `</...>` and `<?...>` are skipped to the next `>`.
//!
//! The first usable declaration wins. If the window ends before one is
//! found (including in the middle of a tag), there is no result.
//!
//! [prescan]: https://html.spec.whatwg.org/multipage/parsing.html#prescan-a-byte-stream-to-determine-its-encoding

use crate::encoding::{StringEncoding, is_utf16};

/// How many leading bytes the prescan looks at unless configured otherwise.
pub const DEFAULT_PRESCAN_WINDOW: usize = 1024;

/// Search `window` for a `<meta charset>` or
/// `<meta http-equiv="content-type" content="...charset=...">` declaration.
///
/// A declared UTF-16 encoding is reported as UTF-8 and `x-user-defined` as
/// windows-1252: a document the prescan can read as ASCII is in neither.
pub fn prescan(window: &[u8]) -> Option<StringEncoding> {
    let found = Scanner { bytes: window, pos: 0 }.run();
    trace!(window = window.len(), charset = ?found, "meta prescan");
    found
}

/// Extract an encoding from the value of a `<meta content>` attribute, e.g.
/// `text/html; charset=koi8-r`.
///
/// Finds the first `charset` (any case) followed, after optional
/// whitespace, by `=`; the value is either quoted (and must be closed) or
/// runs to the next whitespace or `;`.
pub fn extract_charset_from_content(content: &[u8]) -> Option<StringEncoding> {
    let mut pos = 0;
    loop {
        pos = find_ignore_ascii_case(content, pos, b"charset")? + b"charset".len();
        pos = skip_spaces(content, pos);
        if content.get(pos) != Some(&b'=') {
            continue;
        }
        pos = skip_spaces(content, pos + 1);

        let rest = content.get(pos..)?;
        return match *rest.first()? {
            quote @ (b'"' | b'\'') => {
                let body = rest.get(1..)?;
                let end = body.iter().position(|&b| b == quote)?;
                StringEncoding::for_label_bytes(body.get(..end)?)
            }
            _ => {
                let end = rest
                    .iter()
                    .position(|&b| is_space(b) || b == b';')
                    .unwrap_or(rest.len());
                StringEncoding::for_label_bytes(rest.get(..end)?)
            }
        };
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

/// One step of "get an attribute".
enum Attribute {
    Pair { name: Vec<u8>, value: Vec<u8> },
    /// Reached the `>` that closes the tag.
    End,
}

#[derive(Clone, Copy)]
enum AttrState {
    BeforeName,
    Name,
    AfterName,
    BeforeValue,
    Quoted(u8),
    Unquoted,
}

impl Scanner<'_> {
    /// Returns `None` when the window runs out without a declaration.
    fn run(&mut self) -> Option<StringEncoding> {
        while let Some(rest) = self.bytes.get(self.pos..).filter(|r| !r.is_empty()) {
            if rest.starts_with(b"<!--") {
                // The closing `-->` may reuse the opener's dashes: `<!-->`.
                let close = find(self.bytes, self.pos + 2, b"-->")?;
                self.pos = close + 3;
                continue;
            }

            if starts_with_ignore_ascii_case(rest, b"<meta")
                && rest.get(5).is_some_and(|&b| is_space(b) || b == b'/')
            {
                self.pos += 5;
                if let Some(encoding) = self.meta()? {
                    return Some(encoding);
                }
            } else if is_tag_open(rest) {
                let name_len = rest.iter().position(|&b| is_space(b) || b == b'>')?;
                self.pos += name_len;
                while let Attribute::Pair { .. } = self.attribute()? {}
            } else if rest.starts_with(b"<!") || rest.starts_with(b"</") || rest.starts_with(b"<?") {
                self.pos = find(self.bytes, self.pos + 1, b">")?;
            }

            self.pos += 1;
        }
        None
    }

    /// Evaluate the attributes of a `<meta` tag. The outer `None` means the
    /// window ended inside the tag; the inner one that this tag declares
    /// nothing usable.
    fn meta(&mut self) -> Option<Option<StringEncoding>> {
        let mut seen: Vec<Vec<u8>> = Vec::new();
        let mut got_pragma = false;
        let mut need_pragma: Option<bool> = None;
        let mut charset: Option<StringEncoding> = None;

        while let Attribute::Pair { name, value } = self.attribute()? {
            if seen.contains(&name) {
                continue;
            }
            match name.as_slice() {
                b"http-equiv" => got_pragma |= value == b"content-type",
                b"content" if charset.is_none() => {
                    if let Some(encoding) = extract_charset_from_content(&value) {
                        charset = Some(encoding);
                        need_pragma = Some(true);
                    }
                }
                b"charset" => {
                    charset = StringEncoding::for_label_bytes(&value);
                    need_pragma = Some(false);
                }
                _ => {}
            }
            seen.push(name);
        }

        let declared = match (need_pragma, charset) {
            (Some(true), Some(_)) if !got_pragma => None,
            (Some(_), Some(encoding)) => Some(encoding),
            _ => None,
        };
        Some(declared.map(|encoding| {
            if is_utf16(encoding) {
                StringEncoding::UTF_8
            } else if encoding == StringEncoding::X_USER_DEFINED {
                StringEncoding::WINDOWS_1252
            } else {
                encoding
            }
        }))
    }

    /// "Get an attribute": read one attribute starting at `pos`. Names and
    /// values are ASCII-lowercased. `None` means the window ended first.
    fn attribute(&mut self) -> Option<Attribute> {
        let mut name = Vec::new();
        let mut value = Vec::new();
        let mut state = AttrState::BeforeName;

        loop {
            let b = *self.bytes.get(self.pos)?;
            match state {
                AttrState::BeforeName => match b {
                    b'>' => return Some(Attribute::End),
                    b'/' => self.pos += 1,
                    _ if is_space(b) => self.pos += 1,
                    _ => state = AttrState::Name,
                },
                AttrState::Name => match b {
                    b'=' if !name.is_empty() => {
                        self.pos += 1;
                        state = AttrState::BeforeValue;
                    }
                    b'/' | b'>' => return Some(Attribute::Pair { name, value }),
                    _ if is_space(b) => state = AttrState::AfterName,
                    _ => {
                        name.push(b.to_ascii_lowercase());
                        self.pos += 1;
                    }
                },
                AttrState::AfterName => match b {
                    b'=' => {
                        self.pos += 1;
                        state = AttrState::BeforeValue;
                    }
                    _ if is_space(b) => self.pos += 1,
                    _ => return Some(Attribute::Pair { name, value }),
                },
                AttrState::BeforeValue => match b {
                    b'"' | b'\'' => {
                        self.pos += 1;
                        state = AttrState::Quoted(b);
                    }
                    b'>' => return Some(Attribute::Pair { name, value }),
                    _ if is_space(b) => self.pos += 1,
                    _ => {
                        value.push(b.to_ascii_lowercase());
                        self.pos += 1;
                        state = AttrState::Unquoted;
                    }
                },
                AttrState::Quoted(quote) => {
                    self.pos += 1;
                    if b == quote {
                        return Some(Attribute::Pair { name, value });
                    }
                    value.push(b.to_ascii_lowercase());
                }
                AttrState::Unquoted => {
                    if is_space(b) || b == b'>' {
                        return Some(Attribute::Pair { name, value });
                    }
                    value.push(b.to_ascii_lowercase());
                    self.pos += 1;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Byte helpers
// ---------------------------------------------------------------------------

/// HTML whitespace as far as the prescan is concerned: TAB, LF, FF, CR,
/// SPACE.
fn is_space(b: u8) -> bool {
    matches!(b, 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

/// `<` or `</` followed by an ASCII letter.
fn is_tag_open(rest: &[u8]) -> bool {
    let after = if rest.starts_with(b"</") { rest.get(2) } else { rest.get(1) };
    rest.first() == Some(&b'<') && after.is_some_and(u8::is_ascii_alphabetic)
}

fn starts_with_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .get(..needle.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(needle))
}

fn find(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| from + i)
}

fn find_ignore_ascii_case(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|i| from + i)
}

fn skip_spaces(bytes: &[u8], mut pos: usize) -> usize {
    while bytes.get(pos).copied().is_some_and(is_space) {
        pos += 1;
    }
    pos
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
