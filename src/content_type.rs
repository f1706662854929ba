//! `Content-Type` charset extraction.
//!
//! The transport layer's charset is a hint, not a fact: the resolver
//! records it as [`Tentative`](crate::Confidence::Tentative) and lets an
//! in-document `<meta>` declaration overrule it. Anything malformed here is
//! simply "no signal".

use crate::encoding::StringEncoding;

/// A parsed `Content-Type` header value: media type plus parameters.
///
/// ```text
/// text/html; charset=utf-8          -> text/html, charset=utf-8
/// Text/HTML;Charset="ISO-8859-1"    -> text/html, charset=ISO-8859-1
/// application/json                  -> application/json, no parameters
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypeHeader {
    media_type: String,
    /// Lowercased names, values as written (quotes removed). First wins.
    params: Vec<(String, String)>,
}

impl ContentTypeHeader {
    /// Parse a header value.
    ///
    /// Returns `None` when the value has no `type/subtype` media type.
    /// Malformed parameters (no `=`, empty name, empty value) are skipped;
    /// when a parameter name repeats, the first occurrence is kept.
    pub fn parse(value: &str) -> Option<ContentTypeHeader> {
        let (essence, mut rest) = match value.split_once(';') {
            Some((essence, rest)) => (essence, rest),
            None => (value, ""),
        };

        let essence = trim_http_whitespace(essence);
        let (kind, subtype) = essence.split_once('/')?;
        if !is_token(kind) || !is_token(subtype) {
            return None;
        }
        let media_type = essence.to_ascii_lowercase();

        let mut params: Vec<(String, String)> = Vec::new();
        while !rest.is_empty() {
            let (param, tail) = next_parameter(rest);
            rest = tail;
            let Some((name, value)) = param else { continue };
            if !params.iter().any(|(existing, _)| *existing == name) {
                params.push((name, value));
            }
        }

        Some(ContentTypeHeader { media_type, params })
    }

    /// The lowercased `type/subtype`, e.g. `"text/html"`.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Value of parameter `name` (matched ASCII case-insensitively).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The raw `charset` parameter, if any.
    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }

    /// The `charset` parameter resolved to an encoding. Unrecognised labels
    /// yield `None`.
    pub fn encoding(&self) -> Option<StringEncoding> {
        StringEncoding::for_label(self.charset()?)
    }
}

/// Resolve the `charset` of a raw `Content-Type` header value.
pub fn charset_from_content_type(value: &str) -> Option<StringEncoding> {
    let encoding = ContentTypeHeader::parse(value)?.encoding();
    trace!(content_type = value, charset = ?encoding, "content-type charset");
    encoding
}

/// Resolve the `charset` of the `Content-Type` header in `headers`.
///
/// Values that are not visible ASCII are ignored.
pub fn charset_from_headers(headers: &http::HeaderMap) -> Option<StringEncoding> {
    let value = headers.get(http::header::CONTENT_TYPE)?.to_str().ok()?;
    charset_from_content_type(value)
}

// ---------------------------------------------------------------------------
// Parameter scanning
// ---------------------------------------------------------------------------

/// Read one `name=value` parameter from `input` (positioned just after a
/// `;`). Returns the parameter, if well-formed, and the input following the
/// parameter's terminating `;`.
fn next_parameter(input: &str) -> (Option<(String, String)>, &str) {
    let input = trim_http_whitespace_start(input);

    let name_end = input.find([';', '=']).unwrap_or(input.len());
    let name = trim_http_whitespace(input.get(..name_end).unwrap_or_default());
    let rest = input.get(name_end..).unwrap_or_default();

    let Some(rest) = rest.strip_prefix('=') else {
        // No `=`: skip past the `;` (if any).
        return (None, rest.strip_prefix(';').unwrap_or(rest));
    };
    let rest = trim_http_whitespace_start(rest);

    let (value, rest) = if let Some(quoted) = rest.strip_prefix('"') {
        let (value, after) = read_quoted(quoted);
        // Anything between the closing quote and the next `;` is ignored.
        let skip = after.find(';').map_or(after.len(), |i| i + 1);
        (value, after.get(skip..).unwrap_or_default())
    } else {
        let end = rest.find(';').unwrap_or(rest.len());
        let value = trim_http_whitespace(rest.get(..end).unwrap_or_default()).to_owned();
        let skip = if end < rest.len() { end + 1 } else { end };
        (value, rest.get(skip..).unwrap_or_default())
    };

    if name.is_empty() || !is_token(name) || value.is_empty() {
        return (None, rest);
    }
    (Some((name.to_ascii_lowercase(), value)), rest)
}

/// Read a quoted-string body (opening quote already consumed). Backslash
/// escapes the next character. An unterminated string runs to the end.
fn read_quoted(input: &str) -> (String, &str) {
    let mut value = String::new();
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return (value, input.get(i + 1..).unwrap_or_default()),
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => value.push('\\'),
            },
            _ => value.push(c),
        }
    }
    (value, "")
}

/// RFC 9110 token characters.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

fn is_http_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn trim_http_whitespace(s: &str) -> &str {
    s.trim_matches(is_http_whitespace)
}

fn trim_http_whitespace_start(s: &str) -> &str {
    s.trim_start_matches(is_http_whitespace)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_media_type_table() {
        let cases: &[(&str, Option<&str>, &str)] = &[
            ("text/html", Some("text/html"), "bare"),
            ("Text/HTML; charset=utf-8", Some("text/html"), "lowercased"),
            ("  text/plain  ;", Some("text/plain"), "whitespace and empty param list"),
            ("application/xhtml+xml", Some("application/xhtml+xml"), "plus in subtype"),
            ("", None, "empty"),
            ("text", None, "no subtype"),
            ("text/", None, "empty subtype"),
            ("/html", None, "empty type"),
            ("text html/x", None, "space in type"),
            ("; charset=utf-8", None, "parameters only"),
        ];

        for &(value, expected, desc) in cases {
            let parsed = ContentTypeHeader::parse(value);
            assert_eq!(parsed.as_ref().map(ContentTypeHeader::media_type), expected, "{desc}");
        }
    }

    #[test]
    fn charset_param_table() {
        let cases: &[(&str, Option<&str>, &str)] = &[
            ("text/html; charset=utf-8", Some("utf-8"), "plain charset"),
            ("text/html; charset=\"UTF-8\"", Some("UTF-8"), "quoted charset"),
            ("text/html;charset=latin1", Some("latin1"), "no space"),
            ("text/html; CHARSET=Shift_JIS", Some("Shift_JIS"), "uppercase name"),
            ("text/html; charset = utf-8", Some("utf-8"), "space around equals"),
            ("text/html; charset=\"a\\\"b\"", Some("a\"b"), "escaped quote"),
            ("text/html; charset=\"utf-8", Some("utf-8"), "unterminated quote"),
            ("text/html; charset=\"utf-8\" junk; x=y", Some("utf-8"), "junk after quote"),
            ("text/html; charset=koi8-r; charset=utf-8", Some("koi8-r"), "first charset wins"),
            ("text/html; q=1; charset=euc-kr", Some("euc-kr"), "charset after other param"),
            ("text/html; foo; charset=gbk", Some("gbk"), "valueless param skipped"),
            ("application/json", None, "no charset param"),
            ("text/html; charset=", None, "empty charset value"),
            ("text/html; charset=\"\"", None, "empty quoted charset value"),
            ("text/html; xcharset=utf-8", None, "name must match exactly"),
        ];

        for &(value, expected, desc) in cases {
            let parsed = ContentTypeHeader::parse(value).unwrap_or_else(|| panic!("{desc}"));
            assert_eq!(parsed.charset(), expected, "{desc}");
        }
    }

    #[test]
    fn param_lookup_is_case_insensitive() {
        let parsed = ContentTypeHeader::parse("text/html; Boundary=XyZ").unwrap();
        assert_eq!(parsed.param("boundary"), Some("XyZ"));
        assert_eq!(parsed.param("BOUNDARY"), Some("XyZ"));
        assert_eq!(parsed.param("charset"), None);
    }

    #[test]
    fn charset_from_content_type_table() {
        let cases: &[(&str, Option<StringEncoding>, &str)] = &[
            ("text/html; charset=utf-8", Some(StringEncoding::UTF_8), "utf-8"),
            ("text/html; charset=ISO-8859-1", Some(StringEncoding::WINDOWS_1252), "latin1 alias"),
            ("text/html; charset=\"utf-16\"", Some(StringEncoding::UTF_16LE), "utf-16"),
            ("text/html; charset=utf-7", None, "unsupported label"),
            ("text/html; charset=\u{00FC}tf-8", None, "non-ASCII label"),
            ("text/html", None, "no charset"),
            ("garbage", None, "malformed header"),
        ];

        for &(value, expected, desc) in cases {
            assert_eq!(charset_from_content_type(value), expected, "{desc}");
        }
    }

    #[test]
    fn charset_from_headers_table() {
        let cases: &[(&str, Option<StringEncoding>, &str)] = &[
            ("text/html; charset=windows-1252", Some(StringEncoding::WINDOWS_1252), "plain"),
            ("text/html; charset=\"UTF-8\"", Some(StringEncoding::UTF_8), "quoted"),
            ("application/json", None, "no charset"),
        ];

        for &(value, expected, desc) in cases {
            let mut headers = http::HeaderMap::new();
            headers.insert(http::header::CONTENT_TYPE, value.parse().expect("valid"));
            assert_eq!(charset_from_headers(&headers), expected, "{desc}");
        }
    }

    #[test]
    fn charset_from_headers_missing_or_opaque() {
        let headers = http::HeaderMap::new();
        assert_eq!(charset_from_headers(&headers), None);

        let mut headers = http::HeaderMap::new();
        let opaque = http::HeaderValue::from_bytes(b"text/html; charset=\xFCtf-8").expect("opaque");
        headers.insert(http::header::CONTENT_TYPE, opaque);
        assert_eq!(charset_from_headers(&headers), None);
    }
}
