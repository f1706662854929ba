//! Integration tests for charsniff -- serves pages from a local wiremock
//! `MockServer`, fetches them with reqwest, and resolves the real response
//! headers and body.

#![expect(clippy::tests_outside_test_module)]

use charsniff::{Confidence, Sniffer, Source, StringEncoding};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A minimal tracing subscriber that accepts every event/span but discards
/// all output, so field expressions inside the crate's log calls are
/// evaluated.
#[cfg(feature = "tracing")]
struct SinkSubscriber;

#[cfg(feature = "tracing")]
impl tracing::Subscriber for SinkSubscriber {
    fn enabled(&self, _: &tracing::Metadata<'_>) -> bool {
        true
    }
    fn new_span(&self, _: &tracing::span::Attributes<'_>) -> tracing::span::Id {
        tracing::span::Id::from_u64(1)
    }
    fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}
    fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}
    fn event(&self, _: &tracing::Event<'_>) {}
    fn enter(&self, _: &tracing::span::Id) {}
    fn exit(&self, _: &tracing::span::Id) {}
}

/// Helper: mount a GET mock serving `body` with an optional `Content-Type`.
async fn mock_page(path_str: &str, body: &[u8], content_type: Option<&str>) -> MockServer {
    let server = MockServer::start().await;
    let resp = match content_type {
        Some(mime) => ResponseTemplate::new(200).set_body_raw(body.to_vec(), mime),
        None => ResponseTemplate::new(200).set_body_bytes(body.to_vec()),
    };
    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(resp)
        .expect(1)
        .mount(&server)
        .await;
    server
}

/// Helper: fetch `path_str` and resolve it with `sniffer`.
async fn fetch_and_resolve(
    server: &MockServer,
    path_str: &str,
    sniffer: &Sniffer,
) -> charsniff::Result<charsniff::Decoded> {
    let resp = reqwest::get(format!("{}{path_str}", server.uri()))
        .await
        .expect("request should succeed");
    let headers = resp.headers().clone();
    let body = resp.bytes().await.expect("body read should succeed");
    sniffer.resolve_with_headers(&body, &headers)
}

fn enc(label: &str) -> StringEncoding {
    StringEncoding::for_label(label).expect("known label")
}

// -----------------------------------------------------------------------
// Resolution over HTTP
// -----------------------------------------------------------------------

/// Each case: body, Content-Type, expected encoding, confidence, source,
/// expected text, description.
type PageCase = (
    &'static [u8],
    Option<&'static str>,
    &'static str,
    Confidence,
    Source,
    &'static str,
    &'static str,
);

#[tokio::test]
async fn resolve_served_pages() {
    let cases: &[PageCase] = &[
        (
            b"\xEF\xBB\xBFcaf\xC3\xA9",
            Some("text/html; charset=windows-1252"),
            "utf-8",
            Confidence::Certain,
            Source::Bom,
            "caf\u{E9}",
            "BOM beats header",
        ),
        (
            b"\xFF\xFE<\x00p\x00>\x00",
            Some("text/html; charset=utf-8"),
            "utf-16le",
            Confidence::Certain,
            Source::Bom,
            "<p>",
            "UTF-16LE BOM",
        ),
        (
            b"<p>caf\xE9</p>",
            Some("text/html; charset=ISO-8859-1"),
            "windows-1252",
            Confidence::Tentative,
            Source::TransportLayer,
            "<p>caf\u{E9}</p>",
            "latin1 header",
        ),
        (
            b"<meta charset=\"utf-8\"><p>\xE2\x98\x83</p>",
            Some("text/html"),
            "utf-8",
            Confidence::Certain,
            Source::MetaPrescan,
            "<meta charset=\"utf-8\"><p>\u{2603}</p>",
            "meta charset",
        ),
        (
            b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=shift_jis\">\x82\xA0",
            Some("text/html; charset=windows-1252"),
            "shift_jis",
            Confidence::Certain,
            Source::MetaPrescan,
            "<meta http-equiv=\"Content-Type\" content=\"text/html; charset=shift_jis\">\u{3042}",
            "http-equiv beats header",
        ),
        (
            b"<p>caf\xE9</p>",
            None,
            "windows-1252",
            Confidence::Tentative,
            Source::Default,
            "<p>caf\u{E9}</p>",
            "nothing declared",
        ),
    ];

    let sniffer = Sniffer::new();
    for (i, &(body, content_type, label, confidence, source, text, desc)) in cases.iter().enumerate() {
        let path_str = format!("/page/{i}");
        let server = mock_page(&path_str, body, content_type).await;
        let decoded = fetch_and_resolve(&server, &path_str, &sniffer)
            .await
            .unwrap_or_else(|e| panic!("{desc}: {e}"));

        let decision = decoded.decision();
        assert_eq!(decision.encoding(), enc(label), "{desc}: encoding");
        assert_eq!(decision.confidence(), confidence, "{desc}: confidence");
        assert_eq!(decision.source(), source, "{desc}: source");
        assert_eq!(decoded.text(), text, "{desc}: text");
    }
}

/// A malformed body is reported with the encoding and offset, and can be
/// retried leniently.
#[tokio::test]
async fn malformed_body_over_http() {
    let body: &[u8] = b"<meta charset=utf-8><p>\xC3(</p>";
    let server = mock_page("/bad", body, Some("text/html")).await;

    let resp = reqwest::get(format!("{}/bad", server.uri()))
        .await
        .expect("request should succeed");
    let headers = resp.headers().clone();
    let bytes = resp.bytes().await.expect("body read should succeed");

    let err = Sniffer::new()
        .resolve_with_headers(&bytes, &headers)
        .expect_err("strict decode should fail");
    assert!(err.is_decode());
    assert_eq!(err.encoding(), Some(StringEncoding::UTF_8));
    assert_eq!(err.offset(), Some(23));

    let lenient = Sniffer::builder()
        .replace_malformed(true)
        .build()
        .expect("builder");
    let decoded = lenient
        .resolve_with_headers(&bytes, &headers)
        .expect("lenient decode");
    assert_eq!(decoded.text(), "<meta charset=utf-8><p>\u{FFFD}(</p>");
}

/// The same page resolved concurrently by clones of one sniffer yields the
/// same result every time.
#[tokio::test]
async fn concurrent_resolution_is_consistent() {
    let body: &[u8] = b"<html><head><meta charset=koi8-r></head><body>\xF0\xD2\xC9</body>";
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/koi8"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), "text/html"))
        .expect(8)
        .mount(&server)
        .await;

    let sniffer = Sniffer::new();
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let sniffer = sniffer.clone();
        let url = format!("{}/koi8", server.uri());
        tasks.push(tokio::spawn(async move {
            let resp = reqwest::get(url).await.expect("request should succeed");
            let headers = resp.headers().clone();
            let bytes = resp.bytes().await.expect("body read should succeed");
            sniffer.resolve_with_headers(&bytes, &headers).expect("resolve")
        }));
    }

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.expect("task should not panic"));
    }
    for decoded in &results {
        assert_eq!(decoded, &results[0]);
        assert_eq!(decoded.encoding(), enc("koi8-r"));
        assert!(decoded.text().ends_with("<body>\u{41F}\u{440}\u{438}</body>"));
    }
}

/// Run full resolutions under a sink subscriber so every log call site in
/// the crate evaluates its fields.
#[cfg(feature = "tracing")]
#[test]
fn resolution_with_tracing_subscriber() {
    let _guard = tracing::subscriber::set_default(SinkSubscriber);

    let sniffer = Sniffer::builder()
        .replace_malformed(true)
        .build()
        .expect("builder");
    for (bytes, content_type) in [
        (&b"\xFE\xFF\x00a"[..], None),
        (&b"<meta charset=gbk>"[..], Some("text/html; charset=utf-16le")),
        (&b"<p>\x81</p>"[..], Some("text/html; charset=windows-1252")),
    ] {
        sniffer.resolve(bytes, content_type).expect("resolve");
    }

    let decision = sniffer.sniff(b"<p>x</p>", None);
    assert!(matches!(
        decision.change_to(enc("euc-jp")),
        charsniff::EncodingChange::Reparse(_)
    ));
}
