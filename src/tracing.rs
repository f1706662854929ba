//! Internal logging shims.
//!
//! With the `tracing` feature the macros forward to [`tracing`]; without it
//! they expand to nothing, so the sniffing stages log unconditionally and
//! never carry `#[cfg]` annotations of their own.

// Only one side of each cfg pair is active at a time.
#![allow(unused_macros)]

// ---- feature = "tracing" ----

#[cfg(feature = "tracing")]
macro_rules! trace {
    ($($tt:tt)*) => { tracing::trace!($($tt)*) }
}

#[cfg(feature = "tracing")]
macro_rules! debug {
    ($($tt:tt)*) => { tracing::debug!($($tt)*) }
}

#[cfg(feature = "tracing")]
macro_rules! warn {
    ($($tt:tt)*) => { tracing::warn!($($tt)*) }
}

// ---- not(feature = "tracing") ----

#[cfg(not(feature = "tracing"))]
macro_rules! trace {
    ($($tt:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($tt:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn {
    ($($tt:tt)*) => {};
}

// ---------------------------------------------------------------------------
// Test-only: a subscriber that accepts everything and records nothing, so
// the field expressions inside trace!/debug!/warn! actually get evaluated.
// ---------------------------------------------------------------------------

#[cfg(all(test, feature = "tracing"))]
pub(crate) struct SinkSubscriber;

#[cfg(all(test, feature = "tracing"))]
impl ::tracing::Subscriber for SinkSubscriber {
    fn enabled(&self, _: &::tracing::Metadata<'_>) -> bool {
        true
    }
    fn new_span(&self, _: &::tracing::span::Attributes<'_>) -> ::tracing::span::Id {
        ::tracing::span::Id::from_u64(1)
    }
    fn record(&self, _: &::tracing::span::Id, _: &::tracing::span::Record<'_>) {}
    fn record_follows_from(&self, _: &::tracing::span::Id, _: &::tracing::span::Id) {}
    fn event(&self, _: &::tracing::Event<'_>) {}
    fn enter(&self, _: &::tracing::span::Id) {}
    fn exit(&self, _: &::tracing::span::Id) {}
}

/// Run every logging call site of a full resolution (BOM, transport,
/// prescan, default, decode fallback) under the sink subscriber.
#[cfg(all(test, feature = "tracing"))]
#[test]
fn resolution_logs_under_sink_subscriber() {
    let _guard = ::tracing::subscriber::set_default(SinkSubscriber);

    let sniffer = crate::Sniffer::builder()
        .replace_malformed(true)
        .build()
        .expect("default sniffer");
    let inputs: &[(&[u8], Option<&str>)] = &[
        (b"\xEF\xBB\xBFbom", None),
        (b"<p>plain", Some("text/html; charset=iso-8859-2")),
        (b"<meta charset=koi8-r>", None),
        (b"<p>nothing declared", None),
        (b"<meta charset=utf-8>\xFF", None),
        (b"", None),
    ];
    for &(bytes, content_type) in inputs {
        let decoded = sniffer.resolve(bytes, content_type).expect("resolve");
        assert!(decoded.text().len() <= bytes.len() * 3);
    }
}
