//! Query string encoding shared by the S3 URL and keeper URI codecs.
//!
//! Parsing yields every `name=value` pair in order of appearance. How repeated
//! names collapse is decided by each consumer, not here.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters left unescaped when stringifying (the `encodeURIComponent` set).
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Parse a query string (without the leading `?`) into ordered pairs.
///
/// Empty segments are skipped, a segment without `=` yields an empty value,
/// `+` decodes to a space and invalid UTF-8 is replaced lossily.
pub fn parse_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((name, value)) => (decode_component(name), decode_component(value)),
            None => (decode_component(segment), String::new()),
        })
        .collect()
}

/// Stringify pairs as `name=value` joined by `&`.
pub fn stringify_pairs<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| format!("{}={}", encode_component(name), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-decode one query component.
pub fn decode_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Percent-encode one query component.
pub fn encode_component(component: &str) -> String {
    utf8_percent_encode(component, QUERY_COMPONENT).to_string()
}
