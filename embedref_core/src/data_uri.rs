//! `data:` URI decoding and encoding.
//!
//! Grammar accepted by [`decode`]:
//!
//! ```text
//! data:[<type>/<subtype>][;<name>=<value>]*[;base64],<payload>
//! ```

use crate::error::{Error, Result};
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{Engine, alphabet};
use percent_encoding::percent_decode_str;

/// Scheme tag every data URI starts with.
pub const SCHEME: &str = "data:";

/// Mimetype assumed when a data URI declares none.
pub const DEFAULT_MIMETYPE: &str = "text/plain";

/// Charset assumed when a data URI declares no mimetype and no charset.
pub const DEFAULT_CHARSET: &str = "US-ASCII";

/// Mimetype used by [`encode`] when the caller provides none.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Accepts unpadded input and non-zero trailing bits, like Node's decoder.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

const STANDARD: GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Decoded bytes plus their media type metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// Raw payload.
    pub data: Vec<u8>,
    /// `type/subtype`, without parameters.
    pub mimetype: String,
    /// Value of the `charset` parameter, if any.
    pub charset: Option<String>,
    /// Mimetype followed by all of its parameters.
    pub mediatype: String,
}

impl DataUri {
    /// Wrap bytes with a mimetype and no parameters.
    pub fn new(data: impl Into<Vec<u8>>, mimetype: impl Into<String>) -> Self {
        let mimetype = mimetype.into();
        Self {
            data: data.into(),
            mediatype: mimetype.clone(),
            mimetype,
            charset: None,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Encode back into a base64 data URI using this value's mimetype.
    pub fn to_data_uri(&self) -> String {
        encode(&self.data, Some(&self.mimetype))
    }
}

/// Decode a data URI into its payload and media type.
pub fn decode(uri: &str) -> Result<DataUri> {
    let rest = uri
        .strip_prefix(SCHEME)
        .ok_or_else(|| Error::invalid_data_uri("missing data: scheme"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::invalid_data_uri("missing ',' before payload"))?;

    let mut parts: Vec<&str> = meta.split(';').collect();
    let is_base64 = parts.len() > 1
        && parts
            .last()
            .is_some_and(|last| last.eq_ignore_ascii_case("base64"));
    if is_base64 {
        parts.pop();
    }

    let declared = parts[0].trim();
    if !declared.is_empty() && !is_mimetype(declared) {
        return Err(Error::invalid_data_uri(format!(
            "invalid mimetype: {}",
            declared
        )));
    }

    let mut params = Vec::with_capacity(parts.len().saturating_sub(1));
    let mut charset = None;
    for param in &parts[1..] {
        let (name, value) = param
            .split_once('=')
            .ok_or_else(|| Error::invalid_data_uri(format!("invalid parameter: {}", param)))?;
        if name.eq_ignore_ascii_case("charset") {
            charset = Some(value.to_string());
        }
        params.push(*param);
    }

    let mimetype = if declared.is_empty() {
        if charset.is_none() {
            charset = Some(DEFAULT_CHARSET.to_string());
            params.push("charset=US-ASCII");
        }
        DEFAULT_MIMETYPE.to_string()
    } else {
        declared.to_string()
    };

    let mediatype = std::iter::once(mimetype.as_str())
        .chain(params.iter().copied())
        .collect::<Vec<_>>()
        .join(";");

    let data = if is_base64 {
        let compact: String = payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        LENIENT
            .decode(compact.as_bytes())
            .map_err(|e| Error::invalid_data_uri(format!("invalid base64 payload: {}", e)))?
    } else {
        percent_decode_str(payload).collect()
    };

    Ok(DataUri {
        data,
        mimetype,
        charset,
        mediatype,
    })
}

/// Encode bytes as a base64 data URI.
pub fn encode(data: &[u8], mimetype: Option<&str>) -> String {
    let mimetype = mimetype.filter(|m| !m.is_empty()).unwrap_or(OCTET_STREAM);
    format!("{}{};base64,{}", SCHEME, mimetype, STANDARD.encode(data))
}

fn is_mimetype(s: &str) -> bool {
    match s.split_once('/') {
        Some((kind, subtype)) => {
            !kind.is_empty()
                && !subtype.is_empty()
                && !subtype.contains('/')
                && !s.chars().any(|c| c.is_whitespace() || c.is_control())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_default_mimetype() {
        assert_eq!(
            encode(&[0u8], None),
            "data:application/octet-stream;base64,AA=="
        );
    }

    #[test]
    fn test_decode_single_zero_byte() {
        let decoded = decode("data:application/octet-stream;base64,AA==").unwrap();
        assert_eq!(decoded.data, vec![0u8]);
        assert_eq!(decoded.mimetype, "application/octet-stream");
        assert_eq!(decoded.charset, None);
    }

    #[test]
    fn test_decode_unpadded_jpeg_header() {
        let decoded = decode("data:image/jpeg;base64,/9j/4AAQSkZJRgABAQAAAQABAAD").unwrap();
        assert_eq!(
            hex::encode(&decoded.data),
            "ffd8ffe000104a46494600010100000100010000"
        );
        assert_eq!(decoded.mimetype, "image/jpeg");
        assert_eq!(decoded.mediatype, "image/jpeg");
    }

    #[test]
    fn test_decode_plain_text_defaults() {
        let decoded = decode("data:,Hello%2C%20World!").unwrap();
        assert_eq!(decoded.data, b"Hello, World!");
        assert_eq!(decoded.mimetype, "text/plain");
        assert_eq!(decoded.charset.as_deref(), Some("US-ASCII"));
        assert_eq!(decoded.mediatype, "text/plain;charset=US-ASCII");
    }

    #[test]
    fn test_decode_charset_parameter() {
        let decoded = decode("data:text/html;charset=utf-8;base64,PGI+aGk8L2I+").unwrap();
        assert_eq!(decoded.data, b"<b>hi</b>");
        assert_eq!(decoded.mimetype, "text/html");
        assert_eq!(decoded.charset.as_deref(), Some("utf-8"));
        assert_eq!(decoded.mediatype, "text/html;charset=utf-8");
    }

    #[test]
    fn test_decode_ignores_whitespace_in_base64() {
        let decoded = decode("data:foo/bar;base64,YW Jj\nZA==").unwrap();
        assert_eq!(decoded.data, b"abcd");
    }

    #[test]
    fn test_decode_malformed() {
        assert!(decode("data:").is_err());
        assert!(decode("data:image/jpeg;base64").is_err());
        assert!(decode("hello").is_err());
        assert!(decode("data:image/jpeg;base64,!!!!").is_err());
        assert!(decode("data:image/jpeg;nonsense,abc").is_err());
        assert!(decode("data:notamimetype,abc").is_err());
    }

    #[test]
    fn test_base64_keyword_alone_is_not_a_flag() {
        // "base64" in the mimetype slot is not a type/subtype
        assert!(decode("data:base64,AA==").is_err());
    }

    #[test]
    fn test_to_data_uri() {
        let value = DataUri::new(b"a".to_vec(), "foo/bar");
        assert_eq!(value.to_data_uri(), "data:foo/bar;base64,YQ==");
        assert_eq!(value.len(), 1);
        assert!(!value.is_empty());
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Decoding an encoded buffer yields the same bytes and mimetype
        #[test]
        fn prop_encode_decode(
            data: Vec<u8>,
            mimetype in "[a-z]{1,10}/[a-z0-9.+-]{1,16}"
        ) {
            let decoded = decode(&encode(&data, Some(&mimetype)))?;
            prop_assert_eq!(decoded.data, data);
            prop_assert_eq!(decoded.mimetype, mimetype);
        }
    }
}
