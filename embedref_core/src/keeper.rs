//! Keeper URIs: content-addressed, location-independent references.
//!
//! Form: `tradle-keeper://<hash>[/]?<query>`. The query carries arbitrary
//! attributes such as the mimetype or hash algorithm.

use crate::query;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::trace;

/// Scheme tag, including the authority slashes.
pub const KEEPER_SCHEME: &str = "tradle-keeper://";

/// Value of the `type` field of every parsed keeper URI.
pub const KEEPER_TYPE: &str = "tradle-keeper";

/// Attribute names taken by the fixed fields.
const RESERVED_ATTRIBUTES: [&str; 2] = ["type", "hash"];

/// A parsed keeper URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeeperUri {
    /// Always [`KEEPER_TYPE`].
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Lower-cased content hash.
    pub hash: String,
    /// Extra attributes from the query string.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

impl KeeperUri {
    /// Create a keeper URI without attributes.
    pub fn new(hash: impl AsRef<str>) -> Self {
        Self {
            kind: KEEPER_TYPE,
            hash: hash.as_ref().to_lowercase(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute. `type` and `hash` name the fixed fields and are ignored.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if !is_reserved(&name) {
            self.attributes.insert(name, value.into());
        }
        self
    }

    /// Look up an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED_ATTRIBUTES.contains(&name)
}

/// Whether the string uses the keeper scheme.
pub fn is_keeper_uri(uri: &str) -> bool {
    uri.starts_with(KEEPER_SCHEME)
}

/// Parse a keeper URI.
///
/// The hash is sliced out by position rather than parsed as a URL host. Only
/// the text between the first and second `?` is read as the query. For
/// repeated query names only the first value is kept, and `type` / `hash`
/// attributes are dropped so they cannot shadow the fixed fields.
pub fn parse_keeper_uri(uri: &str) -> Option<KeeperUri> {
    let rest = uri.strip_prefix(KEEPER_SCHEME)?;
    let rest = rest.replacen("/?", "?", 1);
    let mut parts = rest.split('?');
    let hash = parts.next().unwrap_or_default();
    let raw_query = parts.next().unwrap_or_default();

    let mut keeper = KeeperUri::new(hash);
    for (name, value) in query::parse_pairs(raw_query) {
        if is_reserved(&name) {
            trace!(name = %name, "ignoring reserved keeper attribute");
            continue;
        }
        keeper.attributes.entry(name).or_insert(value);
    }
    Some(keeper)
}

/// Build the canonical string form of a keeper URI.
pub fn build_keeper_uri(keeper: &KeeperUri) -> String {
    let qs = query::stringify_pairs(
        keeper
            .attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str())),
    );
    format!("{}{}/?{}", KEEPER_SCHEME, keeper.hash.to_lowercase(), qs)
}
