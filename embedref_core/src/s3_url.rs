//! S3 URL parsing.
//!
//! Both virtual-hosted (`https://<bucket>.s3[-region].amazonaws.com/<key>`) and
//! path-style (`https://<host>/<bucket>/<key>`) URLs are recognized.

use crate::query;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static VIRTUAL_HOSTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?|s3)://([^.]+)\.s3.*?\.amazonaws.com/([^?]*)")
        .expect("virtual-hosted S3 pattern is valid")
});

/// A query parameter value. Repeated parameters keep every value in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// The parameter appeared once.
    Single(String),
    /// The parameter appeared more than once.
    Multi(Vec<String>),
}

impl QueryValue {
    /// First value of the parameter.
    pub fn first(&self) -> &str {
        match self {
            QueryValue::Single(value) => value,
            QueryValue::Multi(values) => values.first().map(String::as_str).unwrap_or_default(),
        }
    }

    /// All values of the parameter.
    pub fn values(&self) -> &[String] {
        match self {
            QueryValue::Single(value) => std::slice::from_ref(value),
            QueryValue::Multi(values) => values,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(first) => {
                *self = QueryValue::Multi(vec![std::mem::take(first), value]);
            }
            QueryValue::Multi(values) => values.push(value),
        }
    }
}

/// Query parameters of an S3 URL.
pub type Query = BTreeMap<String, QueryValue>;

/// A parsed S3 object URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct S3Location {
    /// The URL as given.
    pub url: String,
    /// Query parameters.
    pub query: Query,
    /// Host including port, if the URL has an authority.
    pub host: Option<String>,
    /// Bucket name.
    pub bucket: String,
    /// Object key, not percent-decoded.
    pub key: String,
    /// Whether the query carries a request signature.
    pub presigned: bool,
}

/// Parse an `http:`/`https:` S3 object URL.
///
/// Returns `None` for other schemes and for path-style URLs without a key.
pub fn parse_s3_url(url: &str) -> Option<S3Location> {
    let rest = url
        .strip_prefix("https:")
        .or_else(|| url.strip_prefix("http:"))?;

    let rest = rest.split('#').next().unwrap_or_default();
    let (before_query, raw_query) = rest.split_once('?').unwrap_or((rest, ""));

    let (host, pathname) = match before_query.strip_prefix("//") {
        Some(authority_and_path) => {
            let (authority, pathname) = match authority_and_path.find('/') {
                Some(i) => authority_and_path.split_at(i),
                None => (authority_and_path, ""),
            };
            let host = authority
                .rsplit('@')
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase();
            (Some(host).filter(|h| !h.is_empty()), pathname)
        }
        None => (None, before_query),
    };

    let query = parse_query(raw_query);
    let presigned = query
        .keys()
        .any(|name| name.eq_ignore_ascii_case("signature") || name.eq_ignore_ascii_case("x-amz-signature"));

    let (bucket, key) = match VIRTUAL_HOSTED.captures(url) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => {
            let trimmed = pathname.strip_prefix('/').unwrap_or(pathname);
            let (bucket, key) = trimmed.split_once('/')?;
            if bucket.is_empty() || key.is_empty() {
                return None;
            }
            (bucket.to_string(), key.to_string())
        }
    };

    Some(S3Location {
        url: url.to_string(),
        query,
        host,
        bucket,
        key,
        presigned,
    })
}

/// Parse a query string, collecting repeated names into [`QueryValue::Multi`].
pub fn parse_query(raw: &str) -> Query {
    let mut query = Query::new();
    for (name, value) in query::parse_pairs(raw) {
        match query.get_mut(&name) {
            Some(existing) => existing.push(value),
            None => {
                query.insert(name, QueryValue::Single(value));
            }
        }
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_style_with_repeated_query() {
        let url = "https://foo/bar/baz/bak?q=hello&q=world";
        let parsed = parse_s3_url(url).unwrap();
        assert_eq!(parsed.url, url);
        assert_eq!(parsed.host.as_deref(), Some("foo"));
        assert_eq!(parsed.bucket, "bar");
        assert_eq!(parsed.key, "baz/bak");
        assert!(!parsed.presigned);
        assert_eq!(
            parsed.query.get("q"),
            Some(&QueryValue::Multi(vec!["hello".into(), "world".into()]))
        );
    }

    #[test]
    fn test_path_style_missing_key() {
        assert_eq!(parse_s3_url("https://foo/bar/"), None);
        assert_eq!(parse_s3_url("https://foo/bar"), None);
        assert_eq!(parse_s3_url("https://foo"), None);
    }

    #[test]
    fn test_non_http_schemes() {
        assert_eq!(parse_s3_url("s3://bucket.s3.amazonaws.com/key"), None);
        assert_eq!(parse_s3_url("ftp://foo/bar/baz"), None);
        assert_eq!(parse_s3_url("HTTPS://foo/bar/baz"), None);
        assert_eq!(parse_s3_url(""), None);
    }

    #[test]
    fn test_virtual_hosted() {
        let parsed = parse_s3_url("https://mybucket.s3.amazonaws.com/mykeyprefixabc").unwrap();
        assert_eq!(parsed.bucket, "mybucket");
        assert_eq!(parsed.key, "mykeyprefixabc");
        assert_eq!(parsed.host.as_deref(), Some("mybucket.s3.amazonaws.com"));
        assert!(parsed.query.is_empty());
    }

    #[test]
    fn test_virtual_hosted_regional() {
        let parsed = parse_s3_url("https://b.s3-us-west-2.amazonaws.com/a/b/c").unwrap();
        assert_eq!(parsed.bucket, "b");
        assert_eq!(parsed.key, "a/b/c");
    }

    #[test]
    fn test_dotted_bucket_falls_back_to_path() {
        // the virtual-hosted pattern does not allow dots in the bucket
        let parsed = parse_s3_url("https://abc.def.s3.amazonaws.com/bloob/x").unwrap();
        assert_eq!(parsed.bucket, "bloob");
        assert_eq!(parsed.key, "x");
    }

    #[test]
    fn test_presigned_query() {
        let parsed = parse_s3_url(
            "https://mybucket.s3.amazonaws.com/key?AWSAccessKeyId=a&Expires=b&Signature=c",
        )
        .unwrap();
        assert!(parsed.presigned);
        assert_eq!(parsed.key, "key");
        assert_eq!(parsed.query.len(), 3);
        assert_eq!(parsed.query["Signature"], QueryValue::Single("c".into()));

        let v4 = parse_s3_url("http://localhost:4572/b/k?X-Amz-Signature=abc").unwrap();
        assert!(v4.presigned);
        assert_eq!(v4.host.as_deref(), Some("localhost:4572"));
    }

    #[test]
    fn test_fragment_and_userinfo() {
        let parsed = parse_s3_url("http://user:pw@Example.COM/b/k#frag").unwrap();
        assert_eq!(parsed.host.as_deref(), Some("example.com"));
        assert_eq!(parsed.bucket, "b");
        assert_eq!(parsed.key, "k");
    }

    #[test]
    fn test_query_value_accessors() {
        let single = QueryValue::Single("a".into());
        assert_eq!(single.first(), "a");
        assert_eq!(single.values(), ["a".to_string()]);
        let multi = QueryValue::Multi(vec!["a".into(), "b".into()]);
        assert_eq!(multi.first(), "a");
        assert_eq!(multi.values().len(), 2);
    }

    #[test]
    fn test_query_serializes_untagged() {
        let query = parse_query("q=1&q=2&r=3");
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            serde_json::json!({ "q": ["1", "2"], "r": "3" })
        );
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Virtual-hosted URLs yield their bucket and key
        #[test]
        fn prop_virtual_hosted_bucket_key(
            bucket in "[a-z0-9-]{3,20}",
            region in "[a-z]{2}-[a-z]{4,9}-[1-3]",
            key in "[a-zA-Z0-9_/-]{1,40}"
        ) {
            let url = format!("https://{}.s3-{}.amazonaws.com/{}", bucket, region, key);
            let parsed = parse_s3_url(&url).expect("virtual-hosted url parses");
            prop_assert_eq!(parsed.bucket, bucket);
            prop_assert_eq!(parsed.key, key);
        }

        /// Path-style URLs without a key never parse
        #[test]
        fn prop_path_style_without_key(
            host in "[a-z]{1,10}",
            bucket in "[a-z]{1,10}",
            slash in proptest::bool::ANY
        ) {
            let url = format!("https://{}/{}{}", host, bucket, if slash { "/" } else { "" });
            prop_assert!(parse_s3_url(&url).is_none());
        }
    }
}
