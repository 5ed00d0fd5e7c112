//! Externalizing inline payloads and keeper URIs to S3 URLs.

use crate::data_uri::{self, DataUri};
use crate::embed::EmbedMode;
use crate::error::Result;
use crate::hash::{Algorithm, ContentHash};
use crate::keeper::{KeeperUri, parse_keeper_uri};
use crate::region::s3_endpoint;
use crate::target::{S3Target, get_s3_upload_target};
use crate::walk::{self, Path};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Where externalized objects go and how they are keyed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReplaceOptions {
    /// Region used to pick the endpoint when `endpoint` is not set.
    pub region: Option<String>,
    /// Explicit endpoint, e.g. `localhost:4572`. Takes precedence over `region`.
    pub endpoint: Option<String>,
    /// Destination bucket.
    pub bucket: String,
    /// Prepended to the content hash to form the object key.
    pub key_prefix: String,
    /// Hash used for data URI payloads.
    pub algorithm: Algorithm,
}

impl ReplaceOptions {
    /// Options for a bucket, using the default region and an empty key prefix.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    /// Set the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set an explicit endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    /// Set the payload hash algorithm.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The endpoint objects are addressed through.
    pub fn resolve_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => s3_endpoint(self.region.as_deref()).to_string(),
        }
    }

    fn target_for(&self, endpoint: &str, hash: &str) -> S3Target {
        S3Target {
            endpoint: endpoint.to_string(),
            bucket: self.bucket.clone(),
            key: format!("{}{}", self.key_prefix, hash),
        }
    }
}

/// One data URI moved out of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Replacement {
    /// The data URI as it was found.
    pub data_url: String,
    /// Hex content hash of the decoded payload.
    pub hash: String,
    /// Decoded payload, to be uploaded by the caller.
    #[serde(skip)]
    pub body: DataUri,
    /// Mimetype of the payload.
    pub mimetype: String,
    /// Host the object is addressed through.
    pub host: String,
    /// Destination bucket.
    pub bucket: String,
    /// Destination key.
    pub key: String,
    /// Object URL, without mode prefix.
    pub s3_url: String,
    /// Where the data URI was.
    pub path: Path,
}

/// One keeper URI rewritten to an S3 URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeeperReplacement {
    /// The parsed keeper URI, attributes included.
    #[serde(flatten)]
    pub keeper: KeeperUri,
    /// Host the object is addressed through.
    pub host: String,
    /// Destination bucket.
    pub bucket: String,
    /// Destination key.
    pub key: String,
    /// Object URL, without mode prefix.
    pub s3_url: String,
    /// Where the keeper URI was.
    pub path: Path,
}

/// Replace every decodable data URI with an unsigned S3 URL.
///
/// Returns the replacements in traversal order. Strings that start with
/// `data:` but do not decode are left as they are. A missing bucket fails at
/// the first data URI, before it is rewritten.
pub fn replace_data_urls(tree: &mut Value, options: &ReplaceOptions) -> Result<Vec<Replacement>> {
    let endpoint = options.resolve_endpoint();
    debug!(endpoint = %endpoint, bucket = %options.bucket, "externalizing data URIs");

    let replacements = walk::fold_mut(tree, Ok(Vec::new()), |acc: Result<Vec<Replacement>>, mut leaf| {
        let mut replacements = acc?;
        let Some(value) = leaf.as_str().filter(|v| v.starts_with(data_uri::SCHEME)) else {
            return Ok(replacements);
        };

        let body = match data_uri::decode(value) {
            Ok(body) => body,
            Err(e) => {
                warn!(path = %leaf.path(), error = %e, "skipping undecodable data URI");
                return Ok(replacements);
            }
        };

        let hash = ContentHash::digest(options.algorithm, &body.data).to_hex();
        let target = options.target_for(&endpoint, &hash);
        let upload = get_s3_upload_target(&target)?;
        trace!(path = %leaf.path(), key = %target.key, "externalizing data URI");

        let data_url = value.to_string();
        leaf.replace(EmbedMode::Unsigned.apply(&upload.s3_url));
        replacements.push(Replacement {
            data_url,
            hash,
            mimetype: body.mimetype.clone(),
            body,
            host: upload.host,
            bucket: target.bucket,
            key: target.key,
            s3_url: upload.s3_url,
            path: leaf.path().clone(),
        });
        Ok(replacements)
    })?;

    debug!(count = replacements.len(), "externalized data URIs");
    Ok(replacements)
}

/// Replace every keeper URI with an unsigned S3 URL keyed by its hash.
pub fn replace_keeper_uris(
    tree: &mut Value,
    options: &ReplaceOptions,
) -> Result<Vec<KeeperReplacement>> {
    let endpoint = options.resolve_endpoint();
    debug!(endpoint = %endpoint, bucket = %options.bucket, "converting keeper URIs");

    let replacements = walk::fold_mut(tree, Ok(Vec::new()), |acc: Result<Vec<KeeperReplacement>>, mut leaf| {
        let mut replacements = acc?;
        let Some(keeper) = leaf.as_str().and_then(parse_keeper_uri) else {
            return Ok(replacements);
        };

        let target = options.target_for(&endpoint, &keeper.hash);
        let upload = get_s3_upload_target(&target)?;
        trace!(path = %leaf.path(), key = %target.key, "converting keeper URI");

        leaf.replace(EmbedMode::Unsigned.apply(&upload.s3_url));
        replacements.push(KeeperReplacement {
            keeper,
            host: upload.host,
            bucket: target.bucket,
            key: target.key,
            s3_url: upload.s3_url,
            path: leaf.path().clone(),
        });
        Ok(replacements)
    })?;

    debug!(count = replacements.len(), "converted keeper URIs");
    Ok(replacements)
}

/// The S3 URL a keeper URI maps to, or `None` if `uri` is not a keeper URI.
pub fn get_s3_url_for_keeper_uri(options: &ReplaceOptions, uri: &str) -> Result<Option<String>> {
    let Some(keeper) = parse_keeper_uri(uri) else {
        return Ok(None);
    };
    let target = options.target_for(&options.resolve_endpoint(), &keeper.hash);
    Ok(Some(get_s3_upload_target(&target)?.s3_url))
}
