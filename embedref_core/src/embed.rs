//! Embed detection and the unsigned/presigned mode prefixes.
//!
//! An embed is a string leaf holding a mode prefix followed by an S3 URL:
//!
//! ```text
//! u:s3:https://mybucket.s3.amazonaws.com/<key>
//! p:s3:https://mybucket.s3.amazonaws.com/<key>?AWSAccessKeyId=..&Expires=..&Signature=..
//! ```

use crate::error::{BoxError, Error, Result};
use crate::s3_url::{S3Location, parse_s3_url};
use crate::walk::{self, Path};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Prefix of a stable, unsigned object URL.
pub const UNSIGNED_PREFIX: &str = "u:s3:";

/// Prefix of a URL carrying a temporary signature.
pub const PRESIGNED_PREFIX: &str = "p:s3:";

/// Length shared by both prefixes.
pub const PREFIX_LEN: usize = 5;

const _: () = assert!(UNSIGNED_PREFIX.len() == PREFIX_LEN && PRESIGNED_PREFIX.len() == PREFIX_LEN);

/// Which prefix an embed was stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedMode {
    /// `u:s3:`
    Unsigned,
    /// `p:s3:`
    Presigned,
}

impl EmbedMode {
    /// The prefix token for this mode.
    pub fn prefix(&self) -> &'static str {
        match self {
            EmbedMode::Unsigned => UNSIGNED_PREFIX,
            EmbedMode::Presigned => PRESIGNED_PREFIX,
        }
    }

    /// Detect the mode prefix at the start of a string.
    pub fn from_value(value: &str) -> Option<Self> {
        if value.starts_with(PRESIGNED_PREFIX) {
            Some(EmbedMode::Presigned)
        } else if value.starts_with(UNSIGNED_PREFIX) {
            Some(EmbedMode::Unsigned)
        } else {
            None
        }
    }

    /// Prepend this mode's prefix to a URL.
    pub fn apply(&self, url: &str) -> String {
        format!("{}{}", self.prefix(), url)
    }
}

/// An S3 reference found inside a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Embed {
    /// The parsed URL, without the mode prefix.
    #[serde(flatten)]
    pub location: S3Location,
    /// The prefix the URL was stored under.
    pub mode: EmbedMode,
    /// The leaf exactly as found, prefix included.
    pub value: String,
    /// Where the leaf sits in the tree.
    pub path: Path,
}

impl Embed {
    /// The unprefixed URL.
    pub fn url(&self) -> &str {
        &self.location.url
    }

    /// Bucket name.
    pub fn bucket(&self) -> &str {
        &self.location.bucket
    }

    /// Object key.
    pub fn key(&self) -> &str {
        &self.location.key
    }
}

/// What a `sign` callback is told about an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignRequest {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Where the embed sits in the tree.
    pub path: Path,
}

/// Recognize a single leaf value as an embed.
///
/// The value must start with a mode prefix and the remainder must parse as an
/// S3 URL; anything else is not an embed.
pub fn parse_embedded_value(value: &str, path: &Path) -> Option<Embed> {
    let mode = EmbedMode::from_value(value)?;
    let location = parse_s3_url(&value[PREFIX_LEN..])?;
    Some(Embed {
        location,
        mode,
        value: value.to_string(),
        path: path.clone(),
    })
}

/// Collect every embed in the tree, in traversal order.
pub fn get_embeds(tree: &Value) -> Vec<Embed> {
    let embeds = walk::fold(tree, Vec::new(), |mut embeds, leaf| {
        if let Some(embed) = leaf
            .as_str()
            .and_then(|value| parse_embedded_value(value, leaf.path()))
        {
            trace!(path = %embed.path, bucket = %embed.bucket(), "found embed");
            embeds.push(embed);
        }
        embeds
    });
    debug!(count = embeds.len(), "collected embeds");
    embeds
}

/// Replace every embed with its bare URL. Returns the number of leaves rewritten.
///
/// Leaves without a recognized prefix are left alone, so a second pass is a no-op.
pub fn strip_embed_prefix(tree: &mut Value) -> usize {
    let stripped = walk::fold_mut(tree, 0, |count, mut leaf| {
        let url = leaf
            .as_str()
            .and_then(|value| parse_embedded_value(value, leaf.path()))
            .map(|embed| embed.location.url);
        match url {
            Some(url) => {
                leaf.replace(url);
                count + 1
            }
            None => count,
        }
    });
    debug!(count = stripped, "stripped embed prefixes");
    stripped
}

/// Rewrite every embed to a presigned URL produced by `sign`.
///
/// `sign` receives only the bucket, key and path of each embed. A failure
/// aborts the pass; embeds rewritten before it keep their new value.
pub fn presign_urls<F, E>(tree: &mut Value, mut sign: F) -> Result<usize>
where
    F: FnMut(&SignRequest) -> std::result::Result<String, E>,
    E: Into<BoxError>,
{
    let embeds = get_embeds(tree);
    let mut signed = 0;
    for embed in embeds {
        let request = SignRequest {
            bucket: embed.location.bucket,
            key: embed.location.key,
            path: embed.path,
        };
        let url = sign(&request).map_err(|e| Error::sign(request.path.to_string(), e))?;
        if walk::set_path(tree, &request.path, EmbedMode::Presigned.apply(&url)) {
            signed += 1;
        } else {
            warn!(path = %request.path, "embed path no longer resolves, skipping");
        }
    }
    debug!(count = signed, "presigned embeds");
    Ok(signed)
}
