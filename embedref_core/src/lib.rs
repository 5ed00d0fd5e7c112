//! # embedref Core
//!
//! Rewrites embedded binary payload references inside JSON document trees.
//!
//! A leaf string may hold a payload in one of three forms:
//!
//! - an inline `data:` URI,
//! - a content-addressed keeper URI (`tradle-keeper://<hash>/?<attrs>`),
//! - an S3 object URL stored behind a mode prefix (`u:s3:` for stable
//!   URLs, `p:s3:` for presigned ones).
//!
//! This library moves payloads between those forms in place and reports every
//! leaf it touched, so the caller can do the actual uploading, signing and
//! fetching.
//!
//! ## Features
//!
//! - Externalize data URIs to S3 URLs keyed by content hash
//! - Convert keeper URIs to S3 URLs
//! - Scan a tree for embeds, strip their prefixes, or presign them
//! - Resolve embeds back into data URIs with bounded concurrency
//!
//! ## Example
//!
//! ```no_run
//! use embedref_core::{ReplaceOptions, get_embeds, replace_data_urls};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = json!({ "photo": "data:image/png;base64,iVBORw0KGgo=" });
//!
//! // Move the payload out; the tree now holds a u:s3: URL
//! let options = ReplaceOptions::new("my-bucket").with_key_prefix("photos/");
//! for replacement in replace_data_urls(&mut doc, &options)? {
//!     println!("upload {} bytes to {}", replacement.body.len(), replacement.s3_url);
//! }
//!
//! // Find it again later
//! let embeds = get_embeds(&doc);
//! println!("{} embed(s) at {}", embeds.len(), embeds[0].path);
//! # Ok(())
//! # }
//! ```

pub mod data_uri;
mod embed;
mod error;
mod hash;
mod keeper;
pub mod query;
mod region;
mod replace;
mod resolve;
mod s3_url;
mod target;
pub mod walk;

pub use data_uri::DataUri;
pub use embed::{
    Embed, EmbedMode, PREFIX_LEN, PRESIGNED_PREFIX, SignRequest, UNSIGNED_PREFIX, get_embeds,
    parse_embedded_value, presign_urls, strip_embed_prefix,
};
pub use error::{BoxError, Error, Result};
pub use hash::{Algorithm, ContentHash, sha256_hex};
pub use keeper::{
    KEEPER_SCHEME, KEEPER_TYPE, KeeperUri, build_keeper_uri, is_keeper_uri, parse_keeper_uri,
};
pub use region::{DEFAULT_ENDPOINT, DEFAULT_REGION, S3_ENDPOINTS, known_regions, s3_endpoint};
pub use replace::{
    KeeperReplacement, ReplaceOptions, Replacement, get_s3_url_for_keeper_uri, replace_data_urls,
    replace_keeper_uris,
};
pub use resolve::resolve_embeds;
pub use s3_url::{Query, QueryValue, S3Location, parse_query, parse_s3_url};
pub use target::{S3Target, S3UploadTarget, get_s3_upload_target, is_private_endpoint};
pub use walk::Path;
