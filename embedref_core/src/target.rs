//! Upload target construction for externalized payloads.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Where an object should be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Target {
    /// S3 endpoint host, optionally with a port (e.g. `s3.amazonaws.com`, `localhost:4572`).
    pub endpoint: String,
    /// Bucket name. Must not be empty.
    pub bucket: String,
    /// Object key.
    pub key: String,
}

/// The computed location of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct S3UploadTarget {
    /// Host the object is addressed through.
    pub host: String,
    /// Full object URL.
    pub s3_url: String,
}

/// Whether an endpoint points at a local or private network address.
///
/// Any `http://`/`https://` prefix and port are ignored. The host is private when
/// it is `localhost` or a loopback, private, link-local or unique-local IP.
pub fn is_private_endpoint(endpoint: &str) -> bool {
    let rest = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .unwrap_or(endpoint);

    let host = match rest.strip_prefix('[') {
        Some(bracketed) => bracketed.split(']').next().unwrap_or_default(),
        None => rest.split(':').next().unwrap_or_default(),
    };

    if host == "localhost" {
        return true;
    }

    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => ip.is_private() || ip.is_loopback() || ip.is_link_local(),
        Ok(IpAddr::V6(ip)) => {
            let first = ip.segments()[0];
            ip.is_loopback()
                || ip.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || ip
                    .to_ipv4_mapped()
                    .is_some_and(|v4| v4.is_private() || v4.is_loopback() || v4.is_link_local())
        }
        Err(_) => false,
    }
}

/// Compute the host and URL an object should be uploaded to.
///
/// Private endpoints get a path-style `http://` URL, everything else a
/// virtual-hosted `https://` URL.
pub fn get_s3_upload_target(target: &S3Target) -> Result<S3UploadTarget> {
    if target.bucket.is_empty() {
        return Err(Error::MissingBucket);
    }

    if is_private_endpoint(&target.endpoint) {
        return Ok(S3UploadTarget {
            host: target.endpoint.clone(),
            s3_url: format!(
                "http://{}/{}/{}",
                target.endpoint, target.bucket, target.key
            ),
        });
    }

    let host = format!("{}.{}", target.bucket, target.endpoint);
    Ok(S3UploadTarget {
        s3_url: format!("https://{}/{}", host, target.key),
        host,
    })
}
