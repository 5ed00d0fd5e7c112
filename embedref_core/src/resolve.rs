//! Inlining embeds back into the tree as data URIs.

use crate::data_uri::DataUri;
use crate::embed::{Embed, get_embeds};
use crate::error::{BoxError, Error, Result};
use crate::walk::{self, Path};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use std::future::Future;
use tracing::{debug, warn};

/// Fetch every embed through `resolve` and inline the results as data URIs.
///
/// The set of embeds and their paths is fixed before the first call. At most
/// `concurrency` calls are in flight at once (`None` means all of them). The
/// tree is only written after every call has succeeded; on the first failure
/// the remaining calls are dropped and the tree is left as it was.
///
/// Returns the number of leaves rewritten.
pub async fn resolve_embeds<F, Fut, E>(
    tree: &mut Value,
    mut resolve: F,
    concurrency: Option<usize>,
) -> Result<usize>
where
    F: FnMut(Embed) -> Fut,
    Fut: Future<Output = std::result::Result<DataUri, E>>,
    E: Into<BoxError>,
{
    let embeds = get_embeds(tree);
    if embeds.is_empty() {
        return Ok(0);
    }

    let limit = concurrency.unwrap_or(embeds.len()).max(1);
    debug!(count = embeds.len(), limit, "resolving embeds");

    let paths: Vec<Path> = embeds.iter().map(|embed| embed.path.clone()).collect();
    let bodies: Vec<DataUri> = stream::iter(embeds.into_iter().map(|embed| {
        let path = embed.path.to_string();
        let pending = resolve(embed);
        async move { pending.await.map_err(|e| Error::resolve(path, e)) }
    }))
    .buffered(limit)
    .try_collect()
    .await?;

    let mut written = 0;
    for (path, body) in paths.iter().zip(&bodies) {
        if walk::set_path(tree, path, body.to_data_uri()) {
            written += 1;
        } else {
            warn!(path = %path, "embed path no longer resolves, skipping");
        }
    }

    debug!(count = written, "inlined embeds");
    Ok(written)
}
