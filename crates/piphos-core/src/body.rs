//! Size-bounded collection of HTTP response bodies
//!
//! Beacons and tenders both read untrusted bodies; this keeps one bound
//! check for both: the declared length first, then the running total.

use std::pin::pin;
use tokio_stream::{Stream, StreamExt};

use crate::error::{Error, Result};

/// Collect a chunked body, failing as soon as it exceeds `limit` bytes
///
/// # Parameters
///
/// - `target`: Beacon or tender name used in errors
/// - `limit`: Largest accepted body, in bytes
/// - `content_length`: Declared length, checked before any chunk is read
/// - `chunks`: Body chunks, e.g. `reqwest::Response::bytes_stream()`
///
/// # Errors
///
/// - `ResponseTooLarge` once the declared or received size passes `limit`
/// - `Unreachable` if a chunk fails to arrive
pub async fn read_bounded<S, B, E>(
    target: &str,
    limit: usize,
    content_length: Option<u64>,
    chunks: S,
) -> Result<Vec<u8>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    if let Some(len) = content_length
        && len > limit as u64
    {
        return Err(Error::too_large(target, limit));
    }

    let mut chunks = pin!(chunks);
    let mut body = Vec::new();
    while let Some(chunk) = chunks.next().await {
        let chunk =
            chunk.map_err(|e| Error::unreachable_with(target, "failed to read response", e))?;
        let chunk = chunk.as_ref();
        if body.len() + chunk.len() > limit {
            return Err(Error::too_large(target, limit));
        }
        body.extend_from_slice(chunk);
    }
    Ok(body)
}
