//! Remote HTTP(S) fetch mode: multi-range bundle requests over a bounded
//! connection pool, falling back to whole-bundle downloads when the server
//! doesn't support range requests the way we'd like.

use crate::multipart::{extract_boundary, parse_content_range, parse_multipart_byteranges};
use crate::{BlockPool, MAX_CONCURRENT_CONNECTIONS};
use futures::stream::{self, StreamExt};
use patch_core::{Error, Hash, Manifest, Progress, Result};
use patch_planner::FetchPlan;
use reqwest::{Client, StatusCode};
use std::sync::Mutex;

/// Execute `plan` against `base_url`, populating `pool` with every needed
/// block. Bundle fetches and individual block fetches both run through the
/// same bounded-concurrency stream so no more than
/// [`MAX_CONCURRENT_CONNECTIONS`] requests are in flight at once.
pub async fn fetch_remote(
    client: &Client,
    base_url: &str,
    manifest: &Manifest,
    plan: &FetchPlan,
    dictionary: Option<&[u8]>,
    pool: &mut BlockPool,
    progress: &mut Progress,
) -> Result<()> {
    let pool_mutex = Mutex::new(std::mem::take(pool));
    let progress_mutex = Mutex::new(());

    let bundle_jobs = plan.bundle_fetches.iter().map(|bf| {
        let base_url = base_url.to_string();
        let pool_mutex = &pool_mutex;
        let progress_mutex = &progress_mutex;
        async move {
            let bytes = fetch_bundle_ranges(client, &base_url, manifest, bf, dictionary).await?;
            let mut guard = pool_mutex.lock().unwrap();
            for (hash, data) in bytes {
                guard.insert(hash, data);
            }
            drop(guard);
            let _ = progress_mutex.lock().unwrap();
            Ok::<(), Error>(())
        }
    });

    stream::iter(bundle_jobs)
        .buffer_unordered(MAX_CONCURRENT_CONNECTIONS)
        .for_each(|result| {
            if let Err(e) = result {
                tracing::warn!(error = %e, "bundle range fetch failed");
            }
            progress.advance(1);
            futures::future::ready(())
        })
        .await;

    let block_jobs = plan.individual_blocks.iter().map(|hash| {
        let base_url = base_url.to_string();
        let pool_mutex = &pool_mutex;
        async move {
            let data = fetch_single_block(client, &base_url, hash, dictionary).await?;
            pool_mutex.lock().unwrap().insert(*hash, data);
            Ok::<(), Error>(())
        }
    });

    stream::iter(block_jobs)
        .buffer_unordered(MAX_CONCURRENT_CONNECTIONS)
        .for_each(|result| {
            if let Err(e) = result {
                tracing::warn!(error = %e, "block fetch failed");
            }
            progress.advance(1);
            futures::future::ready(())
        })
        .await;

    *pool = pool_mutex.into_inner().unwrap();
    Ok(())
}

/// Fetch the members of a single bundle needed by `bundle_fetch`, issuing a
/// multi-range `Range` request and dispatching on the response shape:
/// `206` + `multipart/byteranges` splits into parts, `206` with a single
/// range is used directly, anything else falls back to a full bundle
/// download.
async fn fetch_bundle_ranges(
    client: &Client,
    base_url: &str,
    manifest: &Manifest,
    bundle_fetch: &patch_planner::BundleFetch,
    dictionary: Option<&[u8]>,
) -> Result<Vec<(Hash, Vec<u8>)>> {
    let members = manifest
        .bundles
        .get(&bundle_fetch.bundle_id)
        .ok_or_else(|| Error::MalformedBundleIndex {
            bundle_id: bundle_fetch.bundle_id.clone(),
            reason: "bundle referenced by plan is absent from manifest".to_string(),
        })?;

    let mut ranges: Vec<(u64, u64, Hash)> = bundle_fetch
        .needed
        .iter()
        .map(|hash| {
            let member = members
                .iter_ordered()
                .find(|m| m.hash == *hash)
                .ok_or_else(|| Error::MissingBlock { hash: hash.to_hex() })?;
            let start = member.block_offset;
            let end = start + member.length - 1;
            Ok((start, end, *hash))
        })
        .collect::<Result<Vec<_>>>()?;
    ranges.sort_by_key(|(start, _, _)| *start);

    let url = format!("{base_url}/bundles/{}", bundle_fetch.bundle_id);
    let range_header = ranges
        .iter()
        .map(|(start, end, _)| format!("bytes={start}-{end}"))
        .collect::<Vec<_>>()
        .join(",");

    let response = client
        .get(&url)
        .header("Range", range_header)
        .send()
        .await
        .map_err(|e| Error::Transport {
            url: url.clone(),
            source: e,
        })?;

    match response.status() {
        StatusCode::PARTIAL_CONTENT => {
            let content_type = response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();

            if content_type.to_ascii_lowercase().contains("multipart/byteranges") {
                let boundary = extract_boundary(&content_type).ok_or_else(|| Error::MalformedMultipart {
                    url: url.clone(),
                    reason: "missing boundary parameter".to_string(),
                })?;
                let body = response.bytes().await.map_err(|e| Error::Transport {
                    url: url.clone(),
                    source: e,
                })?;
                let parts = parse_multipart_byteranges(&body, boundary);

                let mut out = Vec::with_capacity(ranges.len());
                for (start, end, hash) in &ranges {
                    let part = parts
                        .iter()
                        .find(|p| p.start == *start && p.end == *end)
                        .ok_or_else(|| Error::MalformedMultipart {
                            url: url.clone(),
                            reason: format!("no part matched requested range {start}-{end}"),
                        })?;
                    out.push((*hash, decompress_if_needed(&part.body, dictionary)?));
                }
                Ok(out)
            } else {
                // Single-range 206: body is exactly the one range we asked for.
                let (start, end, hash) = ranges[0];
                let content_range = response
                    .headers()
                    .get("content-range")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                if let Some((actual_start, actual_end)) = parse_content_range(content_range) {
                    if actual_start != start || actual_end != end {
                        return Err(Error::MalformedMultipart {
                            url,
                            reason: "single-range response did not match requested range".to_string(),
                        });
                    }
                }
                let body = response.bytes().await.map_err(|e| Error::Transport {
                    url: url.clone(),
                    source: e,
                })?;
                Ok(vec![(hash, decompress_if_needed(&body, dictionary)?)])
            }
        }
        StatusCode::OK => {
            // Server ignored the Range header; fetch the whole bundle and
            // slice the needed members out of it ourselves.
            let body = response.bytes().await.map_err(|e| Error::Transport {
                url: url.clone(),
                source: e,
            })?;
            let mut out = Vec::with_capacity(ranges.len());
            for (start, end, hash) in &ranges {
                let slice = &body[*start as usize..=*end as usize];
                out.push((*hash, decompress_if_needed(slice, dictionary)?));
            }
            Ok(out)
        }
        status => Err(Error::UnexpectedStatus { url, status }),
    }
}

async fn fetch_single_block(
    client: &Client,
    base_url: &str,
    hash: &Hash,
    dictionary: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let url = format!("{base_url}/blocks/{}", hash.to_hex());
    let response = client.get(&url).send().await.map_err(|e| Error::Transport {
        url: url.clone(),
        source: e,
    })?;
    if !response.status().is_success() {
        return Err(Error::UnexpectedStatus {
            url,
            status: response.status(),
        });
    }
    let body = response.bytes().await.map_err(|e| Error::Transport {
        url: url.clone(),
        source: e,
    })?;
    decompress_if_needed(&body, dictionary)
}

fn decompress_if_needed(data: &[u8], dictionary: Option<&[u8]>) -> Result<Vec<u8>> {
    match dictionary {
        Some(dict) => patch_bundle::decompress(data, dict, data.len() * 4),
        None => Ok(data.to_vec()),
    }
}
