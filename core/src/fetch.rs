//! Offset-paginated fetching with bounded retry.
//!
//! The backing store returns fixed-size pages. A short page means
//! end-of-data; a full page means there may be more. Each page attempt
//! is retried with exponential backoff, and exhausted retries fail the
//! whole operation — a truncated fetch must never stand in for the full
//! data set (an incomplete org chart once shipped exactly that way).

use crate::{
    config::RetryPolicy,
    error::{CoreError, CoreResult},
};
use std::thread;

/// Fetch every row by looping `fetch(offset, limit)` until a short page.
///
/// `fetch` is retried per page according to `retry`; transient errors
/// inside it surface as `FetchRetriesExhausted` once attempts run out.
pub fn fetch_all_pages<T, F>(page_size: usize, retry: &RetryPolicy, mut fetch: F) -> CoreResult<Vec<T>>
where
    F: FnMut(usize, usize) -> CoreResult<Vec<T>>,
{
    assert!(page_size > 0, "page_size must be positive");
    let mut rows: Vec<T> = Vec::new();
    let mut offset = 0;

    loop {
        let page = fetch_page_with_retry(&mut fetch, offset, page_size, retry)?;
        let got = page.len();
        rows.extend(page);
        if got < page_size {
            return Ok(rows);
        }
        offset += got;
    }
}

fn fetch_page_with_retry<T, F>(
    fetch: &mut F,
    offset: usize,
    limit: usize,
    retry: &RetryPolicy,
) -> CoreResult<Vec<T>>
where
    F: FnMut(usize, usize) -> CoreResult<Vec<T>>,
{
    let attempts = retry.attempts.max(1);
    for attempt in 0..attempts {
        match fetch(offset, limit) {
            Ok(page) => return Ok(page),
            Err(err) => {
                log::warn!(
                    "page fetch at offset {offset} failed (attempt {}/{attempts}): {err}",
                    attempt + 1
                );
                if attempt + 1 < attempts {
                    thread::sleep(retry.delay_after(attempt));
                }
            }
        }
    }
    Err(CoreError::FetchRetriesExhausted { offset, attempts })
}

/// Split an id list into store-sized chunks for IN-list point lookups.
pub fn id_chunks<'a, T>(ids: &'a [T], chunk_size: usize) -> impl Iterator<Item = &'a [T]> {
    assert!(chunk_size > 0, "chunk_size must be positive");
    ids.chunks(chunk_size)
}
