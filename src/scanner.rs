//! Batch log fetcher
//!
//! Drives the chain client across a block range in bounded windows, retrying
//! and shrinking windows under rate-limit pressure, deduplicating events and
//! advancing the checkpoint behind a contiguous completion frontier.

use crate::checkpoint::CheckpointStore;
use crate::config::{BlockNumber, ScanConfig};
use crate::error::{Error, Result, RpcError};
use crate::event::{EventKey, TransferEvent};
use crate::retry::{rate_limiter, BackoffPolicy, SharedRateLimiter};
use crate::rpc::ChainClient;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// Scan progress information
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Highest block covered by the contiguous frontier
    pub current_block: u64,
    /// Total blocks in the residual range
    pub total_blocks: u64,
    /// Events fetched so far this run (cached events excluded)
    pub events_fetched: u64,
    /// Percentage complete
    pub percent: f64,
    /// Blocks per second
    pub blocks_per_second: f64,
}

/// Resumable batched transfer-event scanner
pub struct Scanner<C: ChainClient> {
    client: Arc<C>,
    store: CheckpointStore,
    limiter: SharedRateLimiter,
    backoff: BackoffPolicy,
    config: ScanConfig,
    progress_callback: Option<ProgressCallback>,
}

impl<C: ChainClient> Scanner<C> {
    pub fn new(client: Arc<C>, store: CheckpointStore, config: ScanConfig) -> Self {
        let limiter = rate_limiter(config.requests_per_second);
        let backoff = BackoffPolicy {
            max_retries: config.max_retries,
            ..BackoffPolicy::default()
        };

        Self {
            client,
            store,
            limiter,
            backoff,
            config,
            progress_callback: None,
        }
    }

    /// Override the default backoff policy (tests use millisecond bases).
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set progress callback
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ScanProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Share the scanner's rate limiter, so balance queries issued after the
    /// scan stay under the same ceiling.
    pub fn limiter(&self) -> SharedRateLimiter {
        self.limiter.clone()
    }

    /// Scan `[from, to]`, resuming from the checkpoint when one exists.
    ///
    /// Returns every event for the scanned range: cached events for the
    /// already-completed prefix plus freshly fetched ones, ordered by block
    /// and log index. On a fatal window failure the checkpoint stays at the
    /// last contiguous frontier and [`Error::ScanInterrupted`] is returned;
    /// a subsequent run resumes cleanly.
    pub async fn scan(&mut self, from: u64, to: BlockNumber) -> Result<Vec<TransferEvent>> {
        let end_block = match to {
            BlockNumber::Number(n) => n,
            BlockNumber::Latest => self.client.get_block_number().await.map_err(Error::Rpc)?,
        };

        // Cached events are authoritative for the already-scanned range.
        let mut all_events = Vec::new();
        let mut seen: HashMap<EventKey, TransferEvent> = HashMap::new();
        let mut effective_from = from;

        if let Some((checkpoint, cached)) = self.store.load()? {
            tracing::info!(
                "resuming from checkpoint at block {} ({} cached events)",
                checkpoint.last_scanned_block,
                checkpoint.event_count
            );
            effective_from = effective_from.max(checkpoint.last_scanned_block + 1);
            for event in cached {
                seen.insert(event.key(), event.clone());
                all_events.push(event);
            }
        }

        // Empty residual range is a no-op, not an error.
        if effective_from > end_block {
            return Ok(all_events);
        }

        let windows = partition(effective_from, end_block, self.config.window_size);
        let total_blocks = end_block - effective_from + 1;
        tracing::info!(
            "scanning blocks {} to {} ({} windows of {})",
            effective_from,
            end_block,
            windows.len(),
            self.config.window_size
        );

        let start_time = std::time::Instant::now();
        let mut fetched_total = 0u64;

        // Workers pull windows concurrently; completions may land out of
        // order, so results fold into an index-keyed frontier and the
        // checkpoint only advances over a gap-free prefix.
        let tasks: Vec<_> = windows
            .iter()
            .enumerate()
            .map(|(index, &(window_from, window_to))| {
                let client = self.client.clone();
                let limiter = self.limiter.clone();
                let backoff = self.backoff.clone();

                async move {
                    let result =
                        fetch_window(&*client, &limiter, &backoff, window_from, window_to).await;
                    (index, result)
                }
            })
            .collect();
        let mut results = stream::iter(tasks).buffer_unordered(self.config.concurrency);

        let mut pending: BTreeMap<usize, Vec<TransferEvent>> = BTreeMap::new();
        let mut next_window = 0usize;

        while let Some((index, result)) = results.next().await {
            match result {
                Ok(events) => {
                    pending.insert(index, events);
                }
                Err(e) => {
                    // Leave the checkpoint at the last completed frontier;
                    // in-flight windows are dropped without partial writes.
                    let last = self
                        .store
                        .checkpoint()
                        .map(|c| c.last_scanned_block)
                        .unwrap_or_else(|| effective_from.saturating_sub(1));
                    tracing::warn!("window {} failed fatally: {}", index, e);
                    return Err(Error::ScanInterrupted {
                        last_scanned_block: last,
                        source: e,
                    });
                }
            }

            while let Some(events) = pending.remove(&next_window) {
                let window_end = windows[next_window].1;
                let fresh = dedup_into(&mut seen, events);
                fetched_total += fresh.len() as u64;

                self.store.append(&fresh, window_end)?;
                all_events.extend(fresh);
                next_window += 1;

                if let Some(cb) = &self.progress_callback {
                    let blocks_done = window_end - effective_from + 1;
                    let elapsed = start_time.elapsed().as_secs_f64();
                    cb(ScanProgress {
                        current_block: window_end,
                        total_blocks,
                        events_fetched: fetched_total,
                        percent: (blocks_done as f64 / total_blocks as f64) * 100.0,
                        blocks_per_second: if elapsed > 0.0 {
                            blocks_done as f64 / elapsed
                        } else {
                            0.0
                        },
                    });
                }
            }
        }

        Ok(all_events)
    }
}

/// Partition `[from, to]` into consecutive non-overlapping windows.
///
/// The last window is truncated to `to`; a window size larger than the range
/// is clamped; an inverted range yields no windows.
fn partition(from: u64, to: u64, window_size: u64) -> Vec<(u64, u64)> {
    let window_size = window_size.max(1);
    let mut windows = Vec::new();
    let mut current = from;

    while current <= to {
        let window_end = current.saturating_add(window_size - 1).min(to);
        windows.push((current, window_end));
        if window_end == u64::MAX {
            break;
        }
        current = window_end + 1;
    }

    windows
}

/// Keep first-seen records; conflicting duplicates are an upstream
/// inconsistency and are logged rather than silently overwritten.
fn dedup_into(
    seen: &mut HashMap<EventKey, TransferEvent>,
    events: Vec<TransferEvent>,
) -> Vec<TransferEvent> {
    let mut fresh = Vec::with_capacity(events.len());

    for event in events {
        match seen.get(&event.key()) {
            None => {
                seen.insert(event.key(), event.clone());
                fresh.push(event);
            }
            Some(prior) if prior.conflicts_with(&event) => {
                tracing::warn!(
                    tx_hash = %event.tx_hash,
                    log_index = event.log_index,
                    "conflicting duplicate event; keeping first-seen record"
                );
            }
            Some(_) => {
                tracing::debug!(
                    tx_hash = %event.tx_hash,
                    log_index = event.log_index,
                    "duplicate event discarded"
                );
            }
        }
    }

    fresh.sort_by_key(|e| (e.block_number, e.log_index));
    fresh
}

/// Fetch one window, shrinking the request span under rate-limit pressure.
///
/// The span halves (floor one block) each time retries are exhausted on a
/// rate-limit or timeout; a transport failure that survives its retries, or
/// rate limiting at a one-block span, fails the window fatally.
async fn fetch_window<C: ChainClient>(
    client: &C,
    limiter: &SharedRateLimiter,
    backoff: &BackoffPolicy,
    from: u64,
    to: u64,
) -> std::result::Result<Vec<TransferEvent>, RpcError> {
    let mut span = to - from + 1;
    let mut cursor = from;
    let mut events = Vec::new();

    while cursor <= to {
        let span_end = cursor.saturating_add(span - 1).min(to);

        match fetch_span(client, limiter, backoff, cursor, span_end).await {
            Ok(batch) => {
                events.extend(batch);
                cursor = span_end + 1;
            }
            Err(e) if e.is_rate_limit() && span > 1 => {
                span = (span / 2).max(1);
                tracing::debug!(
                    "rate limited on blocks {}-{}, shrinking span to {}",
                    cursor,
                    span_end,
                    span
                );
            }
            Err(e) => {
                return Err(RpcError::RetriesExhausted {
                    from: cursor,
                    to: span_end,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(events)
}

/// One span attempt with bounded backoff; every outbound call waits on the
/// shared token bucket first.
async fn fetch_span<C: ChainClient>(
    client: &C,
    limiter: &SharedRateLimiter,
    backoff: &BackoffPolicy,
    from: u64,
    to: u64,
) -> std::result::Result<Vec<TransferEvent>, RpcError> {
    let mut attempt = 0u32;

    loop {
        limiter.until_ready().await;

        match client.get_logs(from, to).await {
            Ok(events) => return Ok(events),
            Err(e) if e.is_recoverable() && attempt < backoff.max_retries => {
                let delay = backoff.delay(attempt);
                tracing::debug!(
                    "blocks {}-{}: {} (retry {} in {:?})",
                    from,
                    to,
                    e,
                    attempt + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
