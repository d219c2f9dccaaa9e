//! Scanner and aggregator behavior against a scripted chain client
//!
//! Exercises the properties that matter for resumable ingestion: idempotent
//! resume after a mid-scan failure, window shrinking under persistent rate
//! limits, dedup across overlapping windows, and gap-free checkpointing.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use token_flow::{
    ledger, unique_addresses, BackoffPolicy, BalanceAggregator, BlockNumber, ChainClient,
    CheckpointStore, RoleBook, RpcError, ScanConfig, Scanner, TransferEvent,
};

fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

fn event(tx: u16, log_index: u64, block: u64, from: Address, to: Address) -> TransferEvent {
    let mut hash = [0u8; 32];
    hash[0] = (tx >> 8) as u8;
    hash[1] = tx as u8;
    TransferEvent {
        tx_hash: B256::from(hash),
        log_index,
        block_number: block,
        from,
        to,
        amount: U256::from(100u64 + tx as u64),
    }
}

/// Deterministic universe: one transfer every 20 blocks.
fn universe(head: u64) -> Vec<TransferEvent> {
    (0..=head)
        .step_by(20)
        .enumerate()
        .map(|(i, block)| event(i as u16, 0, block, addr(0xa1), addr(0xb2)))
        .collect()
}

/// Scripted in-memory chain
#[derive(Default)]
struct MockChain {
    events: Vec<TransferEvent>,
    head: u64,
    balances: HashMap<Address, U256>,
    total_supply: U256,
    decimals: u8,
    /// Rate-limit any getLogs span wider than this many blocks
    rate_limit_spans_above: Option<u64>,
    /// Transport-fail any getLogs request touching `[start, end]`
    broken_blocks: Mutex<Option<(u64, u64)>>,
    /// Re-report the last block of the previous request (overlapping windows)
    overlap_bleed: bool,
    calls: AtomicU64,
}

impl MockChain {
    fn with_universe(head: u64) -> Self {
        Self {
            events: universe(head),
            head,
            ..Self::default()
        }
    }

    fn heal(&self) {
        *self.broken_blocks.lock().unwrap() = None;
    }

    fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_logs(&self, from: u64, to: u64) -> Result<Vec<TransferEvent>, RpcError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if let Some(max_span) = self.rate_limit_spans_above {
            if to - from + 1 > max_span {
                return Err(RpcError::RateLimited("span too wide".to_string()));
            }
        }

        if let Some((start, end)) = *self.broken_blocks.lock().unwrap() {
            if from <= end && to >= start {
                return Err(RpcError::Transport("node down".to_string()));
            }
        }

        let lo = if self.overlap_bleed { from.saturating_sub(1) } else { from };
        Ok(self
            .events
            .iter()
            .filter(|e| e.block_number >= lo && e.block_number <= to)
            .cloned()
            .collect())
    }

    async fn get_balance(&self, address: Address, _at_block: u64) -> Result<U256, RpcError> {
        Ok(self.balances.get(&address).copied().unwrap_or(U256::ZERO))
    }

    async fn get_total_supply(&self, _at_block: u64) -> Result<U256, RpcError> {
        Ok(self.total_supply)
    }

    async fn get_decimals(&self) -> Result<u8, RpcError> {
        Ok(self.decimals)
    }

    async fn get_block_number(&self) -> Result<u64, RpcError> {
        Ok(self.head)
    }
}

fn quick_config(window_size: u64, concurrency: usize) -> ScanConfig {
    ScanConfig {
        window_size,
        concurrency,
        requests_per_second: 100_000,
        timeout_secs: 5,
        max_retries: 3,
    }
}

fn quick_backoff() -> BackoffPolicy {
    BackoffPolicy::new(
        std::time::Duration::from_millis(1),
        std::time::Duration::from_millis(5),
        3,
    )
}

fn scanner_for(
    chain: Arc<MockChain>,
    dir: &std::path::Path,
    config: ScanConfig,
) -> Scanner<MockChain> {
    let store = CheckpointStore::open(dir, addr(0x70), 1).unwrap();
    Scanner::new(chain, store, config).with_backoff(quick_backoff())
}

#[tokio::test]
async fn test_full_scan_collects_all_events() {
    let chain = Arc::new(MockChain::with_universe(999));
    let dir = tempfile::tempdir().unwrap();

    let mut scanner = scanner_for(chain.clone(), dir.path(), quick_config(100, 4));
    let events = scanner.scan(0, BlockNumber::Number(999)).await.unwrap();

    assert_eq!(events.len(), universe(999).len());

    // Gap-free frontier: the durable checkpoint covers the whole range.
    let mut store = CheckpointStore::open(dir.path(), addr(0x70), 1).unwrap();
    let (checkpoint, cached) = store.load().unwrap().unwrap();
    assert_eq!(checkpoint.last_scanned_block, 999);
    assert_eq!(cached.len(), events.len());
}

#[tokio::test]
async fn test_empty_range_is_a_noop() {
    let chain = Arc::new(MockChain::with_universe(999));
    let dir = tempfile::tempdir().unwrap();

    let mut scanner = scanner_for(chain.clone(), dir.path(), quick_config(100, 2));
    let events = scanner.scan(500, BlockNumber::Number(100)).await.unwrap();

    assert!(events.is_empty());
    assert_eq!(chain.call_count(), 0);
}

#[tokio::test]
async fn test_interrupted_scan_keeps_checkpoint_gap_free() {
    let chain = Arc::new(MockChain::with_universe(999));
    *chain.broken_blocks.lock().unwrap() = Some((300, 399));
    let dir = tempfile::tempdir().unwrap();

    let mut scanner = scanner_for(chain.clone(), dir.path(), quick_config(100, 4));
    let result = scanner.scan(0, BlockNumber::Number(999)).await;
    assert!(result.is_err());

    // Later windows may have completed out of order, but the checkpoint must
    // not have advanced past the failed window.
    let mut store = CheckpointStore::open(dir.path(), addr(0x70), 1).unwrap();
    if let Some((checkpoint, cached)) = store.load().unwrap() {
        assert!(checkpoint.last_scanned_block < 300);
        assert!(cached.iter().all(|e| e.block_number <= checkpoint.last_scanned_block));
    }
}

#[tokio::test]
async fn test_resume_matches_uninterrupted_run() {
    // Interrupted-then-resumed scan
    let chain = Arc::new(MockChain::with_universe(999));
    *chain.broken_blocks.lock().unwrap() = Some((500, 599));
    let dir = tempfile::tempdir().unwrap();

    let mut scanner = scanner_for(chain.clone(), dir.path(), quick_config(100, 2));
    assert!(scanner.scan(0, BlockNumber::Number(999)).await.is_err());

    chain.heal();
    let mut resumed = scanner_for(chain.clone(), dir.path(), quick_config(100, 2));
    let resumed_events = resumed.scan(0, BlockNumber::Number(999)).await.unwrap();

    // Uninterrupted reference run
    let reference_chain = Arc::new(MockChain::with_universe(999));
    let reference_dir = tempfile::tempdir().unwrap();
    let mut reference = scanner_for(reference_chain, reference_dir.path(), quick_config(100, 2));
    let reference_events = reference.scan(0, BlockNumber::Number(999)).await.unwrap();

    assert_eq!(resumed_events, reference_events);

    let mut store_a = CheckpointStore::open(dir.path(), addr(0x70), 1).unwrap();
    let mut store_b = CheckpointStore::open(reference_dir.path(), addr(0x70), 1).unwrap();
    let (cp_a, _) = store_a.load().unwrap().unwrap();
    let (cp_b, _) = store_b.load().unwrap().unwrap();
    assert_eq!(cp_a.last_scanned_block, cp_b.last_scanned_block);
    assert_eq!(cp_a.event_count, cp_b.event_count);
}

#[tokio::test]
async fn test_resume_does_not_refetch_completed_range() {
    let chain = Arc::new(MockChain::with_universe(999));
    let dir = tempfile::tempdir().unwrap();

    let mut scanner = scanner_for(chain.clone(), dir.path(), quick_config(100, 2));
    scanner.scan(0, BlockNumber::Number(999)).await.unwrap();
    let calls_after_first = chain.call_count();

    // Nothing new to scan: the second run must answer from the checkpoint.
    let mut rerun = scanner_for(chain.clone(), dir.path(), quick_config(100, 2));
    let events = rerun.scan(0, BlockNumber::Number(999)).await.unwrap();

    assert_eq!(events.len(), universe(999).len());
    assert_eq!(chain.call_count(), calls_after_first);
}

#[tokio::test]
async fn test_persistent_rate_limit_shrinks_to_single_blocks() {
    // Every span wider than one block is rate limited; a 1000-block window
    // must still complete by shrinking, with no gaps and no duplicates.
    let chain = Arc::new(MockChain {
        rate_limit_spans_above: Some(1),
        ..MockChain::with_universe(999)
    });
    let dir = tempfile::tempdir().unwrap();

    let mut scanner = scanner_for(chain.clone(), dir.path(), quick_config(1_000, 1));
    let events = scanner.scan(0, BlockNumber::Number(999)).await.unwrap();

    let expected = universe(999);
    assert_eq!(events.len(), expected.len());

    let mut keys: Vec<_> = events.iter().map(|e| e.key()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), expected.len());

    let mut store = CheckpointStore::open(dir.path(), addr(0x70), 1).unwrap();
    let (checkpoint, _) = store.load().unwrap().unwrap();
    assert_eq!(checkpoint.last_scanned_block, 999);
}

#[tokio::test]
async fn test_overlapping_windows_deduplicate() {
    let chain = Arc::new(MockChain {
        overlap_bleed: true,
        ..MockChain::with_universe(999)
    });
    let dir = tempfile::tempdir().unwrap();

    let mut scanner = scanner_for(chain.clone(), dir.path(), quick_config(100, 4));
    let events = scanner.scan(0, BlockNumber::Number(999)).await.unwrap();

    let expected = universe(999);
    assert_eq!(events.len(), expected.len());

    let mut keys: Vec<_> = events.iter().map(|e| e.key()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), expected.len());
}

#[tokio::test]
async fn test_ingested_events_flow_into_ledger_without_drops() {
    let dex = addr(0xde);
    let user_a = addr(0xa1);
    let user_b = addr(0xb2);
    let stranger = addr(0x99);

    let mut chain = MockChain::with_universe(0);
    chain.events = vec![
        event(1, 0, 10, user_a, dex),
        event(2, 0, 20, dex, user_b),
        event(3, 0, 30, user_a, user_b),
        event(4, 0, 40, stranger, addr(0x98)), // both unknown: the one documented drop
    ];
    chain.head = 100;
    let chain = Arc::new(chain);
    let dir = tempfile::tempdir().unwrap();

    let mut scanner = scanner_for(chain, dir.path(), quick_config(50, 2));
    let events = scanner.scan(0, BlockNumber::Latest).await.unwrap();
    assert_eq!(events.len(), 4);

    let roles = RoleBook::new(
        [dex].into_iter().collect(),
        [user_a, user_b].into_iter().collect(),
    )
    .unwrap();

    let rows = ledger(&events, &roles);
    assert_eq!(rows.len(), events.len() - 1);
}

#[tokio::test]
async fn test_snapshot_orders_and_retains_zero_balances() {
    let holder_big = addr(0x01);
    let holder_small = addr(0x02);
    let emptied = addr(0x03);

    let mut chain = MockChain::with_universe(0);
    chain.events = vec![
        event(1, 0, 10, holder_big, holder_small),
        event(2, 0, 20, holder_small, emptied),
    ];
    chain.head = 100;
    chain.total_supply = U256::from(1_000u64);
    chain.balances = HashMap::from([
        (holder_big, U256::from(600u64)),
        (holder_small, U256::from(400u64)),
    ]);
    let chain = Arc::new(chain);

    let addresses = unique_addresses(&chain.events);
    assert_eq!(addresses.len(), 3);

    let aggregator = BalanceAggregator::new(
        chain.clone(),
        token_flow::rate_limiter(100_000),
        4,
    )
    .with_backoff(quick_backoff());

    let records = aggregator.snapshot(&addresses, 100).await.unwrap();

    // One row per observed address, zero balances included.
    assert_eq!(records.len(), addresses.len());
    assert_eq!(records[0].address, holder_big);
    assert_eq!(records[0].percentage.to_string(), "60.0000");
    assert_eq!(records[1].address, holder_small);
    assert_eq!(records[1].percentage.to_string(), "40.0000");
    assert_eq!(records[2].address, emptied);
    assert!(records[2].balance.is_zero());
}
