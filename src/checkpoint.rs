//! Resumable scan checkpoints
//!
//! One JSON state file per `(token, chain)` pair holds the checkpoint and
//! every event fetched so far. The file name embeds the token, chain and last
//! scanned block so a human can identify freshness at a glance:
//! `<token>_all_transfer_events_chain_<chainId>_block_<lastScannedBlock>.json`.
//!
//! Persistence is atomic: the full state is serialized to a temp file in the
//! same directory and renamed into place, so a crash between fetch and
//! persist never advances the checkpoint past what was durably written.

use crate::error::{CheckpointError, Result};
use crate::event::TransferEvent;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scan progress for one `(token, chain)` pair.
///
/// Owned exclusively by the scanner; mutated only after a window frontier is
/// fully retrieved; `last_scanned_block` is monotonically non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCheckpoint {
    pub token_address: Address,
    pub chain_id: u64,
    pub last_scanned_block: u64,
    pub event_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckpointState {
    checkpoint: ScanCheckpoint,
    events: Vec<TransferEvent>,
}

/// File-backed checkpoint store
pub struct CheckpointStore {
    dir: PathBuf,
    token: Address,
    chain_id: u64,
    state: Option<CheckpointState>,
    current_file: Option<PathBuf>,
}

impl CheckpointStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>, token: Address, chain_id: u64) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| CheckpointError::WriteError(format!("{}: {}", dir.display(), e)))?;

        Ok(Self {
            dir,
            token,
            chain_id,
            state: None,
            current_file: None,
        })
    }

    fn file_prefix(&self) -> String {
        format!(
            "{:#x}_all_transfer_events_chain_{}_block_",
            self.token, self.chain_id
        )
    }

    fn file_name(&self, last_block: u64) -> String {
        format!("{}{}.json", self.file_prefix(), last_block)
    }

    /// Locate the freshest checkpoint file for this `(token, chain)` pair.
    fn find_latest_file(&self) -> Result<Option<PathBuf>> {
        let prefix = self.file_prefix();
        let mut best: Option<(u64, PathBuf)> = None;

        for entry in std::fs::read_dir(&self.dir)
            .map_err(|e| CheckpointError::ReadError(format!("{}: {}", self.dir.display(), e)))?
        {
            let entry =
                entry.map_err(|e| CheckpointError::ReadError(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();

            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };
            let Some(block_str) = rest.strip_suffix(".json") else {
                continue;
            };
            let Ok(block) = block_str.parse::<u64>() else {
                continue;
            };

            if best.as_ref().map_or(true, |(b, _)| block > *b) {
                best = Some((block, entry.path()));
            }
        }

        Ok(best.map(|(_, path)| path))
    }

    /// Load prior progress, if any.
    ///
    /// Returns the checkpoint plus the cached events, which are authoritative
    /// for the already-scanned range; the caller only requests
    /// `[last_scanned_block + 1, target]` from the scanner.
    pub fn load(&mut self) -> Result<Option<(ScanCheckpoint, Vec<TransferEvent>)>> {
        let Some(path) = self.find_latest_file()? else {
            return Ok(None);
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| CheckpointError::ReadError(format!("{}: {}", path.display(), e)))?;
        let state: CheckpointState = serde_json::from_str(&content)
            .map_err(|e| CheckpointError::Corrupted(format!("{}: {}", path.display(), e)))?;

        if state.checkpoint.token_address != self.token || state.checkpoint.chain_id != self.chain_id
        {
            return Err(CheckpointError::Corrupted(format!(
                "{} does not match token {:#x} on chain {}",
                path.display(),
                self.token,
                self.chain_id
            ))
            .into());
        }

        let checkpoint = state.checkpoint;
        let events = state.events.clone();
        self.state = Some(state);
        self.current_file = Some(path);

        Ok(Some((checkpoint, events)))
    }

    /// Current checkpoint, if any progress has been recorded or loaded.
    pub fn checkpoint(&self) -> Option<ScanCheckpoint> {
        self.state.as_ref().map(|s| s.checkpoint)
    }

    /// Atomically persist newly fetched events and the advanced checkpoint.
    ///
    /// `new_last_block` must not regress; the scanner only calls this after a
    /// contiguous window frontier completed.
    pub fn append(&mut self, events: &[TransferEvent], new_last_block: u64) -> Result<()> {
        let final_path = self.dir.join(self.file_name(new_last_block));
        let tmp_path = self.dir.join(format!(".{}.tmp", self.file_name(new_last_block)));

        let state = self.state.get_or_insert_with(|| CheckpointState {
            checkpoint: ScanCheckpoint {
                token_address: self.token,
                chain_id: self.chain_id,
                last_scanned_block: 0,
                event_count: 0,
            },
            events: Vec::new(),
        });

        if new_last_block < state.checkpoint.last_scanned_block {
            return Err(CheckpointError::WriteError(format!(
                "checkpoint regression: {} < {}",
                new_last_block, state.checkpoint.last_scanned_block
            ))
            .into());
        }

        state.events.extend_from_slice(events);
        state.checkpoint.last_scanned_block = new_last_block;
        state.checkpoint.event_count = state.events.len() as u64;

        let content = serde_json::to_string(state)?;
        std::fs::write(&tmp_path, content)
            .map_err(|e| CheckpointError::WriteError(format!("{}: {}", tmp_path.display(), e)))?;
        std::fs::rename(&tmp_path, &final_path)
            .map_err(|e| CheckpointError::WriteError(format!("{}: {}", final_path.display(), e)))?;

        // Durable under the new name; the superseded file can go.
        if let Some(old) = self.current_file.take() {
            if old != final_path {
                let _ = std::fs::remove_file(&old);
            }
        }
        self.current_file = Some(final_path);

        Ok(())
    }

    /// Path of the current checkpoint file, if one exists on disk.
    pub fn current_file(&self) -> Option<&Path> {
        self.current_file.as_deref()
    }
}
