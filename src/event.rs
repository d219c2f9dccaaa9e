//! Transfer event model and log decoding

use crate::error::{Result, RpcError};
use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;
use serde::{Deserialize, Serialize};

sol! {
    /// Canonical ERC-20 transfer event
    event Transfer(address indexed from, address indexed to, uint256 value);
}

/// topic0 for `Transfer(address,address,uint256)`
pub fn transfer_topic() -> B256 {
    Transfer::SIGNATURE_HASH
}

/// A normalized on-chain token transfer.
///
/// Identity key is `(tx_hash, log_index)`; duplicates across overlapping
/// batch windows are discarded by this key. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub tx_hash: B256,
    pub log_index: u64,
    pub block_number: u64,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

/// Identity key of a [`TransferEvent`]
pub type EventKey = (B256, u64);

impl TransferEvent {
    pub fn key(&self) -> EventKey {
        (self.tx_hash, self.log_index)
    }

    /// Decode a raw log into a transfer event.
    ///
    /// Logs from `eth_getLogs` on a canonical head always carry block and
    /// transaction metadata; its absence is an invalid response, not a
    /// pending log.
    pub fn from_log(log: &Log) -> Result<Self> {
        let decoded = Transfer::decode_log(&log.inner, true)
            .map_err(|e| RpcError::InvalidResponse(format!("undecodable transfer log: {}", e)))?;

        let tx_hash = log
            .transaction_hash
            .ok_or_else(|| RpcError::InvalidResponse("log missing transaction hash".to_string()))?;
        let log_index = log
            .log_index
            .ok_or_else(|| RpcError::InvalidResponse("log missing log index".to_string()))?;
        let block_number = log
            .block_number
            .ok_or_else(|| RpcError::InvalidResponse("log missing block number".to_string()))?;

        Ok(Self {
            tx_hash,
            log_index,
            block_number,
            from: decoded.data.from,
            to: decoded.data.to,
            amount: decoded.data.value,
        })
    }

    /// True when the other record shares this identity key but disagrees on
    /// payload — an upstream inconsistency, not a benign overlap duplicate.
    pub fn conflicts_with(&self, other: &TransferEvent) -> bool {
        self.key() == other.key() && self != other
    }
}
