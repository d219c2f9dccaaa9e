//! CSV report writers

use crate::classify::ClassifiedTransfer;
use crate::error::{OutputError, Result};
use crate::holders::HolderRecord;
use crate::output::format_token_amount;
use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    Ok(if let Some(p) = path {
        let file = File::create(p)
            .map_err(|e| OutputError::FileCreate(format!("{}: {}", p.display(), e)))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    })
}

/// Ledger report writer: one row per classified transfer
pub struct LedgerWriter {
    writer: csv::Writer<Box<dyn Write + Send>>,
    decimals: u8,
}

impl LedgerWriter {
    /// Write to `path`, or stdout when no path is given.
    pub fn new(path: Option<&Path>, decimals: u8) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(open_output(path)?);
        writer
            .write_record(["label", "amount", "from", "to"])
            .map_err(|e| OutputError::CsvWrite(e.to_string()))?;

        Ok(Self { writer, decimals })
    }

    /// Append rows in the given (event) order.
    pub fn write_rows(&mut self, rows: &[ClassifiedTransfer]) -> Result<()> {
        for row in rows {
            self.writer
                .write_record([
                    row.label.as_str().to_string(),
                    format_token_amount(row.amount, self.decimals),
                    format!("{:#x}", row.from),
                    format!("{:#x}", row.to),
                ])
                .map_err(|e| OutputError::CsvWrite(e.to_string()))?;
        }
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::CsvWrite(e.to_string()))?;
        Ok(())
    }
}

/// Snapshot report writer: one row per holder
pub struct HolderWriter {
    writer: csv::Writer<Box<dyn Write + Send>>,
    decimals: u8,
}

impl HolderWriter {
    /// Write to `path`, or stdout when no path is given.
    pub fn new(path: Option<&Path>, decimals: u8) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(open_output(path)?);
        writer
            .write_record(["address", "balance", "percentage"])
            .map_err(|e| OutputError::CsvWrite(e.to_string()))?;

        Ok(Self { writer, decimals })
    }

    /// Append rows in the given (balance-descending) order.
    pub fn write_rows(&mut self, rows: &[HolderRecord]) -> Result<()> {
        for row in rows {
            self.writer
                .write_record([
                    format!("{:#x}", row.address),
                    format_token_amount(row.balance, self.decimals),
                    row.percentage.to_string(),
                ])
                .map_err(|e| OutputError::CsvWrite(e.to_string()))?;
        }
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::CsvWrite(e.to_string()))?;
        Ok(())
    }
}

/// Sidecar metadata written next to a snapshot report
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMetadata {
    pub generated_at: DateTime<Utc>,
    pub chain_id: u64,
    pub token_address: Address,
    pub snapshot_block: u64,
}

impl SnapshotMetadata {
    pub fn new(chain_id: u64, token_address: Address, snapshot_block: u64) -> Self {
        Self {
            generated_at: Utc::now(),
            chain_id,
            token_address,
            snapshot_block,
        }
    }

    /// Write `<report>.meta.json` next to the report file.
    pub fn write_sidecar(&self, report_path: &Path) -> Result<PathBuf> {
        let path = report_path.with_extension("meta.json");
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .map_err(|e| OutputError::FileCreate(format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }
}
