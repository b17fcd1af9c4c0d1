//! Append-only CSV audit trail of signals and completed positions
//!
//! The running process never reads this file back.

use crate::error::AuditError;
use crate::models::position::{Completion, OpenPosition};
use crate::positions::tracker::Entry;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditEvent {
    Signal,
    Completed,
}

#[derive(Debug, Serialize)]
struct AuditRow<'a> {
    event: AuditEvent,
    timestamp: String,
    symbol: &'a str,
    rsi: String,
    price: f64,
    entry_price: Option<f64>,
    exit_price: Option<f64>,
    duration_seconds: Option<i64>,
    drop_percent: Option<f64>,
    reference_price_entry: Option<f64>,
    reference_price_exit: Option<f64>,
}

const HEADER: [&str; 11] = [
    "event",
    "timestamp",
    "symbol",
    "rsi",
    "price",
    "entry_price",
    "exit_price",
    "duration_seconds",
    "drop_percent",
    "reference_price_entry",
    "reference_price_exit",
];

pub struct AuditLog {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl AuditLog {
    /// Open `path` for appending, writing the header when the file is new
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_signal(&mut self, entry: &Entry) -> Result<(), AuditError> {
        self.append(AuditRow {
            event: AuditEvent::Signal,
            timestamp: timestamp(entry.time),
            symbol: &entry.symbol,
            rsi: entry.rsi.to_string(),
            price: entry.price,
            entry_price: None,
            exit_price: None,
            duration_seconds: None,
            drop_percent: None,
            reference_price_entry: entry.reference_price,
            reference_price_exit: None,
        })
    }

    pub fn record_completion(
        &mut self,
        position: &OpenPosition,
        completion: &Completion,
        reference_price_exit: Option<f64>,
    ) -> Result<(), AuditError> {
        self.append(AuditRow {
            event: AuditEvent::Completed,
            timestamp: timestamp(completion.exit_time),
            symbol: &completion.symbol,
            rsi: position.rsi_at_entry.to_string(),
            price: completion.exit_price,
            entry_price: Some(completion.entry_price),
            exit_price: Some(completion.exit_price),
            duration_seconds: Some(completion.elapsed.num_seconds()),
            drop_percent: Some(completion.drop_percent),
            reference_price_entry: position.reference_price_at_entry,
            reference_price_exit,
        })
    }

    fn append(&mut self, row: AuditRow<'_>) -> Result<(), AuditError> {
        self.writer.serialize(row)?;
        self.writer.flush()?;
        Ok(())
    }
}

fn timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
