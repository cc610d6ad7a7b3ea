//! Append-only attendance log.
//!
//! A textual tabular file: header row `Name,ExternalID,Status,Time`, one
//! row per Present transition in transition order. Appends are synced to
//! disk before they count as applied; absence is implicit by omission.

use chrono::Local;
use rollcall_core::{AttendanceSink, Identity};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const LOG_HEADER: &str = "Name,ExternalID,Status,Time";
const STATUS_PRESENT: &str = "Present";

/// One persisted attendance row.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRecord {
    pub name: String,
    pub external_id: String,
    pub status: String,
    /// Wall-clock `HH:MM:SS` of the transition (not of frame capture).
    pub time: String,
}

impl AttendanceRecord {
    /// Build a Present record stamped with the current local time.
    pub fn present_now(identity: &Identity) -> Self {
        Self {
            name: identity.name.clone(),
            external_id: identity.external_id.clone(),
            status: STATUS_PRESENT.to_string(),
            time: Local::now().format("%H:%M:%S").to_string(),
        }
    }

    fn to_row(&self) -> String {
        format!(
            "{},{},{},{}",
            csv_field(&self.name),
            csv_field(&self.external_id),
            csv_field(&self.status),
            csv_field(&self.time)
        )
    }
}

/// Handle on the attendance CSV file.
#[derive(Debug, Clone)]
pub struct AttendanceLog {
    path: PathBuf,
}

impl AttendanceLog {
    /// Truncate the file and write the header row. Used at first startup
    /// and by the revert control surface.
    pub fn initialize(path: impl Into<PathBuf>) -> io::Result<Self> {
        let log = Self { path: path.into() };
        log.reset()?;
        Ok(log)
    }

    /// Open an existing log, writing the header only if the file is
    /// missing. Prior rows are kept; sessions append across restarts until
    /// an explicit revert.
    pub fn open_or_create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let log = Self { path: path.into() };
        if !log.path.exists() {
            log.reset()?;
        }
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Truncate back to exactly the header row.
    pub fn reset(&self) -> io::Result<()> {
        let mut file = File::create(&self.path)?;
        writeln!(file, "{LOG_HEADER}")?;
        file.sync_all()?;
        tracing::info!(path = %self.path.display(), "attendance log initialized");
        Ok(())
    }

    /// Append one record and sync it to disk before returning. When this
    /// returns Ok the row has hit storage; abrupt termination afterwards
    /// cannot lose it.
    pub fn append(&self, record: &AttendanceRecord) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", record.to_row())?;
        file.sync_all()?;
        tracing::debug!(
            name = %record.name,
            external_id = %record.external_id,
            time = %record.time,
            "attendance row appended"
        );
        Ok(())
    }
}

impl AttendanceSink for AttendanceLog {
    fn record_present(&mut self, identity: &Identity) -> io::Result<()> {
        self.append(&AttendanceRecord::present_now(identity))
    }
}

/// Quote a field when it contains a comma, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
