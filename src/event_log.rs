// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Detection event log and spreadsheet export.
//!
//! One record per detection-positive cycle, append-only for the session. Negative cycles
//! are not recorded; they only produce the transient [`Alert::NoFire`] text.

use std::fmt;
use std::path::Path;

use chrono::{Datelike, NaiveDateTime, Timelike};
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, Workbook, XlsxError};
use tracing::info;

use crate::error::{FireError, Result};

pub const EXPORT_FILE: &str = "fire_detection_log.xlsx";
pub const FIRE_STATUS: &str = "Fire detected";
pub const NO_FIRE_TEXT: &str = "No fire detected";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Whole seconds; fixed when the cycle is recorded.
    pub timestamp: NaiveDateTime,
    pub status: String,
}

impl EventRecord {
    pub fn timestamp_string(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Text surfaced in the alert pane after a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Fire { at: NaiveDateTime },
    NoFire,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::Fire { at } => write!(f, "{} - {}", at.format(TIMESTAMP_FORMAT), FIRE_STATUS),
            Alert::NoFire => f.write_str(NO_FIRE_TEXT),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one cycle. At most one record is appended, however many boxes the
    /// cycle produced.
    pub fn record(&mut self, timestamp: NaiveDateTime, has_detection: bool) -> Alert {
        if !has_detection {
            return Alert::NoFire;
        }
        let at = timestamp.with_nanosecond(0).unwrap_or(timestamp);
        self.records.push(EventRecord {
            timestamp: at,
            status: FIRE_STATUS.to_string(),
        });
        Alert::Fire { at }
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Writes the whole log, oldest first, overwriting `path`.
    ///
    /// The workbook's creation time is taken from the first record, so exporting an
    /// unchanged log twice yields identical bytes.
    pub fn export(&self, path: &Path) -> Result<()> {
        self.write_workbook(path).map_err(|source| FireError::Export {
            path: path.to_path_buf(),
            source,
        })?;
        info!("💾 {} detection events exported to {}", self.records.len(), path.display());
        Ok(())
    }

    fn write_workbook(&self, path: &Path) -> std::result::Result<(), XlsxError> {
        let mut workbook = Workbook::new();
        let properties = DocProperties::new()
            .set_title("Fire detection log")
            .set_creation_datetime(&self.creation_datetime()?);
        workbook.set_properties(&properties);

        let header = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Detections")?;
        sheet.write_string_with_format(0, 0, "Timestamp", &header)?;
        sheet.write_string_with_format(0, 1, "Status", &header)?;
        sheet.set_column_width(0, 22)?;
        sheet.set_column_width(1, 16)?;

        for (row, record) in self.records.iter().enumerate() {
            let row = row as u32 + 1;
            sheet.write_string(row, 0, record.timestamp_string())?;
            sheet.write_string(row, 1, &record.status)?;
        }

        workbook.save(path)
    }

    fn creation_datetime(&self) -> std::result::Result<ExcelDateTime, XlsxError> {
        match self.records.first() {
            Some(first) => {
                let t = first.timestamp;
                ExcelDateTime::from_ymd(t.year() as u16, t.month() as u8, t.day() as u8)?.and_hms(
                    t.hour() as u16,
                    t.minute() as u8,
                    t.second() as f64,
                )
            }
            None => ExcelDateTime::from_ymd(2000, 1, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_milli_opt(h, m, s, 250)
            .unwrap()
    }

    #[test]
    fn negative_cycle_appends_nothing() {
        let mut log = EventLog::new();
        let alert = log.record(at(10, 0, 0), false);
        assert_eq!(alert.to_string(), "No fire detected");
        assert!(log.is_empty());
    }

    #[test]
    fn positive_cycle_appends_one_record_at_whole_seconds() {
        let mut log = EventLog::new();
        let alert = log.record(at(10, 0, 1), true);
        assert_eq!(alert.to_string(), "2024-05-17 10:00:01 - Fire detected");
        assert_eq!(log.len(), 1);
        assert_eq!(log.records()[0].status, FIRE_STATUS);
        assert_eq!(log.records()[0].timestamp_string(), "2024-05-17 10:00:01");
    }

    #[test]
    fn export_overwrites_and_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EXPORT_FILE);
        std::fs::write(&path, b"stale").unwrap();

        let mut log = EventLog::new();
        log.record(at(9, 30, 0), true);
        log.record(at(9, 30, 5), true);

        log.export(&path).unwrap();
        let first = std::fs::read(&path).unwrap();
        log.export(&path).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_ne!(first, b"stale");
        assert_eq!(first, second);
        // xlsx is a zip container
        assert_eq!(&first[..2], b"PK");
    }

    #[test]
    fn export_to_missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir").join(EXPORT_FILE);
        let err = EventLog::new().export(&path).unwrap_err();
        assert!(matches!(err, FireError::Export { .. }), "{err:?}");
    }
}
