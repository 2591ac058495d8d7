// Copyright 2025-Present rf-collect contributors
// SPDX-License-Identifier: Apache-2.0

//! Buffer for payloads from devices that are not in the registry.
//!
//! Records accumulate in memory during a calendar day. The first rollover check that
//! observes a new date appends them to `unknown_devs_<day>.csv`, where `<day>` is the
//! date being rolled out of, and starts a fresh buffer.

use crate::constants::{UNKNOWN_DEVICES_DELIMITER, UNKNOWN_DEVICES_FILE_PREFIX};
use crate::errors::PersistenceError;
use crate::payload::Payload;
use chrono::NaiveDate;
use serde_json::Value;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct UnknownDeviceBuffer {
    data_dir: PathBuf,
    records: Vec<Payload>,
    day: NaiveDate,
}

impl UnknownDeviceBuffer {
    pub fn new(data_dir: impl Into<PathBuf>, today: NaiveDate) -> Self {
        Self {
            data_dir: data_dir.into(),
            records: Vec::new(),
            day: today,
        }
    }

    pub fn record_unknown(&mut self, payload: Payload) {
        self.records.push(payload);
    }

    pub fn records(&self) -> &[Payload] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Date of the records currently buffered.
    pub fn day(&self) -> NaiveDate {
        self.day
    }

    /// File the current buffer will be flushed to.
    pub fn path(&self) -> PathBuf {
        path_for(&self.data_dir, self.day)
    }

    /// Flushes and resets the buffer if `today` differs from the buffered day.
    ///
    /// Returns the path written to, if anything was flushed. The buffered day advances
    /// on every date change, whether or not there was anything to flush. On error the
    /// buffer and its day are left untouched.
    pub fn roll_over(&mut self, today: NaiveDate) -> Result<Option<PathBuf>, PersistenceError> {
        if today == self.day {
            return Ok(None);
        }

        let flushed = if self.records.is_empty() {
            None
        } else {
            debug!(
                "Saving {} unknown devices to {}",
                self.records.len(),
                self.path().display()
            );
            let path = self.flush()?;
            self.records.clear();
            Some(path)
        };
        self.day = today;
        Ok(flushed)
    }

    fn flush(&self) -> Result<PathBuf, PersistenceError> {
        let path = self.path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| PersistenceError::Open {
                path: path.clone(),
                source,
            })?;
        let is_new = file
            .metadata()
            .map(|meta| meta.len() == 0)
            .map_err(|source| PersistenceError::Open {
                path: path.clone(),
                source,
            })?;

        let columns = columns(&self.records);
        let mut writer = csv::WriterBuilder::new()
            .delimiter(UNKNOWN_DEVICES_DELIMITER)
            .has_headers(false)
            .from_writer(file);

        let write_err = |source| PersistenceError::Write {
            path: path.clone(),
            source,
        };
        if is_new {
            writer.write_record(&columns).map_err(write_err)?;
        }
        for record in &self.records {
            let row = columns
                .iter()
                .map(|column| record.get(column.as_str()).map(cell).unwrap_or_default());
            writer.write_record(row).map_err(write_err)?;
        }
        writer.flush().map_err(|source| PersistenceError::Flush {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

pub fn path_for(data_dir: &Path, day: NaiveDate) -> PathBuf {
    data_dir.join(format!(
        "{}_{}.csv",
        UNKNOWN_DEVICES_FILE_PREFIX,
        day.format("%F")
    ))
}

// Union of all keys, in the order they were first seen.
fn columns(records: &[Payload]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for key in records.iter().flat_map(|record| record.keys()) {
        if !columns.iter().any(|c| c == key) {
            columns.push(key.clone());
        }
    }
    columns
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
