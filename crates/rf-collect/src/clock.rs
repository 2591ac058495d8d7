// Copyright 2025-Present rf-collect contributors
// SPDX-License-Identifier: Apache-2.0

//! Wall-clock access for the ingestion loop.
//!
//! Rate limiting works on epoch seconds while the unknown-device rollover works on
//! local calendar dates, so both are read from the same instant.

use chrono::{DateTime, Local, NaiveDate};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    fn epoch_seconds(&self) -> i64 {
        self.now().timestamp()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
