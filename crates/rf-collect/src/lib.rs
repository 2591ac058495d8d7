// Copyright 2025-Present rf-collect contributors
// SPDX-License-Identifier: Apache-2.0

//! Collector for rtl_433 RF sensor telemetry.
//!
//! Datagrams arrive over UDP wrapped in syslog framing, are matched against a
//! registry of known devices and forwarded to Home Assistant. Unrecognized devices
//! are logged to a daily file for triage.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod clock;
pub mod collector;
pub mod config;
pub mod constants;
pub mod errors;
pub mod forwarder;
pub mod payload;
pub mod registry;
pub mod syslog;
pub mod unknown;
