// Copyright 2025-Present rf-collect contributors
// SPDX-License-Identifier: Apache-2.0

/// Largest datagram read in a single receive call.
pub const BUFFER_SIZE: usize = 1024;

/// Minimum number of seconds between two forwards for the same device.
pub const DEFAULT_FORWARD_INTERVAL_SECS: i64 = 60;

/// Port rtl_433 is pointed at with `-F syslog::1433`.
pub const DEFAULT_PORT: u16 = 1433;

pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Device class used when a sensor does not declare one.
pub const UNKNOWN_DEVICE_CLASS: &str = "unk";

/// Maximum number of whitespace separated fields in a syslog line, the last being the payload.
pub const SYSLOG_FIELDS: usize = 8;

pub const UNKNOWN_DEVICES_FILE_PREFIX: &str = "unknown_devs";

pub const UNKNOWN_DEVICES_DELIMITER: u8 = b';';
