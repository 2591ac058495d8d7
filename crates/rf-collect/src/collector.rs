// Copyright 2025-Present rf-collect contributors
// SPDX-License-Identifier: Apache-2.0

//! RF sensor ingestion loop.
//!
//! The collector owns a UDP socket that rtl_433 syslogs to. Every datagram is
//! unwrapped from its syslog frame, decoded as JSON and classified against the
//! device registry. Readings from known devices are forwarded to the state sink at
//! most once per forward interval per device; everything else is buffered and written
//! to a dated file when the calendar day rolls over.
//!
//! Datagrams are processed one at a time, in arrival order. The cancellation token is
//! checked before each receive, so shutdown takes effect once the in-flight datagram
//! has been handled. Buffered unknown devices are not written out on shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::constants::BUFFER_SIZE;
use crate::errors::{CollectorError, PersistenceError};
use crate::forwarder::Forwarder;
use crate::payload::{classify, Classified, Payload};
use crate::registry::{DeviceRegistry, SensorReading};
use crate::syslog;
use crate::unknown::UnknownDeviceBuffer;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// Configuration for the collector
pub struct RfCollectorConfig {
    /// Host to bind UDP socket to (e.g., "0.0.0.0")
    pub host: String,
    /// Port rtl_433 sends syslog datagrams to (e.g., 1433)
    pub port: u16,
    /// Directory receiving the daily unknown-device files
    pub data_dir: PathBuf,
    /// Minimum seconds between two forwards for the same device
    pub forward_interval_secs: i64,
}

// BufferReader abstracts where datagrams come from.
enum BufferReader {
    UdpSocket(tokio::net::UdpSocket),

    /// Mirror reader for testing - replays a fixed buffer
    #[allow(dead_code)]
    MirrorTest(Vec<u8>, SocketAddr),
}

impl BufferReader {
    async fn read(&self) -> std::io::Result<(Vec<u8>, SocketAddr)> {
        match self {
            BufferReader::UdpSocket(socket) => {
                let mut buf = [0; BUFFER_SIZE];
                let (amt, src) = socket.recv_from(&mut buf).await?;
                Ok((buf[..amt].to_owned(), src))
            }
            BufferReader::MirrorTest(data, src) => Ok((data.clone(), *src)),
        }
    }
}

/// Receives rtl_433 datagrams and routes them to the forwarder or the unknown-device log.
pub struct RfCollector {
    cancel_token: CancellationToken,
    buffer_reader: BufferReader,
    registry: DeviceRegistry,
    unknown_devices: UnknownDeviceBuffer,
    forwarder: Arc<dyn Forwarder>,
    clock: Arc<dyn Clock>,
    forward_interval_secs: i64,
}

impl RfCollector {
    /// Binds the UDP socket and takes ownership of the registry.
    pub async fn new(
        config: &RfCollectorConfig,
        registry: DeviceRegistry,
        forwarder: Arc<dyn Forwarder>,
        cancel_token: CancellationToken,
    ) -> Result<RfCollector, CollectorError> {
        let addr = format!("{}:{}", config.host, config.port);
        debug!("Establishing socket on {}", addr);
        let socket = tokio::net::UdpSocket::bind(&addr)
            .await
            .map_err(|source| CollectorError::Bind { addr, source })?;

        Ok(Self::with_parts(
            BufferReader::UdpSocket(socket),
            config,
            registry,
            forwarder,
            Arc::new(SystemClock),
            cancel_token,
        ))
    }

    fn with_parts(
        buffer_reader: BufferReader,
        config: &RfCollectorConfig,
        mut registry: DeviceRegistry,
        forwarder: Arc<dyn Forwarder>,
        clock: Arc<dyn Clock>,
        cancel_token: CancellationToken,
    ) -> Self {
        registry.start(clock.epoch_seconds());
        let unknown_devices = UnknownDeviceBuffer::new(&config.data_dir, clock.today());
        RfCollector {
            cancel_token,
            buffer_reader,
            registry,
            unknown_devices,
            forwarder,
            clock,
            forward_interval_secs: config.forward_interval_secs,
        }
    }

    /// Local address of the bound socket, if listening on UDP.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.buffer_reader {
            BufferReader::UdpSocket(socket) => socket.local_addr().ok(),
            BufferReader::MirrorTest(..) => None,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn unknown_devices(&self) -> &UnknownDeviceBuffer {
        &self.unknown_devices
    }

    /// Main loop, runs until the cancellation token is observed or a fatal error occurs.
    pub async fn spin(mut self) -> Result<(), CollectorError> {
        debug!("Beginning loop!");
        while !self.cancel_token.is_cancelled() {
            self.consume().await?;
        }
        debug!("Collection ended.");
        Ok(())
    }

    /// Receive and process one datagram.
    async fn consume(&mut self) -> Result<(), CollectorError> {
        let (buf, src) = self
            .buffer_reader
            .read()
            .await
            .map_err(CollectorError::Receive)?;
        trace!("Received {} bytes from {}", buf.len(), src);
        self.process_datagram(&buf).await
    }

    /// Runs the rollover check, then decodes, classifies and routes one datagram.
    pub async fn process_datagram(&mut self, buf: &[u8]) -> Result<(), CollectorError> {
        self.check_rollover()?;

        let line = syslog::decode(buf);
        let classified = match classify(&line, &self.registry) {
            Ok(classified) => classified,
            Err(e) => {
                error!("Unable to parse this object. Skipping. {}: {}", e, line);
                return Ok(());
            }
        };

        match classified {
            Classified::Known {
                id,
                model,
                time,
                payload,
            } => {
                let time = time.unwrap_or(Value::Null);
                debug!("Receiving from device: {} ({}) at {}", model, id, time);
                self.forward_known(id, &payload).await?;
            }
            Classified::UnknownDevice { id, model, payload } => {
                let id = id.unwrap_or(Value::Null);
                info!(
                    "Unknown device found: {}: ({})\n{}",
                    model,
                    id,
                    render(&payload)
                );
                self.unknown_devices.record_unknown(payload);
            }
            Classified::SchemaIncomplete(payload) => {
                info!("Skipping, missed \"model\" key: {}", render(&payload));
                self.unknown_devices.record_unknown(payload);
            }
        }
        Ok(())
    }

    async fn forward_known(&mut self, id: u64, payload: &Payload) -> Result<(), CollectorError> {
        let now = self.clock.epoch_seconds();
        let Some(device) = self.registry.get(id) else {
            return Ok(());
        };
        debug!("Device identified. Name: {}.", device.name);

        if !device.forward_due(now, self.forward_interval_secs) {
            debug!("Interval not lapsed for {}, dropping datagram", device.name);
            return Ok(());
        }

        let readings: Vec<SensorReading> = device
            .sensors
            .iter()
            .filter_map(|sensor| {
                let reading = device.reading(sensor, payload);
                if reading.is_none() {
                    info!(
                        "Skipped sensor {}, as it wasn't in the list of data keys offered: {}",
                        sensor.data_name,
                        payload.keys().map(String::as_str).collect::<Vec<_>>().join(",")
                    );
                }
                reading
            })
            .collect();

        if readings.is_empty() {
            return Ok(());
        }
        debug!("Interval lapsed. Sending {} measurements...", readings.len());
        for reading in &readings {
            self.forwarder.set_state(reading).await?;
        }
        if let Some(device) = self.registry.get_mut(id) {
            device.record_forward(now);
        }
        Ok(())
    }

    fn check_rollover(&mut self) -> Result<(), PersistenceError> {
        if let Some(path) = self.unknown_devices.roll_over(self.clock.today())? {
            info!("Saved unknown devices to {}", path.display());
        }
        Ok(())
    }
}

fn render(payload: &Payload) -> String {
    serde_json::to_string_pretty(payload).unwrap_or_default()
}
