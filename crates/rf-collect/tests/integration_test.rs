// Copyright 2025-Present rf-collect contributors
// SPDX-License-Identifier: Apache-2.0

use mockito::{Matcher, Server};
use rf_collect::{
    collector::{RfCollector, RfCollectorConfig},
    forwarder::{HassConfig, HassForwarder},
    registry::DeviceRegistry,
};
use serde_json::json;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::{
    net::UdpSocket,
    task::JoinHandle,
    time::{sleep, timeout, Duration},
};
use tokio_util::sync::CancellationToken;

const NODES: &str = r#"
[8416]
name = "rdu_lne"
friendly_name_prefix = "Living Room"

[[8416.sensors]]
data_name = "temperature_C"
attributes = { device_class = "temperature" }
"#;

async fn start_collector(
    hass_url: String,
    data_dir: &Path,
) -> (
    SocketAddr,
    CancellationToken,
    JoinHandle<Result<(), rf_collect::errors::CollectorError>>,
) {
    let config = RfCollectorConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        data_dir: data_dir.to_path_buf(),
        forward_interval_secs: 60,
    };
    let forwarder = HassForwarder::new(HassConfig {
        url: hass_url,
        token: "mock-token".to_string(),
        timeout: Duration::from_secs(5),
    })
    .expect("failed to create forwarder");
    let registry = DeviceRegistry::from_toml_str(NODES).expect("failed to parse registry");

    let cancel_token = CancellationToken::new();
    let collector = RfCollector::new(&config, registry, Arc::new(forwarder), cancel_token.clone())
        .await
        .expect("failed to bind collector");
    let addr = collector.local_addr().expect("collector has no address");

    (addr, cancel_token, tokio::spawn(collector.spin()))
}

async fn send(addr: SocketAddr, datagram: &str) {
    let socket = UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("unable to bind UDP socket");
    socket
        .send_to(datagram.as_bytes(), addr)
        .await
        .expect("unable to send datagram");
}

#[tokio::test]
async fn collector_forwards_known_device_once_per_interval() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/states/sensor.rf_rdu_lne_temperature")
        .match_header("authorization", "Bearer mock-token")
        .match_body(Matcher::Json(json!({
            "state": 21.5,
            "attributes": {
                "device_class": "temperature",
                "friendly_name": "Living Room Temperature"
            }
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let data_dir = tempfile::tempdir().expect("failed to create temp dir");
    let (addr, cancel_token, _task) = start_collector(server.url(), data_dir.path()).await;

    send(
        addr,
        r#"<30>1 2024-06-14T12:00:00+02:00 altserv rtl_433 - - - {"time":"2024-06-14 12:00:00","model":"Acurite-Tower","id":8416,"temperature_C":21.5}"#,
    )
    .await;

    let wait = async {
        while !mock.matched_async().await {
            sleep(Duration::from_millis(50)).await;
        }
    };
    if timeout(Duration::from_millis(2000), wait).await.is_err() {
        panic!("timed out before the state sink received the reading");
    }

    // Within the interval: dropped, not queued
    send(addr, r#"{"model":"Acurite-Tower","id":8416,"temperature_C":22.0}"#).await;
    sleep(Duration::from_millis(200)).await;
    mock.assert_async().await;

    cancel_token.cancel();
}

#[tokio::test]
async fn collector_does_not_forward_unknown_or_malformed() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .with_status(200)
        .expect(0)
        .create_async()
        .await;

    let data_dir = tempfile::tempdir().expect("failed to create temp dir");
    let (addr, cancel_token, _task) = start_collector(server.url(), data_dir.path()).await;

    send(addr, r#"{"model":"Y","id":99999}"#).await;
    send(addr, "not valid json").await;
    send(addr, r#"{"id":8416,"temperature_C":21.5}"#).await;
    sleep(Duration::from_millis(200)).await;

    mock.assert_async().await;
    cancel_token.cancel();
}

#[tokio::test]
async fn collector_stops_after_next_datagram_when_cancelled() {
    let server = Server::new_async().await;
    let data_dir = tempfile::tempdir().expect("failed to create temp dir");
    let (addr, cancel_token, task) = start_collector(server.url(), data_dir.path()).await;

    cancel_token.cancel();
    send(addr, r#"{"model":"Y","id":1}"#).await;

    let result = timeout(Duration::from_millis(2000), task)
        .await
        .expect("collector did not stop")
        .expect("collector task panicked");
    assert!(result.is_ok());
}
