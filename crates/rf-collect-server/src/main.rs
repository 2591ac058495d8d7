// Copyright 2025-Present rf-collect contributors
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rf_collect::{
    collector::RfCollector,
    config::ServerConfig,
    forwarder::HassForwarder,
    registry::DeviceRegistry,
};
use tokio_util::sync::CancellationToken;

// Cancellation is only observed between datagrams; give up waiting after this long.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
const LOG_FILE_PREFIX: &str = "rf_collect.log";

/// Daily rolling, non-blocking writer under `log_dir`. The guard must outlive
/// every log call or buffered lines are lost.
fn file_writer(log_dir: &Path) -> std::io::Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(log_dir)?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

#[tokio::main]
pub async fn main() {
    let log_level = std::env::var("RF_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());
    let log_dir = std::env::var("RF_LOG_DIR")
        .ok()
        .filter(|val| !val.trim().is_empty())
        .map(PathBuf::from);

    let env_filter = format!("h2=off,hyper=off,reqwest=off,rustls=off,{}", log_level);

    let (file_layer, _log_guard, log_dir_error) = match log_dir.as_deref().map(file_writer) {
        Some(Ok((writer, guard))) => (
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true),
            ),
            Some(guard),
            None,
        ),
        Some(Err(e)) => (None, None, Some(e)),
        None => (None, None, None),
    };

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"))
        .with(
            fmt::layer()
                .with_level(true)
                .with_thread_names(false)
                .with_thread_ids(false)
                .with_line_number(false)
                .with_file(false)
                .with_target(true)
                .without_time(),
        )
        .with(file_layer);

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");
    if let (Some(dir), Some(e)) = (&log_dir, log_dir_error) {
        error!(
            "Unable to create log directory {}, logging to stdout only: {e}",
            dir.display()
        );
    }

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Error creating config on rf collector startup: {e}");
            return;
        }
    };

    let registry = match DeviceRegistry::from_path(&config.registry_path) {
        Ok(r) => r,
        Err(e) => {
            error!("Unable to load device registry: {e}");
            return;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        error!(
            "Unable to create data directory {}: {e}",
            config.data_dir.display()
        );
        return;
    }

    let forwarder = match HassForwarder::new(config.hass_config()) {
        Ok(f) => Arc::new(f),
        Err(e) => {
            error!("Unable to create Home Assistant forwarder: {e}");
            return;
        }
    };

    let cancel_token = CancellationToken::new();
    let collector = match RfCollector::new(
        &config.collector_config(),
        registry,
        forwarder,
        cancel_token.clone(),
    )
    .await
    {
        Ok(c) => c,
        Err(e) => {
            error!("Unable to start rf collector: {e}");
            return;
        }
    };
    info!(
        "rf-collect: listening on {}:{} with {} known devices",
        config.host,
        config.port,
        collector.registry().len()
    );

    let mut collector_task = tokio::spawn(collector.spin());

    tokio::select! {
        res = &mut collector_task => {
            match res {
                Ok(Ok(())) => debug!("Collector stopped"),
                Ok(Err(e)) => error!("Collector failed: {e}"),
                Err(e) => error!("Collector task failed: {e}"),
            }
            return;
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping collector");
            cancel_token.cancel();
        }
    }

    match timeout(SHUTDOWN_GRACE, collector_task).await {
        Ok(Ok(Ok(()))) => debug!("Collector stopped"),
        Ok(Ok(Err(e))) => error!("Collector failed during shutdown: {e}"),
        Ok(Err(e)) => error!("Collector task failed: {e}"),
        Err(_) => warn!("No datagram arrived within {SHUTDOWN_GRACE:?}, exiting"),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                error!("Unable to listen for SIGTERM: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
