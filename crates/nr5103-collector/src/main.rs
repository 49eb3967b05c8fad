//! NR5103 Collector
//!
//! Long-running daemon next to a Zyxel NR5103 cellular modem.
//!
//! - Logs in to the modem's web API and keeps the session cookie
//! - Polls `cellwan_status` on a fixed interval
//! - Normalizes the snapshot into LTE anchor / NR secondary observations
//! - Writes them, plus a ping latency sample, to InfluxDB v2

mod client;
mod collector;
mod config;
mod ping;
mod sink;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::client::Nr5103Client;
use crate::collector::{Collector, WRITE_QUEUE_CAPACITY, spawn_writer};
use crate::config::{Config, Overrides};
use crate::sink::InfluxWriter;

const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// NR5103 radio metrics collector.
#[derive(Parser, Debug)]
#[command(name = "nr5103-collector", about = "Collect NR5103 radio metrics into InfluxDB")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "NR5103_CONFIG")]
    config_file: Option<PathBuf>,

    /// Modem base URL.
    #[arg(long, env = "NR5103_URL")]
    url: Option<String>,

    /// Modem login user.
    #[arg(long, env = "NR5103_USERNAME")]
    username: Option<String>,

    /// Modem login password.
    #[arg(long, env = "NR5103_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// InfluxDB base URL.
    #[arg(long, env = "INFLUXDB_URL")]
    influxdb_url: Option<String>,

    /// InfluxDB API token.
    #[arg(long, env = "INFLUXDB_TOKEN", hide_env_values = true)]
    influxdb_token: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config_file.as_deref()).context("loading configuration")?;
    config.apply_overrides(Overrides {
        modem_url: cli.url,
        username: cli.username,
        password: cli.password,
        influxdb_url: cli.influxdb_url,
        influxdb_token: cli.influxdb_token,
    });

    tracing::info!(
        modem = %config.modem.url,
        influxdb = %config.influxdb.url,
        bucket = %config.influxdb.bucket,
        interval_ms = config.collector.interval.as_millis() as u64,
        ping_host = config.collector.ping_host.as_deref().unwrap_or("-"),
        "nr5103-collector starting"
    );

    // ── Modem session ───────────────────────────────────────────
    let modem = Nr5103Client::new(&config.modem)?;
    if let Err(e) = modem.connect().await {
        tracing::warn!(error = %e, "modem reachability check failed");
    }
    if let Some(path) = &config.modem.cookie_file {
        modem.load_cookies(path).await;
    }

    let session_key = modem
        .login()
        .await?
        .ok_or_else(|| anyhow::anyhow!("NR5103 login failed"))?;
    tracing::info!(modem = %modem.url(), "logged in");

    if let Some(path) = &config.modem.cookie_file {
        if let Err(e) = modem.store_cookies(path).await {
            tracing::warn!(error = %e, "could not persist session cookies");
        }
    }

    // ── Poll loop ───────────────────────────────────────────────
    let influx = InfluxWriter::new(&config.influxdb)?;
    let (queue, writer) = spawn_writer(influx, WRITE_QUEUE_CAPACITY);
    let collector = Collector::new(modem, queue, config.collector);

    tokio::select! {
        _ = collector.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
        }
    }

    // ── Shutdown ────────────────────────────────────────────────
    if let Err(e) = collector.source().logout(&session_key).await {
        tracing::warn!(error = %e, "logout failed");
    }

    // Closing the queue lets the writer finish what is already queued.
    drop(collector);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        tracing::warn!("pending observations not written before exit");
    }

    tracing::info!("nr5103-collector stopped");
    Ok(())
}
