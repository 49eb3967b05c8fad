//! Poll loop: fetch one snapshot, normalize, probe latency, queue.
//!
//! Writes happen on a separate task fed through a bounded channel, so a slow
//! or unreachable sink (retrying with backoff) never holds up polling. When
//! the queue is full new observations are dropped with a warning.

use chrono::Utc;
use nr5103_radio::Observation;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::client::StatusSource;
use crate::config::CollectorConfig;
use crate::ping;
use crate::sink::MetricsSink;

/// Observations allowed to wait for the writer.
pub const WRITE_QUEUE_CAPACITY: usize = 1024;

/// Spawn the writer task. It exits once every sender is dropped and the
/// queue is drained.
pub fn spawn_writer<M>(sink: M, capacity: usize) -> (mpsc::Sender<Observation>, JoinHandle<()>)
where
    M: MetricsSink + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(drain(sink, rx));
    (tx, handle)
}

async fn drain<M: MetricsSink>(sink: M, mut rx: mpsc::Receiver<Observation>) {
    while let Some(obs) = rx.recv().await {
        if let Err(e) = sink.write(&obs).await {
            tracing::warn!(
                measurement = obs.measurement(),
                role = obs.tag("role").unwrap_or("-"),
                error = %e,
                "dropping observation"
            );
        }
    }
    tracing::debug!("writer stopped");
}

pub struct Collector<S> {
    source: S,
    queue: mpsc::Sender<Observation>,
    config: CollectorConfig,
}

impl<S: StatusSource> Collector<S> {
    pub fn new(source: S, queue: mpsc::Sender<Observation>, config: CollectorConfig) -> Self {
        Self {
            source,
            queue,
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// One poll cycle. Returns how many observations were queued.
    ///
    /// A failed fetch skips the whole cycle. Never waits on the sink.
    pub async fn collect(&self) -> usize {
        let Some(status) = self.source.fetch_status().await else {
            tracing::warn!("no status snapshot this cycle");
            return 0;
        };

        let now = Utc::now();
        let mut observations = nr5103_radio::normalize(&status, now);

        if let Some(host) = &self.config.ping_host {
            match ping::probe(host, self.config.ping_timeout).await {
                Some(latency_ms) => observations.push(ping::observation(host, latency_ms, now)),
                None => tracing::debug!(host = %host, "no latency sample"),
            }
        }

        let produced = observations.len();
        let mut queued = 0;
        for obs in observations {
            match self.queue.try_send(obs) {
                Ok(()) => queued += 1,
                Err(TrySendError::Full(obs)) => tracing::warn!(
                    measurement = obs.measurement(),
                    "write queue full, dropping observation"
                ),
                Err(TrySendError::Closed(_)) => {
                    tracing::error!("writer task gone, dropping observations");
                    break;
                }
            }
        }
        tracing::debug!(produced, queued, "cycle complete");
        queued
    }

    /// Poll forever on the configured interval.
    ///
    /// Cycles never overlap: a slow cycle delays the next tick instead of
    /// bunching ticks up behind it.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_ms = self.config.interval.as_millis() as u64, "collector started");
        loop {
            ticker.tick().await;
            self.collect().await;
        }
    }
}
