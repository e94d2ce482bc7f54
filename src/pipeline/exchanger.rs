use std::sync::Arc;
use std::time::Duration;

use async_channel::Receiver;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::batch::StreamBatch;
use crate::labels::LabelSet;
use crate::stream::PackedLogEntry;
use crate::transport::{Transport, TransportError};

const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Invoked with every failed push. The batch it belonged to is already dropped.
pub type ErrorCallback = Arc<dyn Fn(TransportError) + Send + Sync>;

pub fn default_error_callback() -> ErrorCallback {
    Arc::new(|err: TransportError| {
        error!(error = %err, "Failed to perform logs exchange with Loki, batch dropped");
    })
}

#[derive(Debug, Clone)]
pub struct ExchangerConfig {
    pub batch_size: usize,
    pub batch_timeout: Duration,
}

impl Default for ExchangerConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_timeout: Duration::from_secs(5),
        }
    }
}

/// Background worker owning the stream batch. It is the only consumer of the
/// ingestion queue and the only caller of `Transport::push`.
pub struct Exchanger {
    config: ExchangerConfig,
    receiver: Receiver<PackedLogEntry>,
    stop: oneshot::Receiver<()>,
    done: watch::Sender<bool>,
    transport: Arc<dyn Transport>,
    on_error: ErrorCallback,
    batch: StreamBatch,
}

impl Exchanger {
    pub fn new(
        config: ExchangerConfig,
        default_labels: LabelSet,
        receiver: Receiver<PackedLogEntry>,
        stop: oneshot::Receiver<()>,
        done: watch::Sender<bool>,
        transport: Arc<dyn Transport>,
        on_error: ErrorCallback,
    ) -> Self {
        Self {
            config,
            receiver,
            stop,
            done,
            transport,
            on_error,
            batch: StreamBatch::new(default_labels),
        }
    }

    pub async fn run(mut self) {
        info!(
            batch_size = self.config.batch_size,
            batch_timeout_ms = self.config.batch_timeout.as_millis() as u64,
            "Exchange loop running"
        );

        let timer = tokio::time::sleep_until(self.next_deadline());
        tokio::pin!(timer);

        // Queued entries win over the stop request: everything enqueued before
        // close() is routed into the batch before the final flush.
        loop {
            tokio::select! {
                biased;

                received = self.receiver.recv() => match received {
                    Ok(packed) => {
                        self.batch.add(packed);

                        if self.batch.count_entries() >= self.config.batch_size {
                            self.flush().await;
                            timer.as_mut().reset(self.next_deadline());
                        }
                    }
                    Err(_) => {
                        debug!("Ingestion queue closed");
                        break;
                    }
                },

                () = &mut timer => {
                    if !self.batch.is_empty() {
                        self.flush().await;
                    }

                    timer.as_mut().reset(self.next_deadline());
                }

                request = &mut self.stop => {
                    match request {
                        Ok(()) => debug!("Stop requested"),
                        Err(_) => debug!("Client dropped without close"),
                    }
                    break;
                }
            }
        }

        info!(
            buffered = self.batch.count_entries(),
            "Exchange loop stopping"
        );

        if !self.batch.is_empty() {
            self.flush().await;
        }

        // Closers wait on this flag, not on the loop task
        self.done.send_replace(true);

        info!("Exchange loop stopped");
    }

    /// Next timer flush. Timeouts too large for the clock saturate to a
    /// deadline that never comes in practice.
    fn next_deadline(&self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.config.batch_timeout)
            .unwrap_or_else(|| now + FAR_FUTURE)
    }

    async fn flush(&mut self) {
        let entries = self.batch.count_entries();
        let start = Instant::now();

        match self.transport.push(self.batch.streams()).await {
            Ok(()) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                debug!(entries, elapsed_ms, "Flushed batch");
            }
            Err(e) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                debug!(entries, elapsed_ms, "Batch push failed");
                (self.on_error)(e);
            }
        }

        self.batch.reset();
    }
}
