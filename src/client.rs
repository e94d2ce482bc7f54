use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_channel::Sender;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::labels::{copy_labels, LabelSet};
use crate::level::Level;
use crate::pipeline::{default_error_callback, ErrorCallback, Exchanger, ExchangerConfig};
use crate::stream::{LogEntry, PackedLogEntry};
use crate::transport::loki::{normalize_address, LokiClient, LokiConfig};
use crate::transport::{Pong, Transport, TransportError};

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport is not set, no operations could be performed")]
    MissingTransport,

    #[error("Invalid Loki address: {0}")]
    InvalidAddress(#[from] url::ParseError),

    #[error("Invalid client config: {0}")]
    InvalidConfig(String),

    #[error("Failed to create transport: {0}")]
    Transport(#[from] TransportError),
}

/// Construction options for [`Client`]. Applied before the exchange loop starts.
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    labels: LabelSet,
    config: ExchangerConfig,
    queue_capacity: usize,
    on_error: ErrorCallback,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            transport: None,
            labels: LabelSet::new(),
            config: ExchangerConfig::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            on_error: default_error_callback(),
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder shipping to Loki's JSON v1 push API at `address`.
    /// `http://` is assumed when the address has no scheme.
    pub fn with_loki(address: &str) -> Result<Self, ClientError> {
        let url = normalize_address(address)?;
        Self::with_loki_config(LokiConfig::new(url))
    }

    pub fn with_loki_config(config: LokiConfig) -> Result<Self, ClientError> {
        let transport = LokiClient::new(config)?;
        Ok(Self::new().transport(Arc::new(transport)))
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Labels merged into every stream.
    pub fn labels(mut self, labels: LabelSet) -> Self {
        self.labels = labels;
        self
    }

    /// Buffered entry count that triggers an immediate flush.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Flush cadence. A zero duration is ignored.
    pub fn batch_timeout(mut self, batch_timeout: Duration) -> Self {
        if batch_timeout.is_zero() {
            return self;
        }

        self.config.batch_timeout = batch_timeout;
        self
    }

    /// Ingestion queue capacity. Zero is ignored.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        if capacity > 0 {
            self.queue_capacity = capacity;
        }
        self
    }

    pub fn error_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(TransportError) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(callback);
        self
    }

    /// Start the exchange loop and return the client feeding it.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn build(self) -> Result<Client, ClientError> {
        let transport = self.transport.ok_or(ClientError::MissingTransport)?;

        let (sender, receiver) = async_channel::bounded(self.queue_capacity);
        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = watch::channel(false);

        let exchanger = Exchanger::new(
            self.config.clone(),
            self.labels,
            receiver,
            stop_rx,
            done_tx,
            Arc::clone(&transport),
            self.on_error,
        );
        tokio::spawn(exchanger.run());

        Ok(Client {
            sender,
            transport,
            config: self.config,
            stopped: AtomicBool::new(false),
            stop: Mutex::new(Some(stop_tx)),
            done: done_rx,
        })
    }
}

/// Producer side of the pipeline.
///
/// Log calls enqueue onto a bounded queue and wait while it is full. Dropping
/// the client without [`Client::close`] still flushes what the loop holds, but
/// nobody waits for it.
pub struct Client {
    sender: Sender<PackedLogEntry>,
    transport: Arc<dyn Transport>,
    config: ExchangerConfig,
    stopped: AtomicBool,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    done: watch::Receiver<bool>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Client for Loki's JSON v1 API with default batching options.
    pub fn json_v1(address: &str, labels: LabelSet) -> Result<Self, ClientError> {
        ClientBuilder::with_loki(address)?.labels(labels).build()
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    pub fn batch_timeout(&self) -> Duration {
        self.config.batch_timeout
    }

    pub fn is_closed(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub async fn ping(&self) -> Result<Pong, TransportError> {
        self.transport.ping().await
    }

    pub fn logf(
        &self,
        level: Level,
        format: &str,
        args: &[&dyn fmt::Display],
    ) -> impl Future<Output = ()> + Send + '_ {
        let packed = self.pack(level, LabelSet::new(), format, args);
        self.enqueue(packed)
    }

    pub fn logf_with_labels(
        &self,
        level: Level,
        labels: &LabelSet,
        format: &str,
        args: &[&dyn fmt::Display],
    ) -> impl Future<Output = ()> + Send + '_ {
        let packed = self.pack(level, copy_labels(labels), format, args);
        self.enqueue(packed)
    }

    pub fn debugf(&self, format: &str, args: &[&dyn fmt::Display]) -> impl Future<Output = ()> + Send + '_ {
        self.logf(Level::Debug, format, args)
    }

    pub fn infof(&self, format: &str, args: &[&dyn fmt::Display]) -> impl Future<Output = ()> + Send + '_ {
        self.logf(Level::Info, format, args)
    }

    pub fn warnf(&self, format: &str, args: &[&dyn fmt::Display]) -> impl Future<Output = ()> + Send + '_ {
        self.logf(Level::Warn, format, args)
    }

    pub fn errorf(&self, format: &str, args: &[&dyn fmt::Display]) -> impl Future<Output = ()> + Send + '_ {
        self.logf(Level::Error, format, args)
    }

    pub fn fatalf(&self, format: &str, args: &[&dyn fmt::Display]) -> impl Future<Output = ()> + Send + '_ {
        self.logf(Level::Fatal, format, args)
    }

    pub fn panicf(&self, format: &str, args: &[&dyn fmt::Display]) -> impl Future<Output = ()> + Send + '_ {
        self.logf(Level::Panic, format, args)
    }

    // Arguments are rendered and the timestamp taken here, before any await,
    // so the returned futures borrow nothing but the client.
    fn pack(
        &self,
        level: Level,
        labels: LabelSet,
        format: &str,
        args: &[&dyn fmt::Display],
    ) -> Option<PackedLogEntry> {
        if self.is_closed() {
            warn!(%level, "Promtail client is stopped, log entry dropped");
            return None;
        }

        Some(PackedLogEntry {
            level,
            labels,
            entry: LogEntry::new(format, args),
        })
    }

    async fn enqueue(&self, packed: Option<PackedLogEntry>) {
        let Some(packed) = packed else {
            return;
        };

        let level = packed.level;
        if self.sender.send(packed).await.is_err() {
            warn!(%level, "Exchange loop is gone, log entry dropped");
        }
    }

    /// Stop accepting entries, flush what the exchange loop holds and wait for
    /// it to finish. Safe to call repeatedly and concurrently; every caller
    /// returns after the final flush attempt, even when an earlier close was
    /// cancelled halfway.
    pub async fn close(&self) {
        self.stopped.store(true, Ordering::SeqCst);

        let stop = match self.stop.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(stop) = stop {
            info!("Closing promtail client");
            if stop.send(()).is_err() {
                debug!("Exchange loop already stopped");
            }
        }

        let mut done = self.done.clone();
        if done.wait_for(|finished| *finished).await.is_err() {
            warn!("Exchange loop stopped without acknowledging close");
        }
    }
}
