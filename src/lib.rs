pub mod client;
pub mod config;
pub mod labels;
pub mod level;
pub mod pipeline;
pub mod stream;
pub mod transport;

// Re-exports for public API
pub use client::{Client, ClientBuilder, ClientError, DEFAULT_QUEUE_CAPACITY};
pub use config::{Config, ConfigError};
pub use labels::{copy_labels, merge_labels, LabelSet, LOG_LEVEL_LABEL};
pub use level::Level;
pub use pipeline::{ExchangerConfig, StreamBatch};
pub use stream::{LogEntry, LogStream, PackedLogEntry};
pub use transport::loki::{LokiClient, LokiConfig};
pub use transport::{Pong, Transport, TransportError};
