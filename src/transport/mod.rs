//! Delivery of accumulated batches to the log backend.

pub mod loki;

use async_trait::async_trait;
use thiserror::Error;

use crate::stream::LogStream;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Loki returned error: {status} - {body}")]
    LokiResponse { status: u16, body: String },

    #[error("Failed to encode push request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Readiness probe answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pong {
    pub is_ready: bool,
}

/// Capability the exchange loop delivers batches through.
///
/// `push` receives every stream of the batch, empty ones included; an
/// implementation is expected to skip streams without entries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn push(&self, streams: &[LogStream]) -> Result<(), TransportError>;

    async fn ping(&self) -> Result<Pong, TransportError>;
}
