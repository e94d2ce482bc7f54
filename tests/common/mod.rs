#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use promtail_client::{LogStream, Pong, Transport, TransportError};
use rand::{distributions::Alphanumeric, Rng};
use tokio::sync::Notify;

pub const TEST_LOKI_ADDRESS_ENV: &str = "TEST_LOKI_ADDRESS";
pub const TEST_LOKI_ADDRESS_FALLBACK: &str = "127.0.0.1:3100";

pub const TEST_REQUESTS_NUMBER_ENV: &str = "TEST_REQUESTS_NUMBER";
pub const TEST_REQUESTS_NUMBER_FALLBACK: usize = 20;

/// Settings for tests that talk to a real Loki. Built by each test, never global.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub loki_address: String,
    pub requests_number: usize,
}

impl TestConfig {
    pub fn from_env() -> Self {
        let loki_address = std::env::var(TEST_LOKI_ADDRESS_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| TEST_LOKI_ADDRESS_FALLBACK.to_string());

        let requests_number = std::env::var(TEST_REQUESTS_NUMBER_ENV)
            .ok()
            .map(|s| {
                s.parse()
                    .unwrap_or_else(|_| panic!("{} must be an integer", TEST_REQUESTS_NUMBER_ENV))
            })
            .unwrap_or(TEST_REQUESTS_NUMBER_FALLBACK);

        Self {
            loki_address,
            requests_number,
        }
    }
}

pub fn random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Transport keeping a copy of every pushed batch.
#[derive(Default)]
pub struct RecordingTransport {
    pushes: Mutex<Vec<Vec<LogStream>>>,
    pushed: Notify,
    push_delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every push sleeps for `delay` before it is recorded.
    pub fn with_push_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            push_delay: Some(delay),
            ..Default::default()
        })
    }

    pub fn pushes(&self) -> Vec<Vec<LogStream>> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }

    /// Entry count of each recorded push, in push order.
    pub fn entries_per_push(&self) -> Vec<usize> {
        self.pushes
            .lock()
            .unwrap()
            .iter()
            .map(|streams| streams.iter().map(|s| s.entries.len()).sum())
            .collect()
    }

    pub async fn wait_for_pushes(&self, count: usize) {
        loop {
            let notified = self.pushed.notified();
            if self.push_count() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn push(&self, streams: &[LogStream]) -> Result<(), TransportError> {
        if let Some(delay) = self.push_delay {
            tokio::time::sleep(delay).await;
        }

        self.pushes.lock().unwrap().push(streams.to_vec());
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn ping(&self) -> Result<Pong, TransportError> {
        Ok(Pong { is_ready: true })
    }
}

/// Transport rejecting every push with a fixed Loki response.
pub struct FailingTransport {
    pub status: u16,
    pub body: String,
    attempts: Mutex<Vec<usize>>,
}

impl FailingTransport {
    pub fn new(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.to_string(),
            attempts: Mutex::new(Vec::new()),
        })
    }

    /// Entry count of each attempted push.
    pub fn attempts(&self) -> Vec<usize> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FailingTransport {
    async fn push(&self, streams: &[LogStream]) -> Result<(), TransportError> {
        let entries = streams.iter().map(|s| s.entries.len()).sum();
        self.attempts.lock().unwrap().push(entries);

        Err(TransportError::LokiResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }

    async fn ping(&self) -> Result<Pong, TransportError> {
        Err(TransportError::Other("backend unreachable".to_string()))
    }
}
