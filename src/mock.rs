//! Mock transport for testing and examples
//!
//! This module provides an in-memory transport that implements the
//! MetricsTransport trait. Every batch it receives is kept in a shared store
//! so tests can inspect exactly what would have reached the collector, and
//! each phase (connect, send, close) can be made to fail on demand.

use super::*;
use crate::errors::{close_error, connection_error, send_error};
use std::sync::{Arc, Mutex};

/// Batches captured by mock transports, shared between a config and the test
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    batches: Arc<Mutex<Vec<Vec<GraphiteRecord>>>>,
    connects: Arc<Mutex<usize>>,
    closes: Arc<Mutex<usize>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every batch sent so far, in send order
    pub fn batches(&self) -> Vec<Vec<GraphiteRecord>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// All records sent so far, flattened across batches
    pub fn records(&self) -> Vec<GraphiteRecord> {
        self.batches().into_iter().flatten().collect()
    }

    /// Protocol lines of all records sent so far
    pub fn lines(&self) -> String {
        crate::utils::format_lines(&self.records())
    }

    /// Number of successful connects
    pub fn connect_count(&self) -> usize {
        self.connects.lock().map(|c| *c).unwrap_or_default()
    }

    /// Number of close attempts, successful or not
    pub fn close_count(&self) -> usize {
        self.closes.lock().map(|c| *c).unwrap_or_default()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.clear();
        }
        if let Ok(mut connects) = self.connects.lock() {
            *connects = 0;
        }
        if let Ok(mut closes) = self.closes.lock() {
            *closes = 0;
        }
    }

    fn push(&self, batch: Vec<GraphiteRecord>) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(batch);
        }
    }

    fn bump(counter: &Mutex<usize>) {
        if let Ok(mut count) = counter.lock() {
            *count += 1;
        }
    }
}

/// Configuration for the mock transport
///
/// This is intentionally simple since it's just for testing and examples.
#[derive(Debug, Clone, Default)]
pub struct MockTransportConfig {
    /// Name reported by `describe`
    pub endpoint: String,

    /// Shared store receiving every sent batch
    pub store: MockStore,

    /// Fail the connect phase with this message
    pub connect_failure: Option<String>,

    /// Fail the send phase with this message
    pub send_failure: Option<String>,

    /// Fail the close phase with this message
    pub close_failure: Option<String>,
}

impl MockTransportConfig {
    /// Create a new mock config recording into `store`
    pub fn new(store: MockStore) -> Self {
        Self {
            endpoint: "mock://collector".to_string(),
            store,
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Make `connect` fail with the given message
    pub fn failing_connect(mut self, message: impl Into<String>) -> Self {
        self.connect_failure = Some(message.into());
        self
    }

    /// Make `send_batch` fail with the given message
    pub fn failing_send(mut self, message: impl Into<String>) -> Self {
        self.send_failure = Some(message.into());
        self
    }

    /// Make `close` fail with the given message
    pub fn failing_close(mut self, message: impl Into<String>) -> Self {
        self.close_failure = Some(message.into());
        self
    }
}

/// Mock transport that stores batches in memory
///
/// ## Example Usage
/// ```rust
/// use tyl_graphite_handler::{GraphiteRecord, MetricsTransport, MockStore, MockTransport, MockTransportConfig};
///
/// # tokio_test::block_on(async {
/// let store = MockStore::new();
/// let mut transport = MockTransport::connect(MockTransportConfig::new(store.clone()))
///     .await
///     .unwrap();
///
/// transport
///     .send_batch(&[GraphiteRecord::new("sensu.root", "87.500000", 1000)])
///     .await
///     .unwrap();
/// transport.close().await.unwrap();
///
/// assert_eq!(store.lines(), "sensu.root 87.500000 1000\n");
/// # });
/// ```
pub struct MockTransport {
    config: MockTransportConfig,
}

impl MockTransport {
    /// Get current configuration
    pub fn config(&self) -> &MockTransportConfig {
        &self.config
    }
}

#[async_trait]
impl MetricsTransport for MockTransport {
    type Config = MockTransportConfig;

    async fn connect(config: Self::Config) -> Result<Self> {
        if let Some(message) = &config.connect_failure {
            return Err(connection_error(&config.endpoint, message.clone()));
        }

        MockStore::bump(&config.store.connects);
        Ok(Self { config })
    }

    async fn send_batch(&mut self, records: &[GraphiteRecord]) -> Result<()> {
        if let Some(message) = &self.config.send_failure {
            return Err(send_error(&self.config.endpoint, message.clone()));
        }

        self.config.store.push(records.to_vec());
        Ok(())
    }

    async fn close(self) -> Result<()> {
        MockStore::bump(&self.config.store.closes);

        match &self.config.close_failure {
            Some(message) => Err(close_error(&self.config.endpoint, message.clone())),
            None => Ok(()),
        }
    }

    fn describe(&self) -> String {
        self.config.endpoint.clone()
    }
}
