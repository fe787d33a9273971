//! Core port interface for delivering records to a collector
//!
//! This module defines the contract every transport adapter implements.
//! Following hexagonal architecture principles, this port defines WHAT can be
//! done (connect, send one batch, close), not HOW bytes reach the collector.

use super::*;
use crate::config::Protocol;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// **Primary Port Interface** for collector transports
///
/// A transport instance owns exactly one connection for the lifetime of one
/// dispatch. It is never pooled or reused.
///
/// ## Example Implementation
/// ```rust
/// use tyl_graphite_handler::{async_trait, GraphiteRecord, MetricsTransport, Result};
///
/// pub struct StdoutTransport;
///
/// #[async_trait]
/// impl MetricsTransport for StdoutTransport {
///     type Config = ();
///
///     async fn connect(_config: Self::Config) -> Result<Self> {
///         Ok(Self)
///     }
///
///     async fn send_batch(&mut self, records: &[GraphiteRecord]) -> Result<()> {
///         for record in records {
///             println!("{record}");
///         }
///         Ok(())
///     }
///
///     async fn close(self) -> Result<()> {
///         Ok(())
///     }
///
///     fn describe(&self) -> String {
///         "stdout".to_string()
///     }
/// }
/// ```
#[async_trait]
pub trait MetricsTransport: Send + Sync {
    /// Configuration type specific to this transport
    type Config: Send + Sync;

    /// Open a connection to the collector
    ///
    /// # Returns
    /// * `Result<Self>` - A connected transport, or a connection error
    async fn connect(config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Write the whole batch as one operation
    async fn send_batch(&mut self, records: &[GraphiteRecord]) -> Result<()>;

    /// Release the connection
    ///
    /// Always called after `send_batch`, whether or not the send succeeded.
    async fn close(self) -> Result<()>
    where
        Self: Sized;

    /// Human-readable endpoint description used in logs and errors
    fn describe(&self) -> String;
}

/// Collector address and protocol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectorTarget {
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl CollectorTarget {
    pub fn new(host: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            host: host.into(),
            port,
            protocol,
        }
    }

    /// `host:port` form accepted by socket address resolution
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for CollectorTarget {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_HOST,
            crate::config::DEFAULT_PORT,
            Protocol::Tcp,
        )
    }
}

impl std::fmt::Display for CollectorTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Summary of a successful dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Number of records written, including the count record
    pub records_sent: usize,

    /// Transport description of the collector that received them
    pub endpoint: String,
}

impl std::fmt::Display for DispatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sent {} records to {}", self.records_sent, self.endpoint)
    }
}
