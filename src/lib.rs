//! # TYL Graphite Handler
//!
//! **Metrics handler** that forwards the metric points of one monitoring
//! event to a Graphite/Carbon collector over the plaintext protocol.
//!
//! For every event the handler:
//!
//! - **Validates** the options against the event (`HandlerConfig::validate`)
//! - **Names** each point with a dotted prefix derived from entity and check
//!   labels or annotations (`naming`)
//! - **Sends** the batch, plus an optional count record, through a
//!   `MetricsTransport` adapter
//!
//! ## Architecture Philosophy
//!
//! The transport is a **PORT**: `MetricsTransport` defines connect, send and
//! close. Adapters implement it:
//!
//! - `GraphiteTransport` - TCP/UDP plaintext protocol
//! - `MockTransport` - in-memory adapter for testing and examples
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tyl_graphite_handler::{Event, GraphiteHandler, HandlerConfig};
//!
//! async fn forward(json: &str) -> tyl_graphite_handler::Result<()> {
//!     let event = Event::from_json(json)?;
//!     let handler = GraphiteHandler::new(HandlerConfig::default().with_labels("region"));
//!     handler.handle_graphite(&event).await?;
//!     Ok(())
//! }
//! ```

// Re-export TYL framework functionality (CRITICAL pattern)
pub use tyl_errors::{TylError, TylResult};

// Core port interface
mod port;
pub use port::{CollectorTarget, DispatchReport, MetricsTransport};

// Domain types (port concern)
mod types;
pub use types::{
    Check, Entity, Event, GraphiteRecord, Labels, MetricPoint, MetricTag, Metrics, ObjectMeta,
};

// Error helpers for the handler domain
mod errors;
pub use errors::{
    close_error, compose_dispatch_errors, config_error, conflicting_count_scheme_error,
    conflicting_selectors_error, connection_error, event_decode_error, from_serde_json_error,
    no_metrics_error, send_error, HandlerErrorExt,
};

// Options, overrides and normalization
mod config;
pub use config::{
    CountScheme, HandlerConfig, Protocol, ValidatedConfig, ANNOTATION_KEYSPACE, DEFAULT_HOST,
    DEFAULT_PORT, DEFAULT_PREFIX, DEFAULT_PROTOCOL,
};

// Naming engine
pub mod naming;
pub use naming::{
    build_count_record, build_point_records, build_records, compute_effective_prefix, sanitize,
};

// Formatting utilities
mod utils;
pub use utils::{format_count, format_lines, format_point_value, split_keys};

// Real collector adapter
mod graphite;
pub use graphite::{datagram_payloads, GraphiteTransport, CONNECT_TIMEOUT_SECS, MAX_DATAGRAM_BYTES};

// Orchestration
mod handler;
pub use handler::{dispatch, GraphiteHandler};

// Mock adapter for testing and examples
mod mock;
pub use mock::{MockStore, MockTransport, MockTransportConfig};

/// Result type for handler operations using TYL error handling
pub type Result<T> = TylResult<T>;

/// Re-export async_trait for adapter implementations
pub use async_trait::async_trait;
