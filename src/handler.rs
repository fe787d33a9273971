//! Event handling pipeline
//!
//! Runs the strictly sequential pipeline for one event: annotation
//! overrides, validation, record building, then connect, send and close on
//! the chosen transport. Nothing is retried.

use super::*;
use crate::errors::compose_dispatch_errors;
use crate::graphite::GraphiteTransport;
use crate::naming::build_records;
use crate::port::DispatchReport;

/// Handler forwarding the metrics of one event to a collector
///
/// ## Example Usage
/// ```rust
/// use tyl_graphite_handler::{Event, GraphiteHandler, HandlerConfig, MockStore, MockTransport, MockTransportConfig};
///
/// # tokio_test::block_on(async {
/// let event = Event::from_json(r#"{
///     "timestamp": 2000,
///     "check": {"metadata": {"name": "disk"}},
///     "metrics": {"points": [{"name": "/", "value": 87.5, "timestamp": 1000}]}
/// }"#).unwrap();
///
/// let store = MockStore::new();
/// let handler = GraphiteHandler::new(HandlerConfig::default());
/// handler
///     .handle::<MockTransport>(&event, MockTransportConfig::new(store.clone()))
///     .await
///     .unwrap();
///
/// assert_eq!(store.lines(), "sensu.root 87.500000 1000\n");
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct GraphiteHandler {
    config: HandlerConfig,
}

impl GraphiteHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self { config }
    }

    /// Get current configuration
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Resolve per-event overrides and validate the result
    pub fn check_args(&self, event: &Event) -> Result<ValidatedConfig> {
        self.config.with_annotation_overrides(event)?.validate(event)
    }

    /// Build the records an event would produce, without sending them
    pub fn records(&self, event: &Event) -> Result<Vec<GraphiteRecord>> {
        let config = self.check_args(event)?;
        Ok(build_records(&config, event))
    }

    /// Forward an event through the given transport
    ///
    /// Close is attempted even when the send fails; a close failure fails
    /// the whole dispatch.
    pub async fn handle<T: MetricsTransport>(
        &self,
        event: &Event,
        transport_config: T::Config,
    ) -> Result<DispatchReport> {
        let records = self.records(event)?;
        dispatch::<T>(&records, transport_config).await
    }

    /// Forward an event to the Graphite collector named by the configuration
    pub async fn handle_graphite(&self, event: &Event) -> Result<DispatchReport> {
        let config = self.check_args(event)?;
        let records = build_records(&config, event);
        dispatch::<GraphiteTransport>(&records, config.target).await
    }
}

/// Connect, send one batch and close, composing send and close failures
pub async fn dispatch<T: MetricsTransport>(
    records: &[GraphiteRecord],
    transport_config: T::Config,
) -> Result<DispatchReport> {
    let mut transport = T::connect(transport_config).await?;
    let endpoint = transport.describe();

    let sent = transport.send_batch(records).await;
    let closed = transport.close().await;

    if let Err(e) = &sent {
        tracing::error!(endpoint = endpoint.as_str(), error = %e, "failed to send metrics");
    }
    if let Err(e) = &closed {
        tracing::error!(endpoint = endpoint.as_str(), error = %e, "failed to disconnect");
    }

    compose_dispatch_errors(sent, closed)?;

    tracing::info!(
        endpoint = endpoint.as_str(),
        records = records.len(),
        "forwarded metrics"
    );
    Ok(DispatchReport {
        records_sent: records.len(),
        endpoint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ANNOTATION_KEYSPACE;
    use crate::mock::{MockStore, MockTransport, MockTransportConfig};
    use crate::types::{Metrics, MetricPoint};

    fn disk_event(points: Vec<MetricPoint>) -> Event {
        let mut event = Event {
            timestamp: 2000,
            metrics: Some(Metrics {
                handlers: vec!["graphite".to_string()],
                points,
            }),
            ..Default::default()
        };
        event.check.metadata.name = "disk".to_string();
        event
    }

    #[tokio::test]
    async fn test_root_point_with_default_prefix() {
        let store = MockStore::new();
        let handler = GraphiteHandler::new(HandlerConfig::default());
        let event = disk_event(vec![MetricPoint::new("/", 87.5, 1000)]);

        let report = handler
            .handle::<MockTransport>(&event, MockTransportConfig::new(store.clone()))
            .await
            .unwrap();

        assert_eq!(report.records_sent, 1);
        assert_eq!(
            store.records(),
            vec![GraphiteRecord::new("sensu.root", "87.500000", 1000)]
        );
        assert_eq!(store.lines(), "sensu.root 87.500000 1000\n");
    }

    #[tokio::test]
    async fn test_root_point_without_prefix() {
        let store = MockStore::new();
        let handler = GraphiteHandler::new(HandlerConfig::default().with_no_prefix(true));
        let event = disk_event(vec![MetricPoint::new("/", 87.5, 1000)]);

        handler
            .handle::<MockTransport>(&event, MockTransportConfig::new(store.clone()))
            .await
            .unwrap();

        assert_eq!(
            store.records(),
            vec![GraphiteRecord::new("root", "87.500000", 1000)]
        );
    }

    #[tokio::test]
    async fn test_count_record_is_appended() {
        let store = MockStore::new();
        let handler = GraphiteHandler::new(HandlerConfig::default().with_count(true));
        let mut event = disk_event(vec![
            MetricPoint::new("a", 1.0, 1),
            MetricPoint::new("b", 2.0, 2),
            MetricPoint::new("c", 3.0, 3),
        ]);
        event.check.metadata.name = "http".to_string();

        handler
            .handle::<MockTransport>(&event, MockTransportConfig::new(store.clone()))
            .await
            .unwrap();

        let records = store.records();
        assert_eq!(records.len(), 4);
        assert_eq!(
            records.last(),
            Some(&GraphiteRecord::new("sensu.http.count", "3", 2000))
        );
        assert_eq!(store.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_never_connects() {
        let store = MockStore::new();
        let handler = GraphiteHandler::new(HandlerConfig::default());
        let event = disk_event(Vec::new());

        let error = handler
            .handle::<MockTransport>(&event, MockTransportConfig::new(store.clone()))
            .await
            .unwrap_err();

        assert!(error.to_string().contains("does not contain metrics"));
        assert_eq!(store.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_conflicting_count_scheme_never_connects() {
        let store = MockStore::new();
        let handler = GraphiteHandler::new(
            HandlerConfig::default()
                .with_count(true)
                .with_count_scheme("labels:a,annotations:b"),
        );
        let event = disk_event(vec![MetricPoint::new("a", 1.0, 1)]);

        let error = handler
            .handle::<MockTransport>(&event, MockTransportConfig::new(store.clone()))
            .await
            .unwrap_err();

        assert!(error.to_string().contains("count-scheme"));
        assert_eq!(store.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_connection_failure_is_reported() {
        let store = MockStore::new();
        let handler = GraphiteHandler::new(HandlerConfig::default());
        let event = disk_event(vec![MetricPoint::new("a", 1.0, 1)]);

        let error = handler
            .handle::<MockTransport>(
                &event,
                MockTransportConfig::new(store.clone()).failing_connect("connection refused"),
            )
            .await
            .unwrap_err();

        assert!(error.to_string().contains("connection refused"));
        assert_eq!(store.close_count(), 0);
    }

    #[tokio::test]
    async fn test_close_failure_after_successful_send() {
        let store = MockStore::new();
        let handler = GraphiteHandler::new(HandlerConfig::default());
        let event = disk_event(vec![MetricPoint::new("a", 1.0, 1)]);

        let error = handler
            .handle::<MockTransport>(
                &event,
                MockTransportConfig::new(store.clone()).failing_close("socket already closed"),
            )
            .await
            .unwrap_err();

        assert!(error.to_string().contains("socket already closed"));
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_close_attempted_after_send_failure() {
        let store = MockStore::new();
        let handler = GraphiteHandler::new(HandlerConfig::default());
        let event = disk_event(vec![MetricPoint::new("a", 1.0, 1)]);

        let error = handler
            .handle::<MockTransport>(
                &event,
                MockTransportConfig::new(store.clone())
                    .failing_send("broken pipe")
                    .failing_close("reset by peer"),
            )
            .await
            .unwrap_err();

        let text = error.to_string();
        assert!(text.contains("broken pipe"));
        assert!(text.contains("reset by peer"));
        assert_eq!(store.close_count(), 1);
    }

    #[tokio::test]
    async fn test_annotation_override_applies_per_event() {
        let store = MockStore::new();
        let handler = GraphiteHandler::new(HandlerConfig::default());
        let mut event = disk_event(vec![MetricPoint::new("/", 1.0, 1)]);
        event
            .check
            .metadata
            .annotations
            .insert(format!("{ANNOTATION_KEYSPACE}/prefix"), "override".to_string());

        handler
            .handle::<MockTransport>(&event, MockTransportConfig::new(store.clone()))
            .await
            .unwrap();

        assert_eq!(store.records()[0].name, "override.root");
        assert_eq!(handler.config().prefix, "sensu");
    }

    #[test]
    fn test_records_without_sending() {
        let handler = GraphiteHandler::new(HandlerConfig::default().with_prefix("prod"));
        let event = disk_event(vec![MetricPoint::new("used percent", 12.5, 5)]);

        let records = handler.records(&event).unwrap();
        assert_eq!(records, vec![GraphiteRecord::new("prod.used_percent", "12.500000", 5)]);
    }
}
