//! Error handling integration for the Graphite handler
//!
//! This module provides helper functions for creating domain-specific errors
//! using the TYL framework error system. It follows the established TYL
//! pattern of providing semantic error constructors rather than custom error types.
//!
//! Validation failures (`no_metrics_error`, `conflicting_selectors_error`,
//! `conflicting_count_scheme_error`) are always raised before any network
//! activity. Network failures (`connection_error`, `send_error`,
//! `close_error`) are raised by transports, and `compose_dispatch_errors`
//! merges the outcome of a send and the close that always follows it.

use super::*;

/// Message used when an event arrives without any metric points
pub const NO_METRICS_MESSAGE: &str = "event does not contain metrics";

/// Message used when both label and annotation selectors are configured
pub const CONFLICTING_SELECTORS_MESSAGE: &str = "usage of labels and annotations are mutually exclusive";

/// Message used when the count scheme names both labels and annotations
pub const CONFLICTING_COUNT_SCHEME_MESSAGE: &str =
    "usage of labels and annotations are mutually exclusive in count-scheme";

/// Create the error returned when an event carries no metric points
///
/// # Example
/// ```rust
/// use tyl_graphite_handler::no_metrics_error;
///
/// let error = no_metrics_error();
/// assert!(error.to_string().contains("does not contain metrics"));
/// ```
pub fn no_metrics_error() -> TylError {
    TylError::validation("metrics".to_string(), NO_METRICS_MESSAGE.to_string())
}

/// Create the error returned when `labels` and `annotations` are both set
pub fn conflicting_selectors_error() -> TylError {
    TylError::validation(
        "labels".to_string(),
        CONFLICTING_SELECTORS_MESSAGE.to_string(),
    )
}

/// Create the error returned when `count-scheme` mixes `labels:` and `annotations:`
pub fn conflicting_count_scheme_error() -> TylError {
    TylError::validation(
        "count-scheme".to_string(),
        CONFLICTING_COUNT_SCHEME_MESSAGE.to_string(),
    )
}

/// Create a handler configuration error
///
/// Used when an option value (from flags, environment or an annotation
/// override) cannot be interpreted.
///
/// # Arguments
/// * `option` - The option name that caused the error
/// * `message` - Description of the configuration issue
///
/// # Example
/// ```rust
/// use tyl_graphite_handler::config_error;
///
/// let error = config_error("port", "invalid digit found in string");
/// assert!(error.to_string().contains("port"));
/// ```
pub fn config_error(option: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::configuration(format!(
        "Graphite handler config error for {}: {}",
        option.into(),
        message.into()
    ))
}

/// Create a collector connection error
///
/// # Arguments
/// * `endpoint` - The `host:port` (and protocol) that failed to connect
/// * `message` - Description of the connection failure
pub fn connection_error(endpoint: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::network(format!(
        "Graphite connection error to {}: {}",
        endpoint.into(),
        message.into()
    ))
}

/// Create a batch send error
pub fn send_error(endpoint: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::network(format!(
        "Graphite send error to {}: {}",
        endpoint.into(),
        message.into()
    ))
}

/// Create a disconnect error
pub fn close_error(endpoint: impl Into<String>, message: impl Into<String>) -> TylError {
    TylError::network(format!(
        "Graphite disconnect error from {}: {}",
        endpoint.into(),
        message.into()
    ))
}

/// Create an event decoding error
pub fn event_decode_error(message: impl Into<String>) -> TylError {
    TylError::internal(format!("Event decode error for json: {}", message.into()))
}

/// Merge the result of a batch send with the result of the close that follows it
///
/// A failed close never gets swallowed: when both fail, the returned error
/// carries both messages so a send failure can be told apart from a
/// disconnect failure.
///
/// # Example
/// ```rust
/// use tyl_graphite_handler::{close_error, compose_dispatch_errors, send_error};
///
/// let composed = compose_dispatch_errors(
///     Err(send_error("127.0.0.1:2003", "broken pipe")),
///     Err(close_error("127.0.0.1:2003", "not connected")),
/// )
/// .unwrap_err();
///
/// let text = composed.to_string();
/// assert!(text.contains("broken pipe"));
/// assert!(text.contains("not connected"));
/// ```
pub fn compose_dispatch_errors(sent: Result<()>, closed: Result<()>) -> Result<()> {
    match (sent, closed) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(send), Ok(())) => Err(send),
        (Ok(()), Err(close)) => Err(TylError::network(format!(
            "Disconnect error: {}",
            close
        ))),
        (Err(send), Err(close)) => Err(TylError::network(format!(
            "SendMetrics error: {}. Disconnect error: {}",
            send, close
        ))),
    }
}

/// Helper trait for adding handler context to existing errors
///
/// This trait allows adding Graphite-specific context to any existing TylError,
/// which is useful when the binary reports where in the pipeline a failure happened.
pub trait HandlerErrorExt {
    /// Add pipeline stage context to an existing error by wrapping it
    fn with_stage(self, stage: impl Into<String>) -> TylError;
}

impl HandlerErrorExt for TylError {
    fn with_stage(self, stage: impl Into<String>) -> TylError {
        TylError::internal(format!("Graphite handler [{}]: {}", stage.into(), self))
    }
}

/// Convert a JSON decoding error into an event decode error
///
/// Note: These are helper functions rather than From impls to avoid orphan rule issues
pub fn from_serde_json_error(error: serde_json::Error) -> TylError {
    event_decode_error(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_carry_messages() {
        assert!(no_metrics_error().to_string().contains(NO_METRICS_MESSAGE));
        assert!(conflicting_selectors_error()
            .to_string()
            .contains("mutually exclusive"));
        assert!(conflicting_count_scheme_error()
            .to_string()
            .contains("count-scheme"));
    }

    #[test]
    fn test_config_error() {
        let error = config_error("no-prefix", "expected true or false");
        assert!(error.to_string().contains("no-prefix"));
        assert!(error.to_string().contains("expected true or false"));
    }

    #[test]
    fn test_network_errors_name_endpoint() {
        let error = connection_error("127.0.0.1:2003/tcp", "Connection refused");
        assert!(error.to_string().contains("127.0.0.1:2003/tcp"));
        assert!(error.to_string().contains("Connection refused"));

        assert!(send_error("c:2003", "broken pipe").to_string().contains("broken pipe"));
        assert!(close_error("c:2003", "reset").to_string().contains("reset"));
    }

    #[test]
    fn test_compose_both_ok() {
        assert!(compose_dispatch_errors(Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn test_compose_send_failure_only() {
        let error = compose_dispatch_errors(Err(send_error("c", "broken pipe")), Ok(())).unwrap_err();
        let text = error.to_string();
        assert!(text.contains("broken pipe"));
        assert!(!text.contains("Disconnect error"));
    }

    #[test]
    fn test_compose_close_failure_surfaces() {
        let error = compose_dispatch_errors(Ok(()), Err(close_error("c", "shutdown failed")))
            .unwrap_err();
        let text = error.to_string();
        assert!(text.contains("Disconnect error"));
        assert!(text.contains("shutdown failed"));
    }

    #[test]
    fn test_compose_keeps_both_messages() {
        let error = compose_dispatch_errors(
            Err(send_error("c", "broken pipe")),
            Err(close_error("c", "shutdown failed")),
        )
        .unwrap_err();
        let text = error.to_string();
        assert!(text.contains("SendMetrics error"));
        assert!(text.contains("broken pipe"));
        assert!(text.contains("shutdown failed"));
    }

    #[test]
    fn test_stage_extension() {
        let extended = no_metrics_error().with_stage("validate");
        let text = extended.to_string();
        assert!(text.contains("validate"));
        assert!(text.contains(NO_METRICS_MESSAGE));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let tyl_error = from_serde_json_error(json_error);
        assert!(tyl_error.to_string().contains("json"));
    }
}
