//! Handler configuration and its normalization
//!
//! `HandlerConfig` carries the raw option values as resolved from flags and
//! environment. It is never mutated by the pipeline: annotation overrides
//! produce a new `HandlerConfig`, and `validate` turns it into an immutable
//! `ValidatedConfig` that the naming engine and the transports consume.

use crate::errors::{
    config_error, conflicting_count_scheme_error, conflicting_selectors_error, no_metrics_error,
};
use crate::port::CollectorTarget;
use crate::types::{Event, Labels};
use crate::utils::split_keys;
use crate::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PREFIX: &str = "sensu";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 2003;
pub const DEFAULT_PROTOCOL: &str = "tcp";

/// Annotation keyspace under which events may override handler options
pub const ANNOTATION_KEYSPACE: &str = "sensu.io/plugins/graphite/config";

const LABELS_TOKEN: &str = "labels:";
const ANNOTATIONS_TOKEN: &str = "annotations:";

/// Socket protocol used to reach the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    /// Interpret a protocol option value; anything but `udp` selects TCP
    pub fn from_option(value: &str) -> Self {
        if value == "udp" {
            Protocol::Udp
        } else {
            Protocol::Tcp
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// Prefix override for the synthetic count record
///
/// Parsed once from the raw `count-scheme` option.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CountScheme {
    /// No scheme configured; the count record uses the base prefix
    #[default]
    Unset,

    /// A plain string without a `labels:`/`annotations:` form
    ///
    /// Kept for visibility but not applied: the count record still uses the
    /// base prefix.
    Literal(String),

    /// Label keys folded into the count prefix
    ByLabels(Vec<String>),

    /// Annotation keys folded into the count prefix
    ByAnnotations(Vec<String>),
}

impl CountScheme {
    /// Parse a raw `count-scheme` value
    ///
    /// # Examples
    /// ```rust
    /// use tyl_graphite_handler::CountScheme;
    ///
    /// assert_eq!(
    ///     CountScheme::parse("labels:region,tier").unwrap(),
    ///     CountScheme::ByLabels(vec!["region".to_string(), "tier".to_string()])
    /// );
    /// assert!(CountScheme::parse("labels:a annotations:b").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let labels = raw.split_once(LABELS_TOKEN);
        let annotations = raw.split_once(ANNOTATIONS_TOKEN);

        match (labels, annotations) {
            (Some(_), Some(_)) => Err(conflicting_count_scheme_error()),
            (Some((_, keys)), None) => Ok(CountScheme::ByLabels(split_keys(keys))),
            (None, Some((_, keys))) => Ok(CountScheme::ByAnnotations(split_keys(keys))),
            (None, None) if raw.is_empty() => Ok(CountScheme::Unset),
            (None, None) => Ok(CountScheme::Literal(raw.to_string())),
        }
    }
}

/// Raw handler options
///
/// ## Example Usage
/// ```rust
/// use tyl_graphite_handler::HandlerConfig;
///
/// let config = HandlerConfig::default()
///     .with_prefix("prod")
///     .with_labels("region")
///     .with_count(true);
///
/// assert_eq!(config.prefix, "prod");
/// assert_eq!(config.port, 2003);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Base metric-name prefix
    pub prefix: String,

    /// Comma-separated label keys folded into the prefix
    pub labels: String,

    /// Comma-separated annotation keys folded into the prefix
    pub annotations: String,

    /// Suppress every prefix and use the bare point names
    pub no_prefix: bool,

    /// Append a synthetic record holding the number of points
    pub count: bool,

    /// Prefix override for the count record
    pub count_scheme: String,

    /// Collector host name or address
    pub host: String,

    /// Collector port
    pub port: u16,

    /// `tcp` or `udp`
    pub protocol: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            labels: String::new(),
            annotations: String::new(),
            no_prefix: false,
            count: false,
            count_scheme: String::new(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            protocol: DEFAULT_PROTOCOL.to_string(),
        }
    }
}

impl HandlerConfig {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_labels(mut self, labels: impl Into<String>) -> Self {
        self.labels = labels.into();
        self
    }

    pub fn with_annotations(mut self, annotations: impl Into<String>) -> Self {
        self.annotations = annotations.into();
        self
    }

    pub fn with_no_prefix(mut self, no_prefix: bool) -> Self {
        self.no_prefix = no_prefix;
        self
    }

    pub fn with_count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    pub fn with_count_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.count_scheme = scheme.into();
        self
    }

    pub fn with_collector(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Collector address and protocol described by these options
    pub fn target(&self) -> CollectorTarget {
        CollectorTarget::new(
            self.host.clone(),
            self.port,
            Protocol::from_option(&self.protocol),
        )
    }

    /// Apply per-event overrides found under [`ANNOTATION_KEYSPACE`]
    ///
    /// Entity annotations are applied first and check annotations second, so
    /// a check-level override wins over an entity-level one.
    pub fn with_annotation_overrides(&self, event: &Event) -> Result<Self> {
        let mut config = self.clone();
        config.apply_overrides(event.entity.annotations())?;
        config.apply_overrides(event.check.annotations())?;
        Ok(config)
    }

    fn apply_overrides(&mut self, annotations: &Labels) -> Result<()> {
        // Sorted so that a failing override is reported deterministically.
        let mut overrides: Vec<(&str, &String)> = annotations
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(ANNOTATION_KEYSPACE)
                    .and_then(|rest| rest.strip_prefix('/'))
                    .map(|option| (option, value))
            })
            .collect();
        overrides.sort_by_key(|(option, _)| *option);

        for (option, value) in overrides {
            self.set_option(option, value)?;
            tracing::debug!(option, value = value.as_str(), "applied annotation override");
        }

        Ok(())
    }

    fn set_option(&mut self, option: &str, value: &str) -> Result<()> {
        match option {
            "prefix" => self.prefix = value.to_string(),
            "labels" => self.labels = value.to_string(),
            "annotations" => self.annotations = value.to_string(),
            "no-prefix" => self.no_prefix = parse_bool(option, value)?,
            "count" => self.count = parse_bool(option, value)?,
            "count-scheme" => self.count_scheme = value.to_string(),
            "host" => self.host = value.to_string(),
            "port" => {
                self.port = value
                    .parse()
                    .map_err(|e: std::num::ParseIntError| config_error(option, e.to_string()))?
            }
            "protocol" => self.protocol = value.to_string(),
            _ => tracing::debug!(option, "ignoring unknown annotation override"),
        }
        Ok(())
    }

    /// Validate the options against an event and normalize them
    ///
    /// Fails when the event has no metric points, when both label and
    /// annotation selectors are set, or when counting is enabled with a
    /// count scheme naming both forms. `no_prefix` clears the prefix and
    /// both selectors before the selector conflict is checked.
    pub fn validate(&self, event: &Event) -> Result<ValidatedConfig> {
        if !event.has_metrics() {
            return Err(no_metrics_error());
        }

        let (prefix, labels, annotations) = if self.no_prefix {
            (String::new(), String::new(), String::new())
        } else {
            (
                self.prefix.clone(),
                self.labels.clone(),
                self.annotations.clone(),
            )
        };

        if !labels.is_empty() && !annotations.is_empty() {
            return Err(conflicting_selectors_error());
        }

        let count_scheme = if self.count {
            CountScheme::parse(&self.count_scheme)?
        } else {
            CountScheme::Unset
        };

        if let CountScheme::Literal(scheme) = &count_scheme {
            tracing::warn!(
                count_scheme = scheme.as_str(),
                "count-scheme without labels: or annotations: is not applied"
            );
        }

        Ok(ValidatedConfig {
            prefix,
            labels: split_keys(&labels),
            annotations: split_keys(&annotations),
            no_prefix: self.no_prefix,
            count: self.count,
            count_scheme,
            target: self.target(),
        })
    }
}

/// Normalized, immutable handler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedConfig {
    pub prefix: String,
    pub labels: Vec<String>,
    pub annotations: Vec<String>,
    pub no_prefix: bool,
    pub count: bool,
    pub count_scheme: CountScheme,
    pub target: CollectorTarget,
}

/// Parse a boolean option the way flag parsers accept them
fn parse_bool(option: &str, value: &str) -> Result<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(config_error(
            option,
            format!("invalid boolean value {value:?}"),
        )),
    }
}
