//! Metric naming engine
//!
//! Turns an event and a validated configuration into the exact list of
//! Graphite records to send. Nothing in here performs I/O.

use crate::config::{CountScheme, ValidatedConfig};
use crate::types::{Check, Entity, Event, GraphiteRecord, Labels, MetricPoint};
use crate::utils::{format_count, format_point_value};
use lazy_static::lazy_static;
use regex::Regex;

/// Display name used for a point named exactly `/`
pub const ROOT_POINT_NAME: &str = "root";

/// Suffix of the synthetic count record
pub const COUNT_SUFFIX: &str = "count";

/// Which metadata map a selector key is looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Labels,
    Annotations,
}

impl MetadataKind {
    /// Look a key up on the entity first, then on the check
    pub fn lookup<'a>(self, key: &str, entity: &'a Entity, check: &'a Check) -> Option<&'a str> {
        let (entity_map, check_map): (&Labels, &Labels) = match self {
            MetadataKind::Labels => (entity.labels(), check.labels()),
            MetadataKind::Annotations => (entity.annotations(), check.annotations()),
        };

        entity_map
            .get(key)
            .or_else(|| check_map.get(key))
            .map(String::as_str)
    }
}

/// Replace the characters Graphite would misfile (`/`, `@` and space) with `_`
///
/// # Examples
/// ```rust
/// use tyl_graphite_handler::sanitize;
///
/// assert_eq!(sanitize(" a/b@c "), "_a_b_c_");
/// ```
pub fn sanitize(value: &str) -> String {
    lazy_static! {
        static ref UNSAFE_CHARS: Regex = Regex::new(r"[/@ ]").unwrap();
    }

    UNSAFE_CHARS.replace_all(value, "_").into_owned()
}

/// Append one sanitized segment per key found on the entity or the check
///
/// Keys missing from both maps are skipped.
pub fn fold_keys(
    prefix: &str,
    kind: MetadataKind,
    keys: &[String],
    entity: &Entity,
    check: &Check,
) -> String {
    keys.iter()
        .filter_map(|key| kind.lookup(key, entity, check))
        .fold(prefix.to_string(), |acc, value| {
            format!("{acc}.{}", sanitize(value))
        })
}

/// Compute the prefix joined to every point name
pub fn compute_effective_prefix(config: &ValidatedConfig, entity: &Entity, check: &Check) -> String {
    let prefix = fold_keys(
        &config.prefix,
        MetadataKind::Labels,
        &config.labels,
        entity,
        check,
    );
    fold_keys(
        &prefix,
        MetadataKind::Annotations,
        &config.annotations,
        entity,
        check,
    )
}

/// Display name of a point: `root` for `/`, the sanitized name otherwise
pub fn point_display_name(name: &str) -> String {
    if name == "/" {
        ROOT_POINT_NAME.to_string()
    } else {
        sanitize(name)
    }
}

/// Build one record per point, preserving point order
pub fn build_point_records(points: &[MetricPoint], prefix: &str, no_prefix: bool) -> Vec<GraphiteRecord> {
    points
        .iter()
        .map(|point| {
            let display_name = point_display_name(&point.name);
            let name = if no_prefix {
                display_name
            } else {
                format!("{prefix}.{display_name}")
            };
            GraphiteRecord::new(name, format_point_value(point.value), point.timestamp)
        })
        .collect()
}

/// Build the synthetic count record, if counting is enabled
///
/// The count prefix starts from the base prefix, not from the per-point
/// prefix, and is extended only by a `labels:`/`annotations:` count scheme.
pub fn build_count_record(config: &ValidatedConfig, event: &Event) -> Option<GraphiteRecord> {
    if !config.count {
        return None;
    }

    let check_name = event.check.name();
    let name = if config.no_prefix {
        format!("{check_name}.{COUNT_SUFFIX}")
    } else {
        let count_prefix = match &config.count_scheme {
            CountScheme::ByLabels(keys) => fold_keys(
                &config.prefix,
                MetadataKind::Labels,
                keys,
                &event.entity,
                &event.check,
            ),
            CountScheme::ByAnnotations(keys) => fold_keys(
                &config.prefix,
                MetadataKind::Annotations,
                keys,
                &event.entity,
                &event.check,
            ),
            CountScheme::Unset | CountScheme::Literal(_) => config.prefix.clone(),
        };
        format!("{count_prefix}.{check_name}.{COUNT_SUFFIX}")
    };

    Some(GraphiteRecord::new(
        name,
        format_count(event.points().len()),
        event.timestamp,
    ))
}

/// Build the full outgoing batch: point records followed by the count record
pub fn build_records(config: &ValidatedConfig, event: &Event) -> Vec<GraphiteRecord> {
    let prefix = compute_effective_prefix(config, &event.entity, &event.check);
    let mut records = build_point_records(event.points(), &prefix, config.no_prefix);
    records.extend(build_count_record(config, event));
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandlerConfig;
    use crate::types::{Metrics, ObjectMeta};

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn event(points: Vec<MetricPoint>) -> Event {
        Event {
            timestamp: 2000,
            entity: Entity {
                metadata: ObjectMeta {
                    name: "web-01".to_string(),
                    labels: labels(&[("region", "eu west"), ("shared", "from-entity")]),
                    annotations: labels(&[("team", "ops@corp")]),
                },
            },
            check: Check {
                metadata: ObjectMeta {
                    name: "http".to_string(),
                    labels: labels(&[("tier", "gold/1"), ("shared", "from-check")]),
                    annotations: labels(&[("owner", "alice")]),
                },
            },
            metrics: Some(Metrics {
                handlers: Vec::new(),
                points,
            }),
        }
    }

    fn validated(config: HandlerConfig, event: &Event) -> ValidatedConfig {
        config.validate(event).unwrap()
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(" a/b@c "), "_a_b_c_");
        assert_eq!(sanitize("plain.name"), "plain.name");
        assert_eq!(sanitize("/"), "_");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_lookup_prefers_entity() {
        let event = event(vec![MetricPoint::new("x", 1.0, 1)]);
        assert_eq!(
            MetadataKind::Labels.lookup("shared", &event.entity, &event.check),
            Some("from-entity")
        );
        assert_eq!(
            MetadataKind::Labels.lookup("tier", &event.entity, &event.check),
            Some("gold/1")
        );
        assert_eq!(
            MetadataKind::Annotations.lookup("region", &event.entity, &event.check),
            None
        );
    }

    #[test]
    fn test_effective_prefix_from_labels() {
        let event = event(vec![MetricPoint::new("x", 1.0, 1)]);
        let config = validated(
            HandlerConfig::default().with_labels("region,missing,tier,shared"),
            &event,
        );

        assert_eq!(
            compute_effective_prefix(&config, &event.entity, &event.check),
            "sensu.eu_west.gold_1.from-entity"
        );
    }

    #[test]
    fn test_effective_prefix_from_annotations() {
        let event = event(vec![MetricPoint::new("x", 1.0, 1)]);
        let config = validated(
            HandlerConfig::default().with_annotations("owner,team"),
            &event,
        );

        assert_eq!(
            compute_effective_prefix(&config, &event.entity, &event.check),
            "sensu.alice.ops_corp"
        );
    }

    #[test]
    fn test_effective_prefix_without_matches() {
        let event = event(vec![MetricPoint::new("x", 1.0, 1)]);
        let config = validated(HandlerConfig::default().with_labels("nope"), &event);
        assert_eq!(
            compute_effective_prefix(&config, &event.entity, &event.check),
            "sensu"
        );
    }

    #[test]
    fn test_point_display_name() {
        assert_eq!(point_display_name("/"), "root");
        assert_eq!(point_display_name("/var/log"), "_var_log");
        assert_eq!(point_display_name("cpu user"), "cpu_user");
    }

    #[test]
    fn test_point_records_keep_order() {
        let points = vec![
            MetricPoint::new("zeta", 1.0, 30),
            MetricPoint::new("/", 87.5, 10),
            MetricPoint::new("alpha", -2.25, 20),
        ];

        let records = build_point_records(&points, "sensu.web", false);
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["sensu.web.zeta", "sensu.web.root", "sensu.web.alpha"]);
        assert_eq!(records[1].value, "87.500000");
        assert_eq!(records[2].value, "-2.250000");
        assert_eq!(records[2].timestamp, 20);
    }

    #[test]
    fn test_point_records_without_prefix() {
        let points = vec![MetricPoint::new("/", 87.5, 1000), MetricPoint::new("a@b", 1.0, 1)];
        let records = build_point_records(&points, "ignored", true);
        assert_eq!(records[0], GraphiteRecord::new("root", "87.500000", 1000));
        assert_eq!(records[1].name, "a_b");
    }

    #[test]
    fn test_count_record_disabled() {
        let event = event(vec![MetricPoint::new("x", 1.0, 1)]);
        let config = validated(HandlerConfig::default(), &event);
        assert!(build_count_record(&config, &event).is_none());
    }

    #[test]
    fn test_count_record_default_prefix() {
        let event = event(vec![
            MetricPoint::new("a", 1.0, 1),
            MetricPoint::new("b", 2.0, 1),
            MetricPoint::new("c", 3.0, 1),
        ]);
        let config = validated(HandlerConfig::default().with_count(true), &event);

        assert_eq!(
            build_count_record(&config, &event),
            Some(GraphiteRecord::new("sensu.http.count", "3", 2000))
        );
    }

    #[test]
    fn test_count_record_ignores_point_selectors() {
        let event = event(vec![MetricPoint::new("a", 1.0, 1)]);
        let config = validated(
            HandlerConfig::default().with_labels("region").with_count(true),
            &event,
        );

        let record = build_count_record(&config, &event).unwrap();
        assert_eq!(record.name, "sensu.http.count");
    }

    #[test]
    fn test_count_record_by_labels() {
        let event = event(vec![MetricPoint::new("a", 1.0, 1)]);
        let config = validated(
            HandlerConfig::default()
                .with_count(true)
                .with_count_scheme("labels:tier,region"),
            &event,
        );

        let record = build_count_record(&config, &event).unwrap();
        assert_eq!(record.name, "sensu.gold_1.eu_west.http.count");
    }

    #[test]
    fn test_count_record_by_annotations() {
        let event = event(vec![MetricPoint::new("a", 1.0, 1)]);
        let config = validated(
            HandlerConfig::default()
                .with_count(true)
                .with_count_scheme("annotations:team"),
            &event,
        );

        let record = build_count_record(&config, &event).unwrap();
        assert_eq!(record.name, "sensu.ops_corp.http.count");
    }

    #[test]
    fn test_count_record_literal_scheme_uses_base_prefix() {
        let event = event(vec![MetricPoint::new("a", 1.0, 1)]);
        let config = validated(
            HandlerConfig::default()
                .with_count(true)
                .with_count_scheme("my.scheme"),
            &event,
        );

        let record = build_count_record(&config, &event).unwrap();
        assert_eq!(record.name, "sensu.http.count");
    }

    #[test]
    fn test_count_record_without_prefix() {
        let event = event(vec![MetricPoint::new("a", 1.0, 1)]);
        let config = validated(
            HandlerConfig::default()
                .with_no_prefix(true)
                .with_count(true)
                .with_count_scheme("labels:region"),
            &event,
        );

        let record = build_count_record(&config, &event).unwrap();
        assert_eq!(record.name, "http.count");
        assert_eq!(record.value, "1");
    }

    #[test]
    fn test_build_records_appends_count_last() {
        let event = event(vec![
            MetricPoint::new("/", 87.5, 1000),
            MetricPoint::new("/home", 10.0, 1000),
        ]);
        let config = validated(
            HandlerConfig::default().with_labels("region").with_count(true),
            &event,
        );

        let records = build_records(&config, &event);
        assert_eq!(
            records,
            vec![
                GraphiteRecord::new("sensu.eu_west.root", "87.500000", 1000),
                GraphiteRecord::new("sensu.eu_west._home", "10.000000", 1000),
                GraphiteRecord::new("sensu.http.count", "2", 2000),
            ]
        );
    }
}
