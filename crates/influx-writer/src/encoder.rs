use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use influxdb_line_protocol::LineProtocolBuilder;
use jfr_types::FieldValue;
use jfr_types::MetricPoint;
use jfr_types::Number;

/// Tag identifying the instrumented application on every line.
pub const APPLICATION_TAG: &str = "application";

/// Separator between the frames of the folded `stacktrace` field.
pub const STACKTRACE_DELIMITER: &str = " --- ";

const STACKTRACE_FIELD: &str = "stacktrace";
const TRUNCATED_FRAMES: usize = 3;
const NULL_TAG: &str = "<null>";
const BLANK_TAG: &str = "<blank>";

/// Encodes metric points as InfluxDB line protocol.
#[derive(Debug, Clone)]
pub struct LineProtocolEncoder {
    origin_tags: BTreeMap<String, Option<String>>,
    full_stacktrace: bool,
}

impl LineProtocolEncoder {
    /// Create an encoder that adds `origin_tags` to every line.
    ///
    /// The `application` tag is always written, as `<null>` when it is not
    /// part of `origin_tags`. With `full_stacktrace` disabled only the first
    /// three frames of a stack trace are kept.
    pub fn new(
        origin_tags: impl IntoIterator<Item = (String, String)>,
        full_stacktrace: bool,
    ) -> Self {
        let mut tags: BTreeMap<String, Option<String>> = origin_tags
            .into_iter()
            .map(|(key, value)| (key, Some(value)))
            .collect();
        tags.entry(APPLICATION_TAG.to_string()).or_insert(None);

        Self {
            origin_tags: tags,
            full_stacktrace,
        }
    }

    /// Encode one point into a single line without a trailing newline.
    ///
    /// A point without timestamp is stamped with the current time.
    pub fn encode(&self, point: &MetricPoint) -> String {
        let timestamp = point.timestamp().unwrap_or_else(Utc::now);
        self.encode_at(point, timestamp)
    }

    fn encode_at(&self, point: &MetricPoint, timestamp: DateTime<Utc>) -> String {
        // Point tags win over origin tags with the same key
        let mut tags: BTreeMap<&str, Option<&str>> = self
            .origin_tags
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
            .collect();
        for (key, value) in point.tags() {
            tags.insert(key.as_str(), value.as_deref());
        }

        let mut builder = LineProtocolBuilder::new().measurement(point.measurement());
        for (key, value) in tags {
            builder = builder.tag(key, tag_value(value));
        }

        let mut line = builder.field(point.field(), unsuffixed(point.value()));

        if !point.stacktrace().is_empty() {
            let stacktrace = self.fold_stacktrace(point.stacktrace());
            line = line.field(STACKTRACE_FIELD, stacktrace.as_str());
        }

        for (key, value) in point.extra_fields() {
            if key == point.field() || key == STACKTRACE_FIELD {
                continue;
            }
            line = match value {
                FieldValue::String(value) => line.field(key, value.as_str()),
                FieldValue::Integer(value) => line.field(key, *value as f64),
                FieldValue::Float(value) => line.field(key, *value),
                FieldValue::Boolean(value) => {
                    line.field(key, if *value { "true" } else { "false" })
                }
                FieldValue::Null => line.field(key, ""),
            };
        }

        let built = line.timestamp(epoch_nanos(timestamp)).close_line().build();
        String::from_utf8_lossy(&built).trim_end_matches('\n').to_string()
    }

    fn fold_stacktrace(&self, frames: &[String]) -> String {
        let keep = if self.full_stacktrace {
            frames.len()
        } else {
            TRUNCATED_FRAMES.min(frames.len())
        };
        frames[..keep].join(STACKTRACE_DELIMITER)
    }
}

/// Numbers are written without the `i` suffix so every numeric field is an
/// InfluxDB float, whatever Rust type produced it.
fn unsuffixed(value: Number) -> f64 {
    match value {
        Number::Integer(value) => value as f64,
        Number::Float(value) => value,
    }
}

fn tag_value(value: Option<&str>) -> &str {
    match value {
        None => NULL_TAG,
        Some(value) if value.trim().is_empty() => BLANK_TAG,
        Some(value) => value,
    }
}

fn epoch_nanos(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_nanos_opt().unwrap_or_else(|| {
        timestamp
            .timestamp()
            .saturating_mul(1_000_000_000)
            .saturating_add(i64::from(timestamp.timestamp_subsec_nanos()))
    })
}
