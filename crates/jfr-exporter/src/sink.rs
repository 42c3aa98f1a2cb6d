use jfr_types::MetricPoint;
use jfr_types::MetricSink;
use tracing::debug;

/// Sink used when no InfluxDB is configured; points only show up in the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl MetricSink for LogSink {
    fn process(&self, point: MetricPoint) {
        debug!(
            target: "metrics",
            measurement = point.measurement(),
            timestamp = ?point.timestamp(),
            tags = ?point.tags(),
            field = point.field(),
            value = %point.value(),
            extra_fields = ?point.extra_fields(),
            frames = point.stacktrace().len(),
            "metric point"
        );
    }
}
