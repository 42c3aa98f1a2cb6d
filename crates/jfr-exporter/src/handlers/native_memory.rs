use std::sync::Arc;
use std::time::Duration;

use error_stack::Report;
use jfr_types::EventError;
use jfr_types::EventSubscription;
use jfr_types::MetricPoint;
use jfr_types::MetricSink;
use jfr_types::RawEvent;
use tracing::debug;

use super::EventHandler;

const NATIVE_MEMORY_USAGE_TOTAL: &str = "jdk.NativeMemoryUsageTotal";
const NATIVE_MEMORY_USAGE: &str = "jdk.NativeMemoryUsage";
const RESIDENT_SET_SIZE: &str = "jdk.ResidentSetSize";

const RESERVED: &str = "reserved";
const COMMITTED: &str = "committed";

/// Native memory tracking totals, per-type usage and resident set size.
pub struct NativeMemoryHandler {
    sink: Arc<dyn MetricSink>,
}

impl NativeMemoryHandler {
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self { sink }
    }
}

impl EventHandler for NativeMemoryHandler {
    fn subscriptions(&self) -> Vec<EventSubscription> {
        let period = Duration::from_secs(1);
        vec![
            EventSubscription::new(NATIVE_MEMORY_USAGE_TOTAL).with_period(period),
            EventSubscription::new(NATIVE_MEMORY_USAGE).with_period(period),
            EventSubscription::new(RESIDENT_SET_SIZE).with_period(period),
        ]
    }

    fn on_event(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        let point = match event.event_type.as_str() {
            NATIVE_MEMORY_USAGE_TOTAL => MetricPoint::new(
                event.start_time,
                "memory-native-total",
                RESERVED,
                event.long(RESERVED)?,
            )
            .with_field(COMMITTED, event.long(COMMITTED)?),
            NATIVE_MEMORY_USAGE => MetricPoint::new(
                event.start_time,
                "memory-native",
                RESERVED,
                event.long(RESERVED)?,
            )
            .with_optional_tag("type", event.string("type")?)
            .with_field(COMMITTED, event.long(COMMITTED)?),
            RESIDENT_SET_SIZE => MetricPoint::new(
                event.start_time,
                "memory-resident-set-size",
                "size",
                event.long("size")?,
            )
            .with_field("peak", event.long("peak")?),
            other => {
                debug!(event_type = other, "ignoring unknown event");
                return Ok(());
            }
        };
        self.sink.process(point);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jfr_types::Number;
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;
    use crate::handlers::testing::RecordingSink;

    #[test]
    fn native_memory_usage_is_tagged_with_type() {
        let sink = Arc::new(RecordingSink::default());
        let handler = NativeMemoryHandler::new(sink.clone());

        handler
            .on_event(
                &RawEvent::new(NATIVE_MEMORY_USAGE)
                    .with_value("type", "Metaspace")
                    .with_value(RESERVED, 2048i64)
                    .with_value(COMMITTED, 1024i64),
            )
            .expect("should handle native memory usage");

        let points = sink.points();
        assert_eq!(points[0].measurement(), "memory-native");
        assert_eq!(
            points[0].tags().get("type"),
            Some(&Some("Metaspace".to_string()))
        );
        assert_eq!(points[0].value(), Number::Integer(2048));
    }

    #[test]
    fn resident_set_size() {
        let sink = Arc::new(RecordingSink::default());
        let handler = NativeMemoryHandler::new(sink.clone());

        handler
            .on_event(
                &RawEvent::new(RESIDENT_SET_SIZE)
                    .with_value("size", 300i64)
                    .with_value("peak", 500i64),
            )
            .expect("should handle resident set size");

        let points = sink.points();
        assert_eq!(points[0].measurement(), "memory-resident-set-size");
        assert_eq!(points[0].value(), Number::Integer(300));
    }
}
