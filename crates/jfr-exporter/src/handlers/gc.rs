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

const GC_HEAP_SUMMARY: &str = "jdk.GCHeapSummary";
const OLD_GC: &str = "jdk.OldGarbageCollection";
const YOUNG_GC: &str = "jdk.YoungGarbageCollection";

/// Heap usage and garbage collection pauses.
pub struct GcHandler {
    sink: Arc<dyn MetricSink>,
}

impl GcHandler {
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self { sink }
    }

    fn report_collection(&self, event: &RawEvent, measurement: &str) {
        let duration_ms = event
            .duration()
            .map_or(0.0, |duration| duration.as_millis() as f64);
        self.sink.process(MetricPoint::new(
            event.start_time,
            measurement,
            "duration-ms",
            duration_ms,
        ));
    }
}

impl EventHandler for GcHandler {
    fn subscriptions(&self) -> Vec<EventSubscription> {
        vec![
            EventSubscription::new(GC_HEAP_SUMMARY).with_period(Duration::from_secs(1)),
            EventSubscription::new(OLD_GC).with_threshold(Duration::ZERO),
            EventSubscription::new(YOUNG_GC).with_threshold(Duration::ZERO),
        ]
    }

    fn on_event(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        debug!(event_type = %event.event_type, start_time = ?event.start_time, "gc event");
        match event.event_type.as_str() {
            GC_HEAP_SUMMARY => {
                let heap_used = event.long("heapUsed")?;
                let heap_committed = event.long("heapSpace.committedSize")?;
                self.sink.process(
                    MetricPoint::new(event.start_time, "heap", "heapUsed", heap_used)
                        .with_field("heapCommitted", heap_committed),
                );
            }
            OLD_GC => self.report_collection(event, "oldGc"),
            YOUNG_GC => self.report_collection(event, "youngGc"),
            other => debug!(event_type = other, "ignoring unknown event"),
        }
        Ok(())
    }
}
