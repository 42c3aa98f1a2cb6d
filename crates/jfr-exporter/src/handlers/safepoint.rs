use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use dashmap::DashMap;
use error_stack::Report;
use jfr_types::EventError;
use jfr_types::EventSubscription;
use jfr_types::MetricPoint;
use jfr_types::MetricSink;
use jfr_types::RawEvent;
use tracing::debug;
use tracing::info;

use super::EventHandler;

const SAFEPOINT_BEGIN: &str = "jdk.SafepointBegin";
const SAFEPOINT_END: &str = "jdk.SafepointEnd";

/// Pairs safepoint begin and end events and reports the time in between.
pub struct SafepointHandler {
    sink: Arc<dyn MetricSink>,
    /// Start time of every safepoint that has begun but not ended yet
    open: DashMap<i64, Option<DateTime<Utc>>>,
}

impl SafepointHandler {
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self {
            sink,
            open: DashMap::new(),
        }
    }

    fn end(&self, id: i64, event: &RawEvent) {
        self.report_duration(id, event);

        let in_progress = self.open.len();
        if in_progress > 0 {
            info!(in_progress, "safepoints in progress");
        }
    }

    fn report_duration(&self, id: i64, event: &RawEvent) {
        let Some((_, started)) = self.open.remove(&id) else {
            debug!(safepoint_id = id, "no begin recorded for safepoint end");
            return;
        };

        let ended = event.end_time.or(event.start_time);
        let (Some(started), Some(ended)) = (started, ended) else {
            debug!(safepoint_id = id, "safepoint without begin or end time");
            return;
        };
        let duration_ms = (ended - started).num_milliseconds() as f64;
        self.sink.process(MetricPoint::new(
            event.start_time,
            "safepoint",
            "duration",
            duration_ms,
        ));
    }
}

impl EventHandler for SafepointHandler {
    fn subscriptions(&self) -> Vec<EventSubscription> {
        vec![
            EventSubscription::new(SAFEPOINT_BEGIN),
            EventSubscription::new(SAFEPOINT_END),
        ]
    }

    fn on_event(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        let id = event.long("safepointId")?;
        match event.event_type.as_str() {
            SAFEPOINT_BEGIN => {
                self.open.insert(id, event.start_time);
            }
            SAFEPOINT_END => self.end(id, event),
            other => debug!(event_type = other, "ignoring unknown event"),
        }
        Ok(())
    }
}
