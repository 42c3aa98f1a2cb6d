use std::sync::Arc;
use std::time::Duration;

use error_stack::Report;
use jfr_types::EventError;
use jfr_types::EventSubscription;
use jfr_types::MetricPoint;
use jfr_types::MetricSink;
use jfr_types::RawEvent;
use tracing::debug;
use tracing::error;
use tracing::trace;

use super::frames::render_stack_trace;
use super::frames::thread_name;
use super::EventHandler;

const JAVA_MONITOR_WAIT: &str = "jdk.JavaMonitorWait";
const JAVA_MONITOR_ENTER: &str = "jdk.JavaMonitorEnter";

const MINIMUM_DURATION: Duration = Duration::from_millis(10);

/// Threads whose monitor waits are part of normal operation.
const IGNORED_WAITING_THREADS: [&str; 2] = ["JFR Event Stream", "Finalizer"];

/// Reports monitor waits and contended monitor enters longer than 10ms.
pub struct MonitorHandler {
    sink: Arc<dyn MetricSink>,
}

impl MonitorHandler {
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self { sink }
    }
}

fn duration_nanos(event: &RawEvent) -> Result<i64, Report<EventError>> {
    match event.duration() {
        Some(duration) => Ok(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)),
        None => event.long("duration"),
    }
}

impl EventHandler for MonitorHandler {
    fn subscriptions(&self) -> Vec<EventSubscription> {
        vec![
            EventSubscription::new(JAVA_MONITOR_WAIT).with_threshold(MINIMUM_DURATION),
            EventSubscription::new(JAVA_MONITOR_ENTER).with_threshold(MINIMUM_DURATION),
        ]
    }

    fn on_event(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        let duration_ns = duration_nanos(event)?;
        let monitor_class = event.string("monitorClass")?.unwrap_or("<unknown>");
        // prefixed so InfluxDB does not read it as a number
        let address = format!("0x{:x}", event.long("address")?);
        trace!(
            event_type = %event.event_type,
            duration_ns,
            monitor_class,
            address = %address,
            "monitor event"
        );

        if duration_ns <= i64::try_from(MINIMUM_DURATION.as_nanos()).unwrap_or(i64::MAX) {
            return Ok(());
        }

        let Some(stacktrace) = render_stack_trace(event) else {
            error!(
                duration_ns,
                monitor_class,
                "no stack trace available for monitor event"
            );
            return Ok(());
        };
        let thread = thread_name(event, "eventThread");
        debug!(
            duration_ns,
            monitor_class,
            frame = stacktrace.first().map_or("<none>", String::as_str),
            "found long monitor event"
        );

        let point = match event.event_type.as_str() {
            JAVA_MONITOR_WAIT => {
                if IGNORED_WAITING_THREADS
                    .iter()
                    .any(|prefix| thread.starts_with(prefix))
                {
                    debug!(duration_ns, thread, "ignoring monitor wait");
                    return Ok(());
                }
                let timed_out = event.boolean("timedOut")?;
                MetricPoint::new(
                    event.start_time,
                    "java-monitor-wait",
                    "duration-ns",
                    duration_ns,
                )
                .with_field("notifier", thread_name(event, "notifier"))
                .with_field("timeout", event.long("timeout")?)
                .with_field("timed-out", timed_out.to_string())
            }
            JAVA_MONITOR_ENTER => MetricPoint::new(
                event.start_time,
                "java-monitor-enter",
                "duration-ns",
                duration_ns,
            )
            .with_field("previous-owner", thread_name(event, "previousOwner")),
            other => {
                error!(event_type = other, "unknown monitor event");
                return Ok(());
            }
        };

        self.sink.process(
            point
                .with_field("monitor-class", monitor_class)
                .with_field("thread", thread)
                .with_field("address", address)
                .with_stacktrace(stacktrace),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jfr_types::FieldValue;
    use jfr_types::Number;
    use jfr_types::StackFrame;
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;
    use crate::handlers::testing::RecordingSink;

    fn wait(duration_ns: i64, thread: &str) -> RawEvent {
        RawEvent::new(JAVA_MONITOR_WAIT)
            .with_value("duration", duration_ns)
            .with_value("monitorClass", "java.lang.Object")
            .with_value("address", 255i64)
            .with_value("eventThread", thread)
            .with_value("notifier", "producer")
            .with_value("timeout", 0i64)
            .with_value("timedOut", false)
            .with_stack_trace(vec![StackFrame::new("java.lang.Object", "wait", -1)])
    }

    #[test]
    fn long_wait_is_reported() {
        let sink = Arc::new(RecordingSink::default());
        let handler = MonitorHandler::new(sink.clone());

        handler
            .on_event(&wait(20_000_000, "consumer"))
            .expect("should handle wait");

        let points = sink.points();
        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.measurement(), "java-monitor-wait");
        assert_eq!(point.value(), Number::Integer(20_000_000));
        assert_eq!(
            point.extra_fields().get("address"),
            Some(&FieldValue::String("0xff".to_string()))
        );
        assert_eq!(
            point.extra_fields().get("timed-out"),
            Some(&FieldValue::String("false".to_string()))
        );
        assert_eq!(
            point.extra_fields().get("notifier"),
            Some(&FieldValue::String("producer".to_string()))
        );
    }

    #[test]
    fn short_and_internal_waits_are_ignored() {
        let sink = Arc::new(RecordingSink::default());
        let handler = MonitorHandler::new(sink.clone());

        handler
            .on_event(&wait(10_000_000, "consumer"))
            .expect("should ignore short wait");
        handler
            .on_event(&wait(50_000_000, "JFR Event Stream Thread"))
            .expect("should ignore jfr thread");
        handler
            .on_event(&wait(50_000_000, "Finalizer"))
            .expect("should ignore finalizer");

        assert!(sink.points().is_empty());
    }

    #[test]
    fn contended_enter_reports_previous_owner() {
        let sink = Arc::new(RecordingSink::default());
        let handler = MonitorHandler::new(sink.clone());

        handler
            .on_event(
                &RawEvent::new(JAVA_MONITOR_ENTER)
                    .with_value("duration", 11_000_000i64)
                    .with_value("monitorClass", "com.shop.Inventory")
                    .with_value("address", 4096i64)
                    .with_stack_trace(vec![StackFrame::new("com.shop.Inventory", "reserve", 40)]),
            )
            .expect("should handle enter");

        let points = sink.points();
        assert_eq!(points[0].measurement(), "java-monitor-enter");
        assert_eq!(
            points[0].extra_fields().get("previous-owner"),
            Some(&FieldValue::String("<unknown>".to_string()))
        );
        assert_eq!(
            points[0].extra_fields().get("thread"),
            Some(&FieldValue::String("<unknown>".to_string()))
        );
    }
}
