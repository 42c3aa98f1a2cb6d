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

const JAVA_THREAD_STATISTICS: &str = "jdk.JavaThreadStatistics";
const CLASS_LOADING_STATISTICS: &str = "jdk.ClassLoadingStatistics";

/// Thread and loaded class counts.
pub struct JavaStatisticsHandler {
    sink: Arc<dyn MetricSink>,
}

impl JavaStatisticsHandler {
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self { sink }
    }
}

impl EventHandler for JavaStatisticsHandler {
    fn subscriptions(&self) -> Vec<EventSubscription> {
        let period = Duration::from_secs(1);
        vec![
            EventSubscription::new(JAVA_THREAD_STATISTICS).with_period(period),
            EventSubscription::new(CLASS_LOADING_STATISTICS).with_period(period),
        ]
    }

    fn on_event(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        match event.event_type.as_str() {
            JAVA_THREAD_STATISTICS => {
                let active = event.long("activeCount")?;
                let daemon = event.long("daemonCount")?;
                self.sink.process(
                    MetricPoint::new(event.start_time, "threads", "activeCount", active)
                        .with_field("daemonCount", daemon),
                );
            }
            CLASS_LOADING_STATISTICS => {
                let loaded = event.long("loadedClassCount")?;
                let unloaded = event.long("unloadedClassCount")?;
                self.sink.process(MetricPoint::new(
                    event.start_time,
                    "classes-loaded",
                    "loadedClassCount",
                    loaded - unloaded,
                ));
            }
            other => debug!(event_type = other, "ignoring unknown event"),
        }
        Ok(())
    }
}
