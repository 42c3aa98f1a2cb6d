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

const CONTAINER_CPU_THROTTLING: &str = "jdk.ContainerCPUThrottling";
const CONTAINER_MEMORY_USAGE: &str = "jdk.ContainerMemoryUsage";

/// CPU throttling and memory usage reported by the container runtime.
pub struct ContainerHandler {
    sink: Arc<dyn MetricSink>,
}

impl ContainerHandler {
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self { sink }
    }

    fn cpu_throttling(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        let elapsed_slices = event.long("cpuElapsedSlices")?;
        let throttled_slices = event.long("cpuThrottledSlices")?;
        let throttled_time = event.long("cpuThrottledTime")?;

        self.sink.process(
            MetricPoint::new(
                event.start_time,
                "container-cpu-throttling-slices",
                "cpuElapsedSlices",
                elapsed_slices,
            )
            .with_field("cpuThrottledSlices", throttled_slices),
        );
        self.sink.process(MetricPoint::new(
            event.start_time,
            "container-cpu-throttling-time",
            "cpuThrottledTime",
            throttled_time,
        ));
        Ok(())
    }

    fn memory_usage(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        let memory_usage = event.long("memoryUsage")?;
        // swapMemoryUsage includes regular memory
        let swap_usage = event.long("swapMemoryUsage")? - memory_usage;
        let fail_count = event.long("memoryFailCount")?;

        self.sink.process(
            MetricPoint::new(
                event.start_time,
                "container-memory-usage",
                "memoryUsage",
                memory_usage,
            )
            .with_field("swapMemoryUsage", swap_usage),
        );
        self.sink.process(MetricPoint::new(
            event.start_time,
            "container-memory-usage-failures",
            "memoryFailCount",
            fail_count,
        ));
        Ok(())
    }
}

impl EventHandler for ContainerHandler {
    fn subscriptions(&self) -> Vec<EventSubscription> {
        vec![
            EventSubscription::new(CONTAINER_MEMORY_USAGE).with_period(Duration::from_secs(1)),
            EventSubscription::new(CONTAINER_CPU_THROTTLING).with_period(Duration::from_secs(1)),
        ]
    }

    fn on_event(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        match event.event_type.as_str() {
            CONTAINER_CPU_THROTTLING => self.cpu_throttling(event),
            CONTAINER_MEMORY_USAGE => self.memory_usage(event),
            other => {
                debug!(event_type = other, "ignoring unknown event");
                Ok(())
            }
        }
    }
}
