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

const CPU_LOAD: &str = "jdk.CPULoad";
const THREAD_CONTEXT_SWITCH_RATE: &str = "jdk.ThreadContextSwitchRate";

/// Reports machine and JVM CPU load as percentages, and the context switch rate.
pub struct CpuLoadHandler {
    sink: Arc<dyn MetricSink>,
}

impl CpuLoadHandler {
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self { sink }
    }
}

impl EventHandler for CpuLoadHandler {
    fn subscriptions(&self) -> Vec<EventSubscription> {
        vec![
            EventSubscription::new(CPU_LOAD).with_period(Duration::from_secs(1)),
            EventSubscription::new(THREAD_CONTEXT_SWITCH_RATE).with_period(Duration::from_secs(10)),
        ]
    }

    fn on_event(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        match event.event_type.as_str() {
            CPU_LOAD => {
                let machine_total = event.double("machineTotal")? * 100.0;
                let jvm_user = event.double("jvmUser")? * 100.0;
                let jvm_system = event.double("jvmSystem")? * 100.0;
                self.sink.process(
                    MetricPoint::new(event.start_time, "CPU", "machineTotal", machine_total)
                        .with_field("jvmUser", jvm_user)
                        .with_field("jvmSystem", jvm_system),
                );
            }
            THREAD_CONTEXT_SWITCH_RATE => {
                let switch_rate = event.double("switchRate")?;
                self.sink.process(MetricPoint::new(
                    event.start_time,
                    "thread-context-switch-rate",
                    "switchRate",
                    switch_rate,
                ));
            }
            other => debug!(event_type = other, "ignoring unknown event"),
        }
        Ok(())
    }
}
