//! Handlers turning raw flight recorder events into metric points
//!
//! Each handler subscribes to one or more event types and reports the points
//! it derives to a shared [`MetricSink`]. Some of them keep state between
//! events: safepoint begin times, and byte counters that are reported as a
//! rate every couple of seconds.

mod allocation;
mod container;
mod cpu;
mod frames;
mod gc;
mod monitor;
mod native_memory;
mod rate;
mod safepoint;
mod socket;
mod statistics;

use std::sync::Arc;

use error_stack::Report;
use jfr_types::EventError;
use jfr_types::EventSubscription;
use jfr_types::MetricSink;
use jfr_types::RawEvent;

pub use allocation::AllocationSampleHandler;
pub use allocation::BigAllocationHandler;
pub use container::ContainerHandler;
pub use cpu::CpuLoadHandler;
pub use frames::translate_class_name;
pub use gc::GcHandler;
pub use monitor::MonitorHandler;
pub use native_memory::NativeMemoryHandler;
pub use safepoint::SafepointHandler;
pub use socket::PortBucket;
pub use socket::SocketHandler;
pub use statistics::JavaStatisticsHandler;

/// Capability shared by every handler.
pub trait EventHandler: Send + Sync {
    /// Event types this handler wants, with their recording settings.
    fn subscriptions(&self) -> Vec<EventSubscription>;

    /// Process one event, reporting zero or more points to the sink.
    fn on_event(&self, event: &RawEvent) -> Result<(), Report<EventError>>;
}

/// Thresholds for the allocation handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerSettings {
    /// Allocations outside a TLAB above this many bytes are reported
    pub big_object_threshold: i64,
    /// Allocation samples with a weight above this many bytes are reported
    pub sample_weight_threshold: i64,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            big_object_threshold: 256_000,
            sample_weight_threshold: 48_000_000,
        }
    }
}

/// The built-in handlers.
pub enum Handler {
    CpuLoad(CpuLoadHandler),
    Gc(GcHandler),
    JavaStatistics(JavaStatisticsHandler),
    Container(ContainerHandler),
    NativeMemory(NativeMemoryHandler),
    BigAllocation(BigAllocationHandler),
    AllocationSample(AllocationSampleHandler),
    Monitor(MonitorHandler),
    Safepoint(SafepointHandler),
    Socket(SocketHandler),
}

impl Handler {
    fn inner(&self) -> &dyn EventHandler {
        match self {
            Handler::CpuLoad(handler) => handler,
            Handler::Gc(handler) => handler,
            Handler::JavaStatistics(handler) => handler,
            Handler::Container(handler) => handler,
            Handler::NativeMemory(handler) => handler,
            Handler::BigAllocation(handler) => handler,
            Handler::AllocationSample(handler) => handler,
            Handler::Monitor(handler) => handler,
            Handler::Safepoint(handler) => handler,
            Handler::Socket(handler) => handler,
        }
    }
}

impl EventHandler for Handler {
    fn subscriptions(&self) -> Vec<EventSubscription> {
        self.inner().subscriptions()
    }

    fn on_event(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        self.inner().on_event(event)
    }
}

/// Create every built-in handler reporting to `sink`.
pub fn builtin(sink: Arc<dyn MetricSink>, settings: HandlerSettings) -> Vec<Handler> {
    vec![
        Handler::CpuLoad(CpuLoadHandler::new(sink.clone())),
        Handler::Gc(GcHandler::new(sink.clone())),
        Handler::JavaStatistics(JavaStatisticsHandler::new(sink.clone())),
        Handler::Container(ContainerHandler::new(sink.clone())),
        Handler::NativeMemory(NativeMemoryHandler::new(sink.clone())),
        Handler::BigAllocation(BigAllocationHandler::new(
            sink.clone(),
            settings.big_object_threshold,
        )),
        Handler::AllocationSample(AllocationSampleHandler::new(
            sink.clone(),
            settings.sample_weight_threshold,
        )),
        Handler::Monitor(MonitorHandler::new(sink.clone())),
        Handler::Safepoint(SafepointHandler::new(sink.clone())),
        Handler::Socket(SocketHandler::new(sink)),
    ]
}


#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use similar_asserts::assert_eq;
    use test_log::test;

    use super::testing::RecordingSink;
    use super::*;

    #[test]
    fn builtin_handlers_subscribe_to_distinct_event_types() {
        let sink = Arc::new(RecordingSink::default());
        let handlers = builtin(sink, HandlerSettings::default());

        let types: Vec<String> = handlers
            .iter()
            .flat_map(|handler| handler.subscriptions())
            .map(|subscription| subscription.event_type().to_string())
            .collect();
        let unique: HashSet<&String> = types.iter().collect();

        assert_eq!(types.len(), 20);
        assert_eq!(unique.len(), types.len());
    }
}
