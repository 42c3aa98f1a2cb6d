use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use error_stack::Report;
use jfr_types::EventError;
use jfr_types::EventSubscription;
use jfr_types::MetricPoint;
use jfr_types::MetricSink;
use jfr_types::RawEvent;
use jfr_types::ThresholdPair;
use tracing::debug;
use tracing::error;
use tracing::trace;

use super::frames::render_stack_trace;
use super::frames::thread_name;
use super::frames::translate_class_name;
use super::rate::per_second;
use super::rate::RateWindow;
use super::rate::REPORT_INTERVAL;
use super::EventHandler;

const OBJECT_ALLOCATION_OUTSIDE_TLAB: &str = "jdk.ObjectAllocationOutsideTLAB";
const OBJECT_ALLOCATION_SAMPLE: &str = "jdk.ObjectAllocationSample";

/// Build the point for an allocation above its threshold.
///
/// Returns `None` and logs an error when the event has no stack trace.
fn large_allocation(
    event: &RawEvent,
    measurement: &str,
    bytes: i64,
) -> Result<Option<MetricPoint>, Report<EventError>> {
    let object_class = event.string("objectClass")?.unwrap_or("<unknown>");
    let Some(stacktrace) = render_stack_trace(event) else {
        error!(
            event_type = %event.event_type,
            bytes,
            object_class,
            "no stack trace available for large allocation"
        );
        return Ok(None);
    };

    let object_class = translate_class_name(object_class);
    debug!(
        bytes,
        object_class = %object_class,
        frame = stacktrace.first().map_or("<none>", String::as_str),
        "found large allocation"
    );

    Ok(Some(
        MetricPoint::new(event.start_time, measurement, "bytes", bytes)
            .with_field("objectClass", object_class)
            .with_field("thread", thread_name(event, "eventThread"))
            .with_stacktrace(stacktrace),
    ))
}

/// Reports single allocations outside a TLAB larger than a threshold.
pub struct BigAllocationHandler {
    sink: Arc<dyn MetricSink>,
    threshold: i64,
}

impl BigAllocationHandler {
    pub fn new(sink: Arc<dyn MetricSink>, threshold: i64) -> Self {
        debug!(threshold, "tracing allocations outside TLAB above threshold");
        Self { sink, threshold }
    }
}

impl EventHandler for BigAllocationHandler {
    fn subscriptions(&self) -> Vec<EventSubscription> {
        vec![EventSubscription::new(OBJECT_ALLOCATION_OUTSIDE_TLAB)]
    }

    fn on_event(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        let size = event.long("allocationSize")?;
        trace!(start_time = ?event.start_time, size, "allocation outside TLAB");
        if size > self.threshold {
            if let Some(point) = large_allocation(event, "big-allocations", size)? {
                self.sink.process(point);
            }
        }
        Ok(())
    }
}

/// Reports heavy allocation samples and the overall allocation rate.
///
/// Every sample weight is added to a running total which is reported as
/// bytes per second once per report interval.
pub struct AllocationSampleHandler {
    sink: Arc<dyn MetricSink>,
    threshold: i64,
    total_weight: AtomicI64,
    window: RateWindow,
}

impl AllocationSampleHandler {
    pub fn new(sink: Arc<dyn MetricSink>, threshold: i64) -> Self {
        Self::starting_at(sink, threshold, Instant::now())
    }

    pub(crate) fn starting_at(sink: Arc<dyn MetricSink>, threshold: i64, origin: Instant) -> Self {
        debug!(threshold, "tracing allocation samples above weight threshold");
        Self {
            sink,
            threshold,
            total_weight: AtomicI64::new(0),
            window: RateWindow::starting_at(origin, REPORT_INTERVAL),
        }
    }

    pub(crate) fn on_event_at(
        &self,
        event: &RawEvent,
        now: Instant,
    ) -> Result<(), Report<EventError>> {
        // relative weight of the sample; summed up it approximates allocation pressure
        let weight = event.long("weight")?;
        trace!(start_time = ?event.start_time, weight, "allocation sample");

        if weight > self.threshold {
            if let Some(point) = large_allocation(event, "object-allocation-sample", weight)? {
                self.sink.process(point);
            }
        }

        self.total_weight.fetch_add(weight, Ordering::AcqRel);
        if let Some(elapsed) = self.window.try_claim(now) {
            let total = self.total_weight.swap(0, Ordering::AcqRel);
            if total != 0 {
                let rate = per_second(total, elapsed);
                debug!(total, rate, "allocation rate");
                self.sink.process(MetricPoint::new(
                    event.start_time,
                    "allocation-rate-bytes",
                    "bytes",
                    rate,
                ));
            }
        }
        Ok(())
    }
}

impl EventHandler for AllocationSampleHandler {
    fn subscriptions(&self) -> Vec<EventSubscription> {
        vec![EventSubscription::new(OBJECT_ALLOCATION_SAMPLE)
            .with_named_threshold(ThresholdPair::new("throttle", "200/s"))]
    }

    fn on_event(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        self.on_event_at(event, Instant::now())
    }
}
