use std::fmt;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use dashmap::DashMap;
use error_stack::Report;
use jfr_types::EventError;
use jfr_types::EventSubscription;
use jfr_types::MetricPoint;
use jfr_types::MetricSink;
use jfr_types::RawEvent;
use tracing::debug;
use tracing::trace;

use super::rate::per_second;
use super::rate::RateWindow;
use super::rate::REPORT_INTERVAL;
use super::EventHandler;

const SOCKET_READ: &str = "jdk.SocketRead";
const SOCKET_WRITE: &str = "jdk.SocketWrite";

/// Remote port as used in the endpoint key.
///
/// Ephemeral ports are collapsed into one bucket to bound the number of keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortBucket {
    Fixed(i64),
    Dynamic,
}

impl PortBucket {
    const DYNAMIC_PORTS: std::ops::RangeInclusive<i64> = 24000..=65535;

    pub fn from_port(port: i64) -> Self {
        if Self::DYNAMIC_PORTS.contains(&port) {
            PortBucket::Dynamic
        } else {
            PortBucket::Fixed(port)
        }
    }
}

impl fmt::Display for PortBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortBucket::Fixed(port) => write!(f, "{port}"),
            PortBucket::Dynamic => f.write_str("dynamic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EndpointKey {
    host: Option<String>,
    address: Option<String>,
    port: PortBucket,
}

/// Byte counters per remote endpoint for one direction.
struct Direction {
    measurement: &'static str,
    bytes_field: &'static str,
    totals: DashMap<EndpointKey, AtomicI64>,
    window: RateWindow,
}

impl Direction {
    fn new(measurement: &'static str, bytes_field: &'static str, origin: Instant) -> Self {
        Self {
            measurement,
            bytes_field,
            totals: DashMap::new(),
            window: RateWindow::starting_at(origin, REPORT_INTERVAL),
        }
    }

    fn record(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        let bytes = event.long(self.bytes_field)?;
        let key = EndpointKey {
            host: event.string("host")?.map(str::to_string),
            address: event.string("address")?.map(str::to_string),
            port: PortBucket::from_port(event.long("port")?),
        };
        trace!(direction = self.measurement, bytes, port = %key.port, "socket io");
        if bytes == 0 {
            return Ok(());
        }
        self.totals
            .entry(key)
            .or_insert_with(|| AtomicI64::new(0))
            .fetch_add(bytes, Ordering::AcqRel);
        Ok(())
    }

    fn report(&self, sink: &dyn MetricSink, now: Instant) {
        let Some(elapsed) = self.window.try_claim(now) else {
            return;
        };
        // collected first so no map shard is locked while the sink runs
        let totals: Vec<(EndpointKey, i64)> = self
            .totals
            .iter()
            .filter_map(|entry| {
                let total = entry.value().swap(0, Ordering::AcqRel);
                (total != 0).then(|| (entry.key().clone(), total))
            })
            .collect();

        let timestamp = Some(Utc::now());
        for (key, total) in totals {
            let rate = per_second(total, elapsed);
            debug!(
                direction = self.measurement,
                host = key.host.as_deref(),
                port = %key.port,
                total,
                rate,
                "socket rate"
            );
            sink.process(
                MetricPoint::new(timestamp, self.measurement, "bytes", rate)
                    .with_optional_tag("host", key.host.as_deref())
                    .with_optional_tag("address", key.address.as_deref())
                    .with_tag("port", key.port.to_string()),
            );
        }
    }
}

/// Reports socket read and write throughput per remote endpoint.
pub struct SocketHandler {
    sink: Arc<dyn MetricSink>,
    read: Direction,
    write: Direction,
}

impl SocketHandler {
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self::starting_at(sink, Instant::now())
    }

    pub(crate) fn starting_at(sink: Arc<dyn MetricSink>, origin: Instant) -> Self {
        Self {
            sink,
            read: Direction::new("socket-read-rate-bytes", "bytesRead", origin),
            write: Direction::new("socket-write-rate-bytes", "bytesWritten", origin),
        }
    }

    pub(crate) fn on_event_at(
        &self,
        event: &RawEvent,
        now: Instant,
    ) -> Result<(), Report<EventError>> {
        let direction = match event.event_type.as_str() {
            SOCKET_READ => &self.read,
            SOCKET_WRITE => &self.write,
            other => {
                debug!(event_type = other, "ignoring unknown event");
                return Ok(());
            }
        };
        direction.record(event)?;
        direction.report(self.sink.as_ref(), now);
        Ok(())
    }
}

impl EventHandler for SocketHandler {
    fn subscriptions(&self) -> Vec<EventSubscription> {
        vec![
            EventSubscription::new(SOCKET_READ),
            EventSubscription::new(SOCKET_WRITE),
        ]
    }

    fn on_event(&self, event: &RawEvent) -> Result<(), Report<EventError>> {
        self.on_event_at(event, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use jfr_types::Number;
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;
    use crate::handlers::testing::RecordingSink;

    fn read(bytes: i64, port: i64) -> RawEvent {
        RawEvent::new(SOCKET_READ)
            .with_value("bytesRead", bytes)
            .with_value("host", "db.internal")
            .with_value("address", "10.0.0.7")
            .with_value("port", port)
    }

    #[test]
    fn ephemeral_ports_are_bucketed() {
        assert_eq!(PortBucket::from_port(80).to_string(), "80");
        assert_eq!(PortBucket::from_port(23999), PortBucket::Fixed(23999));
        assert_eq!(PortBucket::from_port(24000).to_string(), "dynamic");
        assert_eq!(PortBucket::from_port(65535), PortBucket::Dynamic);
    }

    #[test]
    fn read_rate_per_endpoint() {
        let sink = Arc::new(RecordingSink::default());
        let origin = Instant::now();
        let handler = SocketHandler::starting_at(sink.clone(), origin);

        handler
            .on_event_at(&read(4000, 5432), origin + Duration::from_millis(100))
            .expect("should record");
        handler
            .on_event_at(&read(3000, 5432), origin + Duration::from_millis(900))
            .expect("should record");
        assert!(sink.points().is_empty());

        handler
            .on_event_at(&read(1000, 5432), origin + Duration::from_millis(2050))
            .expect("should report");

        let points = sink.points();
        assert_eq!(points.len(), 1);
        let point = &points[0];
        assert_eq!(point.measurement(), "socket-read-rate-bytes");
        assert_eq!(point.value(), Number::Integer(4000));
        assert_eq!(point.tags().get("port"), Some(&Some("5432".to_string())));
        assert_eq!(
            point.tags().get("host"),
            Some(&Some("db.internal".to_string()))
        );
    }

    #[test]
    fn directions_and_endpoints_are_reported_separately() {
        let sink = Arc::new(RecordingSink::default());
        let origin = Instant::now();
        let handler = SocketHandler::starting_at(sink.clone(), origin);
        let write = RawEvent::new(SOCKET_WRITE)
            .with_value("bytesWritten", 600i64)
            .with_value("host", jfr_types::RawValue::Null)
            .with_value("address", "10.0.0.9")
            .with_value("port", 40000i64);

        handler
            .on_event_at(&read(0, 80), origin)
            .expect("should ignore empty read");
        handler
            .on_event_at(&read(2000, 443), origin + Duration::from_secs(3))
            .expect("should report read");
        handler
            .on_event_at(&write, origin + Duration::from_secs(3))
            .expect("should report write");

        let points = sink.points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].measurement(), "socket-read-rate-bytes");
        assert_eq!(points[0].value(), Number::Integer(666));
        assert_eq!(points[1].measurement(), "socket-write-rate-bytes");
        assert_eq!(points[1].value(), Number::Integer(200));
        assert_eq!(points[1].tags().get("host"), Some(&None));
        assert_eq!(
            points[1].tags().get("port"),
            Some(&Some("dynamic".to_string()))
        );
    }

    #[test]
    fn zero_byte_window_reports_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let origin = Instant::now();
        let handler = SocketHandler::starting_at(sink.clone(), origin);

        handler
            .on_event_at(&read(0, 5432), origin + Duration::from_millis(2500))
            .expect("should claim the window");
        assert!(sink.points().is_empty());

        handler
            .on_event_at(&read(1000, 5432), origin + Duration::from_millis(2600))
            .expect("should record");
        handler
            .on_event_at(&read(0, 5432), origin + Duration::from_millis(4600))
            .expect("should report");
        assert_eq!(sink.points().len(), 1);

        handler
            .on_event_at(&read(0, 5432), origin + Duration::from_millis(6700))
            .expect("should claim the window");
        assert_eq!(sink.points().len(), 1);
    }

    #[test]
    fn concurrent_reads_are_all_reported() {
        let sink = Arc::new(RecordingSink::default());
        let origin = Instant::now();
        let handler = Arc::new(SocketHandler::starting_at(sink.clone(), origin));
        let barrier = Arc::new(Barrier::new(8));

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let handler = Arc::clone(&handler);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let port = if worker % 2 == 0 { 5432 } else { 80 };
                    for _ in 0..100 {
                        handler
                            .on_event_at(&read(3, port), origin + Duration::from_millis(100))
                            .expect("should record");
                    }
                    barrier.wait();
                    // one of these claims the first window while the others keep recording
                    for _ in 0..100 {
                        handler
                            .on_event_at(&read(3, port), origin + Duration::from_millis(3500))
                            .expect("should record");
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("thread should not panic");
        }
        handler
            .on_event_at(&read(3, 5432), origin + Duration::from_millis(7000))
            .expect("should report the remainder");

        // both windows span three whole seconds
        let mut reported: BTreeMap<String, i64> = BTreeMap::new();
        for point in sink.points() {
            let Number::Integer(rate) = point.value() else {
                panic!("socket rates are integers");
            };
            let port = point
                .tags()
                .get("port")
                .cloned()
                .flatten()
                .expect("should have a port tag");
            *reported.entry(port).or_default() += rate * 3;
        }

        assert_eq!(
            reported,
            BTreeMap::from([("5432".to_string(), 2403), ("80".to_string(), 2400)])
        );
    }
}
