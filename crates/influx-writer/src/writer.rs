use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use jfr_types::MetricPoint;
use jfr_types::MetricSink;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::batch::Batch;
use crate::batch::BatchConfig;
use crate::batch::BatchingWriter;
use crate::encoder::LineProtocolEncoder;
use crate::transport::Transport;

/// Metric sink that encodes, batches and sends points.
///
/// Delivery is best effort: a failed send is logged and the batch dropped.
pub struct InfluxWriter<T> {
    encoder: LineProtocolEncoder,
    batcher: BatchingWriter,
    transport: T,
    closed: AtomicBool,
}

impl<T: Transport> InfluxWriter<T> {
    pub fn new(encoder: LineProtocolEncoder, batch: BatchConfig, transport: T) -> Self {
        Self {
            encoder,
            batcher: BatchingWriter::new(batch),
            transport,
            closed: AtomicBool::new(false),
        }
    }

    /// Flush whatever is buffered and close the transport.
    ///
    /// Only the first call has an effect. Points processed concurrently with
    /// the close are either part of the final flush or dropped.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(batch) = self.batcher.drain() {
            self.send(batch);
        }
        self.transport.close();
        debug!("influx writer closed");
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn send(&self, batch: Batch) {
        debug!(lines = batch.line_count, "flushing metric batch");
        if let Err(err) = self.transport.send(&batch.payload) {
            error!(lines = batch.line_count, error = ?err, "failed to send metric batch");
        }
    }
}

impl<T: Transport> MetricSink for InfluxWriter<T> {
    fn process(&self, point: MetricPoint) {
        if self.closed.load(Ordering::Acquire) {
            debug!(measurement = point.measurement(), "writer closed, dropping point");
            return;
        }
        let line = self.encoder.encode(&point);
        if let Some(batch) = self.batcher.write(line) {
            self.send(batch);
        }
        // a close that drained between the check above and the write has
        // already closed the transport, so the late lines are dropped here
        if self.closed.load(Ordering::Acquire) {
            if let Some(batch) = self.batcher.drain() {
                warn!(lines = batch.line_count, "writer closed while writing, dropping lines");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::thread;

    use chrono::DateTime;
    use error_stack::Report;
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;
    use crate::error::TransportError;
    use crate::error::TransportResult;

    #[derive(Default)]
    struct FakeTransport {
        sent: Mutex<Vec<String>>,
        closes: AtomicUsize,
        fail: bool,
    }

    impl Transport for FakeTransport {
        fn send(&self, payload: &str) -> TransportResult<()> {
            self.sent
                .lock()
                .expect("lock")
                .push(payload.to_string());
            if self.fail {
                return Err(Report::new(TransportError::Http {
                    status: 500,
                    message: "down".into(),
                }));
            }
            Ok(())
        }

        fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn writer(max_batch_size: usize, transport: FakeTransport) -> InfluxWriter<FakeTransport> {
        InfluxWriter::new(
            LineProtocolEncoder::new([("application".to_string(), "app".to_string())], true),
            BatchConfig {
                max_batch_size,
                ..Default::default()
            },
            transport,
        )
    }

    fn point(value: i64) -> MetricPoint {
        let ts = DateTime::from_timestamp(1, 0).expect("valid timestamp");
        MetricPoint::new(Some(ts), "threads", "activeCount", value)
    }

    #[test]
    fn flushes_when_batch_size_is_exceeded() {
        let writer = writer(2, FakeTransport::default());

        writer.process(point(1));
        writer.process(point(2));
        assert!(writer.transport().sent.lock().expect("lock").is_empty());

        writer.process(point(3));
        let sent = writer.transport().sent.lock().expect("lock").clone();
        assert_eq!(
            sent,
            vec![[
                "threads,application=app activeCount=1 1000000000",
                "threads,application=app activeCount=2 1000000000",
                "threads,application=app activeCount=3 1000000000",
            ]
            .join("\n")]
        );
    }

    #[test]
    fn close_flushes_once() {
        let writer = writer(1000, FakeTransport::default());
        writer.process(point(1));
        writer.process(point(2));

        writer.close();
        writer.close();
        writer.process(point(3));

        let transport = writer.transport();
        assert_eq!(transport.sent.lock().expect("lock").len(), 1);
        assert_eq!(transport.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn send_failures_are_swallowed() {
        let writer = writer(
            0,
            FakeTransport {
                fail: true,
                ..Default::default()
            },
        );

        writer.process(point(1));
        writer.process(point(2));
        writer.close();

        assert_eq!(writer.transport().sent.lock().expect("lock").len(), 2);
    }

    #[test]
    fn nothing_is_left_buffered_after_close() {
        let writer = Arc::new(writer(1000, FakeTransport::default()));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let writer = Arc::clone(&writer);
                thread::spawn(move || {
                    for value in 0..500 {
                        writer.process(point(value));
                    }
                })
            })
            .collect();
        writer.close();
        for worker in workers {
            worker.join().expect("thread should not panic");
        }

        assert!(writer.batcher.drain().is_none());
        assert_eq!(writer.transport().closes.load(Ordering::SeqCst), 1);
    }
}
