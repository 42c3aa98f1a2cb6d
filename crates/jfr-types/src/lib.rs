//! Shared type definitions
//!
//! This crate contains the types passed between the event source, the
//! aggregating handlers and the InfluxDB writer: raw flight recorder events,
//! the metric points derived from them and the subscription settings each
//! handler declares.

mod error;
mod event;
mod metric;
mod subscription;

pub use error::EventError;
pub use event::RawEvent;
pub use event::RawValue;
pub use event::StackFrame;
pub use metric::FieldValue;
pub use metric::MetricPoint;
pub use metric::MetricSink;
pub use metric::Number;
pub use subscription::EventSubscription;
pub use subscription::ThresholdPair;
