//! InfluxDB export for metric points
//!
//! Points are encoded to line protocol by [`LineProtocolEncoder`], buffered by
//! [`BatchingWriter`] until a size or age limit is crossed and then handed to
//! a [`Transport`]. [`InfluxWriter`] glues the three together behind the
//! [`jfr_types::MetricSink`] capability.

mod batch;
mod encoder;
mod error;
mod transport;
mod writer;

pub use batch::Batch;
pub use batch::BatchConfig;
pub use batch::BatchingWriter;
pub use encoder::LineProtocolEncoder;
pub use encoder::APPLICATION_TAG;
pub use encoder::STACKTRACE_DELIMITER;
pub use error::TransportError;
pub use error::TransportResult;
pub use transport::HttpConfig;
pub use transport::HttpTransport;
pub use transport::Transport;
pub use writer::InfluxWriter;
