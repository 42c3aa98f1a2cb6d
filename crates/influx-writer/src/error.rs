//! Error types for sending batches to InfluxDB.

use core::error::Error;

use derive_more::Display;
use error_stack::Report;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, Report<TransportError>>;

/// Errors that can occur while talking to InfluxDB.
#[derive(Debug, Display)]
pub enum TransportError {
    /// Invalid URL or client settings
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// Connection, timeout or other I/O failure
    #[display("Network error: {message}")]
    Network { message: String },

    /// InfluxDB answered with a non-success status
    #[display("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },
}

impl Error for TransportError {}
