//! Exports flight recorder events to InfluxDB
//!
//! Raw events are read from an [`source::EventSource`], routed by the
//! [`registry::HandlerRegistry`] to the handler subscribed to their type and
//! turned into metric points. Points go to an `InfluxWriter` which encodes,
//! batches and sends them, or only to the log when no InfluxDB is configured.

pub mod app;
pub mod config;
pub mod handlers;
pub mod registry;
pub mod sink;
pub mod source;
