//! Event sources feeding the registry

use core::error::Error;
use std::collections::HashSet;
use std::io::BufRead;
use std::time::Instant;

use derive_more::Display;
use error_stack::Report;
use error_stack::ResultExt;
use jfr_types::EventSubscription;
use jfr_types::RawEvent;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::registry::HandlerRegistry;

/// Delivers raw events of the event types it was told to enable.
pub trait EventSource {
    /// Enable delivery of one event type.
    ///
    /// Period and thresholds of the subscription are hints for the recorder.
    fn enable(&mut self, subscription: &EventSubscription);
}

#[derive(Debug, Display)]
pub enum SourceError {
    #[display("failed to read line {line} of the event stream")]
    Read { line: usize },
}

impl Error for SourceError {}

/// Counters of one run over an event stream.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Events handed to the registry
    pub dispatched: usize,
    /// Well-formed events of a type that was not enabled
    pub skipped: usize,
    /// Lines that could not be parsed as an event
    pub malformed: usize,
}

/// Reads one JSON encoded [`RawEvent`] per line.
pub struct JsonLinesSource<R> {
    reader: R,
    enabled: HashSet<String>,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            enabled: HashSet::new(),
        }
    }

    pub fn is_enabled(&self, event_type: &str) -> bool {
        self.enabled.contains(event_type)
    }

    /// Dispatch events until the input ends or `deadline` passes.
    ///
    /// The deadline is checked between lines, a blocked read is not interrupted.
    pub fn run(
        &mut self,
        registry: &HandlerRegistry,
        deadline: Option<Instant>,
    ) -> Result<RunSummary, Report<SourceError>> {
        let mut summary = RunSummary::default();
        let mut line = String::new();
        let mut number = 0;

        loop {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                info!("recording duration elapsed");
                break;
            }

            line.clear();
            number += 1;
            let read = self
                .reader
                .read_line(&mut line)
                .change_context(SourceError::Read { line: number })?;
            if read == 0 {
                debug!("end of event stream");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let event: RawEvent = match serde_json::from_str(trimmed) {
                Ok(event) => event,
                Err(err) => {
                    warn!(line = number, error = %err, "skipping malformed event");
                    summary.malformed += 1;
                    continue;
                }
            };

            if !self.is_enabled(&event.event_type) {
                summary.skipped += 1;
                continue;
            }
            registry.dispatch(&event.event_type, &event);
            summary.dispatched += 1;
        }

        info!(
            dispatched = summary.dispatched,
            skipped = summary.skipped,
            malformed = summary.malformed,
            "event stream finished"
        );
        Ok(summary)
    }
}

impl<R: BufRead> EventSource for JsonLinesSource<R> {
    fn enable(&mut self, subscription: &EventSubscription) {
        debug!(
            event_type = subscription.event_type(),
            period = ?subscription.period(),
            threshold = ?subscription.threshold(),
            named_threshold = ?subscription.named_threshold().map(ToString::to_string),
            "enable event"
        );
        self.enabled.insert(subscription.event_type().to_string());
    }
}
