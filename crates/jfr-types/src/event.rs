use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use error_stack::Report;
use serde::Deserialize;
use serde::Serialize;

use crate::EventError;

/// A single value recorded on a raw event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Boolean(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::String(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RawValue::Null, Into::into)
    }
}

/// One frame of a recorded stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// Fully qualified name of the declaring type
    pub declaring_type: String,
    /// Method name
    pub method: String,
    /// Source line number, negative when unknown
    #[serde(default = "unknown_line")]
    pub line: i32,
}

fn unknown_line() -> i32 {
    -1
}

impl StackFrame {
    pub fn new(declaring_type: impl Into<String>, method: impl Into<String>, line: i32) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            method: method.into(),
            line,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} (line: {})",
            self.declaring_type, self.method, self.line
        )
    }
}

/// A typed, timestamped event as delivered by the event source.
///
/// Only the values a handler explicitly asks for are interpreted; everything
/// else is carried along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Event type name, e.g. `jdk.CPULoad`
    #[serde(rename = "type")]
    pub event_type: String,
    /// When the event started
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// When the event ended, equal to the start for instant events
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Recorded stack trace, `None` when the recording carried none
    #[serde(default)]
    pub stack_trace: Option<Vec<StackFrame>>,
    /// Named values of the event
    #[serde(default)]
    pub values: BTreeMap<String, RawValue>,
}

impl RawEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            start_time: None,
            end_time: None,
            stack_trace: None,
            values: BTreeMap::new(),
        }
    }

    /// Set both start and end time to `time`.
    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.start_time = Some(time);
        self.end_time = Some(time);
        self
    }

    pub fn with_end_time(mut self, time: DateTime<Utc>) -> Self {
        self.end_time = Some(time);
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn with_stack_trace(mut self, frames: Vec<StackFrame>) -> Self {
        self.stack_trace = Some(frames);
        self
    }

    fn value(&self, name: &str) -> Result<&RawValue, Report<EventError>> {
        self.values
            .get(name)
            .ok_or_else(|| Report::new(EventError::missing(&self.event_type, name)))
    }

    /// Read an integer value.
    pub fn long(&self, name: &str) -> Result<i64, Report<EventError>> {
        match self.value(name)? {
            RawValue::Integer(value) => Ok(*value),
            _ => Err(Report::new(EventError::wrong_type(
                &self.event_type,
                name,
                "integer",
            ))),
        }
    }

    /// Read a numeric value, widening integers.
    pub fn double(&self, name: &str) -> Result<f64, Report<EventError>> {
        match self.value(name)? {
            RawValue::Float(value) => Ok(*value),
            RawValue::Integer(value) => Ok(*value as f64),
            _ => Err(Report::new(EventError::wrong_type(
                &self.event_type,
                name,
                "number",
            ))),
        }
    }

    pub fn boolean(&self, name: &str) -> Result<bool, Report<EventError>> {
        match self.value(name)? {
            RawValue::Boolean(value) => Ok(*value),
            _ => Err(Report::new(EventError::wrong_type(
                &self.event_type,
                name,
                "boolean",
            ))),
        }
    }

    /// Read a string value. An explicit `null` reads as `None`.
    pub fn string(&self, name: &str) -> Result<Option<&str>, Report<EventError>> {
        match self.value(name)? {
            RawValue::String(value) => Ok(Some(value.as_str())),
            RawValue::Null => Ok(None),
            _ => Err(Report::new(EventError::wrong_type(
                &self.event_type,
                name,
                "string",
            ))),
        }
    }

    /// Read a string value that may be absent altogether.
    pub fn optional_string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(RawValue::String(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Duration of the event.
    ///
    /// Taken from the start and end time when both are known, otherwise from
    /// the `duration` value in nanoseconds.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            return (end - start).to_std().ok();
        }
        match self.values.get("duration") {
            Some(RawValue::Integer(nanos)) if *nanos >= 0 => {
                Some(Duration::from_nanos(*nanos as u64))
            }
            _ => None,
        }
    }
}
