use std::collections::BTreeMap;
use std::fmt;

use chrono::DateTime;
use chrono::Utc;

/// Primary numeric value of a metric point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Integer(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Integer(value.into())
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(value) => write!(f, "{value}"),
            Number::Float(value) => write!(f, "{value}"),
        }
    }
}

/// Supplementary field value written next to the primary field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Number> for FieldValue {
    fn from(value: Number) -> Self {
        match value {
            Number::Integer(value) => FieldValue::Integer(value),
            Number::Float(value) => FieldValue::Float(value),
        }
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// A single time-series sample produced by a handler.
///
/// Points are assembled with the `with_*` methods and handed over to a
/// [`MetricSink`] by value; there is no way to change a point afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    timestamp: Option<DateTime<Utc>>,
    measurement: String,
    tags: BTreeMap<String, Option<String>>,
    field: String,
    value: Number,
    extra_fields: BTreeMap<String, FieldValue>,
    stacktrace: Vec<String>,
}

impl MetricPoint {
    /// Create a point with its primary field.
    ///
    /// # Panics
    ///
    /// Panics when `measurement` or `field` is blank.
    pub fn new(
        timestamp: Option<DateTime<Utc>>,
        measurement: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Number>,
    ) -> Self {
        let measurement = measurement.into();
        let field = field.into();
        assert!(
            !measurement.trim().is_empty(),
            "metric point needs a measurement"
        );
        assert!(
            !field.trim().is_empty(),
            "metric point `{measurement}` needs a field name"
        );
        Self {
            timestamp,
            measurement,
            tags: BTreeMap::new(),
            field,
            value: value.into(),
            extra_fields: BTreeMap::new(),
            stacktrace: Vec::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), Some(value.into()));
        self
    }

    /// Add a tag whose value may be unknown. Unknown values are kept so the
    /// series schema stays stable.
    pub fn with_optional_tag(mut self, key: impl Into<String>, value: Option<&str>) -> Self {
        self.tags.insert(key.into(), value.map(str::to_string));
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra_fields.insert(key.into(), value.into());
        self
    }

    pub fn with_stacktrace(mut self, frames: Vec<String>) -> Self {
        self.stacktrace = frames;
        self
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, Option<String>> {
        &self.tags
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> Number {
        self.value
    }

    pub fn extra_fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.extra_fields
    }

    pub fn stacktrace(&self) -> &[String] {
        &self.stacktrace
    }
}

/// Receiver of the points produced by handlers.
pub trait MetricSink: Send + Sync {
    fn process(&self, point: MetricPoint);
}
