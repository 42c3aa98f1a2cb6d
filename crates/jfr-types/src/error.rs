use derive_more::Display;

/// Errors raised while reading values off a raw event.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The event does not carry the requested value
    #[display("event `{event_type}` has no value `{name}`")]
    MissingField { event_type: String, name: String },

    /// The value exists but has an unexpected type
    #[display("value `{name}` of event `{event_type}` is not a {expected}")]
    FieldType {
        event_type: String,
        name: String,
        expected: &'static str,
    },
}

impl core::error::Error for EventError {}

impl EventError {
    pub fn missing(event_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingField {
            event_type: event_type.into(),
            name: name.into(),
        }
    }

    pub fn wrong_type(
        event_type: impl Into<String>,
        name: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::FieldType {
            event_type: event_type.into(),
            name: name.into(),
            expected,
        }
    }
}
