use std::fmt;
use std::time::Duration;

/// A named setting passed through to the event source, e.g. `throttle=200/s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdPair {
    pub name: String,
    pub value: String,
}

impl ThresholdPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ThresholdPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Which event type a handler wants delivered, and how.
///
/// The settings are hints for the event source; nothing in the dispatch path
/// enforces them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSubscription {
    event_type: String,
    period: Option<Duration>,
    threshold: Option<Duration>,
    named_threshold: Option<ThresholdPair>,
}

impl EventSubscription {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            period: None,
            threshold: None,
            named_threshold: None,
        }
    }

    /// Sample a periodic event every `period`.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }

    /// Only deliver events lasting longer than `threshold`.
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_named_threshold(mut self, pair: ThresholdPair) -> Self {
        self.named_threshold = Some(pair);
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn threshold(&self) -> Option<Duration> {
        self.threshold
    }

    pub fn named_threshold(&self) -> Option<&ThresholdPair> {
        self.named_threshold.as_ref()
    }
}
