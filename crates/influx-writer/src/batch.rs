use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

/// Limits that decide when buffered lines are flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Flush once more than this many lines are buffered
    pub max_batch_size: usize,
    /// Flush once this much time passed since the previous flush
    pub max_batch_age: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 1000,
            max_batch_age: Duration::from_millis(5000),
        }
    }
}

/// Newline-joined lines drained from the buffer in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub payload: String,
    pub line_count: usize,
}

struct BatchState {
    lines: Vec<String>,
    next_flush: Instant,
}

/// Thread-safe line buffer with size and age flush triggers.
///
/// The buffer and the flush deadline are guarded by one lock. Draining hands
/// the batch back to the caller so sending happens outside the lock.
pub struct BatchingWriter {
    config: BatchConfig,
    state: Mutex<BatchState>,
}

impl BatchingWriter {
    pub fn new(config: BatchConfig) -> Self {
        Self::starting_at(config, Instant::now())
    }

    fn starting_at(config: BatchConfig, now: Instant) -> Self {
        Self {
            config,
            state: Mutex::new(BatchState {
                lines: Vec::new(),
                next_flush: now + config.max_batch_age,
            }),
        }
    }

    /// Buffer `line` and return a batch when a flush trigger fired.
    pub fn write(&self, line: String) -> Option<Batch> {
        self.push(line, Instant::now())
    }

    fn push(&self, line: String, now: Instant) -> Option<Batch> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.lines.push(line);

        if state.lines.len() > self.config.max_batch_size || now > state.next_flush {
            state.next_flush = now + self.config.max_batch_age;
            Some(take_batch(&mut state.lines))
        } else {
            None
        }
    }

    /// Drain everything regardless of the triggers. Returns `None` when the
    /// buffer is empty.
    pub fn drain(&self) -> Option<Batch> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.next_flush = Instant::now() + self.config.max_batch_age;
        if state.lines.is_empty() {
            return None;
        }
        Some(take_batch(&mut state.lines))
    }

    /// Number of lines waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .lines
            .len()
    }
}

fn take_batch(lines: &mut Vec<String>) -> Batch {
    let drained = std::mem::take(lines);
    Batch {
        line_count: drained.len(),
        payload: drained.join("\n"),
    }
}
