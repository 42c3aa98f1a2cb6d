use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

/// Interval between two rate reports.
pub(crate) const REPORT_INTERVAL: Duration = Duration::from_millis(2000);

/// Decides which caller reports a rolling rate.
///
/// The window is only checked when an event arrives; a quiet period
/// produces no report and the next one covers the whole quiet time.
pub(crate) struct RateWindow {
    origin: Instant,
    interval: Duration,
    last_report_ms: AtomicU64,
}

impl RateWindow {
    pub(crate) fn starting_at(origin: Instant, interval: Duration) -> Self {
        Self {
            origin,
            interval,
            last_report_ms: AtomicU64::new(0),
        }
    }

    /// Claim the report for the window that ended at `now`.
    ///
    /// Returns the time since the previous report when more than the
    /// interval passed and this caller won the race to report it.
    pub(crate) fn try_claim(&self, now: Instant) -> Option<Duration> {
        let now_ms = millis(now.saturating_duration_since(self.origin));
        let last = self.last_report_ms.load(Ordering::Acquire);
        let elapsed = now_ms.saturating_sub(last);
        if elapsed <= millis(self.interval) {
            return None;
        }
        self.last_report_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Duration::from_millis(elapsed))
    }
}

/// Per-second rate of `total` over `elapsed`, using whole seconds.
pub(crate) fn per_second(total: i64, elapsed: Duration) -> i64 {
    let seconds = i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX).max(1);
    total / seconds
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
