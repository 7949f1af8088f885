use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Clock abstraction for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Monotonic time for durations and deadlines
    fn now(&self) -> Instant;
    /// Wall-clock epoch seconds, used to normalize relative rate-limit values
    fn epoch_seconds(&self) -> u64;
}

/// Production clock implementation using system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }
}
