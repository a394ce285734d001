use std::fmt;
use std::time::{Duration, Instant};

/// Connection status: before each connect attempt.
pub const STATUS_DISCONNECTED: &str = "Disconnected";
/// Connection status: a connect attempt is in progress.
pub const STATUS_WAITING: &str = "Waiting for client";
/// Connection status: a session is active.
pub const STATUS_CONNECTED: &str = "Connected";
/// Frequency status when no measurement is available.
pub const STATUS_FREQUENCY_UNAVAILABLE: &str = "Update frequency: N/A";

/// Which status line a text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusChannel {
    /// Connection state of the pipe.
    Connection,
    /// Measured update frequency.
    Frequency,
}

impl StatusChannel {
    pub fn name(self) -> &'static str {
        match self {
            StatusChannel::Connection => "connection",
            StatusChannel::Frequency => "frequency",
        }
    }
}

impl fmt::Display for StatusChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Started at the top of a cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleTimer {
    started: Instant,
}

impl CycleTimer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn finish(self) -> CycleMeasurement {
        CycleMeasurement::from_elapsed(self.started.elapsed())
    }
}

/// Round-trip time of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleMeasurement {
    elapsed: Duration,
}

impl CycleMeasurement {
    pub fn from_elapsed(elapsed: Duration) -> Self {
        Self { elapsed }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// `1000 / elapsed_ms`, rounded. `None` when no time elapsed.
    pub fn frequency_hz(&self) -> Option<u32> {
        if self.elapsed.is_zero() {
            return None;
        }
        let millis = self.elapsed.as_secs_f64() * 1000.0;
        Some((1000.0 / millis).round() as u32)
    }

    /// Status text for the frequency channel.
    pub fn frequency_text(&self) -> String {
        match self.frequency_hz() {
            Some(hz) => format!("Update frequency: {hz}Hz"),
            None => STATUS_FREQUENCY_UNAVAILABLE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_is_rounded_reciprocal_of_millis() {
        let m = CycleMeasurement::from_elapsed(Duration::from_millis(4));
        assert_eq!(m.frequency_hz(), Some(250));
        assert_eq!(m.frequency_text(), "Update frequency: 250Hz");

        let m = CycleMeasurement::from_elapsed(Duration::from_micros(3_000));
        assert_eq!(m.frequency_hz(), Some(333));

        let m = CycleMeasurement::from_elapsed(Duration::from_micros(1_600));
        assert_eq!(m.frequency_hz(), Some(625));
    }

    #[test]
    fn slow_cycles_round_to_zero_hz() {
        let m = CycleMeasurement::from_elapsed(Duration::from_secs(3));
        assert_eq!(m.frequency_hz(), Some(0));
    }

    #[test]
    fn zero_elapsed_is_unavailable() {
        let m = CycleMeasurement::from_elapsed(Duration::ZERO);
        assert_eq!(m.frequency_hz(), None);
        assert_eq!(m.frequency_text(), STATUS_FREQUENCY_UNAVAILABLE);
    }

    #[test]
    fn sub_nanosecond_scale_does_not_overflow() {
        let m = CycleMeasurement::from_elapsed(Duration::from_nanos(1));
        assert_eq!(m.frequency_hz(), Some(1_000_000_000));
    }

    #[test]
    fn timer_measures_monotonic_elapsed() {
        let timer = CycleTimer::start();
        std::thread::sleep(Duration::from_millis(2));
        assert!(timer.finish().elapsed() >= Duration::from_millis(2));
    }
}
