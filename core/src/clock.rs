//! Time sources for cooldown tracking
//!
//! A [`Clock`] gives the breaker two readings:
//! - `now()`: monotonic seconds, used for `opened_at` and the cooldown check
//! - `wall_time()`: seconds since the Unix epoch, used for `last_opened_at`
//!
//! `MonotonicClock` reads the system clocks. `ManualClock` is caller-driven
//! for tests and simulations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time in seconds
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current reading in seconds. Must never go backwards.
    fn now(&self) -> f64;

    /// Seconds since the Unix epoch, for reporting only
    fn wall_time(&self) -> f64 {
        system_wall_time()
    }
}

fn system_wall_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_secs_f64())
}

/// Clock anchored at an `Instant`, reporting elapsed seconds since creation
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start_time: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to
///
/// `wall_time()` is `now()` shifted by a fixed epoch, zero unless set with
/// [`with_wall_epoch`](Self::with_wall_epoch), so both readings advance together.
///
/// # Example
///
/// ```rust
/// use windowed_breaker::{Clock, ManualClock};
///
/// let clock = ManualClock::new().with_wall_epoch(1_700_000_000.0);
/// clock.advance_secs(1.5);
/// assert_eq!(clock.now(), 1.5);
/// assert_eq!(clock.wall_time(), 1_700_000_001.5);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    /// `f64` seconds stored as raw bits
    seconds: AtomicU64,
    wall_epoch: f64,
}

impl ManualClock {
    /// Create a clock reading zero
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    /// Create a clock with an initial reading
    pub fn starting_at(seconds: f64) -> Self {
        Self {
            seconds: AtomicU64::new(seconds.to_bits()),
            wall_epoch: 0.0,
        }
    }

    /// Offset added to `now()` to form `wall_time()`
    pub fn with_wall_epoch(mut self, epoch_secs: f64) -> Self {
        self.wall_epoch = epoch_secs;
        self
    }

    /// Move the clock forward. Negative or NaN amounts are ignored.
    pub fn advance_secs(&self, seconds: f64) {
        if seconds.is_nan() || seconds <= 0.0 {
            return;
        }

        let mut current = self.seconds.load(Ordering::Acquire);
        loop {
            let next = (f64::from_bits(current) + seconds).to_bits();
            match self.seconds.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Move the clock forward by a `Duration`
    pub fn advance(&self, duration: Duration) {
        self.advance_secs(duration.as_secs_f64());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.seconds.load(Ordering::Acquire))
    }

    fn wall_time(&self) -> f64 {
        self.wall_epoch + self.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_monotonic_clock_moves_forward() {
        let clock = MonotonicClock::new();

        let time1 = clock.now();
        std::thread::sleep(Duration::from_millis(10));
        let time2 = clock.now();

        assert!(time2 > time1);
    }

    #[test]
    fn test_monotonic_clock_wall_time_is_unix_seconds() {
        let clock = MonotonicClock::new();
        let expected = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("System clock after epoch")
            .as_secs_f64();

        assert!((clock.wall_time() - expected).abs() < 5.0);
        // Wall time does not depend on when the clock was created
        assert!(clock.wall_time() > clock.now() + 1_000_000_000.0);
    }

    #[test]
    fn test_manual_clock_drives_both_readings() {
        let clock = ManualClock::starting_at(2.0).with_wall_epoch(500.0);
        assert_eq!(clock.wall_time(), 502.0);

        clock.advance_secs(3.0);
        assert_eq!(clock.now(), 5.0);
        assert_eq!(clock.wall_time(), 505.0);
        assert_eq!(ManualClock::new().wall_time(), 0.0);
    }

    #[test]
    fn test_manual_clock_only_moves_on_advance() {
        let clock = ManualClock::starting_at(10.0);
        assert_eq!(clock.now(), 10.0);

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), 10.25);

        clock.advance_secs(-5.0);
        clock.advance_secs(f64::NAN);
        assert_eq!(clock.now(), 10.25);
    }

    #[test]
    fn test_manual_clock_concurrent_advances() {
        let clock = Arc::new(ManualClock::new());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let clock = Arc::clone(&clock);
                scope.spawn(move || {
                    for _ in 0..100 {
                        clock.advance_secs(1.0);
                    }
                });
            }
        });

        assert_eq!(clock.now(), 400.0);
    }
}
