//! windowed-breaker - Count-based circuit breaker
//!
//! This crate provides a process-local circuit breaker with:
//! - A sliding window over the most recent call outcomes
//! - Failure-rate threshold evaluated once the window is full
//! - State machine for the breaker lifecycle (Closed → Open → HalfOpen)
//! - Lazy cooldown evaluation on a monotonic clock, no background timer
//! - Statistics snapshots (failure rate, streak, open history)
//!
//! The breaker never performs the protected call. Callers ask whether a call
//! is admitted and report exactly one outcome per admitted call.
//!
//! # Example
//!
//! ```rust
//! use windowed_breaker::Breaker;
//!
//! let breaker = Breaker::builder("payment_api")
//!     .failure_threshold(0.5)
//!     .window_size(10)
//!     .timeout_secs(30.0)
//!     .success_threshold(2)
//!     .on_open(|name| println!("Circuit {} opened!", name))
//!     .build();
//!
//! if breaker.allows_request() {
//!     // Your service call here
//!     let outcome: Result<(), String> = Ok(());
//!     match outcome {
//!         Ok(_) => breaker.record_success(),
//!         Err(_) => breaker.record_failure(),
//!     }
//! }
//!
//! let stats = breaker.stats();
//! assert_eq!(stats.total, 1);
//! assert_eq!(stats.current_streak, 1);
//! ```

pub mod builder;
pub mod callbacks;
pub mod circuit;
pub mod clock;
pub mod errors;
pub mod stats;
pub mod window;

pub use builder::BreakerBuilder;
pub use circuit::{Breaker, BreakerState, BreakerTransition, Config};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use errors::BreakerError;
pub use stats::{BreakerStats, WindowTally};
pub use window::SlidingWindow;
