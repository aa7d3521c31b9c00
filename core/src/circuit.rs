//! Circuit breaker implementation using state machines
//!
//! The lifecycle (Closed → Open → HalfOpen → Closed) is a dynamic
//! `state_machines` machine. Guards read the shared sliding window and clock
//! from the machine context; bookkeeping that outlives a single state
//! (open counts, streak, last open time) lives beside the machine in
//! [`CircuitCore`].

use crate::{
    BreakerError,
    callbacks::Callbacks,
    clock::{Clock, MonotonicClock},
    stats::{BreakerStats, next_streak},
    window::SlidingWindow,
};
use serde::{Deserialize, Serialize};
use state_machines::state_machine;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, trace, warn};

/// Breaker configuration, fixed for the breaker's lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Failure rate (0.0-1.0) over a full window at which the circuit opens
    pub failure_threshold: f64,

    /// Number of most recent closed-state outcomes kept in the window
    pub window_size: usize,

    /// Seconds to stay Open before admitting probe requests
    pub timeout_secs: f64,

    /// Consecutive HalfOpen successes required to close the circuit
    pub success_threshold: usize,

    /// Jitter factor for the cooldown (0.0 = no jitter, 1.0 = full jitter)
    /// Uses chrono-machines formula: timeout * (1 - jitter + rand * jitter)
    pub jitter_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            failure_threshold: 0.5,
            window_size: 10,
            timeout_secs: 30.0,
            success_threshold: 1,
            jitter_factor: 0.0,
        }
    }
}

impl Config {
    /// Check every field against its allowed range.
    ///
    /// The breaker itself accepts any configuration; callers that assemble
    /// one from external input should validate it first.
    pub fn validate(&self) -> Result<(), BreakerError> {
        if !(0.0..=1.0).contains(&self.failure_threshold) {
            return Err(BreakerError::invalid(
                "failure_threshold",
                format!("must be within [0, 1], got {}", self.failure_threshold),
            ));
        }

        if !self.timeout_secs.is_finite() || self.timeout_secs < 0.0 {
            return Err(BreakerError::invalid(
                "timeout_secs",
                format!("must be a finite number >= 0, got {}", self.timeout_secs),
            ));
        }

        if self.success_threshold == 0 {
            return Err(BreakerError::invalid("success_threshold", "must be at least 1"));
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(BreakerError::invalid(
                "jitter_factor",
                format!("must be within [0, 1], got {}", self.jitter_factor),
            ));
        }

        Ok(())
    }

    /// Cooldown for one Open episode, drawn once when the circuit opens
    fn draw_cooldown_secs(&self) -> f64 {
        if self.jitter_factor > 0.0 {
            let base_delay_ms = (self.timeout_secs * 1000.0) as u64;
            let policy = chrono_machines::Policy {
                max_attempts: 1,
                base_delay_ms,
                multiplier: 1.0,
                max_delay_ms: base_delay_ms,
            };
            let timeout_ms = policy.calculate_delay(1, self.jitter_factor);
            (timeout_ms as f64) / 1000.0
        } else {
            self.timeout_secs
        }
    }
}

/// Public view of the lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }

    fn from_machine(name: &str) -> Self {
        match name {
            "Closed" => BreakerState::Closed,
            "Open" => BreakerState::Open,
            "HalfOpen" => BreakerState::HalfOpen,
            other => unreachable!("circuit machine reported unknown state {other:?}"),
        }
    }
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change together with the reason it happened.
///
/// Each variant carries its own effect set, applied by [`CircuitCore`]:
/// - into Open (`Tripped`, `Reopened`, `ForcedOpen`): stamp `opened_at`
///   (monotonic) and `last_opened_at` (wall time), count the open. Window and streak are kept.
/// - into HalfOpen (`HalfOpened`): only the probe counter restarts.
/// - into Closed (`Recovered`, `ForcedClosed`): clear window and streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerTransition {
    /// Closed → Open, failure rate over a full window reached the threshold
    Tripped,
    /// HalfOpen → Open, a probe failed
    Reopened,
    /// Any → Open by administrative override
    ForcedOpen,
    /// Open → HalfOpen, cooldown elapsed
    HalfOpened,
    /// HalfOpen → Closed, enough probes succeeded
    Recovered,
    /// Open/HalfOpen → Closed by administrative override
    ForcedClosed,
}

impl BreakerTransition {
    pub fn to_state(self) -> BreakerState {
        match self {
            BreakerTransition::Tripped
            | BreakerTransition::Reopened
            | BreakerTransition::ForcedOpen => BreakerState::Open,
            BreakerTransition::HalfOpened => BreakerState::HalfOpen,
            BreakerTransition::Recovered | BreakerTransition::ForcedClosed => BreakerState::Closed,
        }
    }
}

/// Circuit context - shared data across all states
#[derive(Debug, Clone)]
pub struct CircuitContext {
    pub name: String,
    pub config: Config,
    pub window: Arc<SlidingWindow>,
    pub clock: Arc<dyn Clock>,
}

impl CircuitContext {
    pub fn new(name: impl Into<String>, config: Config, clock: Arc<dyn Clock>) -> Self {
        let window = Arc::new(SlidingWindow::new(config.window_size));
        Self {
            name: name.into(),
            config,
            window,
            clock,
        }
    }
}

impl Default for CircuitContext {
    fn default() -> Self {
        Self::new(String::new(), Config::default(), Arc::new(MonotonicClock::new()))
    }
}

/// Data specific to the Open state
#[derive(Debug, Clone, Default)]
pub struct OpenData {
    pub opened_at: f64,
    /// Cooldown drawn for this episode (jittered when configured)
    pub cooldown_secs: f64,
}

impl OpenData {
    fn cooldown_elapsed(&self, now: f64) -> bool {
        now - self.opened_at >= self.cooldown_secs
    }

    fn remaining_secs(&self, now: f64) -> f64 {
        (self.opened_at + self.cooldown_secs - now).max(0.0)
    }
}

/// Data specific to the HalfOpen state
#[derive(Debug, Clone, Default)]
pub struct HalfOpenData {
    /// Carried over from Open; HalfOpen continues the same cooldown episode
    pub opened_at: f64,
    pub consecutive_successes: usize,
}

state_machine! {
    name: Circuit,
    context: CircuitContext,
    dynamic: true,

    initial: Closed,
    states: [
        Closed,
        Open(OpenData),
        HalfOpen(HalfOpenData),
    ],
    events {
        trip {
            guards: [threshold_exceeded],
            transition: { from: Closed, to: Open }
        }
        reopen {
            transition: { from: HalfOpen, to: Open }
        }
        attempt_reset {
            guards: [cooldown_elapsed],
            transition: { from: Open, to: HalfOpen }
        }
        recover {
            guards: [probes_succeeded],
            transition: { from: HalfOpen, to: Closed }
        }
        force_open {
            transition: { from: [Closed, HalfOpen], to: Open }
        }
        force_close {
            transition: { from: [Open, HalfOpen], to: Closed }
        }
    }
}

impl Circuit<Closed> {
    /// Open only once the window is full and its failure rate reaches the threshold
    fn threshold_exceeded(&self, ctx: &CircuitContext) -> bool {
        let tally = ctx.window.tally();

        if tally.total < ctx.config.window_size {
            return false;
        }

        tally.failure_rate() >= ctx.config.failure_threshold
    }
}

impl Circuit<Open> {
    fn cooldown_elapsed(&self, ctx: &CircuitContext) -> bool {
        let now = ctx.clock.now();
        self.state_data_open()
            .is_some_and(|data| data.cooldown_elapsed(now))
    }
}

impl Circuit<HalfOpen> {
    fn probes_succeeded(&self, ctx: &CircuitContext) -> bool {
        self.state_data_half_open()
            .is_some_and(|data| data.consecutive_successes >= ctx.config.success_threshold)
    }
}

/// Single-threaded breaker state: the machine plus sticky bookkeeping.
///
/// Every method expects exclusive access; [`Breaker`] provides it.
pub(crate) struct CircuitCore {
    machine: DynamicCircuit,
    context: CircuitContext,
    last_opened_at: Option<f64>,
    total_opens: u64,
    current_streak: i64,
}

impl CircuitCore {
    pub(crate) fn new(context: CircuitContext) -> Self {
        let machine = DynamicCircuit::new(context.clone());

        Self {
            machine,
            context,
            last_opened_at: None,
            total_opens: 0,
            current_streak: 0,
        }
    }

    fn name(&self) -> &str {
        &self.context.name
    }

    /// State as stored, without the lazy cooldown check
    pub(crate) fn current_state(&self) -> BreakerState {
        BreakerState::from_machine(self.machine.current_state())
    }

    /// Move Open → HalfOpen if the cooldown has elapsed
    pub(crate) fn refresh(&mut self, fired: &mut Vec<BreakerTransition>) {
        let Some(opened_at) = self.machine.open_data().map(|data| data.opened_at) else {
            return;
        };

        if self.machine.handle(CircuitEvent::AttemptReset).is_ok() {
            if let Some(data) = self.machine.half_open_data_mut() {
                data.opened_at = opened_at;
            }
            info!(circuit = %self.name(), opened_at, "circuit half-open, admitting probes");
            fired.push(BreakerTransition::HalfOpened);
        }
    }

    pub(crate) fn state(&mut self, fired: &mut Vec<BreakerTransition>) -> BreakerState {
        self.refresh(fired);
        self.current_state()
    }

    /// Dispatch one reported outcome on the current state.
    ///
    /// The lazy cooldown check runs first, so only a report arriving before the
    /// cooldown elapses hits the Open no-op arm.
    pub(crate) fn record(&mut self, success: bool, fired: &mut Vec<BreakerTransition>) {
        match self.state(fired) {
            BreakerState::Closed => {
                self.context.window.record(success);
                self.current_streak = next_streak(self.current_streak, success);

                // A success can trip too when old failures still fill the window
                if self.machine.handle(CircuitEvent::Trip).is_ok() {
                    self.enter(BreakerTransition::Tripped, fired);
                }
            }
            BreakerState::HalfOpen if success => {
                if let Some(data) = self.machine.half_open_data_mut() {
                    data.consecutive_successes += 1;
                }

                if self.machine.handle(CircuitEvent::Recover).is_ok() {
                    self.enter(BreakerTransition::Recovered, fired);
                }
            }
            BreakerState::HalfOpen => {
                if self.machine.handle(CircuitEvent::Reopen).is_ok() {
                    self.enter(BreakerTransition::Reopened, fired);
                }
            }
            BreakerState::Open => {
                // Nothing reaches the backend while open; the report is stale
                trace!(circuit = %self.name(), success, "outcome ignored while open");
            }
        }
    }

    pub(crate) fn force_open(&mut self, fired: &mut Vec<BreakerTransition>) {
        // Already open: restart the cooldown and count the open again
        if self.current_state() == BreakerState::Open
            || self.machine.handle(CircuitEvent::ForceOpen).is_ok()
        {
            self.enter(BreakerTransition::ForcedOpen, fired);
        }
    }

    pub(crate) fn force_close(&mut self, fired: &mut Vec<BreakerTransition>) {
        if self.current_state() == BreakerState::Closed {
            self.clear_closed_history();
            return;
        }

        if self.machine.handle(CircuitEvent::ForceClose).is_ok() {
            self.enter(BreakerTransition::ForcedClosed, fired);
        }
    }

    /// Back to the pristine initial state
    pub(crate) fn reset(&mut self) {
        self.context.window.clear();
        self.machine = DynamicCircuit::new(self.context.clone());
        self.last_opened_at = None;
        self.total_opens = 0;
        self.current_streak = 0;
        debug!(circuit = %self.name(), "circuit reset");
    }

    pub(crate) fn stats(&self) -> BreakerStats {
        BreakerStats::new(
            self.context.window.tally(),
            self.last_opened_at,
            self.total_opens,
            self.current_streak,
        )
    }

    /// Timestamp of the current cooldown episode (Open or HalfOpen)
    pub(crate) fn opened_at(&self) -> Option<f64> {
        self.machine
            .open_data()
            .map(|data| data.opened_at)
            .or_else(|| self.machine.half_open_data().map(|data| data.opened_at))
    }

    pub(crate) fn half_open_successes(&self) -> usize {
        self.machine
            .half_open_data()
            .map_or(0, |data| data.consecutive_successes)
    }

    /// Seconds left before probes are admitted, zero unless Open
    pub(crate) fn retry_after_secs(&self) -> f64 {
        let now = self.context.clock.now();
        self.machine
            .open_data()
            .map_or(0.0, |data| data.remaining_secs(now))
    }

    /// Apply the effect set of a transition the machine has already taken
    fn enter(&mut self, transition: BreakerTransition, fired: &mut Vec<BreakerTransition>) {
        match transition.to_state() {
            BreakerState::Open => self.stamp_open(transition),
            BreakerState::Closed => {
                self.clear_closed_history();
                info!(circuit = %self.name(), ?transition, "circuit closed");
            }
            // HalfOpen is entered only through `refresh`
            BreakerState::HalfOpen => {}
        }
        fired.push(transition);
    }

    fn stamp_open(&mut self, transition: BreakerTransition) {
        let now = self.context.clock.now();
        let cooldown_secs = self.context.config.draw_cooldown_secs();

        if let Some(data) = self.machine.open_data_mut() {
            data.opened_at = now;
            data.cooldown_secs = cooldown_secs;
        }
        self.last_opened_at = Some(self.context.clock.wall_time());
        self.total_opens = self.total_opens.saturating_add(1);

        let tally = self.context.window.tally();
        warn!(
            circuit = %self.name(),
            ?transition,
            failures = tally.failures,
            total = tally.total,
            total_opens = self.total_opens,
            cooldown_secs,
            "circuit opened"
        );
    }

    fn clear_closed_history(&mut self) {
        self.context.window.clear();
        self.current_streak = 0;
    }
}

/// Thread-safe circuit breaker.
///
/// Every operation runs under one lock, so "check cooldown, then answer" and
/// "record, evaluate threshold, maybe open" are atomic. Callbacks run after
/// the lock is released.
///
/// # Example
///
/// ```rust
/// use windowed_breaker::{Breaker, BreakerState};
///
/// let breaker = Breaker::builder("inventory")
///     .window_size(4)
///     .failure_threshold(0.5)
///     .build();
///
/// for _ in 0..4 {
///     if breaker.allows_request() {
///         breaker.record_failure();
///     }
/// }
///
/// assert_eq!(breaker.state(), BreakerState::Open);
/// assert!(!breaker.allows_request());
/// ```
pub struct Breaker {
    name: String,
    config: Config,
    core: Mutex<CircuitCore>,
    callbacks: Callbacks,
}

impl Breaker {
    /// Create a breaker on a monotonic clock (use builder() for more options)
    pub fn new(name: impl Into<String>, config: Config) -> Self {
        let context = CircuitContext::new(name, config, Arc::new(MonotonicClock::new()));
        Self::with_context_and_callbacks(context, Callbacks::new())
    }

    /// Create a breaker with custom context and callbacks (used by builder)
    pub(crate) fn with_context_and_callbacks(
        context: CircuitContext,
        callbacks: Callbacks,
    ) -> Self {
        Self {
            name: context.name.clone(),
            config: context.config.clone(),
            core: Mutex::new(CircuitCore::new(context)),
            callbacks,
        }
    }

    /// Create a new breaker builder
    pub fn builder(name: impl Into<String>) -> crate::builder::BreakerBuilder {
        crate::builder::BreakerBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// True when a call may be issued (Closed or HalfOpen)
    pub fn allows_request(&self) -> bool {
        self.with_core(|core, fired| core.state(fired) != BreakerState::Open)
    }

    /// Like [`allows_request`](Self::allows_request), but returns an error for `?`
    pub fn check(&self) -> Result<(), BreakerError> {
        self.with_core(|core, fired| {
            if core.state(fired) != BreakerState::Open {
                return Ok(());
            }

            Err(BreakerError::Open {
                circuit: self.name.clone(),
                opened_at: core.opened_at().unwrap_or(0.0),
                retry_after_secs: core.retry_after_secs(),
            })
        })
    }

    /// Report a successful call
    pub fn record_success(&self) {
        self.with_core(|core, fired| core.record(true, fired));
    }

    /// Report a failed call
    pub fn record_failure(&self) {
        self.with_core(|core, fired| core.record(false, fired));
    }

    /// Current state, after the lazy cooldown check
    pub fn state(&self) -> BreakerState {
        self.with_core(|core, fired| core.state(fired))
    }

    pub fn is_closed(&self) -> bool {
        self.state() == BreakerState::Closed
    }

    pub fn is_open(&self) -> bool {
        self.state() == BreakerState::Open
    }

    pub fn is_half_open(&self) -> bool {
        self.state() == BreakerState::HalfOpen
    }

    /// Open the circuit regardless of the window
    pub fn force_open(&self) {
        self.with_core(|core, fired| core.force_open(fired));
    }

    /// Close the circuit regardless of probes
    pub fn force_close(&self) {
        self.with_core(|core, fired| core.force_close(fired));
    }

    /// Return to the initial state, clearing window and history
    pub fn reset(&self) {
        self.with_core(|core, _| core.reset());
    }

    /// Snapshot of window and history. Does not run the cooldown check.
    pub fn stats(&self) -> BreakerStats {
        self.with_core(|core, _| core.stats())
    }

    /// Seconds until probes are admitted, zero unless Open
    pub fn retry_after_secs(&self) -> f64 {
        self.with_core(|core, fired| {
            core.refresh(fired);
            core.retry_after_secs()
        })
    }

    /// Successes counted in the current HalfOpen episode
    pub fn half_open_successes(&self) -> usize {
        self.with_core(|core, _| core.half_open_successes())
    }

    fn with_core<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut CircuitCore, &mut Vec<BreakerTransition>) -> R,
    {
        let mut fired = Vec::new();
        let result = {
            let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut core, &mut fired)
        };

        for transition in fired {
            self.callbacks.trigger(&self.name, transition);
        }

        result
    }
}

impl fmt::Debug for Breaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self
            .core
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current_state();

        f.debug_struct("Breaker")
            .field("name", &self.name)
            .field("state", &state)
            .field("config", &self.config)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}
