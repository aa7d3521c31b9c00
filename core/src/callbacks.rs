//! Callback system for breaker state transitions

use crate::circuit::{BreakerState, BreakerTransition};
use std::sync::Arc;

type Hook = Arc<dyn Fn(&str) + Send + Sync>;

/// Callbacks fired after a transition, outside the breaker's lock
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_open: Option<Hook>,
    pub on_close: Option<Hook>,
    pub on_half_open: Option<Hook>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the hook registered for the transition's target state
    pub fn trigger(&self, circuit: &str, transition: BreakerTransition) {
        let hook = match transition.to_state() {
            BreakerState::Open => &self.on_open,
            BreakerState::Closed => &self.on_close,
            BreakerState::HalfOpen => &self.on_half_open,
        };

        if let Some(callback) = hook {
            callback(circuit);
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_half_open", &self.on_half_open.is_some())
            .finish()
    }
}
