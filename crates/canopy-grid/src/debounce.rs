//! Debounced input
//!
//! Keeps the raw value (what the input box shows) separate from the settled
//! value (what the pipeline sees). Time is passed in explicitly so callers
//! can drive it from whatever clock their event loop uses.

use std::time::{Duration, Instant};

/// Delay applied to global search input unless configured
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct Debounced<T> {
    raw: T,
    settled: T,
    last_input: Option<Instant>,
    delay: Duration,
}

impl<T: Clone + PartialEq + Default> Default for Debounced<T> {
    fn default() -> Self {
        Self::new(T::default(), DEFAULT_DEBOUNCE)
    }
}

impl<T: Clone + PartialEq> Debounced<T> {
    pub fn new(initial: T, delay: Duration) -> Self {
        Self {
            raw: initial.clone(),
            settled: initial,
            last_input: None,
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Record new input at `now`; restarts the quiet period
    pub fn set(&mut self, value: T, now: Instant) {
        self.raw = value;
        self.last_input = Some(now);
    }

    /// Value as typed
    pub fn raw(&self) -> &T {
        &self.raw
    }

    /// Value the pipeline filters by
    pub fn settled(&self) -> &T {
        &self.settled
    }

    pub fn is_pending(&self) -> bool {
        self.last_input.is_some()
    }

    /// When the pending input will settle
    pub fn deadline(&self) -> Option<Instant> {
        self.last_input.map(|at| at + self.delay)
    }

    /// Settle the input if the quiet period has elapsed at `now`. Returns
    /// the new settled value only when it differs from the previous one.
    pub fn poll(&mut self, now: Instant) -> Option<&T> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.flush(),
            _ => None,
        }
    }

    /// Settle immediately regardless of elapsed time
    pub fn flush(&mut self) -> Option<&T> {
        self.last_input.take()?;
        if self.raw == self.settled {
            return None;
        }
        self.settled = self.raw.clone();
        Some(&self.settled)
    }

    /// Set both values at once, dropping any pending input
    pub fn reset(&mut self, value: T) {
        self.raw = value.clone();
        self.settled = value;
        self.last_input = None;
    }
}
