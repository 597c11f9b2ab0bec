//! Per-series lifecycle state machine
//!
//! ```text
//! WarmUpPending --first collect--> WarmUpOngoing --warm-up elapsed--> WarmUpComplete
//!                                                                          |
//!                                           idle past expiration deadline  v
//!                                                                       Expired
//! ```
//!
//! Collections advance the machine at most one step each. Accesses only
//! slide the expiration deadline; they never change the phase.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

/// Lifecycle phase of one metric series
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Created, never collected
    WarmUpPending,
    /// Collected at least once, warm-up window still open
    WarmUpOngoing,
    /// Reporting real values
    WarmUpComplete,
    /// Idle past its expiration deadline; terminal
    Expired,
}

impl Phase {
    /// Whether collections should substitute the neutral snapshot
    #[must_use]
    pub fn is_warming_up(self) -> bool {
        self == Self::WarmUpOngoing
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WarmUpPending => write!(f, "warm-up pending"),
            Self::WarmUpOngoing => write!(f, "warm-up ongoing"),
            Self::WarmUpComplete => write!(f, "warm-up complete"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug)]
struct Deadlines {
    phase: Phase,
    warm_up_until: Option<Instant>,
    active_until: Option<Instant>,
}

/// Thread-safe lifecycle state of one metric series
#[derive(Debug)]
pub struct LifecycleState {
    inner: Mutex<Deadlines>,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleState {
    /// Create a state in [`Phase::WarmUpPending`] with no deadlines
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Deadlines {
                phase: Phase::WarmUpPending,
                warm_up_until: None,
                active_until: None,
            }),
        }
    }

    /// Advance the machine for one collection and return the resulting phase
    ///
    /// The first call opens the warm-up window ending at `now + warm_up`. A
    /// later call strictly after that instant completes warm-up. Once
    /// complete, a call strictly after the expiration deadline (if one was
    /// set by [`on_access`](Self::on_access)) expires the series.
    pub fn on_collect(&self, warm_up: Duration, now: Instant) -> Phase {
        let mut state = self.inner.lock();
        let next = match state.phase {
            Phase::WarmUpPending => {
                state.warm_up_until = Some(now + warm_up);
                Phase::WarmUpOngoing
            }
            Phase::WarmUpOngoing => match state.warm_up_until {
                Some(deadline) if now > deadline => Phase::WarmUpComplete,
                _ => Phase::WarmUpOngoing,
            },
            Phase::WarmUpComplete => match state.active_until {
                Some(deadline) if now > deadline => Phase::Expired,
                _ => Phase::WarmUpComplete,
            },
            Phase::Expired => Phase::Expired,
        };

        if next != state.phase {
            trace!(from = %state.phase, to = %next, "lifecycle phase transition");
            state.phase = next;
        }
        next
    }

    /// Record an access, sliding the expiration deadline to `now + expiration`
    ///
    /// A zero `expiration` leaves the series without a deadline.
    pub fn on_access(&self, expiration: Duration, now: Instant) {
        if expiration.is_zero() {
            return;
        }
        self.inner.lock().active_until = Some(now + expiration);
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    /// Whether the series has expired
    pub fn is_expired(&self) -> bool {
        self.phase() == Phase::Expired
    }
}
