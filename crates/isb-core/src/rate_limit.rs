//! Burst detector gating inbound events.
//!
//! Two hard-reset windows replace per-sender timestamps:
//! - `recent`: senders seen since the last short reset (default 1s).
//! - `strikes`: per-sender count of repeat sightings inside a short window,
//!   cleared on a longer reset (default 30s).
//!
//! A sender straddling a reset boundary is not flagged. Resets are independent
//! of each other and of in-flight checks.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::domain::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// First sighting in the current short window.
    Clear,
    /// Repeat sighting; counted as a strike.
    Warn,
    /// Strike limit reached; the strike counter was evicted.
    Block,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Clear => "clear",
            Verdict::Warn => "warn",
            Verdict::Block => "block",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpamPolicy {
    pub window: Duration,
    pub strike_window: Duration,
    pub strike_limit: u32,
}

impl Default for SpamPolicy {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(1),
            strike_window: Duration::from_secs(30),
            strike_limit: 5,
        }
    }
}

#[derive(Debug, Default)]
struct SpamState {
    recent: HashSet<UserId>,
    strikes: HashMap<UserId, u32>,
}

#[derive(Debug)]
pub struct RateLimiter {
    policy: SpamPolicy,
    state: Mutex<SpamState>,
}

impl RateLimiter {
    pub fn new(policy: SpamPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(SpamState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SpamState> {
        // A panic while holding the lock cannot leave the maps half-updated.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn check(&self, sender: UserId) -> Verdict {
        let mut st = self.state();
        if st.recent.insert(sender) {
            return Verdict::Clear;
        }

        let strikes = st.strikes.entry(sender).or_insert(0);
        *strikes += 1;

        // The opening message plus `strikes` repeats make up the burst.
        if *strikes >= self.policy.strike_limit {
            st.strikes.remove(&sender);
            return Verdict::Block;
        }
        Verdict::Warn
    }

    /// Current strike count for `sender` in this strike window, if any.
    pub fn strikes(&self, sender: UserId) -> Option<u32> {
        self.state().strikes.get(&sender).copied()
    }

    pub fn clear_recent(&self) {
        self.state().recent.clear();
    }

    pub fn clear_strikes(&self) {
        self.state().strikes.clear();
    }

    /// Spawn the two reset timers. They stop when `cancel` fires.
    pub fn spawn_resets(self: &Arc<Self>, cancel: CancellationToken) -> ResetTimers {
        let recent = spawn_reset_loop(self.policy.window, cancel.clone(), {
            let limiter = Arc::clone(self);
            move || limiter.clear_recent()
        });
        let strikes = spawn_reset_loop(self.policy.strike_window, cancel.clone(), {
            let limiter = Arc::clone(self);
            move || limiter.clear_strikes()
        });

        tracing::debug!(
            window_ms = self.policy.window.as_millis() as u64,
            strike_window_ms = self.policy.strike_window.as_millis() as u64,
            "spam reset timers started"
        );

        ResetTimers {
            cancel,
            handles: vec![recent, strikes],
        }
    }
}

fn spawn_reset_loop(
    period: Duration,
    cancel: CancellationToken,
    reset: impl Fn() + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
              _ = cancel.cancelled() => break,
              _ = tick.tick() => reset(),
            }
        }
    })
}

/// Handles for the running reset timers.
pub struct ResetTimers {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl ResetTimers {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for h in self.handles {
            let _ = h.await;
        }
    }
}
