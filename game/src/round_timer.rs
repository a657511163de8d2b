use serde::{Deserialize, Serialize};

/// Countdown for a time-boxed session, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTimer {
    remaining_secs: u32,
    limit_secs: u32,
}

/// What a single tick did to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub before: u32,
    pub after: u32,
}

impl TimerTick {
    /// True when this tick landed on or passed `threshold` seconds remaining.
    pub fn crossed(&self, threshold: u32) -> bool {
        self.before > threshold && self.after <= threshold
    }

    pub fn expired(&self) -> bool {
        self.after == 0
    }
}

impl RoundTimer {
    pub fn new(limit_secs: u32) -> Self {
        Self {
            remaining_secs: limit_secs,
            limit_secs,
        }
    }

    pub fn reset(&mut self) {
        self.remaining_secs = self.limit_secs;
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn limit_secs(&self) -> u32 {
        self.limit_secs
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.limit_secs - self.remaining_secs
    }

    pub fn is_up(&self) -> bool {
        self.remaining_secs == 0
    }

    /// Counts down by `delta_secs` when `running`; never goes below zero.
    pub fn tick_if_running(&mut self, delta_secs: u32, running: bool) -> TimerTick {
        let before = self.remaining_secs;
        if running {
            self.remaining_secs = self.remaining_secs.saturating_sub(delta_secs);
        }
        TimerTick {
            before,
            after: self.remaining_secs,
        }
    }
}
