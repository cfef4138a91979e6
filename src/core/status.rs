/// Status tracker — the three clamped meters and the health counter.

use crate::schema::status::{StatusDelta, StatusSnapshot, METER_MAX, METER_MIN};

fn clamp_meter(value: i32) -> i32 {
    value.clamp(METER_MIN, METER_MAX)
}

/// Holds fatigue, psyche and time, each clamped to `[0, 100]`.
///
/// Nothing here ever moves a meter back toward its starting value on its
/// own; only authored choice effects can do that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTracker {
    fatigue: i32,
    psyche: i32,
    time: i32,
}

impl Default for StatusTracker {
    fn default() -> Self {
        let start = StatusSnapshot::default();
        Self {
            fatigue: start.fatigue,
            psyche: start.psyche,
            time: start.time,
        }
    }
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add each field of `delta` to its meter and clamp the result.
    /// Does nothing when `delta` is `None`.
    pub fn apply_effects(&mut self, delta: Option<&StatusDelta>) {
        let Some(delta) = delta else {
            return;
        };
        self.fatigue = clamp_meter(self.fatigue.saturating_add(delta.fatigue));
        self.psyche = clamp_meter(self.psyche.saturating_add(delta.psyche));
        self.time = clamp_meter(self.time.saturating_add(delta.time));
    }

    /// The generic cost of a wrong answer.
    pub fn apply_failure_penalty(&mut self, penalty: &StatusDelta) {
        self.apply_effects(Some(penalty));
    }

    /// Used only by fatal fail nodes. Leaves `time` alone.
    pub fn force_collapse(&mut self) {
        self.fatigue = METER_MAX;
        self.psyche = METER_MIN;
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            fatigue: self.fatigue,
            psyche: self.psyche,
            time: self.time,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Small counter whose exhaustion is the generic game-over trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    current: u32,
    max: u32,
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn decrement(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn exhaust(&mut self) {
        self.current = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.current == 0
    }

    pub fn reset(&mut self) {
        self.current = self.max;
    }
}
