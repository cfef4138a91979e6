use serde::{Deserialize, Serialize};

/// Lowest value any status meter can hold.
pub const METER_MIN: i32 = 0;
/// Highest value any status meter can hold.
pub const METER_MAX: i32 = 100;

/// An additive change to the three status meters.
///
/// Deltas are never clamped themselves; only the meter they are applied
/// to is. Missing fields in authored content default to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StatusDelta {
    #[serde(default)]
    pub fatigue: i32,
    #[serde(default)]
    pub psyche: i32,
    #[serde(default)]
    pub time: i32,
}

impl StatusDelta {
    pub fn new(fatigue: i32, psyche: i32, time: i32) -> Self {
        Self {
            fatigue,
            psyche,
            time,
        }
    }

    /// Returns true if applying this delta can never change a meter.
    pub fn is_zero(&self) -> bool {
        self.fatigue == 0 && self.psyche == 0 && self.time == 0
    }
}

/// Read-only copy of the three meters, handed to presentation.
///
/// `fatigue` gets worse as it rises; `psyche` and `time` get worse as
/// they fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub fatigue: i32,
    pub psyche: i32,
    pub time: i32,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            fatigue: METER_MIN,
            psyche: METER_MAX,
            time: METER_MAX,
        }
    }
}

impl StatusSnapshot {
    /// Returns true if every meter lies within `[METER_MIN, METER_MAX]`.
    pub fn in_bounds(&self) -> bool {
        [self.fatigue, self.psyche, self.time]
            .iter()
            .all(|v| (METER_MIN..=METER_MAX).contains(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_default_is_fresh_applicant() {
        let s = StatusSnapshot::default();
        assert_eq!(s.fatigue, 0);
        assert_eq!(s.psyche, 100);
        assert_eq!(s.time, 100);
        assert!(s.in_bounds());
    }

    #[test]
    fn delta_missing_fields_default_to_zero() {
        let d: StatusDelta = ron::from_str("(fatigue: 3)").unwrap();
        assert_eq!(d, StatusDelta::new(3, 0, 0));
        assert!(!d.is_zero());
        assert!(StatusDelta::default().is_zero());
    }

    #[test]
    fn out_of_bounds_snapshot_detected() {
        let s = StatusSnapshot {
            fatigue: 101,
            psyche: 50,
            time: 50,
        };
        assert!(!s.in_bounds());
    }
}
