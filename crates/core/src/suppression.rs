//! Key-mismatch alert suppression.
//!
//! Repeated key-mismatch alerts are suppressed for [`MISMATCH_ALERT_WINDOW`]
//! after the last observed mismatch. The last-seen timestamp is refreshed on
//! every mismatch, whether or not an alert went out, so a steady stream of
//! mismatches closer together than the window produces a single alert.
//!
//! The caller owns persistence: [`MismatchThrottle::needs_load`] signals that
//! the durable value should be read once and handed to
//! [`MismatchThrottle::seed`]; after [`MismatchThrottle::observe`] the caller
//! writes [`MismatchThrottle::last_seen`] back.

use std::time::Duration;

use crate::types::Timestamp;

/// Minimum interval between two key-mismatch alerts.
pub const MISMATCH_ALERT_WINDOW: Duration = Duration::from_secs(4 * 60 * 60);

/// Where a mismatch at a given instant falls relative to the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionState {
    NoPriorAlert,
    WithinWindow,
    ExpiredWindow,
}

impl SuppressionState {
    pub fn evaluate(last: Option<Timestamp>, now: Timestamp) -> Self {
        let Some(last) = last else {
            return Self::NoPriorAlert;
        };
        let window = chrono::Duration::from_std(MISMATCH_ALERT_WINDOW)
            .unwrap_or_else(|_| chrono::Duration::hours(4));
        if now.signed_duration_since(last) < window {
            Self::WithinWindow
        } else {
            Self::ExpiredWindow
        }
    }

    pub fn should_alert(self) -> bool {
        !matches!(self, Self::WithinWindow)
    }
}

/// In-memory mirror of the persisted last-mismatch timestamp.
#[derive(Debug, Default)]
pub struct MismatchThrottle {
    last_seen: Option<Timestamp>,
    loaded: bool,
}

impl MismatchThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the durable value has been read once.
    pub fn needs_load(&self) -> bool {
        !self.loaded
    }

    /// Install the durable value. A later in-memory value wins.
    pub fn seed(&mut self, stored: Option<Timestamp>) {
        self.loaded = true;
        self.last_seen = match (self.last_seen, stored) {
            (Some(mem), Some(db)) => Some(mem.max(db)),
            (mem, db) => mem.or(db),
        };
    }

    pub fn last_seen(&self) -> Option<Timestamp> {
        self.last_seen
    }

    /// Record a mismatch at `now` and report whether it should be alerted.
    ///
    /// The recorded timestamp never moves backward: a mismatch reported late
    /// with an older `now` is suppressed and leaves the window untouched.
    pub fn observe(&mut self, now: Timestamp) -> (SuppressionState, bool) {
        let state = SuppressionState::evaluate(self.last_seen, now);
        self.last_seen = Some(self.last_seen.map_or(now, |last| last.max(now)));
        (state, state.should_alert())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at(hour: u32, minute: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn first_mismatch_alerts() {
        let mut throttle = MismatchThrottle::new();
        assert_eq!(throttle.observe(at(8, 0)), (SuppressionState::NoPriorAlert, true));
        assert_eq!(throttle.last_seen(), Some(at(8, 0)));
    }

    #[test]
    fn mismatch_inside_window_is_suppressed_but_recorded() {
        let mut throttle = MismatchThrottle::new();
        throttle.observe(at(8, 0));
        assert_eq!(throttle.observe(at(11, 59)), (SuppressionState::WithinWindow, false));
        assert_eq!(throttle.last_seen(), Some(at(11, 59)));
    }

    #[test]
    fn mismatch_after_window_alerts_again() {
        let mut throttle = MismatchThrottle::new();
        throttle.observe(at(8, 0));
        assert_eq!(throttle.observe(at(12, 0)), (SuppressionState::ExpiredWindow, true));
    }

    #[test]
    fn suppressed_events_extend_the_window() {
        let mut throttle = MismatchThrottle::new();
        throttle.observe(at(8, 0));
        throttle.observe(at(11, 0));
        // 5h after the alert but only 3h after the last mismatch.
        assert!(!throttle.observe(at(14, 0)).1);
    }

    #[test]
    fn late_older_mismatch_does_not_rewind_the_window() {
        let mut throttle = MismatchThrottle::new();
        assert!(throttle.observe(at(10, 0)).1);
        assert_eq!(throttle.observe(at(5, 0)), (SuppressionState::WithinWindow, false));
        assert_eq!(throttle.last_seen(), Some(at(10, 0)));
        assert_eq!(throttle.observe(at(10, 30)), (SuppressionState::WithinWindow, false));
    }

    #[test]
    fn seeded_value_suppresses_after_restart() {
        let mut throttle = MismatchThrottle::new();
        assert!(throttle.needs_load());
        throttle.seed(Some(at(8, 0)));
        assert!(!throttle.needs_load());
        assert!(!throttle.observe(at(9, 0)).1);
    }

    #[test]
    fn seed_keeps_the_later_timestamp() {
        let mut throttle = MismatchThrottle::new();
        throttle.observe(at(10, 0));
        throttle.seed(Some(at(6, 0)));
        assert_eq!(throttle.last_seen(), Some(at(10, 0)));
    }
}
