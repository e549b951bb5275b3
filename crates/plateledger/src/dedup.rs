//! Duplicate-suppression window for plateledger.
//!
//! A plate sitting in front of a camera is recognized on nearly every frame.
//! The dedup window turns that stream into discrete sightings: a plate is
//! admitted once, then suppressed until the window has fully elapsed since
//! its most recent admitted detection.

use chrono::{DateTime, Duration, Utc};

/// The admission decision for a candidate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The detection is outside the window (or the plate is new) and
    /// should be recorded.
    Admit,
    /// The detection falls inside the window and should be dropped.
    Suppress {
        /// Time elapsed since the plate was last recorded. Clamped to
        /// zero when the stored timestamp is ahead of the clock.
        elapsed: Duration,
    },
}

/// A fixed-width suppression window keyed on the most recent sighting.
///
/// The decision is pure: callers supply the last recorded timestamp and
/// the current time, which keeps boundary behavior directly testable.
#[derive(Debug, Clone, Copy)]
pub struct DedupWindow {
    window: Duration,
}

impl DedupWindow {
    /// Create a window of the given width.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// The width of this window.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decide whether a detection observed at `now` should be admitted,
    /// given the plate's most recent recorded timestamp.
    ///
    /// A plate never seen before is always admitted. Otherwise the
    /// detection is admitted only when at least the full window has
    /// elapsed; an elapsed time exactly equal to the window admits.
    /// A last-seen timestamp ahead of `now` (clock adjustment between
    /// writes) suppresses, reporting zero elapsed.
    #[must_use]
    pub fn decide(&self, last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Admission {
        let Some(last_seen) = last_seen else {
            return Admission::Admit;
        };

        let elapsed = now.signed_duration_since(last_seen);
        if elapsed >= self.window {
            Admission::Admit
        } else {
            Admission::Suppress {
                elapsed: elapsed.max(Duration::zero()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_5s() -> DedupWindow {
        DedupWindow::new(Duration::seconds(5))
    }

    #[test]
    fn test_unseen_plate_admits() {
        let now = Utc::now();
        assert_eq!(window_5s().decide(None, now), Admission::Admit);
    }

    #[test]
    fn test_inside_window_suppresses() {
        let now = Utc::now();
        let last = now - Duration::milliseconds(4_900);

        match window_5s().decide(Some(last), now) {
            Admission::Suppress { elapsed } => {
                assert_eq!(elapsed, Duration::milliseconds(4_900));
            }
            Admission::Admit => panic!("4.9s elapsed must suppress in a 5s window"),
        }
    }

    #[test]
    fn test_outside_window_admits() {
        let now = Utc::now();
        let last = now - Duration::milliseconds(5_100);
        assert_eq!(window_5s().decide(Some(last), now), Admission::Admit);
    }

    #[test]
    fn test_exact_boundary_admits() {
        let now = Utc::now();
        let last = now - Duration::seconds(5);
        assert_eq!(window_5s().decide(Some(last), now), Admission::Admit);
    }

    #[test]
    fn test_immediate_repeat_suppresses() {
        let now = Utc::now();
        match window_5s().decide(Some(now), now) {
            Admission::Suppress { elapsed } => assert_eq!(elapsed, Duration::zero()),
            Admission::Admit => panic!("zero elapsed must suppress"),
        }
    }

    #[test]
    fn test_last_seen_in_future_suppresses_with_zero_elapsed() {
        let now = Utc::now();
        let last = now + Duration::seconds(2);

        match window_5s().decide(Some(last), now) {
            Admission::Suppress { elapsed } => assert_eq!(elapsed, Duration::zero()),
            Admission::Admit => panic!("future last-seen must suppress"),
        }
    }

    #[test]
    fn test_narrow_window() {
        let window = DedupWindow::new(Duration::milliseconds(500));
        let now = Utc::now();

        assert_eq!(
            window.decide(Some(now - Duration::milliseconds(600)), now),
            Admission::Admit
        );
        assert!(matches!(
            window.decide(Some(now - Duration::milliseconds(400)), now),
            Admission::Suppress { .. }
        ));
    }
}
