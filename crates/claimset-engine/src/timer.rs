//! Round timer: reshuffle deadline and countdown display.

use std::time::{Duration, Instant};

use claimset_core::ViewEvent;

use crate::config::TimerMode;

/// Round timer driven by the arbiter.
///
/// Every method takes `now` explicitly so the arbiter samples the clock
/// once per loop iteration.
#[derive(Clone, Debug)]
pub struct Countdown {
    mode: TimerMode,
    started: Instant,
}

impl Countdown {
    /// A timer in `mode`, started at `now`.
    pub fn new(mode: TimerMode, now: Instant) -> Self {
        Self { mode, started: now }
    }

    /// The configured mode.
    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Restart the round at `now`.
    pub fn reset(&mut self, now: Instant) {
        self.started = now;
    }

    /// The reshuffle deadline, in countdown mode.
    pub fn deadline(&self) -> Option<Instant> {
        match self.mode {
            TimerMode::Countdown { period, .. } => Some(self.started + period),
            TimerMode::Elapsed | TimerMode::Disabled => None,
        }
    }

    /// Whether the reshuffle deadline has passed.
    pub fn expired(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    /// The display update for `now`, or `None` when the timer is disabled.
    pub fn display(&self, now: Instant) -> Option<ViewEvent> {
        match self.mode {
            TimerMode::Countdown { period, warning } => {
                let remaining = period.saturating_sub(now.saturating_duration_since(self.started));
                Some(ViewEvent::CountdownUpdated {
                    millis: remaining.as_millis() as u64,
                    warning: remaining <= warning,
                })
            }
            TimerMode::Elapsed => Some(ViewEvent::CountdownUpdated {
                millis: now.saturating_duration_since(self.started).as_millis() as u64,
                warning: false,
            }),
            TimerMode::Disabled => None,
        }
    }

    /// How long the arbiter may sleep: the next tick or the deadline,
    /// whichever comes first.
    pub fn next_wake(&self, now: Instant, tick: Duration) -> Duration {
        match self.deadline() {
            Some(deadline) => tick.min(deadline.saturating_duration_since(now)),
            None => tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn countdown(period_ms: u64, warning_ms: u64) -> TimerMode {
        TimerMode::Countdown {
            period: Duration::from_millis(period_ms),
            warning: Duration::from_millis(warning_ms),
        }
    }

    #[test]
    fn countdown_expires_at_deadline() {
        let t0 = Instant::now();
        let timer = Countdown::new(countdown(1000, 100), t0);
        assert!(!timer.expired(t0 + Duration::from_millis(999)));
        assert!(timer.expired(t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn countdown_display_flags_warning() {
        let t0 = Instant::now();
        let timer = Countdown::new(countdown(1000, 100), t0);
        assert_eq!(
            timer.display(t0 + Duration::from_millis(400)),
            Some(ViewEvent::CountdownUpdated {
                millis: 600,
                warning: false
            })
        );
        assert_eq!(
            timer.display(t0 + Duration::from_millis(950)),
            Some(ViewEvent::CountdownUpdated {
                millis: 50,
                warning: true
            })
        );
        assert_eq!(
            timer.display(t0 + Duration::from_secs(5)),
            Some(ViewEvent::CountdownUpdated {
                millis: 0,
                warning: true
            })
        );
    }

    #[test]
    fn reset_moves_the_deadline() {
        let t0 = Instant::now();
        let mut timer = Countdown::new(countdown(1000, 0), t0);
        let t1 = t0 + Duration::from_millis(800);
        timer.reset(t1);
        assert_eq!(timer.deadline(), Some(t1 + Duration::from_millis(1000)));
        assert!(!timer.expired(t0 + Duration::from_millis(1500)));
    }

    #[test]
    fn elapsed_mode_counts_up_and_never_expires() {
        let t0 = Instant::now();
        let timer = Countdown::new(TimerMode::Elapsed, t0);
        assert_eq!(
            timer.display(t0 + Duration::from_millis(2500)),
            Some(ViewEvent::CountdownUpdated {
                millis: 2500,
                warning: false
            })
        );
        assert!(!timer.expired(t0 + Duration::from_secs(3600)));
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn disabled_mode_is_silent() {
        let t0 = Instant::now();
        let timer = Countdown::new(TimerMode::Disabled, t0);
        assert_eq!(timer.display(t0), None);
        assert!(!timer.expired(t0 + Duration::from_secs(3600)));
    }

    #[test]
    fn next_wake_is_min_of_tick_and_deadline() {
        let t0 = Instant::now();
        let tick = Duration::from_millis(100);
        let timer = Countdown::new(countdown(1000, 0), t0);
        assert_eq!(timer.next_wake(t0, tick), tick);
        assert_eq!(
            timer.next_wake(t0 + Duration::from_millis(970), tick),
            Duration::from_millis(30)
        );
        assert_eq!(timer.next_wake(t0 + Duration::from_secs(2), tick), Duration::ZERO);
        let idle = Countdown::new(TimerMode::Elapsed, t0);
        assert_eq!(idle.next_wake(t0, tick), tick);
    }
}
