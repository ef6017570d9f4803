//! The periodic tick: scheduler handle plus the loop controller operations on the session.

use std::time::{Duration, Instant};

use tracing::info;

use crate::hud::{PauseLabel, STATUS_GAME_OVER, STATUS_IN_PROGRESS};
use crate::rule_engine::RuleEngine;
use crate::session::HostSession;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(700);
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Owned handle for a fixed-interval timer.
///
/// The host polls it from its event loop. While stopped, `poll` never fires, so nothing can
/// tick after `stop()` returns.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

impl TickScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_TICK_INTERVAL),
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    /// Arms the timer. Returns `false` (and keeps the existing schedule) if already active.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_active() {
            return false;
        }
        self.next_due = Some(now + self.interval);
        true
    }

    /// Disarms the timer. Returns whether it was active.
    pub fn stop(&mut self) -> bool {
        self.next_due.take().is_some()
    }

    /// Fires at most once per call. A late poll does not replay the missed intervals.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }
        let mut next = due + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.next_due = Some(next);
        true
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_due
    }
}

impl<E: RuleEngine> HostSession<E> {
    /// Starts ticking. No-op when already running or when there is no engine.
    pub fn start_loop(&mut self, now: Instant) {
        if self.engine.is_none() || !self.scheduler.start(now) {
            return;
        }
        self.hud.pause_label = PauseLabel::Pause;
        self.hud.set_status(STATUS_IN_PROGRESS, false);
    }

    /// Stops ticking. Idempotent; `reason` is shown highlighted when given.
    pub fn stop_loop(&mut self, reason: Option<&str>) {
        self.scheduler.stop();
        self.hud.pause_label = PauseLabel::Resume;
        if let Some(reason) = reason {
            self.hud.set_status(reason, true);
        }
    }

    /// One timer firing: advance, redraw, refresh the HUD, then check for a terminal state.
    pub fn on_tick(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        engine.tick();
        self.redraw();
        self.refresh_hud();
        let over = self.engine.as_mut().is_some_and(|engine| engine.is_game_over());
        if over {
            info!("game over");
            self.stop_loop(Some(STATUS_GAME_OVER));
        }
    }

    /// Restarts the loop unless it is already running or the game has ended.
    pub fn resume_if_possible(&mut self, now: Instant) {
        if self.is_running() {
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if !engine.is_game_over() {
            self.start_loop(now);
        }
    }

    /// Runs `on_tick` if the scheduler is due. Returns whether a tick happened.
    pub fn poll_tick(&mut self, now: Instant) -> bool {
        if !self.scheduler.poll(now) {
            return false;
        }
        self.on_tick();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_twice_keeps_single_schedule() {
        let t0 = Instant::now();
        let mut s = TickScheduler::new(Duration::from_millis(700));
        assert!(s.start(t0));
        assert!(!s.start(t0 + Duration::from_millis(300)));
        assert_eq!(s.next_deadline(), Some(t0 + Duration::from_millis(700)));
    }

    #[test]
    fn poll_fires_once_per_interval() {
        let t0 = Instant::now();
        let mut s = TickScheduler::new(Duration::from_millis(700));
        s.start(t0);

        assert!(!s.poll(t0 + Duration::from_millis(699)));
        assert!(s.poll(t0 + Duration::from_millis(700)));
        assert!(!s.poll(t0 + Duration::from_millis(701)));
        assert!(s.poll(t0 + Duration::from_millis(1400)));
    }

    #[test]
    fn late_poll_does_not_burst() {
        let t0 = Instant::now();
        let mut s = TickScheduler::new(Duration::from_millis(100));
        s.start(t0);

        let late = t0 + Duration::from_millis(1_000);
        assert!(s.poll(late));
        assert!(!s.poll(late));
        assert_eq!(s.next_deadline(), Some(late + Duration::from_millis(100)));
    }

    #[test]
    fn stop_is_idempotent_and_silences_poll() {
        let t0 = Instant::now();
        let mut s = TickScheduler::new(Duration::from_millis(10));
        s.start(t0);

        assert!(s.stop());
        assert!(!s.stop());
        assert!(!s.is_active());
        assert!(!s.poll(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn zero_interval_is_raised_to_minimum() {
        let s = TickScheduler::new(Duration::ZERO);
        assert_eq!(s.interval(), MIN_TICK_INTERVAL);
    }
}
