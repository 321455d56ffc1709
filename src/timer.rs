use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_GAME_SECONDS: u32 = 120;
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const WARNING_THRESHOLD: u32 = 30;
pub const CRITICAL_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One second elapsed; carries the seconds still left (always > 0).
    Tick(u32),
    /// Time ran out. Emitted exactly once per run, never together with `Tick(0)`.
    TimeUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

/// Presentation hint only; game logic never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Warning,
    Critical,
}

/// The single clock for the whole game.
#[derive(Debug, Clone)]
pub struct Timer {
    total_seconds: u32,
    seconds_left: u32,
    state: TimerState,
    // time accumulated towards the next tick
    carry: Duration,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(DEFAULT_GAME_SECONDS)
    }
}

impl Timer {
    pub fn new(total_seconds: u32) -> Self {
        Self {
            total_seconds,
            seconds_left: total_seconds,
            state: TimerState::Idle,
            carry: Duration::ZERO,
        }
    }

    /// Starts ticking. Returns false (and changes nothing) if already running.
    pub fn start(&mut self) -> bool {
        if self.state == TimerState::Running {
            warn!("timer is already running");
            return false;
        }
        info!(seconds_left = self.seconds_left, "starting game timer");
        self.state = TimerState::Running;
        self.carry = Duration::ZERO;
        true
    }

    /// Cancels ticking without firing `TimeUp`. Idempotent.
    pub fn stop(&mut self) {
        if self.state != TimerState::Idle {
            debug!(seconds_left = self.seconds_left, "timer stopped");
        }
        self.state = TimerState::Idle;
        self.carry = Duration::ZERO;
    }

    /// Stops and restores the full duration, for a brand-new game.
    pub fn reset(&mut self) {
        self.stop();
        self.seconds_left = self.total_seconds;
    }

    pub fn pause(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused;
            self.carry = Duration::ZERO;
            debug!(seconds_left = self.seconds_left, "timer paused");
        }
    }

    /// Resumes a paused timer if time remains.
    pub fn resume(&mut self) {
        if self.state == TimerState::Paused && self.seconds_left > 0 {
            self.state = TimerState::Running;
            debug!(seconds_left = self.seconds_left, "timer resumed");
        }
    }

    /// Feeds wall-clock time. Each whole second decrements by exactly one.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        if self.state != TimerState::Running {
            return events;
        }

        self.carry += elapsed;
        while self.carry >= TICK_INTERVAL {
            self.carry -= TICK_INTERVAL;
            self.seconds_left = self.seconds_left.saturating_sub(1);
            if self.seconds_left == 0 {
                info!("time is up");
                self.stop();
                events.push(TimerEvent::TimeUp);
                break;
            }
            events.push(TimerEvent::Tick(self.seconds_left));
        }
        events
    }

    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn urgency(&self) -> Urgency {
        if self.seconds_left <= CRITICAL_THRESHOLD {
            Urgency::Critical
        } else if self.seconds_left <= WARNING_THRESHOLD {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }

    /// `m:ss`
    pub fn formatted(&self) -> String {
        format!("{}:{:02}", self.seconds_left / 60, self.seconds_left % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_for(timer: &mut Timer, secs: u32) -> Vec<TimerEvent> {
        (0..secs)
            .flat_map(|_| timer.advance(TICK_INTERVAL))
            .collect()
    }

    #[test]
    fn ticks_once_per_second() {
        let mut timer = Timer::new(5);
        assert!(timer.start());
        assert!(timer.advance(Duration::from_millis(900)).is_empty());
        assert_eq!(
            timer.advance(Duration::from_millis(100)),
            vec![TimerEvent::Tick(4)]
        );
        assert_eq!(timer.seconds_left(), 4);
    }

    #[test]
    fn full_run_fires_time_up_exactly_once() {
        let mut timer = Timer::new(120);
        timer.start();
        let events = run_for(&mut timer, 130);

        let ticks = events
            .iter()
            .filter(|e| matches!(e, TimerEvent::Tick(_)))
            .count();
        let time_ups = events.iter().filter(|e| **e == TimerEvent::TimeUp).count();
        assert_eq!(ticks, 119);
        assert_eq!(time_ups, 1);
        assert_eq!(events.last(), Some(&TimerEvent::TimeUp));
        assert_eq!(timer.seconds_left(), 0);
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn single_large_step_never_goes_negative() {
        let mut timer = Timer::new(3);
        timer.start();
        let events = timer.advance(Duration::from_secs(10));
        assert_eq!(
            events,
            vec![TimerEvent::Tick(2), TimerEvent::Tick(1), TimerEvent::TimeUp]
        );
        assert_eq!(timer.seconds_left(), 0);
    }

    #[test]
    fn double_start_is_a_no_op() {
        let mut timer = Timer::new(10);
        assert!(timer.start());
        timer.advance(Duration::from_millis(600));
        assert!(!timer.start());
        // carry preserved: the second start did not restart the current second
        assert_eq!(
            timer.advance(Duration::from_millis(400)),
            vec![TimerEvent::Tick(9)]
        );
    }

    #[test]
    fn stop_prevents_further_events() {
        let mut timer = Timer::new(10);
        timer.start();
        timer.stop();
        timer.stop();
        assert!(timer.advance(Duration::from_secs(20)).is_empty());
        assert_eq!(timer.seconds_left(), 10);
    }

    #[test]
    fn reset_restores_full_duration() {
        let mut timer = Timer::new(10);
        timer.start();
        run_for(&mut timer, 4);
        timer.reset();
        assert_eq!(timer.seconds_left(), 10);
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn pause_keeps_remaining_time_and_resume_continues() {
        let mut timer = Timer::new(10);
        timer.start();
        run_for(&mut timer, 3);
        timer.pause();
        assert_eq!(timer.state(), TimerState::Paused);
        assert!(timer.advance(Duration::from_secs(5)).is_empty());
        assert_eq!(timer.seconds_left(), 7);

        timer.resume();
        assert!(timer.is_running());
        assert_eq!(timer.advance(TICK_INTERVAL), vec![TimerEvent::Tick(6)]);
    }

    #[test]
    fn resume_does_not_start_an_idle_or_expired_timer() {
        let mut timer = Timer::new(2);
        timer.resume();
        assert_eq!(timer.state(), TimerState::Idle);

        timer.start();
        run_for(&mut timer, 2);
        timer.resume();
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn urgency_thresholds() {
        let mut timer = Timer::new(31);
        assert_eq!(timer.urgency(), Urgency::Normal);
        timer.start();
        run_for(&mut timer, 1);
        assert_eq!(timer.urgency(), Urgency::Warning);
        run_for(&mut timer, 19);
        assert_eq!(timer.seconds_left(), 11);
        assert_eq!(timer.urgency(), Urgency::Warning);
        run_for(&mut timer, 1);
        assert_eq!(timer.urgency(), Urgency::Critical);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(Timer::new(120).formatted(), "2:00");
        assert_eq!(Timer::new(65).formatted(), "1:05");
        assert_eq!(Timer::new(9).formatted(), "0:09");
    }
}
