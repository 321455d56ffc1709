use std::time::Duration;

pub const COUNTDOWN_FROM: u8 = 3;
pub const COUNTDOWN_STEP: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// A new number is on screen.
    Count(u8),
    /// The sequence ran to the end. Emitted at most once per `start`.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountdownState {
    Idle,
    Running { count: u8, elapsed: Duration },
    Finished,
    Cancelled,
}

/// The 3-2-1 lead-in shown before the game clock starts.
#[derive(Debug, Clone)]
pub struct Countdown {
    state: CountdownState,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Countdown {
    pub fn new() -> Self {
        Self {
            state: CountdownState::Idle,
        }
    }

    /// Begins (or restarts) the sequence at 3.
    pub fn start(&mut self) -> CountdownEvent {
        self.state = CountdownState::Running {
            count: COUNTDOWN_FROM,
            elapsed: Duration::ZERO,
        };
        CountdownEvent::Count(COUNTDOWN_FROM)
    }

    /// Suppresses the pending completion. Idempotent.
    pub fn cancel(&mut self) {
        if let CountdownState::Running { .. } = self.state {
            self.state = CountdownState::Cancelled;
        }
    }

    /// Moves the sequence forward by `elapsed` wall-clock time and reports the
    /// latest thing that happened. `Complete` always wins over a count reached
    /// in the same step.
    pub fn advance(&mut self, elapsed: Duration) -> Option<CountdownEvent> {
        let CountdownState::Running {
            mut count,
            elapsed: mut acc,
        } = self.state
        else {
            return None;
        };

        acc += elapsed;
        let mut event = None;
        while acc >= COUNTDOWN_STEP {
            acc -= COUNTDOWN_STEP;
            count -= 1;
            if count == 0 {
                self.state = CountdownState::Finished;
                return Some(CountdownEvent::Complete);
            }
            event = Some(CountdownEvent::Count(count));
        }

        self.state = CountdownState::Running {
            count,
            elapsed: acc,
        };
        event
    }

    /// Number currently shown, if the sequence is running.
    pub fn current(&self) -> Option<u8> {
        match self.state {
            CountdownState::Running { count, .. } => Some(count),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, CountdownState::Running { .. })
    }

    /// Leaving the screen mid-sequence should ask for confirmation.
    pub fn blocks_navigation(&self) -> bool {
        self.is_running()
    }
}
