//! Match lifecycle state machine
//!
//! Owns nothing but its own counters: the room feeds it roster changes and
//! tick advances, and acts on the returned events. The countdown is a
//! tick-deadline checked each tick, so the machine is testable without
//! wall-clock waiting.

use crate::util::time::TICK_RATE;
use crate::ws::protocol::GamePhase;

/// Notifications for the room to act on (reset state, broadcast updates)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Countdown began with this many seconds on the clock
    CountdownStarted { seconds: u32 },
    /// One second of countdown elapsed
    CountdownTick { seconds_remaining: u32 },
    /// Countdown aborted (player count fell below the minimum)
    CountdownCancelled,
    /// Countdown hit zero: reset per-match state and respawn everyone
    MatchStarted,
    /// Room fell back to waiting (emptied out, or too few players after a match)
    ReturnedToWaiting,
}

/// Game phase state machine
pub struct PhaseMachine {
    phase: GamePhase,
    min_players: usize,
    countdown_secs: u32,
    /// Tick at which the running countdown fires
    deadline: Option<u64>,
    /// Last whole-seconds value announced, to emit one tick event per second
    last_announced_secs: u32,
}

impl PhaseMachine {
    pub fn new(min_players: usize, countdown_secs: u32) -> Self {
        Self {
            phase: GamePhase::WaitingForPlayers,
            min_players,
            countdown_secs,
            deadline: None,
            last_announced_secs: 0,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn min_players(&self) -> usize {
        self.min_players
    }

    /// Whole seconds left on the countdown, if one is running
    pub fn countdown_remaining_secs(&self, now: u64) -> Option<u32> {
        self.deadline.map(|deadline| {
            let ticks = deadline.saturating_sub(now);
            (ticks as u32 + TICK_RATE - 1) / TICK_RATE
        })
    }

    /// React to a join or leave. `count` is the connected roster size.
    pub fn on_roster_change(&mut self, count: usize, now: u64) -> Vec<PhaseEvent> {
        let mut events = Vec::new();

        if count == 0 {
            // Empty room resets everything, whatever the phase
            self.deadline = None;
            if self.phase != GamePhase::WaitingForPlayers {
                self.phase = GamePhase::WaitingForPlayers;
                events.push(PhaseEvent::ReturnedToWaiting);
            }
            return events;
        }

        match self.phase {
            GamePhase::WaitingForPlayers => {
                if count >= self.min_players {
                    self.start_countdown(now, &mut events);
                }
            }
            GamePhase::Countdown => {
                if count < self.min_players {
                    self.phase = GamePhase::WaitingForPlayers;
                    self.deadline = None;
                    events.push(PhaseEvent::CountdownCancelled);
                }
            }
            GamePhase::Playing => {
                // Win condition on disconnect is the room's call; nothing here
            }
        }

        events
    }

    /// Advance the countdown by the current tick, if one is running
    pub fn on_tick(&mut self, now: u64) -> Vec<PhaseEvent> {
        let mut events = Vec::new();

        let Some(deadline) = self.deadline else {
            return events;
        };
        if self.phase != GamePhase::Countdown {
            return events;
        }

        if now >= deadline {
            self.phase = GamePhase::Playing;
            self.deadline = None;
            events.push(PhaseEvent::MatchStarted);
            return events;
        }

        let remaining = self
            .countdown_remaining_secs(now)
            .unwrap_or(0);
        if remaining < self.last_announced_secs && remaining > 0 {
            self.last_announced_secs = remaining;
            events.push(PhaseEvent::CountdownTick {
                seconds_remaining: remaining,
            });
        }

        events
    }

    /// A match concluded (single survivor, by combat or disconnect)
    pub fn on_match_end(&mut self, count: usize, now: u64) -> Vec<PhaseEvent> {
        let mut events = Vec::new();
        if self.phase != GamePhase::Playing {
            return events;
        }

        if count >= self.min_players {
            self.start_countdown(now, &mut events);
        } else {
            self.phase = GamePhase::WaitingForPlayers;
            self.deadline = None;
            events.push(PhaseEvent::ReturnedToWaiting);
        }
        events
    }

    fn start_countdown(&mut self, now: u64, events: &mut Vec<PhaseEvent>) {
        self.phase = GamePhase::Countdown;
        self.deadline = Some(now + self.countdown_secs as u64 * TICK_RATE as u64);
        self.last_announced_secs = self.countdown_secs;
        events.push(PhaseEvent::CountdownStarted {
            seconds: self.countdown_secs,
        });
    }
}
