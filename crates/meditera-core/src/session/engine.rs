//! Workout session timer.
//!
//! The timer is a tick-driven state machine. It does not own a clock - the
//! caller invokes `tick()` once per elapsed second (see [`super::SessionHandle`]
//! for the tokio-driven owner).
//!
//! ## State Transitions
//!
//! ```text
//! Active -> Resting -> Active (next exercise) -> ... -> Terminal
//!    \_______ Running <-> Paused _______/
//! ```
//!
//! Phase boundaries are derived from elapsed time,
//! `(total - remaining) mod (exercise + rest)`, so every boundary is hit even
//! when the cycle does not divide the total duration. A total that is not a
//! multiple of the cycle ends the session mid-cycle.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::routine::Routine;
use crate::error::ValidationError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Active,
    Resting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Paused,
    /// Remaining time reached zero. Nothing leaves this state.
    Finished,
}

/// Durations and exercise count for one workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub total_secs: u64,
    pub exercise_secs: u64,
    pub rest_secs: u64,
    pub exercise_count: usize,
}

impl SessionConfig {
    /// `laps` full passes through `routine`, one exercise + rest cycle each.
    pub fn for_routine(routine: &Routine, exercise_secs: u64, rest_secs: u64, laps: u32) -> Self {
        let cycle = exercise_secs.saturating_add(rest_secs);
        Self {
            total_secs: cycle
                .saturating_mul(routine.len() as u64)
                .saturating_mul(u64::from(laps)),
            exercise_secs,
            rest_secs,
            exercise_count: routine.len(),
        }
    }

    pub fn cycle_secs(&self) -> u64 {
        self.exercise_secs.saturating_add(self.rest_secs)
    }

    /// Reject configurations that would divide by zero or never progress.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.exercise_count == 0 {
            return Err(ValidationError::EmptyCollection("exercises".into()));
        }
        if self.cycle_secs() == 0 {
            return Err(ValidationError::InvalidValue {
                field: "exercise_secs + rest_secs".into(),
                message: "cycle length must be greater than zero".into(),
            });
        }
        if self.exercise_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "exercise_secs".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.total_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "total_secs".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// What the presentation layer renders after each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub remaining_secs: u64,
    pub phase: Phase,
    pub exercise_index: usize,
    pub paused: bool,
    pub status: SessionStatus,
    pub laps: u32,
}

/// Restored timers go through the same validation as [`SessionTimer::start`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TimerState")]
pub struct SessionTimer {
    config: SessionConfig,
    remaining_secs: u64,
    exercise_index: usize,
    phase: Phase,
    paused: bool,
    finished: bool,
    laps: u32,
}

#[derive(Deserialize)]
struct TimerState {
    config: SessionConfig,
    remaining_secs: u64,
    exercise_index: usize,
    phase: Phase,
    paused: bool,
    finished: bool,
    laps: u32,
}

impl TryFrom<TimerState> for SessionTimer {
    type Error = ValidationError;

    fn try_from(state: TimerState) -> Result<Self, Self::Error> {
        state.config.validate()?;
        if state.exercise_index >= state.config.exercise_count {
            return Err(ValidationError::InvalidValue {
                field: "exercise_index".into(),
                message: format!(
                    "{} is out of range for {} exercises",
                    state.exercise_index, state.config.exercise_count
                ),
            });
        }
        if state.remaining_secs > state.config.total_secs {
            return Err(ValidationError::InvalidValue {
                field: "remaining_secs".into(),
                message: format!("exceeds total of {}s", state.config.total_secs),
            });
        }
        Ok(Self {
            config: state.config,
            remaining_secs: state.remaining_secs,
            exercise_index: state.exercise_index,
            phase: state.phase,
            paused: state.paused,
            finished: state.finished || state.remaining_secs == 0,
            laps: state.laps,
        })
    }
}

impl SessionTimer {
    /// Begin a session: Active, first exercise, running.
    ///
    /// # Errors
    /// Returns a `ValidationError` for zero exercises, a zero-length cycle,
    /// a zero-length exercise or a zero total duration.
    pub fn start(config: SessionConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            config,
            remaining_secs: config.total_secs,
            exercise_index: 0,
            phase: Phase::Active,
            paused: false,
            finished: false,
            laps: 0,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.config.total_secs - self.remaining_secs
    }

    pub fn exercise_index(&self) -> usize {
        self.exercise_index
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Completed passes through the whole routine.
    pub fn laps(&self) -> u32 {
        self.laps
    }

    pub fn status(&self) -> SessionStatus {
        if self.finished {
            SessionStatus::Finished
        } else if self.paused {
            SessionStatus::Paused
        } else {
            SessionStatus::Running
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            remaining_secs: self.remaining_secs,
            phase: self.phase,
            exercise_index: self.exercise_index,
            paused: self.paused,
            status: self.status(),
            laps: self.laps,
        }
    }

    pub fn started_event(&self) -> Event {
        Event::SessionStarted {
            total_secs: self.config.total_secs,
            exercise_count: self.config.exercise_count,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn pause(&mut self) -> Option<Event> {
        if self.finished || self.paused {
            return None;
        }
        self.paused = true;
        Some(Event::SessionPaused {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.finished || !self.paused {
            return None;
        }
        self.paused = false;
        Some(Event::SessionResumed {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Apply one elapsed second. Ignored while paused or finished.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.paused || self.finished {
            return events;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        let now = Utc::now();
        let position = self.elapsed_secs() % self.config.cycle_secs();

        if position == 0 {
            let from = self.phase;
            self.phase = Phase::Active;
            self.exercise_index = (self.exercise_index + 1) % self.config.exercise_count;
            if from != Phase::Active {
                events.push(Event::PhaseChanged {
                    from,
                    to: Phase::Active,
                    exercise_index: self.exercise_index,
                    remaining_secs: self.remaining_secs,
                    at: now,
                });
            }
            events.push(Event::ExerciseAdvanced {
                exercise_index: self.exercise_index,
                remaining_secs: self.remaining_secs,
                at: now,
            });
            if self.exercise_index == 0 {
                self.laps += 1;
                tracing::debug!(laps = self.laps, "routine lap completed");
                events.push(Event::LapCompleted {
                    laps: self.laps,
                    at: now,
                });
            }
        } else if position == self.config.exercise_secs && self.config.rest_secs > 0 {
            self.phase = Phase::Resting;
            events.push(Event::PhaseChanged {
                from: Phase::Active,
                to: Phase::Resting,
                exercise_index: self.exercise_index,
                remaining_secs: self.remaining_secs,
                at: now,
            });
        }

        if self.remaining_secs == 0 {
            self.finished = true;
            tracing::debug!(laps = self.laps, "session finished");
            events.push(Event::SessionFinished {
                laps: self.laps,
                at: now,
            });
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(total: u64, exercise: u64, rest: u64, count: usize) -> SessionConfig {
        SessionConfig {
            total_secs: total,
            exercise_secs: exercise,
            rest_secs: rest,
            exercise_count: count,
        }
    }

    fn run(timer: &mut SessionTimer, ticks: u64) -> Vec<Event> {
        (0..ticks).flat_map(|_| timer.tick()).collect()
    }

    fn phase_changes(events: &[Event]) -> Vec<(Phase, Phase)> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::PhaseChanged { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    fn lap_count(events: &[Event]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, Event::LapCompleted { .. }))
            .count()
    }

    #[test]
    fn start_initial_state() {
        let timer = SessionTimer::start(config(120, 45, 15, 2)).unwrap();
        assert_eq!(timer.remaining_secs(), 120);
        assert_eq!(timer.phase(), Phase::Active);
        assert_eq!(timer.exercise_index(), 0);
        assert_eq!(timer.status(), SessionStatus::Running);
    }

    #[test]
    fn restored_timer_resumes_where_it_left_off() {
        let mut timer = SessionTimer::start(config(120, 45, 15, 2)).unwrap();
        run(&mut timer, 50);
        let json = serde_json::to_string(&timer).unwrap();

        let restored: SessionTimer = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.snapshot(), timer.snapshot());
        assert_eq!(restored.phase(), Phase::Resting);
    }

    #[test]
    fn restoring_invalid_config_is_rejected() {
        let json = r#"{
            "config": {"total_secs": 10, "exercise_secs": 0, "rest_secs": 0, "exercise_count": 0},
            "remaining_secs": 10, "exercise_index": 0, "phase": "active",
            "paused": false, "finished": false, "laps": 0
        }"#;
        let err = serde_json::from_str::<SessionTimer>(json).unwrap_err();
        assert!(err.to_string().contains("exercise"), "{err}");
    }

    #[test]
    fn restoring_out_of_range_index_is_rejected() {
        let mut timer = SessionTimer::start(config(120, 45, 15, 2)).unwrap();
        run(&mut timer, 5);
        let mut value = serde_json::to_value(&timer).unwrap();
        value["exercise_index"] = serde_json::json!(2);
        assert!(serde_json::from_value::<SessionTimer>(value).is_err());
    }

    #[test]
    fn start_rejects_zero_exercises() {
        let err = SessionTimer::start(config(120, 45, 15, 0)).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyCollection(_)));
    }

    #[test]
    fn start_rejects_zero_cycle() {
        let err = SessionTimer::start(config(120, 0, 0, 2)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn start_rejects_zero_total() {
        assert!(SessionTimer::start(config(0, 45, 15, 2)).is_err());
    }

    #[test]
    fn sixty_ticks_rest_then_next_exercise() {
        let mut timer = SessionTimer::start(config(120, 45, 15, 2)).unwrap();

        let events = run(&mut timer, 45);
        assert_eq!(phase_changes(&events), vec![(Phase::Active, Phase::Resting)]);
        assert_eq!(timer.exercise_index(), 0);

        let events = run(&mut timer, 15);
        assert_eq!(phase_changes(&events), vec![(Phase::Resting, Phase::Active)]);
        assert_eq!(timer.exercise_index(), 1);
        assert_eq!(timer.remaining_secs(), 60);
        assert_eq!(lap_count(&events), 0);
    }

    #[test]
    fn full_duration_reaches_terminal() {
        let mut timer = SessionTimer::start(config(120, 45, 15, 2)).unwrap();
        let events = run(&mut timer, 120);

        assert!(timer.is_finished());
        assert_eq!(timer.status(), SessionStatus::Finished);
        assert_eq!(timer.remaining_secs(), 0);
        assert_eq!(lap_count(&events), 1);
        assert!(matches!(events.last(), Some(Event::SessionFinished { laps: 1, .. })));

        assert!(run(&mut timer, 30).is_empty());
        assert_eq!(timer.remaining_secs(), 0);
    }

    #[test]
    fn pause_ignores_ticks() {
        let mut timer = SessionTimer::start(config(120, 45, 15, 2)).unwrap();
        assert!(timer.pause().is_some());
        assert!(run(&mut timer, 10).is_empty());
        assert_eq!(timer.remaining_secs(), 120);

        assert!(timer.resume().is_some());
        run(&mut timer, 10);
        assert_eq!(timer.remaining_secs(), 110);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let mut timer = SessionTimer::start(config(120, 45, 15, 2)).unwrap();
        assert!(timer.resume().is_none());
        assert!(timer.pause().is_some());
        assert!(timer.pause().is_none());
        assert_eq!(timer.status(), SessionStatus::Paused);
    }

    #[test]
    fn finished_session_ignores_pause() {
        let mut timer = SessionTimer::start(config(2, 1, 1, 1)).unwrap();
        run(&mut timer, 2);
        assert!(timer.pause().is_none());
        assert!(timer.resume().is_none());
        assert_eq!(timer.status(), SessionStatus::Finished);
    }

    #[test]
    fn zero_rest_rolls_straight_into_next_exercise() {
        let mut timer = SessionTimer::start(config(30, 10, 0, 3)).unwrap();
        let events = run(&mut timer, 10);
        assert!(phase_changes(&events).is_empty());
        assert_eq!(timer.exercise_index(), 1);
        assert_eq!(timer.phase(), Phase::Active);

        let events = run(&mut timer, 20);
        assert_eq!(lap_count(&events), 1);
        assert!(timer.is_finished());
    }

    #[test]
    fn uneven_cycle_still_hits_every_boundary() {
        // 7 + 3 does not divide 25; the session ends 5s into the third cycle.
        let mut timer = SessionTimer::start(config(25, 7, 3, 2)).unwrap();
        let events = run(&mut timer, 25);
        assert_eq!(
            phase_changes(&events),
            vec![
                (Phase::Active, Phase::Resting),
                (Phase::Resting, Phase::Active),
                (Phase::Active, Phase::Resting),
                (Phase::Resting, Phase::Active),
            ]
        );
        assert_eq!(timer.phase(), Phase::Active);
        assert_eq!(lap_count(&events), 1);
        assert!(timer.is_finished());
    }

    #[test]
    fn partial_lap_does_not_complete() {
        let mut timer = SessionTimer::start(config(100, 10, 10, 9)).unwrap();
        let events = run(&mut timer, 100);
        assert_eq!(lap_count(&events), 0);
        assert_eq!(timer.laps(), 0);
    }

    #[test]
    fn for_routine_covers_every_exercise() {
        let routine = Routine::default();
        let cfg = SessionConfig::for_routine(&routine, 45, 15, 2);
        assert_eq!(cfg.exercise_count, 9);
        assert_eq!(cfg.total_secs, 2 * 9 * 60);
    }

    proptest! {
        #[test]
        fn total_ticks_reach_terminal(
            exercise in 1u64..20,
            rest in 0u64..20,
            count in 1usize..6,
            total in 1u64..400,
        ) {
            let mut timer = SessionTimer::start(config(total, exercise, rest, count)).unwrap();
            for _ in 0..total {
                prop_assert!(!timer.is_finished());
                timer.tick();
            }
            prop_assert!(timer.is_finished());
            prop_assert!(timer.tick().is_empty());
        }

        #[test]
        fn index_stays_in_range(
            exercise in 1u64..20,
            rest in 0u64..20,
            count in 1usize..6,
            total in 1u64..400,
        ) {
            let mut timer = SessionTimer::start(config(total, exercise, rest, count)).unwrap();
            for _ in 0..total {
                timer.tick();
                prop_assert!(timer.exercise_index() < count);
            }
        }

        #[test]
        fn laps_fire_once_per_full_traversal(
            exercise in 1u64..20,
            rest in 0u64..20,
            count in 1usize..6,
            total in 1u64..400,
        ) {
            let mut timer = SessionTimer::start(config(total, exercise, rest, count)).unwrap();
            let events = run(&mut timer, total);
            let lap_len = (exercise + rest) * count as u64;
            prop_assert_eq!(lap_count(&events) as u64, total / lap_len);
            prop_assert_eq!(u64::from(timer.laps()), total / lap_len);
        }

        #[test]
        fn remaining_strictly_decreases(
            exercise in 1u64..20,
            rest in 0u64..20,
            count in 1usize..6,
            total in 1u64..200,
        ) {
            let mut timer = SessionTimer::start(config(total, exercise, rest, count)).unwrap();
            let mut last = timer.remaining_secs();
            for _ in 0..total {
                timer.tick();
                prop_assert_eq!(timer.remaining_secs() + 1, last);
                last = timer.remaining_secs();
            }
        }
    }
}
