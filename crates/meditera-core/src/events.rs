use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::Achievement;
use crate::session::{Phase, SessionSnapshot};
use crate::store::UserId;

/// Every state change in the system produces an Event.
/// The presentation layer subscribes to them; the tracker reacts to laps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        total_secs: u64,
        exercise_count: usize,
        at: DateTime<Utc>,
    },
    SessionPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Active <-> Resting boundary crossed.
    PhaseChanged {
        from: Phase,
        to: Phase,
        exercise_index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Moved on to the next exercise in the routine.
    ExerciseAdvanced {
        exercise_index: usize,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// The exercise index wrapped back to 0: one full lap through the routine.
    LapCompleted {
        laps: u32,
        at: DateTime<Utc>,
    },
    /// Remaining time hit zero. Terminal.
    SessionFinished {
        laps: u32,
        at: DateTime<Utc>,
    },
    /// Session was torn down before finishing.
    SessionCancelled {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        snapshot: SessionSnapshot,
        at: DateTime<Utc>,
    },
    WorkoutRecorded {
        user_id: UserId,
        workout_count: u32,
        at: DateTime<Utc>,
    },
    AchievementAwarded {
        user_id: UserId,
        achievement: Achievement,
    },
}
