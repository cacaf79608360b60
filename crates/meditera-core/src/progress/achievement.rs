use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::UserId;

/// The fixed achievement catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    AccountCreated,
    FirstWorkout,
    FifthWorkout,
    TenthWorkout,
}

impl AchievementKind {
    pub const ALL: [AchievementKind; 4] = [
        AchievementKind::AccountCreated,
        AchievementKind::FirstWorkout,
        AchievementKind::FifthWorkout,
        AchievementKind::TenthWorkout,
    ];

    /// Display name shown to the user.
    pub fn name(self) -> &'static str {
        match self {
            AchievementKind::AccountCreated => "Account Created",
            AchievementKind::FirstWorkout => "First Workout",
            AchievementKind::FifthWorkout => "Fifth Workout",
            AchievementKind::TenthWorkout => "Tenth Workout",
        }
    }

    /// Storage key.
    pub fn as_str(self) -> &'static str {
        match self {
            AchievementKind::AccountCreated => "account_created",
            AchievementKind::FirstWorkout => "first_workout",
            AchievementKind::FifthWorkout => "fifth_workout",
            AchievementKind::TenthWorkout => "tenth_workout",
        }
    }

    /// Workout count that grants this achievement, if it is count-based.
    pub fn threshold(self) -> Option<u32> {
        match self {
            AchievementKind::AccountCreated => None,
            AchievementKind::FirstWorkout => Some(1),
            AchievementKind::FifthWorkout => Some(5),
            AchievementKind::TenthWorkout => Some(10),
        }
    }

    /// The achievement granted when the workout count becomes exactly `count`.
    pub fn for_workout_count(count: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.threshold() == Some(count))
    }
}

impl fmt::Display for AchievementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AchievementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown achievement kind: {s}"))
    }
}

/// A granted milestone. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: Uuid,
    pub kind: AchievementKind,
    pub awarded_at: DateTime<Utc>,
}

impl Achievement {
    pub fn new(kind: AchievementKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            awarded_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Per-user workout count and achievement list, as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: UserId,
    pub workout_count: u32,
    pub achievements: Vec<Achievement>,
}

impl ProgressRecord {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            workout_count: 0,
            achievements: Vec::new(),
        }
    }

    pub fn has(&self, kind: AchievementKind) -> bool {
        self.achievements.iter().any(|a| a.kind == kind)
    }

    pub fn achievement_names(&self) -> Vec<&'static str> {
        self.achievements.iter().map(Achievement::name).collect()
    }
}
