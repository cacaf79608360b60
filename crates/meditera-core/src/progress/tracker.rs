//! Workout counting and achievement awards.
//!
//! Each completed lap is a read-modify-write against the account store:
//! read the count, write count + 1, then append the achievement for the new
//! count if it hits a threshold. Writes for one user are serialized through a
//! per-user lock. The cached [`ProgressRecord`] only changes after the store
//! has accepted every write of the operation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::achievement::{Achievement, AchievementKind, ProgressRecord};
use super::retry::RetryPolicy;
use crate::error::Result;
use crate::events::Event;
use crate::session::CompletionSink;
use crate::store::{AccountStore, UserId};

/// Result of one recorded workout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub user_id: UserId,
    pub workout_count: u32,
    pub awarded: Option<Achievement>,
}

impl WorkoutRecord {
    pub fn events(&self) -> Vec<Event> {
        let mut events = vec![Event::WorkoutRecorded {
            user_id: self.user_id.clone(),
            workout_count: self.workout_count,
            at: Utc::now(),
        }];
        if let Some(achievement) = &self.awarded {
            events.push(Event::AchievementAwarded {
                user_id: self.user_id.clone(),
                achievement: achievement.clone(),
            });
        }
        events
    }
}

pub struct ProgressTracker<S> {
    store: Arc<S>,
    retry: RetryPolicy,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
    cache: Mutex<HashMap<UserId, ProgressRecord>>,
}

impl<S: AccountStore> ProgressTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
            user_locks: Mutex::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Fetch the user's record from the store and cache it for the session.
    pub fn load(&self, user_id: &UserId) -> Result<ProgressRecord> {
        let record = self.retry.run("load progress", || self.store.progress(user_id))?;
        lock(&self.cache).insert(user_id.clone(), record.clone());
        Ok(record)
    }

    pub fn cached(&self, user_id: &UserId) -> Option<ProgressRecord> {
        lock(&self.cache).get(user_id).cloned()
    }

    /// Drop the cached view, e.g. on sign-out. The user's write lock goes
    /// too unless an operation is holding it.
    pub fn forget(&self, user_id: &UserId) {
        lock(&self.cache).remove(user_id);
        let mut locks = lock(&self.user_locks);
        if locks
            .get(user_id)
            .is_some_and(|l| Arc::strong_count(l) == 1)
        {
            locks.remove(user_id);
        }
    }

    /// Count one completed lap through the routine for `user_id`.
    ///
    /// A threshold award already present in the store is reused rather than
    /// appended again. This covers an append that was stored but reported as
    /// failed, after which the count was rolled back and the lap retried.
    ///
    /// # Errors
    /// Returns the store error once the retry policy gives up. On failure the
    /// cached record is left as it was; if the achievement append fails the
    /// count write is rolled back.
    pub fn record_session_completed(&self, user_id: &UserId) -> Result<WorkoutRecord> {
        let user_lock = self.user_lock(user_id);
        let _serialized = lock(&user_lock);

        let previous = self
            .retry
            .run("read workout count", || self.store.workout_count(user_id))?;
        let workout_count = previous.saturating_add(1);
        self.retry.run("write workout count", || {
            self.store.set_workout_count(user_id, workout_count)
        })?;

        let awarded = match AchievementKind::for_workout_count(workout_count) {
            Some(kind) => match self.award(user_id, kind) {
                Ok(achievement) => Some(achievement),
                Err(e) => {
                    self.roll_back_count(user_id, previous);
                    return Err(e);
                }
            },
            None => None,
        };

        tracing::info!(%user_id, workout_count, "workout recorded");
        if let Some(achievement) = &awarded {
            tracing::info!(%user_id, achievement = achievement.name(), "achievement awarded");
        }

        if let Some(record) = lock(&self.cache).get_mut(user_id) {
            record.workout_count = workout_count;
            if let Some(achievement) = &awarded {
                if !record.has(achievement.kind) {
                    record.achievements.push(achievement.clone());
                }
            }
        }

        Ok(WorkoutRecord {
            user_id: user_id.clone(),
            workout_count,
            awarded,
        })
    }

    /// Grant "Account Created". Call once, right after sign-up.
    pub fn record_account_created(&self, user_id: &UserId) -> Result<Achievement> {
        let user_lock = self.user_lock(user_id);
        let _serialized = lock(&user_lock);

        let achievement = self.award(user_id, AchievementKind::AccountCreated)?;
        tracing::info!(%user_id, "account created achievement awarded");

        if let Some(record) = lock(&self.cache).get_mut(user_id) {
            if !record.has(achievement.kind) {
                record.achievements.push(achievement.clone());
            }
        }
        Ok(achievement)
    }

    /// Append `kind` unless the store already holds it. Returns the stored award.
    fn award(&self, user_id: &UserId, kind: AchievementKind) -> Result<Achievement> {
        let existing = self
            .retry
            .run("read achievements", || self.store.achievements(user_id))?
            .into_iter()
            .find(|a| a.kind == kind);
        if let Some(achievement) = existing {
            tracing::debug!(%user_id, achievement = achievement.name(), "award already stored");
            return Ok(achievement);
        }

        let achievement = Achievement::new(kind);
        self.retry.run("append achievement", || {
            self.store.append_achievement(user_id, &achievement)
        })?;
        Ok(achievement)
    }

    fn roll_back_count(&self, user_id: &UserId, previous: u32) {
        if let Err(e) = self.store.set_workout_count(user_id, previous) {
            tracing::error!(%user_id, previous, error = %e, "failed to roll back workout count");
        }
    }

    fn user_lock(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        Arc::clone(lock(&self.user_locks).entry(user_id.clone()).or_default())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Forwards lap completions from a running session to a [`ProgressTracker`].
///
/// Store calls run on tokio's blocking pool; resulting events go to `events`.
pub struct TrackerSink<S> {
    tracker: Arc<ProgressTracker<S>>,
    user_id: UserId,
    events: Option<mpsc::UnboundedSender<Event>>,
}

impl<S> TrackerSink<S> {
    pub fn new(
        tracker: Arc<ProgressTracker<S>>,
        user_id: UserId,
        events: Option<mpsc::UnboundedSender<Event>>,
    ) -> Self {
        Self {
            tracker,
            user_id,
            events,
        }
    }
}

impl<S: AccountStore + 'static> CompletionSink for TrackerSink<S> {
    fn session_completed(&self, laps: u32) {
        let tracker = Arc::clone(&self.tracker);
        let user_id = self.user_id.clone();
        let events = self.events.clone();
        tokio::task::spawn_blocking(move || match tracker.record_session_completed(&user_id) {
            Ok(record) => {
                if let Some(tx) = events {
                    for event in record.events() {
                        let _ = tx.send(event);
                    }
                }
            }
            Err(e) => {
                tracing::error!(%user_id, laps, error = %e, "failed to record workout");
            }
        });
    }
}
