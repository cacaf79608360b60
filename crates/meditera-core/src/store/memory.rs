use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::credentials::{normalize_email, validate_password, PasswordHash};
use super::{AccountStore, UserId};
use crate::error::{AuthError, PersistenceError, Result};
use crate::progress::Achievement;

struct Account {
    user_id: UserId,
    password: PasswordHash,
}

#[derive(Default)]
struct Profile {
    workout_count: u32,
    achievements: Vec<Achievement>,
}

#[derive(Default)]
struct Inner {
    /// Keyed by normalized email.
    accounts: HashMap<String, Account>,
    profiles: HashMap<UserId, Profile>,
}

/// In-process account store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty profile without credentials.
    pub fn add_profile(&self, user_id: UserId) {
        self.lock().profiles.entry(user_id).or_default();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AccountStore for MemoryStore {
    fn create_user(&self, email: &str, password: &str) -> Result<UserId> {
        let email = normalize_email(email)?;
        validate_password(password)?;

        let mut inner = self.lock();
        if inner.accounts.contains_key(&email) {
            return Err(AuthError::EmailInUse(email).into());
        }
        let user_id = UserId::generate();
        inner.accounts.insert(
            email,
            Account {
                user_id: user_id.clone(),
                password: PasswordHash::new(password)?,
            },
        );
        inner.profiles.insert(user_id.clone(), Profile::default());
        Ok(user_id)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<UserId> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let inner = self.lock();
        match inner.accounts.get(&email) {
            Some(account) if account.password.verify(password) => Ok(account.user_id.clone()),
            _ => Err(AuthError::InvalidCredentials.into()),
        }
    }

    fn workout_count(&self, user_id: &UserId) -> Result<u32> {
        self.lock()
            .profiles
            .get(user_id)
            .map(|p| p.workout_count)
            .ok_or_else(|| PersistenceError::UnknownUser(user_id.clone()).into())
    }

    fn set_workout_count(&self, user_id: &UserId, count: u32) -> Result<()> {
        let mut inner = self.lock();
        let profile = inner
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| PersistenceError::UnknownUser(user_id.clone()))?;
        profile.workout_count = count;
        Ok(())
    }

    fn append_achievement(&self, user_id: &UserId, achievement: &Achievement) -> Result<()> {
        let mut inner = self.lock();
        let profile = inner
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| PersistenceError::UnknownUser(user_id.clone()))?;
        if !profile.achievements.iter().any(|a| a.id == achievement.id) {
            profile.achievements.push(achievement.clone());
        }
        Ok(())
    }

    fn achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>> {
        self.lock()
            .profiles
            .get(user_id)
            .map(|p| p.achievements.clone())
            .ok_or_else(|| PersistenceError::UnknownUser(user_id.clone()).into())
    }
}
