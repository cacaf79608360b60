//! SQLite-backed account store.
//!
//! Provides persistent storage for:
//! - Accounts (email + salted password hash)
//! - Per-user workout count and achievement list
//! - Key-value store for application state (the signed-in user)

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, migrations};
use crate::error::{AuthError, DatabaseError, PersistenceError, Result};
use crate::progress::{Achievement, AchievementKind};
use crate::store::{normalize_email, validate_password, AccountStore, PasswordHash, UserId};

const CURRENT_USER_KEY: &str = "current_user";

/// SQLite database standing in for the hosted account backend.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the database at `~/.config/meditera/meditera.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("meditera.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// The user persisted as signed in, if any.
    pub fn current_user(&self) -> Result<Option<UserId>> {
        Ok(self.kv_get(CURRENT_USER_KEY)?.map(UserId::new))
    }

    pub fn set_current_user(&self, user_id: Option<&UserId>) -> Result<()> {
        match user_id {
            Some(id) => self.kv_set(CURRENT_USER_KEY, id.as_str()),
            None => self.kv_delete(CURRENT_USER_KEY),
        }
    }

    fn ensure_profile(conn: &Connection, user_id: &UserId) -> Result<()> {
        let exists = conn
            .query_row(
                "SELECT 1 FROM profiles WHERE user_id = ?1",
                params![user_id.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        match exists {
            Some(()) => Ok(()),
            None => Err(PersistenceError::UnknownUser(user_id.clone()).into()),
        }
    }
}

impl AccountStore for SqliteStore {
    fn create_user(&self, email: &str, password: &str) -> Result<UserId> {
        let email = normalize_email(email)?;
        validate_password(password)?;
        let hash = PasswordHash::new(password)?;
        let user_id = UserId::generate();

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let taken = tx
            .query_row(
                "SELECT 1 FROM users WHERE email = ?1",
                params![email],
                |_| Ok(()),
            )
            .optional()?;
        if taken.is_some() {
            return Err(AuthError::EmailInUse(email).into());
        }
        tx.execute(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id.as_str(),
                email,
                hash.to_string(),
                Utc::now().to_rfc3339()
            ],
        )?;
        tx.execute(
            "INSERT INTO profiles (user_id, workout_count) VALUES (?1, 0)",
            params![user_id.as_str()],
        )?;
        tx.commit()?;
        Ok(user_id)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<UserId> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let row: Option<(String, String)> = self
            .conn()
            .query_row(
                "SELECT id, password_hash FROM users WHERE email = ?1",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (id, stored) = row.ok_or(AuthError::InvalidCredentials)?;
        let hash: PasswordHash = stored.parse().map_err(|_| DatabaseError::CorruptRow {
            table: "users".into(),
            message: format!("password hash for {id}"),
        })?;
        if hash.verify(password) {
            Ok(UserId::new(id))
        } else {
            Err(AuthError::InvalidCredentials.into())
        }
    }

    fn sign_out(&self, user_id: &UserId) -> Result<()> {
        if self.current_user()?.as_ref() == Some(user_id) {
            self.set_current_user(None)?;
        }
        Ok(())
    }

    fn workout_count(&self, user_id: &UserId) -> Result<u32> {
        let count = self
            .conn()
            .query_row(
                "SELECT workout_count FROM profiles WHERE user_id = ?1",
                params![user_id.as_str()],
                |row| row.get::<_, u32>(0),
            )
            .optional()?;
        count.ok_or_else(|| PersistenceError::UnknownUser(user_id.clone()).into())
    }

    fn set_workout_count(&self, user_id: &UserId, count: u32) -> Result<()> {
        let updated = self.conn().execute(
            "UPDATE profiles SET workout_count = ?1 WHERE user_id = ?2",
            params![count, user_id.as_str()],
        )?;
        if updated == 0 {
            return Err(PersistenceError::UnknownUser(user_id.clone()).into());
        }
        Ok(())
    }

    fn append_achievement(&self, user_id: &UserId, achievement: &Achievement) -> Result<()> {
        let conn = self.conn();
        Self::ensure_profile(&conn, user_id)?;
        conn.execute(
            "INSERT OR IGNORE INTO achievements (id, user_id, kind, awarded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                achievement.id.to_string(),
                user_id.as_str(),
                achievement.kind.as_str(),
                achievement.awarded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>> {
        let conn = self.conn();
        Self::ensure_profile(&conn, user_id)?;
        let mut stmt = conn.prepare(
            "SELECT id, kind, awarded_at FROM achievements
             WHERE user_id = ?1
             ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![user_id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut achievements = Vec::new();
        for row in rows {
            let (id, kind, awarded_at) = row?;
            achievements.push(decode_achievement(&id, &kind, &awarded_at)?);
        }
        Ok(achievements)
    }
}

fn decode_achievement(id: &str, kind: &str, awarded_at: &str) -> Result<Achievement, DatabaseError> {
    let corrupt = |message: String| DatabaseError::CorruptRow {
        table: "achievements".into(),
        message,
    };
    Ok(Achievement {
        id: id.parse().map_err(|e| corrupt(format!("id {id}: {e}")))?,
        kind: kind.parse::<AchievementKind>().map_err(corrupt)?,
        awarded_at: DateTime::parse_from_rfc3339(awarded_at)
            .map_err(|e| corrupt(format!("awarded_at {awarded_at}: {e}")))?
            .with_timezone(&Utc),
    })
}
