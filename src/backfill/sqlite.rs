//! SQLite-backed user store
//!
//! Timestamps are stored as integer milliseconds since the Unix epoch.
//! The onboarding patch is a conditional UPDATE, so two runs racing each
//! other still only write each user once.

use super::error::{BackfillError, BackfillResult};
use super::store::{NewUser, UserRecord, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SELECT_USERS: &str =
    "SELECT id, email, name, created_at, onboarding_completed_at FROM users";

/// Users table in a SQLite database
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

/// Row as stored, before timestamp conversion
struct RawUser {
    id: String,
    email: String,
    name: Option<String>,
    created_at: i64,
    onboarding_completed_at: Option<i64>,
}

impl RawUser {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            onboarding_completed_at: row.get(4)?,
        })
    }

    fn into_record(self) -> BackfillResult<UserRecord> {
        Ok(UserRecord {
            id: self.id,
            email: self.email,
            name: self.name,
            created_at: from_millis(self.created_at)?,
            onboarding_completed_at: self.onboarding_completed_at.map(from_millis).transpose()?,
        })
    }
}

fn from_millis(ms: i64) -> BackfillResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(BackfillError::InvalidTimestamp(ms))
}

impl SqliteUserStore {
    /// Create or open a users database file
    pub fn open(path: &Path) -> BackfillResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };
        store.init_schema()?;

        tracing::debug!(path = %path.display(), "Opened user store");
        Ok(store)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> BackfillResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Database file, if not in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init_schema(&self) -> BackfillResult<()> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                name TEXT,
                created_at INTEGER NOT NULL,
                onboarding_completed_at INTEGER
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_users_onboarding
             ON users(onboarding_completed_at)",
            [],
        )?;

        Ok(())
    }

    fn conn(&self) -> BackfillResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| BackfillError::Lock(e.to_string()))
    }

    fn query_users(&self, sql: &str) -> BackfillResult<Vec<UserRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(sql)?;

        let raw = stmt
            .query_map([], RawUser::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter().map(RawUser::into_record).collect()
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert_user(&self, user: NewUser) -> BackfillResult<UserRecord> {
        let record = user.into_record(Utc::now());

        self.conn()?.execute(
            "INSERT INTO users (id, email, name, created_at, onboarding_completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.email,
                record.name,
                record.created_at.timestamp_millis(),
                record.onboarding_completed_at.map(|t| t.timestamp_millis()),
            ],
        )?;

        Ok(record)
    }

    async fn get_user(&self, id: &str) -> BackfillResult<Option<UserRecord>> {
        let raw = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare_cached(&format!("{} WHERE id = ?1", SELECT_USERS))?;
            let raw = stmt.query_row(params![id], RawUser::from_row).optional()?;
            raw
        };

        raw.map(RawUser::into_record).transpose()
    }

    async fn list_users(&self) -> BackfillResult<Vec<UserRecord>> {
        self.query_users(&format!("{} ORDER BY created_at, id", SELECT_USERS))
    }

    async fn users_missing_onboarding(&self) -> BackfillResult<Vec<UserRecord>> {
        self.query_users(&format!(
            "{} WHERE onboarding_completed_at IS NULL ORDER BY created_at, id",
            SELECT_USERS
        ))
    }

    async fn mark_onboarding_completed(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> BackfillResult<bool> {
        let conn = self.conn()?;

        let changed = conn.execute(
            "UPDATE users SET onboarding_completed_at = ?1
             WHERE id = ?2 AND onboarding_completed_at IS NULL",
            params![at.timestamp_millis(), id],
        )?;

        if changed > 0 {
            return Ok(true);
        }

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;

        if exists {
            Ok(false)
        } else {
            Err(BackfillError::UserNotFound(id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = SqliteUserStore::open_in_memory().unwrap();

        let inserted = store
            .insert_user(
                NewUser::new("ada@example.com")
                    .id("u1")
                    .name("Ada")
                    .created_at(ts(1_000)),
            )
            .await
            .unwrap();

        let fetched = store.get_user("u1").await.unwrap().unwrap();
        assert_eq!(fetched, inserted);
        assert_eq!(fetched.created_at, ts(1_000));
        assert!(store.get_user("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_onboarding_query() {
        let store = SqliteUserStore::open_in_memory().unwrap();
        store
            .insert_user(NewUser::new("a@example.com").id("a").created_at(ts(1)))
            .await
            .unwrap();
        store
            .insert_user(
                NewUser::new("b@example.com")
                    .id("b")
                    .created_at(ts(2))
                    .onboarded_at(ts(3)),
            )
            .await
            .unwrap();
        store
            .insert_user(NewUser::new("c@example.com").id("c").created_at(ts(4)))
            .await
            .unwrap();

        let all = store.list_users().await.unwrap();
        assert_eq!(all.len(), 3);

        let missing: Vec<String> = store
            .users_missing_onboarding()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(missing, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_mark_is_conditional() {
        let store = SqliteUserStore::open_in_memory().unwrap();
        store
            .insert_user(NewUser::new("a@example.com").id("a"))
            .await
            .unwrap();

        assert!(store.mark_onboarding_completed("a", ts(100)).await.unwrap());
        assert!(!store.mark_onboarding_completed("a", ts(200)).await.unwrap());

        let user = store.get_user("a").await.unwrap().unwrap();
        assert_eq!(user.onboarding_completed_at, Some(ts(100)));

        let err = store
            .mark_onboarding_completed("nobody", ts(100))
            .await
            .unwrap_err();
        assert!(matches!(err, BackfillError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("users.db");

        {
            let store = SqliteUserStore::open(&path).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
            store
                .insert_user(NewUser::new("a@example.com").id("a"))
                .await
                .unwrap();
            store.mark_onboarding_completed("a", ts(42)).await.unwrap();
        }

        let store = SqliteUserStore::open(&path).unwrap();
        let user = store.get_user("a").await.unwrap().unwrap();
        assert_eq!(user.onboarding_completed_at, Some(ts(42)));
    }
}
