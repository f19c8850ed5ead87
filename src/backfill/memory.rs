//! In-memory user store
//!
//! Used by tests and for rehearsing a backfill against a snapshot. Writes
//! for selected ids can be made to fail to exercise partial-failure paths.

use super::error::{BackfillError, BackfillResult};
use super::store::{NewUser, UserRecord, UserStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

/// Users kept in a map, ordered by id
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<BTreeMap<String, UserRecord>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from existing records
    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        let users = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        Self {
            users: RwLock::new(users),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Make every onboarding patch for `id` fail
    pub async fn fail_updates_for(&self, id: impl Into<String>) {
        self.failing.write().await.insert(id.into());
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert_user(&self, user: NewUser) -> BackfillResult<UserRecord> {
        let record = user.into_record(Utc::now());
        let mut users = self.users.write().await;

        if users.contains_key(&record.id) {
            return Err(BackfillError::Store(format!(
                "duplicate user id {}",
                record.id
            )));
        }

        users.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_user(&self, id: &str) -> BackfillResult<Option<UserRecord>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn list_users(&self) -> BackfillResult<Vec<UserRecord>> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn mark_onboarding_completed(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> BackfillResult<bool> {
        if self.failing.read().await.contains(id) {
            return Err(BackfillError::Store(format!("write rejected for {}", id)));
        }

        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| BackfillError::UserNotFound(id.to_string()))?;

        if user.onboarding_completed_at.is_some() {
            return Ok(false);
        }

        user.onboarding_completed_at = Some(at);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_list_and_patch() {
        let store = MemoryUserStore::new();
        assert!(store.is_empty().await);

        store
            .insert_user(NewUser::new("b@example.com").id("b"))
            .await
            .unwrap();
        store
            .insert_user(NewUser::new("a@example.com").id("a"))
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);

        let ids: Vec<String> = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);

        let now = Utc::now();
        assert!(store.mark_onboarding_completed("a", now).await.unwrap());
        assert!(!store.mark_onboarding_completed("a", now).await.unwrap());
        assert_eq!(store.users_missing_onboarding().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_and_missing_ids() {
        let store = MemoryUserStore::new();
        store
            .insert_user(NewUser::new("a@example.com").id("a"))
            .await
            .unwrap();

        let dup = store
            .insert_user(NewUser::new("again@example.com").id("a"))
            .await;
        assert!(matches!(dup, Err(BackfillError::Store(_))));

        let missing = store.mark_onboarding_completed("zzz", Utc::now()).await;
        assert!(matches!(missing, Err(BackfillError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryUserStore::new();
        store
            .insert_user(NewUser::new("a@example.com").id("a"))
            .await
            .unwrap();
        store.fail_updates_for("a").await;

        let result = store.mark_onboarding_completed("a", Utc::now()).await;
        assert!(matches!(result, Err(BackfillError::Store(_))));
        assert!(store.get_user("a").await.unwrap().unwrap().needs_onboarding_backfill());
    }

    #[tokio::test]
    async fn test_seeded_legacy_records_backfilled() {
        use crate::backfill::{backfill_onboarding, BackfillOptions};

        // Documents written before the onboarding field existed
        let legacy: Vec<UserRecord> = serde_json::from_str(
            r#"[
                {"id":"old-1","email":"one@example.com","created_at":"2023-01-02T03:04:05Z"},
                {"id":"old-2","email":"two@example.com","created_at":"2023-02-03T04:05:06Z"},
                {"id":"done","email":"done@example.com","created_at":"2023-03-04T05:06:07Z",
                 "onboarding_completed_at":"2023-03-05T00:00:00Z"}
            ]"#,
        )
        .unwrap();
        let store = MemoryUserStore::with_users(legacy);
        assert_eq!(store.len().await, 3);

        let now = Utc::now();
        let report = backfill_onboarding(&store, now, BackfillOptions { dry_run: false })
            .await
            .unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.missing, 2);
        assert_eq!(report.updated, 2);

        let old = store.get_user("old-1").await.unwrap().unwrap();
        assert_eq!(old.onboarding_completed_at, Some(now));
        let done = store.get_user("done").await.unwrap().unwrap();
        assert_eq!(
            done.onboarding_completed_at.unwrap().to_rfc3339(),
            "2023-03-05T00:00:00+00:00"
        );
    }
}
