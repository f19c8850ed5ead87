//! User records and the store abstraction the backfill runs against

use super::error::BackfillResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the users collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// When the user finished onboarding; empty for accounts created
    /// before the field existed
    #[serde(default)]
    pub onboarding_completed_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn needs_onboarding_backfill(&self) -> bool {
        self.onboarding_completed_at.is_none()
    }
}

/// A user to insert
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Option<String>,
    pub email: String,
    pub name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub onboarding_completed_at: Option<DateTime<Utc>>,
}

impl NewUser {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
            name: None,
            created_at: None,
            onboarding_completed_at: None,
        }
    }

    /// Builder method: use a fixed id instead of a generated one
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder method: set display name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method: set creation time
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Builder method: mark onboarding as already completed
    pub fn onboarded_at(mut self, at: DateTime<Utc>) -> Self {
        self.onboarding_completed_at = Some(at);
        self
    }

    /// Resolve generated fields into a full record
    pub fn into_record(self, now: DateTime<Utc>) -> UserRecord {
        UserRecord {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()),
            email: self.email,
            name: self.name,
            created_at: self.created_at.unwrap_or(now),
            onboarding_completed_at: self.onboarding_completed_at,
        }
    }
}

/// Storage the onboarding backfill reads from and patches
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn insert_user(&self, user: NewUser) -> BackfillResult<UserRecord>;

    async fn get_user(&self, id: &str) -> BackfillResult<Option<UserRecord>>;

    /// Every user, in a stable order
    async fn list_users(&self) -> BackfillResult<Vec<UserRecord>>;

    /// Users without an onboarding completion timestamp
    async fn users_missing_onboarding(&self) -> BackfillResult<Vec<UserRecord>> {
        Ok(self
            .list_users()
            .await?
            .into_iter()
            .filter(UserRecord::needs_onboarding_backfill)
            .collect())
    }

    /// Set the completion timestamp if it is still empty
    ///
    /// Returns whether the record changed. Fails with `UserNotFound` for
    /// unknown ids.
    async fn mark_onboarding_completed(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> BackfillResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_into_record() {
        let now = Utc::now();
        let record = NewUser::new("ada@example.com").name("Ada").into_record(now);

        assert_eq!(record.email, "ada@example.com");
        assert_eq!(record.name.as_deref(), Some("Ada"));
        assert_eq!(record.created_at, now);
        assert_eq!(record.id.len(), 32);
        assert!(record.needs_onboarding_backfill());
    }

    #[test]
    fn test_fixed_id_and_onboarded() {
        let now = Utc::now();
        let record = NewUser::new("bob@example.com")
            .id("user_bob")
            .onboarded_at(now)
            .into_record(now);

        assert_eq!(record.id, "user_bob");
        assert!(!record.needs_onboarding_backfill());
    }
}
