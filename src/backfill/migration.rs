//! Onboarding completion backfill
//!
//! Accounts created before onboarding was tracked have no completion
//! timestamp, which sends them back through onboarding on next sign-in.
//! The backfill stamps every such account with the current time:
//!
//! 1. list users missing the timestamp
//! 2. patch each one on its own
//! 3. report how many were updated out of how many were scanned
//!
//! Patches are independent. A failure stops the run and is returned, but
//! users patched before it keep their timestamp; rerunning picks up where
//! the failed run stopped.

use super::error::{BackfillError, BackfillResult};
use super::store::UserStore;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Knobs for a backfill run
#[derive(Debug, Clone, Copy, Default)]
pub struct BackfillOptions {
    /// Count what would change without writing anything
    pub dry_run: bool,
}

/// Outcome of a backfill run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Users looked at
    pub scanned: usize,
    /// Users without a completion timestamp when the run started
    pub missing: usize,
    /// Users actually written (always 0 for a dry run)
    pub updated: usize,
    pub dry_run: bool,
}

impl std::fmt::Display for BackfillReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.dry_run {
            write!(
                f,
                "Would update {} of {} users (dry run)",
                self.missing, self.scanned
            )
        } else {
            write!(f, "Updated {} of {} users", self.updated, self.scanned)
        }
    }
}

/// Stamp every user lacking an onboarding completion time with `now`
pub async fn backfill_onboarding(
    store: &dyn UserStore,
    now: DateTime<Utc>,
    options: BackfillOptions,
) -> BackfillResult<BackfillReport> {
    let scanned = store.list_users().await?.len();
    let pending = store.users_missing_onboarding().await?;

    tracing::info!(
        store = store.name(),
        scanned,
        missing = pending.len(),
        dry_run = options.dry_run,
        "Starting onboarding backfill"
    );

    let mut updated = 0;
    if !options.dry_run {
        for user in &pending {
            let changed = store
                .mark_onboarding_completed(&user.id, now)
                .await
                .map_err(|e| BackfillError::Patch {
                    user_id: user.id.clone(),
                    source: Box::new(e),
                })?;

            if changed {
                updated += 1;
                tracing::debug!(user_id = %user.id, "Marked onboarding completed");
            }
        }
    }

    let report = BackfillReport {
        scanned,
        missing: pending.len(),
        updated,
        dry_run: options.dry_run,
    };

    tracing::info!("{}", report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backfill::{MemoryUserStore, NewUser, SqliteUserStore};
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    async fn seed(store: &dyn UserStore) {
        store
            .insert_user(NewUser::new("a@example.com").id("a").created_at(ts(1)))
            .await
            .unwrap();
        store
            .insert_user(
                NewUser::new("b@example.com")
                    .id("b")
                    .created_at(ts(2))
                    .onboarded_at(ts(50)),
            )
            .await
            .unwrap();
        store
            .insert_user(NewUser::new("c@example.com").id("c").created_at(ts(3)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_backfill_is_idempotent() {
        let store = MemoryUserStore::new();
        seed(&store).await;

        let first = backfill_onboarding(&store, ts(1_000), BackfillOptions::default())
            .await
            .unwrap();
        assert_eq!(first.scanned, 3);
        assert_eq!(first.missing, 2);
        assert_eq!(first.updated, 2);

        let second = backfill_onboarding(&store, ts(2_000), BackfillOptions::default())
            .await
            .unwrap();
        assert_eq!(second.scanned, 3);
        assert_eq!(second.updated, 0);

        // First run's timestamp sticks; pre-existing value untouched
        let a = store.get_user("a").await.unwrap().unwrap();
        let b = store.get_user("b").await.unwrap().unwrap();
        assert_eq!(a.onboarding_completed_at, Some(ts(1_000)));
        assert_eq!(b.onboarding_completed_at, Some(ts(50)));
    }

    #[tokio::test]
    async fn test_backfill_against_sqlite() {
        let store = SqliteUserStore::open_in_memory().unwrap();
        seed(&store).await;

        let first = backfill_onboarding(&store, ts(1_000), BackfillOptions::default())
            .await
            .unwrap();
        assert_eq!(first.updated, 2);

        let second = backfill_onboarding(&store, ts(2_000), BackfillOptions::default())
            .await
            .unwrap();
        assert_eq!(second.updated, 0);
        assert!(store.users_missing_onboarding().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = MemoryUserStore::new();
        seed(&store).await;

        let report = backfill_onboarding(&store, ts(1_000), BackfillOptions { dry_run: true })
            .await
            .unwrap();
        assert_eq!(report.missing, 2);
        assert_eq!(report.updated, 0);
        assert_eq!(report.to_string(), "Would update 2 of 3 users (dry run)");
        assert_eq!(store.users_missing_onboarding().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_patches() {
        let store = MemoryUserStore::new();
        seed(&store).await;
        store.fail_updates_for("c").await;

        let err = backfill_onboarding(&store, ts(1_000), BackfillOptions::default())
            .await
            .unwrap_err();
        match err {
            BackfillError::Patch { user_id, .. } => assert_eq!(user_id, "c"),
            other => panic!("unexpected error: {}", other),
        }

        // "a" was patched before "c" failed, and is not rolled back
        let a = store.get_user("a").await.unwrap().unwrap();
        assert_eq!(a.onboarding_completed_at, Some(ts(1_000)));
        let c = store.get_user("c").await.unwrap().unwrap();
        assert!(c.needs_onboarding_backfill());
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = MemoryUserStore::new();
        let report = backfill_onboarding(&store, ts(1), BackfillOptions::default())
            .await
            .unwrap();
        assert_eq!(
            report,
            BackfillReport {
                scanned: 0,
                missing: 0,
                updated: 0,
                dry_run: false
            }
        );
        assert_eq!(report.to_string(), "Updated 0 of 0 users");
    }
}
