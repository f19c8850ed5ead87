//! User data backfills
//!
//! - **store**: `UserRecord` and the `UserStore` trait
//! - **sqlite**: SQLite implementation of the store
//! - **memory**: in-memory implementation for tests and rehearsals
//! - **migration**: the onboarding completion backfill
//! - **error**: error types
//!
//! # Example
//!
//! ```rust,no_run
//! use mailroom::backfill::{backfill_onboarding, BackfillOptions, SqliteUserStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteUserStore::open("users.db".as_ref())?;
//!     let report = backfill_onboarding(&store, chrono::Utc::now(), BackfillOptions::default()).await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod store;

pub use error::{BackfillError, BackfillResult};
pub use memory::MemoryUserStore;
pub use migration::{backfill_onboarding, BackfillOptions, BackfillReport};
pub use sqlite::SqliteUserStore;
pub use store::{NewUser, UserRecord, UserStore};
