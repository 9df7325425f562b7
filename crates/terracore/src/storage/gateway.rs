//! Storage gateway contract consumed by the workflow.
//!
//! All domain records are mutated through this trait; the workflow keeps no
//! state between updates. Implementations must make
//! [`Storage::take_pending_action`] atomic: of two concurrent callers with
//! the same ID, exactly one receives the record.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Congregation, PendingAction, Role, Territory, TerritoryGroup, TerritoryNote, User};

/// Storage gateway errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema migrations failed to apply
    #[error("Migration error: {0}")]
    Migration(String),

    /// Stored JSON that no longer deserializes
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A uniqueness or consistency constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The record to update does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// How to look a user up.
#[derive(Debug, Clone, Copy)]
pub enum UserFilter<'a> {
    Id(&'a str),
    MessengerUserId(i64),
    /// First user with this role in the congregation.
    CongregationRole { congregation_id: &'a str, role: Role },
}

#[derive(Debug, Clone, Copy)]
pub enum CongregationFilter<'a> {
    Id(&'a str),
    Name(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub enum TerritoryFilter<'a> {
    Id(&'a str),
    Title {
        congregation_id: &'a str,
        group_id: &'a str,
        title: &'a str,
    },
}

/// Territory listing criteria. Unset fields do not constrain the result.
///
/// Results are ordered by last-taken time, never-taken territories first.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerritoryQuery<'a> {
    pub congregation_id: Option<&'a str>,
    pub group_id: Option<&'a str>,
    /// `Some(true)`: only territories without a holder.
    pub available: Option<bool>,
    pub holder_id: Option<&'a str>,
}

impl<'a> TerritoryQuery<'a> {
    pub fn in_congregation(congregation_id: &'a str) -> Self {
        Self {
            congregation_id: Some(congregation_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn group(mut self, group_id: &'a str) -> Self {
        self.group_id = Some(group_id);
        self
    }

    #[must_use]
    pub fn available(mut self, available: Option<bool>) -> Self {
        self.available = available;
        self
    }

    #[must_use]
    pub fn held_by(mut self, holder_id: &'a str) -> Self {
        self.holder_id = Some(holder_id);
        self
    }
}

/// CRUD and filtered queries over the domain model.
pub trait Storage: Send + Sync {
    fn create_user(&self, user: &User) -> StorageResult<()>;
    fn get_user(&self, filter: UserFilter<'_>) -> StorageResult<Option<User>>;
    /// Full replace. Fails with `Conflict` when the role invariant is broken.
    fn update_user(&self, user: &User) -> StorageResult<()>;
    fn list_users(&self, congregation_id: &str, role: Role) -> StorageResult<Vec<User>>;

    fn create_congregation(&self, name: &str) -> StorageResult<Congregation>;
    fn get_congregation(&self, filter: CongregationFilter<'_>) -> StorageResult<Option<Congregation>>;

    fn get_or_create_group(&self, congregation_id: &str, title: &str) -> StorageResult<TerritoryGroup>;
    fn get_group(&self, id: &str) -> StorageResult<Option<TerritoryGroup>>;
    /// Groups of a congregation ordered by title.
    fn list_groups(&self, congregation_id: &str) -> StorageResult<Vec<TerritoryGroup>>;

    /// Fails with `Conflict` when the title is taken in the group.
    fn create_territory(&self, territory: &Territory) -> StorageResult<()>;
    fn get_territory(&self, filter: TerritoryFilter<'_>) -> StorageResult<Option<Territory>>;
    fn list_territories(&self, query: &TerritoryQuery<'_>) -> StorageResult<Vec<Territory>>;
    /// Full replace.
    fn update_territory(&self, territory: &Territory) -> StorageResult<()>;
    /// Compare-and-swap on the holder: applies only while the current holder
    /// equals `expected`. Also stamps `last_taken_at`. Returns whether it applied.
    fn set_territory_holder(
        &self,
        territory_id: &str,
        expected: Option<&str>,
        holder: Option<&str>,
        taken_at: DateTime<Utc>,
    ) -> StorageResult<bool>;

    fn add_note(&self, note: &TerritoryNote) -> StorageResult<()>;
    /// Notes of a territory, oldest first.
    fn list_notes(&self, territory_id: &str) -> StorageResult<Vec<TerritoryNote>>;

    fn create_pending_action(&self, action: &PendingAction) -> StorageResult<()>;
    fn get_pending_action(&self, id: &str) -> StorageResult<Option<PendingAction>>;
    /// Atomic get-and-delete.
    fn take_pending_action(&self, id: &str) -> StorageResult<Option<PendingAction>>;
    /// Removes records created before `older_than`; returns how many.
    fn purge_pending_actions(&self, older_than: DateTime<Utc>) -> StorageResult<usize>;
}
