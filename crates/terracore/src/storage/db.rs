//! SQLite implementation of the storage gateway.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, OptionalExtension, Row};

use super::gateway::{
    CongregationFilter, Storage, StorageError, StorageResult, TerritoryFilter, TerritoryQuery, UserFilter,
};
use super::migrations::run_migrations;
use crate::domain::{
    new_id, Congregation, FileKind, MessageRef, PendingAction, PendingKind, Role, Stage, Territory, TerritoryGroup,
    TerritoryNote, User,
};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Every connection gets WAL journaling and a busy timeout so concurrent
/// writers queue instead of failing. Schema migrations run once, here.
///
/// Each pooled connection to `:memory:` would be its own database, so tests
/// use a temporary file instead.
///
/// # Example
///
/// ```no_run
/// use terracore::storage::create_pool;
///
/// let pool = create_pool("territory.sqlite")?;
/// # Ok::<(), terracore::storage::StorageError>(())
/// ```
pub fn create_pool(database_path: &str) -> StorageResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
    });
    let pool = Pool::builder().max_size(10).build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn).map_err(|e| StorageError::Migration(format!("{:#}", e)))?;

    Ok(pool)
}

/// Get a connection from the pool
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

macro_rules! text_column {
    ($($ty:ty),+) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value.as_str()?.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
                }
            }
        )+
    };
}

text_column!(Role, Stage, FileKind, PendingKind);

fn conflict_or_database(err: rusqlite::Error, what: &str) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == rusqlite::ErrorCode::ConstraintViolation => {
            StorageError::Conflict(format!("{}: {}", what, err))
        }
        _ => StorageError::Database(err),
    }
}

const USER_COLUMNS: &str = "id, messenger_user_id, messenger_chat_id, full_name, congregation_id, \
                            join_congregation_id, role, stage, created_at";

const TERRITORY_COLUMNS: &str = "id, congregation_id, group_id, title, file_id, file_kind, \
                                 in_use_by_user_id, last_taken_at, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        messenger_user_id: row.get(1)?,
        messenger_chat_id: row.get(2)?,
        full_name: row.get(3)?,
        congregation_id: row.get(4)?,
        join_congregation_id: row.get(5)?,
        role: row.get(6)?,
        stage: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn territory_from_row(row: &Row<'_>) -> rusqlite::Result<Territory> {
    Ok(Territory {
        id: row.get(0)?,
        congregation_id: row.get(1)?,
        group_id: row.get(2)?,
        title: row.get(3)?,
        file_id: row.get(4)?,
        file_kind: row.get(5)?,
        in_use_by_user_id: row.get(6)?,
        last_taken_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<TerritoryGroup> {
    Ok(TerritoryGroup {
        id: row.get(0)?,
        congregation_id: row.get(1)?,
        title: row.get(2)?,
    })
}

/// Pending action as stored: the message list is still JSON.
struct PendingRow {
    id: String,
    kind: PendingKind,
    admin_messages: String,
    created_at: DateTime<Utc>,
}

impl PendingRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            admin_messages: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn decode(self) -> StorageResult<PendingAction> {
        let admin_messages: Vec<MessageRef> = serde_json::from_str(&self.admin_messages)?;
        Ok(PendingAction {
            id: self.id,
            kind: self.kind,
            admin_messages,
            created_at: self.created_at,
        })
    }
}

/// Storage gateway over a pooled SQLite database.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: Arc<DbPool>,
}

impl SqliteStorage {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Opens (and migrates) the database at `database_path`.
    pub fn open(database_path: &str) -> StorageResult<Self> {
        Ok(Self::new(Arc::new(create_pool(database_path)?)))
    }

    fn conn(&self) -> StorageResult<DbConnection> {
        Ok(get_connection(&self.pool)?)
    }
}

impl Storage for SqliteStorage {
    fn create_user(&self, user: &User) -> StorageResult<()> {
        if !user.is_consistent() {
            return Err(StorageError::Conflict(format!("user {} has a congregation but no role", user.id)));
        }
        let conn = self.conn()?;
        conn.execute(
            &format!("INSERT INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)", USER_COLUMNS),
            params![
                user.id,
                user.messenger_user_id,
                user.messenger_chat_id,
                user.full_name,
                user.congregation_id,
                user.join_congregation_id,
                user.role,
                user.stage,
                user.created_at,
            ],
        )
        .map_err(|e| conflict_or_database(e, "create user"))?;
        Ok(())
    }

    fn get_user(&self, filter: UserFilter<'_>) -> StorageResult<Option<User>> {
        let conn = self.conn()?;
        let user = match filter {
            UserFilter::Id(id) => conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                    params![id],
                    user_from_row,
                )
                .optional()?,
            UserFilter::MessengerUserId(messenger_user_id) => conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE messenger_user_id = ?1", USER_COLUMNS),
                    params![messenger_user_id],
                    user_from_row,
                )
                .optional()?,
            UserFilter::CongregationRole { congregation_id, role } => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM users WHERE congregation_id = ?1 AND role = ?2 ORDER BY created_at LIMIT 1",
                        USER_COLUMNS
                    ),
                    params![congregation_id, role],
                    user_from_row,
                )
                .optional()?,
        };
        Ok(user)
    }

    fn update_user(&self, user: &User) -> StorageResult<()> {
        if !user.is_consistent() {
            return Err(StorageError::Conflict(format!("user {} has a congregation but no role", user.id)));
        }
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE users SET messenger_chat_id = ?2, full_name = ?3, congregation_id = ?4, \
                 join_congregation_id = ?5, role = ?6, stage = ?7 WHERE id = ?1",
                params![
                    user.id,
                    user.messenger_chat_id,
                    user.full_name,
                    user.congregation_id,
                    user.join_congregation_id,
                    user.role,
                    user.stage,
                ],
            )
            .map_err(|e| conflict_or_database(e, "update user"))?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    fn list_users(&self, congregation_id: &str, role: Role) -> StorageResult<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE congregation_id = ?1 AND role = ?2 ORDER BY created_at",
            USER_COLUMNS
        ))?;
        let users = stmt
            .query_map(params![congregation_id, role], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn create_congregation(&self, name: &str) -> StorageResult<Congregation> {
        let congregation = Congregation {
            id: new_id(),
            name: name.trim().to_string(),
        };
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO congregations (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![congregation.id, congregation.name, Utc::now()],
        )
        .map_err(|e| conflict_or_database(e, "create congregation"))?;
        Ok(congregation)
    }

    fn get_congregation(&self, filter: CongregationFilter<'_>) -> StorageResult<Option<Congregation>> {
        let conn = self.conn()?;
        let (sql, value) = match filter {
            CongregationFilter::Id(id) => ("SELECT id, name FROM congregations WHERE id = ?1", id),
            CongregationFilter::Name(name) => ("SELECT id, name FROM congregations WHERE name = ?1", name),
        };
        let congregation = conn
            .query_row(sql, params![value], |row| {
                Ok(Congregation {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()?;
        Ok(congregation)
    }

    fn get_or_create_group(&self, congregation_id: &str, title: &str) -> StorageResult<TerritoryGroup> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO territory_groups (id, congregation_id, title, created_at) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (congregation_id, title) DO NOTHING",
            params![new_id(), congregation_id, title, Utc::now()],
        )?;
        let group = conn.query_row(
            "SELECT id, congregation_id, title FROM territory_groups WHERE congregation_id = ?1 AND title = ?2",
            params![congregation_id, title],
            group_from_row,
        )?;
        Ok(group)
    }

    fn get_group(&self, id: &str) -> StorageResult<Option<TerritoryGroup>> {
        let conn = self.conn()?;
        let group = conn
            .query_row(
                "SELECT id, congregation_id, title FROM territory_groups WHERE id = ?1",
                params![id],
                group_from_row,
            )
            .optional()?;
        Ok(group)
    }

    fn list_groups(&self, congregation_id: &str) -> StorageResult<Vec<TerritoryGroup>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, congregation_id, title FROM territory_groups WHERE congregation_id = ?1 ORDER BY title",
        )?;
        let groups = stmt
            .query_map(params![congregation_id], group_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    fn create_territory(&self, territory: &Territory) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO territories ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                TERRITORY_COLUMNS
            ),
            params![
                territory.id,
                territory.congregation_id,
                territory.group_id,
                territory.title,
                territory.file_id,
                territory.file_kind,
                territory.in_use_by_user_id,
                territory.last_taken_at,
                territory.created_at,
            ],
        )
        .map_err(|e| conflict_or_database(e, "create territory"))?;
        Ok(())
    }

    fn get_territory(&self, filter: TerritoryFilter<'_>) -> StorageResult<Option<Territory>> {
        let conn = self.conn()?;
        let territory = match filter {
            TerritoryFilter::Id(id) => conn
                .query_row(
                    &format!("SELECT {} FROM territories WHERE id = ?1", TERRITORY_COLUMNS),
                    params![id],
                    territory_from_row,
                )
                .optional()?,
            TerritoryFilter::Title {
                congregation_id,
                group_id,
                title,
            } => conn
                .query_row(
                    &format!(
                        "SELECT {} FROM territories WHERE congregation_id = ?1 AND group_id = ?2 AND title = ?3",
                        TERRITORY_COLUMNS
                    ),
                    params![congregation_id, group_id, title],
                    territory_from_row,
                )
                .optional()?,
        };
        Ok(territory)
    }

    fn list_territories(&self, query: &TerritoryQuery<'_>) -> StorageResult<Vec<Territory>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<&dyn ToSql> = Vec::new();

        if let Some(congregation_id) = &query.congregation_id {
            values.push(congregation_id);
            clauses.push(format!("congregation_id = ?{}", values.len()));
        }
        if let Some(group_id) = &query.group_id {
            values.push(group_id);
            clauses.push(format!("group_id = ?{}", values.len()));
        }
        if let Some(holder_id) = &query.holder_id {
            values.push(holder_id);
            clauses.push(format!("in_use_by_user_id = ?{}", values.len()));
        }
        match query.available {
            Some(true) => clauses.push("in_use_by_user_id IS NULL".to_string()),
            Some(false) => clauses.push("in_use_by_user_id IS NOT NULL".to_string()),
            None => {}
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM territories {} ORDER BY last_taken_at IS NOT NULL, last_taken_at, title",
            TERRITORY_COLUMNS, where_clause
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let territories = stmt
            .query_map(values.as_slice(), territory_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(territories)
    }

    fn update_territory(&self, territory: &Territory) -> StorageResult<()> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE territories SET congregation_id = ?2, group_id = ?3, title = ?4, file_id = ?5, \
                 file_kind = ?6, in_use_by_user_id = ?7, last_taken_at = ?8 WHERE id = ?1",
                params![
                    territory.id,
                    territory.congregation_id,
                    territory.group_id,
                    territory.title,
                    territory.file_id,
                    territory.file_kind,
                    territory.in_use_by_user_id,
                    territory.last_taken_at,
                ],
            )
            .map_err(|e| conflict_or_database(e, "update territory"))?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("territory {}", territory.id)));
        }
        Ok(())
    }

    fn set_territory_holder(
        &self,
        territory_id: &str,
        expected: Option<&str>,
        holder: Option<&str>,
        taken_at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE territories SET in_use_by_user_id = ?2, last_taken_at = ?3 \
             WHERE id = ?1 AND in_use_by_user_id IS ?4",
            params![territory_id, holder, taken_at, expected],
        )?;
        Ok(changed == 1)
    }

    fn add_note(&self, note: &TerritoryNote) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO territory_notes (id, territory_id, author_user_id, text, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![note.id, note.territory_id, note.author_user_id, note.text, note.created_at],
        )?;
        Ok(())
    }

    fn list_notes(&self, territory_id: &str) -> StorageResult<Vec<TerritoryNote>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, territory_id, author_user_id, text, created_at FROM territory_notes \
             WHERE territory_id = ?1 ORDER BY created_at, rowid",
        )?;
        let notes = stmt
            .query_map(params![territory_id], |row| {
                Ok(TerritoryNote {
                    id: row.get(0)?,
                    territory_id: row.get(1)?,
                    author_user_id: row.get(2)?,
                    text: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    fn create_pending_action(&self, action: &PendingAction) -> StorageResult<()> {
        let admin_messages = serde_json::to_string(&action.admin_messages)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO pending_actions (id, kind, admin_messages, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![action.id, action.kind, admin_messages, action.created_at],
        )
        .map_err(|e| conflict_or_database(e, "create pending action"))?;
        Ok(())
    }

    fn get_pending_action(&self, id: &str) -> StorageResult<Option<PendingAction>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, kind, admin_messages, created_at FROM pending_actions WHERE id = ?1",
                params![id],
                PendingRow::from_row,
            )
            .optional()?;
        row.map(PendingRow::decode).transpose()
    }

    fn take_pending_action(&self, id: &str) -> StorageResult<Option<PendingAction>> {
        let conn = self.conn()?;
        // One statement: the delete is the claim, RETURNING hands back what was claimed
        let row = conn
            .query_row(
                "DELETE FROM pending_actions WHERE id = ?1 RETURNING id, kind, admin_messages, created_at",
                params![id],
                PendingRow::from_row,
            )
            .optional()?;
        row.map(PendingRow::decode).transpose()
    }

    fn purge_pending_actions(&self, older_than: DateTime<Utc>) -> StorageResult<usize> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM pending_actions WHERE created_at < ?1", params![older_than])?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn storage() -> (TempDir, SqliteStorage) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sqlite");
        let storage = SqliteStorage::open(path.to_str().unwrap()).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_user_round_trip_by_messenger_id() {
        let (_dir, storage) = storage();
        let user = User::new(42, 4200);
        storage.create_user(&user).unwrap();

        let found = storage.get_user(UserFilter::MessengerUserId(42)).unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.stage, Stage::EnterFullName);
        assert_eq!(found.role, None);
        assert!(storage.get_user(UserFilter::MessengerUserId(43)).unwrap().is_none());
    }

    #[test]
    fn test_update_user_rejects_congregation_without_role() {
        let (_dir, storage) = storage();
        let congregation = storage.create_congregation("North").unwrap();
        let mut user = User::new(1, 1);
        storage.create_user(&user).unwrap();

        user.congregation_id = Some(congregation.id);
        assert!(matches!(storage.update_user(&user), Err(StorageError::Conflict(_))));
    }

    #[test]
    fn test_congregation_lookup_by_name_and_id() {
        let (_dir, storage) = storage();
        let created = storage.create_congregation("  Lviv Center ").unwrap();
        assert_eq!(created.name, "Lviv Center");

        let by_name = storage.get_congregation(CongregationFilter::Name("Lviv Center")).unwrap();
        let by_id = storage.get_congregation(CongregationFilter::Id(&created.id)).unwrap();
        assert_eq!(by_name, Some(created.clone()));
        assert_eq!(by_id, Some(created));
        assert!(matches!(
            storage.create_congregation("Lviv Center"),
            Err(StorageError::Conflict(_))
        ));
    }

    #[test]
    fn test_get_or_create_group_is_idempotent() {
        let (_dir, storage) = storage();
        let congregation = storage.create_congregation("North").unwrap();
        let first = storage.get_or_create_group(&congregation.id, "Lviv").unwrap();
        let second = storage.get_or_create_group(&congregation.id, "Lviv").unwrap();
        assert_eq!(first, second);
        assert_eq!(storage.list_groups(&congregation.id).unwrap().len(), 1);
    }

    #[test]
    fn test_list_territories_filters_and_orders() {
        let (_dir, storage) = storage();
        let congregation = storage.create_congregation("North").unwrap();
        let group = storage.get_or_create_group(&congregation.id, "Lviv").unwrap();
        let holder = User::new(7, 7);
        storage.create_user(&holder).unwrap();

        let mut old = Territory::new(&congregation.id, &group.id, "old", "f1", FileKind::Photo);
        old.last_taken_at = Some(Utc::now() - chrono::Duration::days(30));
        let fresh = Territory::new(&congregation.id, &group.id, "fresh", "f2", FileKind::Document);
        let mut held = Territory::new(&congregation.id, &group.id, "held", "f3", FileKind::Photo);
        held.in_use_by_user_id = Some(holder.id.clone());
        held.last_taken_at = Some(Utc::now());
        for territory in [&old, &fresh, &held] {
            storage.create_territory(territory).unwrap();
        }

        let all = storage
            .list_territories(&TerritoryQuery::in_congregation(&congregation.id))
            .unwrap();
        let titles: Vec<_> = all.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["fresh", "old", "held"]);

        let available = storage
            .list_territories(&TerritoryQuery::in_congregation(&congregation.id).available(Some(true)))
            .unwrap();
        assert_eq!(available.len(), 2);

        let mine = storage
            .list_territories(&TerritoryQuery::in_congregation(&congregation.id).held_by(&holder.id))
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].title, "held");
    }

    #[test]
    fn test_set_territory_holder_is_compare_and_swap() {
        let (_dir, storage) = storage();
        let congregation = storage.create_congregation("North").unwrap();
        let group = storage.get_or_create_group(&congregation.id, "Lviv").unwrap();
        let territory = Territory::new(&congregation.id, &group.id, "1", "f", FileKind::Photo);
        storage.create_territory(&territory).unwrap();

        assert!(storage
            .set_territory_holder(&territory.id, None, Some("u1"), Utc::now())
            .unwrap());
        assert!(!storage
            .set_territory_holder(&territory.id, None, Some("u2"), Utc::now())
            .unwrap());
        assert!(!storage
            .set_territory_holder(&territory.id, Some("u2"), None, Utc::now())
            .unwrap());
        assert!(storage
            .set_territory_holder(&territory.id, Some("u1"), None, Utc::now())
            .unwrap());

        let stored = storage.get_territory(TerritoryFilter::Id(&territory.id)).unwrap().unwrap();
        assert!(stored.is_available());
        assert!(stored.last_taken_at.is_some());
    }

    #[test]
    fn test_notes_are_listed_oldest_first() {
        let (_dir, storage) = storage();
        let congregation = storage.create_congregation("North").unwrap();
        let group = storage.get_or_create_group(&congregation.id, "Lviv").unwrap();
        let territory = Territory::new(&congregation.id, &group.id, "1", "f", FileKind::Photo);
        storage.create_territory(&territory).unwrap();

        storage.add_note(&TerritoryNote::new(&territory.id, "u1", "first")).unwrap();
        storage.add_note(&TerritoryNote::new(&territory.id, "u1", "second")).unwrap();

        let texts: Vec<_> = storage
            .list_notes(&territory.id)
            .unwrap()
            .into_iter()
            .map(|n| n.text)
            .collect();
        assert_eq!(texts, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_take_pending_action_returns_record_once() {
        let (_dir, storage) = storage();
        let action = PendingAction::new(
            "req-1",
            PendingKind::Take,
            vec![MessageRef::new(10, 1), MessageRef::new(20, 2)],
        );
        storage.create_pending_action(&action).unwrap();

        let peeked = storage.get_pending_action("req-1").unwrap().unwrap();
        assert_eq!(peeked.admin_messages, action.admin_messages);

        let taken = storage.take_pending_action("req-1").unwrap().unwrap();
        assert_eq!(taken.kind, PendingKind::Take);
        assert_eq!(taken.admin_messages.len(), 2);
        assert!(storage.take_pending_action("req-1").unwrap().is_none());
        assert!(storage.get_pending_action("req-1").unwrap().is_none());
    }

    #[test]
    fn test_purge_removes_only_expired_actions() {
        let (_dir, storage) = storage();
        let mut stale = PendingAction::new("old", PendingKind::Join, vec![MessageRef::new(1, 1)]);
        stale.created_at = Utc::now() - chrono::Duration::days(10);
        let fresh = PendingAction::new("new", PendingKind::Join, vec![MessageRef::new(1, 2)]);
        storage.create_pending_action(&stale).unwrap();
        storage.create_pending_action(&fresh).unwrap();

        let removed = storage
            .purge_pending_actions(Utc::now() - chrono::Duration::days(7))
            .unwrap();
        assert_eq!(removed, 1);
        assert!(storage.get_pending_action("new").unwrap().is_some());
    }
}
