//! Storage gateway: the trait the workflow consumes and its SQLite backend

pub mod db;
pub mod gateway;
pub mod migrations;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool, SqliteStorage};
pub use gateway::{
    CongregationFilter, Storage, StorageError, StorageResult, TerritoryFilter, TerritoryQuery, UserFilter,
};
