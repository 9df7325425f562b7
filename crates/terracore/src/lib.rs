//! Terracore - territory distribution for congregations
//!
//! Everything the bot does except talking to Telegram: the domain model,
//! the storage gateway and its SQLite backend, message copy, and the
//! conversation workflow with its admin approval protocol.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, retry helpers
//! - `domain`: users, congregations, territories, notes, pending actions
//! - `storage`: storage gateway trait, SQLite implementation, migrations
//! - `i18n`: Fluent message lookup
//! - `provisioning`: out-of-band setup of congregations and admins
//! - `workflow`: stage machine, approval protocol, button router, engine

pub mod core;
pub mod domain;
pub mod i18n;
pub mod provisioning;
pub mod storage;
pub mod workflow;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use storage::{create_pool, get_connection, DbConnection, DbPool, SqliteStorage, Storage};
pub use workflow::{Engine, InboundEvent, Messenger, Workflow};
