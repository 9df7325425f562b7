//! Telegram adapter: bot setup, update conversion, outbound messenger,
//! and the dispatcher schema.

pub mod bot;
pub mod inbound;
pub mod messenger;
pub mod schema;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use messenger::TelegramMessenger;
pub use schema::{schema, HandlerDeps, HandlerError};
