//! Test fixtures for workflow tests
//!
//! Provides TestEnvironment that sets up everything a scenario needs:
//! - SQLite store in a temporary directory
//! - Recording messenger
//! - Workflow and engine wired to both

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use terracore::domain::{Congregation, FileKind, MessageRef, Role, Territory, User};
use terracore::i18n::lang_from_code;
use terracore::storage::{SqliteStorage, Storage, TerritoryFilter, UserFilter};
use terracore::workflow::transport::{InboundEvent, InboundKind};
use terracore::workflow::{Engine, Workflow};

use super::helpers::{press_event, sender};
use crate::mocks::RecordingMessenger;

/// Complete environment for workflow scenarios
///
/// # Example
/// ```ignore
/// let env = TestEnvironment::new();
/// env.start(42, None).await;
/// assert_eq!(env.user(42).stage, Stage::EnterFullName);
/// ```
pub struct TestEnvironment {
    _dir: TempDir,
    pub storage: Arc<SqliteStorage>,
    pub messenger: Arc<RecordingMessenger>,
    pub engine: Arc<Engine>,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self::with_messenger(Arc::new(RecordingMessenger::new()))
    }

    pub fn with_messenger(messenger: Arc<RecordingMessenger>) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("territory.sqlite");
        let storage = Arc::new(SqliteStorage::open(path.to_str().expect("utf-8 path")).expect("open storage"));

        let workflow = Workflow::new(storage.clone(), messenger.clone(), lang_from_code("en"));
        let engine = Arc::new(Engine::new(Arc::new(workflow), Duration::from_secs(10)));

        Self {
            _dir: dir,
            storage,
            messenger,
            engine,
        }
    }

    pub fn congregation(&self, name: &str) -> Congregation {
        self.storage.create_congregation(name).expect("create congregation")
    }

    /// A registered member sitting at the menu.
    pub fn member(&self, user_id: i64, name: &str, congregation: &Congregation, role: Role) -> User {
        let mut user = User::new(user_id, user_id);
        user.full_name = name.to_string();
        user.join(congregation.id.clone(), role);
        self.storage.create_user(&user).expect("create member");
        user
    }

    pub fn territory(&self, congregation: &Congregation, group: &str, title: &str) -> Territory {
        let group = self
            .storage
            .get_or_create_group(&congregation.id, group)
            .expect("create group");
        let territory = Territory::new(
            &congregation.id,
            &group.id,
            title,
            format!("file-{}", title),
            FileKind::Photo,
        );
        self.storage.create_territory(&territory).expect("create territory");
        territory
    }

    pub fn user(&self, user_id: i64) -> User {
        self.storage
            .get_user(UserFilter::MessengerUserId(user_id))
            .expect("query user")
            .expect("user exists")
    }

    pub fn reload(&self, territory: &Territory) -> Territory {
        self.storage
            .get_territory(TerritoryFilter::Id(&territory.id))
            .expect("query territory")
            .expect("territory exists")
    }

    pub async fn start(&self, user_id: i64, payload: Option<&str>) {
        self.engine
            .handle(InboundEvent {
                sender: sender(user_id),
                message: None,
                kind: InboundKind::Start {
                    payload: payload.map(str::to_string),
                },
            })
            .await;
    }

    pub async fn text(&self, user_id: i64, text: &str) {
        self.reply(user_id, text, None).await;
    }

    pub async fn reply(&self, user_id: i64, text: &str, reply_link: Option<String>) {
        self.engine
            .handle(InboundEvent {
                sender: sender(user_id),
                message: None,
                kind: InboundKind::Text {
                    text: text.to_string(),
                    reply_link,
                },
            })
            .await;
    }

    pub async fn photo(&self, user_id: i64, file_id: &str, caption: Option<&str>) {
        self.engine
            .handle(InboundEvent {
                sender: sender(user_id),
                message: None,
                kind: InboundKind::Photo {
                    file_id: file_id.to_string(),
                    caption: caption.map(str::to_string),
                },
            })
            .await;
    }

    pub async fn press(&self, user_id: i64, pressed: MessageRef, payload: &str, link: Option<String>) {
        self.engine.handle(press_event(user_id, pressed, payload, link)).await;
    }
}
