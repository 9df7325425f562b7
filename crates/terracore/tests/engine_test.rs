//! Per-update boundary: panics and timeouts never escape, presses are
//! always answered
//!
//! Run with: cargo test -p terracore --test engine_test

mod common;
mod mocks;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use terracore::domain::{MessageRef, Role, User};
use terracore::i18n::lang_from_code;
use terracore::storage::{SqliteStorage, Storage};
use terracore::workflow::transport::{MessageEdit, Messenger, OutgoingMessage, TransportResult};
use terracore::workflow::{Engine, Workflow};

use common::press_event;
use mocks::RecordingMessenger;

/// Panics on every send; records edits and answers.
struct PanicOnSend {
    inner: RecordingMessenger,
    send_delay: Option<Duration>,
}

#[async_trait]
impl Messenger for PanicOnSend {
    async fn send(&self, chat_id: i64, message: OutgoingMessage) -> TransportResult<MessageRef> {
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
            return self.inner.send(chat_id, message).await;
        }
        panic!("send exploded for chat {}", chat_id);
    }

    async fn edit(&self, message: MessageRef, edit: MessageEdit) -> TransportResult<()> {
        self.inner.edit(message, edit).await
    }

    async fn answer_button(&self, callback_id: &str, text: Option<&str>) -> TransportResult<()> {
        self.inner.answer_button(callback_id, text).await
    }
}

fn engine(messenger: Arc<PanicOnSend>, timeout: Duration) -> (tempfile::TempDir, Arc<SqliteStorage>, Engine) {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(SqliteStorage::open(dir.path().join("engine.sqlite").to_str().unwrap()).unwrap());
    let workflow = Workflow::new(storage.clone(), messenger, lang_from_code("en"));
    (dir, storage, Engine::new(Arc::new(workflow), timeout))
}

fn seed_member(storage: &SqliteStorage) -> String {
    let congregation = storage.create_congregation("North").unwrap();
    let group = storage.get_or_create_group(&congregation.id, "Lviv").unwrap();
    storage
        .create_territory(&terracore::domain::Territory::new(
            &congregation.id,
            &group.id,
            "1",
            "file",
            terracore::domain::FileKind::Photo,
        ))
        .unwrap();
    let mut user = User::new(200, 200);
    user.full_name = "Anna".to_string();
    user.join(congregation.id, Role::Publisher);
    storage.create_user(&user).unwrap();
    group.id
}

#[tokio::test]
async fn handler_panic_is_contained_and_press_still_answered() {
    let messenger = Arc::new(PanicOnSend {
        inner: RecordingMessenger::new(),
        send_delay: None,
    });
    let (_dir, storage, engine) = engine(messenger.clone(), Duration::from_secs(5));
    let group_id = seed_member(&storage);

    engine
        .handle(press_event(200, MessageRef::new(200, 1), &format!("1:g:{}", group_id), None))
        .await;

    assert_eq!(messenger.inner.answers(), vec![("cb-200-1".to_string(), None)]);
}

#[tokio::test]
async fn slow_handler_times_out_and_press_still_answered() {
    let messenger = Arc::new(PanicOnSend {
        inner: RecordingMessenger::new(),
        send_delay: Some(Duration::from_millis(500)),
    });
    let (_dir, storage, engine) = engine(messenger.clone(), Duration::from_millis(50));
    let group_id = seed_member(&storage);

    engine
        .handle(press_event(200, MessageRef::new(200, 2), &format!("1:g:{}", group_id), None))
        .await;

    assert_eq!(messenger.inner.answers(), vec![("cb-200-2".to_string(), None)]);
    assert!(storage
        .get_user(terracore::storage::UserFilter::MessengerUserId(200))
        .unwrap()
        .is_some());
}
