//! Conversation workflow: the per-user stage machine, the admin approval
//! protocol and the inline-button router.
//!
//! [`Workflow`] holds no per-user state; every update reloads what it needs
//! from [`Storage`] and writes it back before replying. [`engine::Engine`] is
//! the per-update boundary that turns handler outcomes into replies.

pub mod approval;
pub mod callback;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod menu;
pub mod messages;
pub mod router;
pub mod territories;
pub mod token;
pub mod transport;

use std::sync::Arc;

use unic_langid::LanguageIdentifier;

use crate::domain::{MessageRef, User};
use crate::storage::{Storage, UserFilter};

pub use callback::ButtonAction;
pub use engine::Engine;
pub use error::{Refusal, WorkflowError, WorkflowResult};
pub use token::CorrelationToken;
pub use transport::{InboundEvent, InboundKind, Messenger, OutgoingMessage, Sender};

/// Handlers of every supported flow, over a storage gateway and a messenger.
pub struct Workflow {
    storage: Arc<dyn Storage>,
    messenger: Arc<dyn Messenger>,
    lang: LanguageIdentifier,
}

impl Workflow {
    pub fn new(storage: Arc<dyn Storage>, messenger: Arc<dyn Messenger>, lang: LanguageIdentifier) -> Self {
        Self {
            storage,
            messenger,
            lang,
        }
    }

    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.messenger
    }

    pub fn lang(&self) -> &LanguageIdentifier {
        &self.lang
    }

    async fn send(&self, chat_id: i64, message: OutgoingMessage) -> WorkflowResult<MessageRef> {
        Ok(self.messenger.send(chat_id, message).await?)
    }

    async fn say(&self, chat_id: i64, text: impl Into<String>) -> WorkflowResult<MessageRef> {
        self.send(chat_id, OutgoingMessage::text(text)).await
    }

    fn find_user(&self, messenger_user_id: i64) -> WorkflowResult<Option<User>> {
        Ok(self.storage.get_user(UserFilter::MessengerUserId(messenger_user_id))?)
    }

    fn require_user(&self, messenger_user_id: i64) -> WorkflowResult<User> {
        self.find_user(messenger_user_id)?
            .ok_or_else(|| Refusal::UserNotFound.into())
    }
}

/// Congregation of a member, or `NotRegistered`.
fn congregation_of(user: &User) -> WorkflowResult<&str> {
    match (&user.role, &user.congregation_id) {
        (Some(_), Some(congregation_id)) => Ok(congregation_id),
        _ => Err(Refusal::NotRegistered.into()),
    }
}
