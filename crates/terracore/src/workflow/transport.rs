//! Messaging transport contract.
//!
//! The workflow talks to the chat platform only through [`Messenger`] and
//! only hears from it through [`InboundEvent`]. The bot binary adapts the
//! Telegram Bot API to both.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{FileKind, MessageRef};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not reach the platform (network, timeout).
    #[error("request failed: {0}")]
    Request(String),

    /// The platform answered with an error (blocked bot, unknown chat, ...).
    #[error("rejected by platform: {0}")]
    Rejected(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Photo { file_id: String, caption: String },
    Document { file_id: String, caption: String },
}

impl Body {
    /// Sends a stored territory file with the given caption.
    pub fn file(kind: FileKind, file_id: impl Into<String>, caption: impl Into<String>) -> Self {
        match kind {
            FileKind::Photo => Body::Photo {
                file_id: file_id.into(),
                caption: caption.into(),
            },
            FileKind::Document => Body::Document {
                file_id: file_id.into(),
                caption: caption.into(),
            },
        }
    }

    /// Text or caption, whichever the body carries.
    pub fn text(&self) -> &str {
        match self {
            Body::Text(text) => text,
            Body::Photo { caption, .. } | Body::Document { caption, .. } => caption,
        }
    }
}

/// An inline button: label shown to the user, short opaque payload sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// Buttons attached to the message.
    Inline(Vec<Vec<Button>>),
    /// Persistent reply keyboard; pressing a label sends it as text.
    Menu(Vec<Vec<String>>),
    /// Asks the client to open a reply to this message.
    ForceReply,
    /// Hides a previously shown reply keyboard.
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub body: Body,
    pub keyboard: Option<Keyboard>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            body: Body::Text(text.into()),
            keyboard: None,
        }
    }

    pub fn new(body: Body) -> Self {
        Self { body, keyboard: None }
    }

    #[must_use]
    pub fn keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    #[must_use]
    pub fn inline(self, rows: Vec<Vec<Button>>) -> Self {
        self.keyboard(Keyboard::Inline(rows))
    }
}

/// Which part of a sent message to replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Text,
    Caption,
}

/// Replaces the text or caption of a sent message and clears its inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEdit {
    pub target: EditTarget,
    pub text: String,
}

impl MessageEdit {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            target: EditTarget::Text,
            text: text.into(),
        }
    }

    pub fn caption(caption: impl Into<String>) -> Self {
        Self {
            target: EditTarget::Caption,
            text: caption.into(),
        }
    }
}

/// Outbound half of the transport. All text is HTML.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, chat_id: i64, message: OutgoingMessage) -> TransportResult<MessageRef>;

    async fn edit(&self, message: MessageRef, edit: MessageEdit) -> TransportResult<()>;

    /// Stops the client-side loading indicator of a button press.
    async fn answer_button(&self, callback_id: &str, text: Option<&str>) -> TransportResult<()>;
}

/// Who sent an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user_id: i64,
    pub chat_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub sender: Sender,
    /// The message this update is (or, for a button, is attached to).
    pub message: Option<MessageRef>,
    pub kind: InboundKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    /// `/start`, with the deep-link payload if any.
    Start { payload: Option<String> },
    Text {
        text: String,
        /// Hidden link of the message this one replies to.
        reply_link: Option<String>,
    },
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    Document {
        file_id: String,
        caption: Option<String>,
    },
    Button {
        callback_id: String,
        payload: String,
        /// Hidden link of the message the button is attached to.
        hidden_link: Option<String>,
    },
}

impl InboundEvent {
    pub fn callback_id(&self) -> Option<&str> {
        match &self.kind {
            InboundKind::Button { callback_id, .. } => Some(callback_id),
            _ => None,
        }
    }
}
