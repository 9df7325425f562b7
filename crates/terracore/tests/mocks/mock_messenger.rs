//! Messenger that records calls instead of sending them

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use terracore::domain::MessageRef;
use terracore::workflow::transport::{
    Body, Keyboard, MessageEdit, Messenger, OutgoingMessage, TransportError, TransportResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send {
        chat_id: i64,
        message: OutgoingMessage,
        sent: MessageRef,
    },
    Edit {
        message: MessageRef,
        edit: MessageEdit,
    },
    Answer {
        callback_id: String,
        text: Option<String>,
    },
}

/// Records every call; sends to chats marked with [`fail_chat`] fail, as do
/// sends of files marked with [`fail_file`].
///
/// Like the Bot API, captions longer than 1024 UTF-16 units are rejected.
///
/// [`fail_chat`]: RecordingMessenger::fail_chat
/// [`fail_file`]: RecordingMessenger::fail_file
#[derive(Default)]
pub struct RecordingMessenger {
    calls: Mutex<Vec<Call>>,
    next_message_id: AtomicI32,
    failing_chats: Mutex<HashSet<i64>>,
    failing_files: Mutex<HashSet<String>>,
}

const CAPTION_LIMIT: usize = 1024;

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_chat(&self, chat_id: i64) {
        self.failing_chats.lock().unwrap().insert(chat_id);
    }

    pub fn fail_file(&self, file_id: &str) {
        self.failing_files.lock().unwrap().insert(file_id.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Messages sent to `chat_id`, with the reference they were given.
    pub fn sent_to(&self, chat_id: i64) -> Vec<(MessageRef, OutgoingMessage)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send {
                    chat_id: to,
                    message,
                    sent,
                } if to == chat_id => Some((sent, message)),
                _ => None,
            })
            .collect()
    }

    /// Body text (or caption) of the last message sent to `chat_id`.
    pub fn last_text_to(&self, chat_id: i64) -> Option<String> {
        self.sent_to(chat_id)
            .last()
            .map(|(_, message)| message.body.text().to_string())
    }

    pub fn last_sent_to(&self, chat_id: i64) -> Option<(MessageRef, OutgoingMessage)> {
        self.sent_to(chat_id).pop()
    }

    pub fn edits(&self) -> Vec<(MessageRef, MessageEdit)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Edit { message, edit } => Some((message, edit)),
                _ => None,
            })
            .collect()
    }

    pub fn answers(&self) -> Vec<(String, Option<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Answer { callback_id, text } => Some((callback_id, text)),
                _ => None,
            })
            .collect()
    }

    /// Inline button payloads of a message, row by row.
    pub fn payloads(message: &OutgoingMessage) -> Vec<String> {
        match &message.keyboard {
            Some(Keyboard::Inline(rows)) => rows.iter().flatten().map(|b| b.payload.clone()).collect(),
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, chat_id: i64, message: OutgoingMessage) -> TransportResult<MessageRef> {
        if self.failing_chats.lock().unwrap().contains(&chat_id) {
            return Err(TransportError::Rejected("Forbidden: bot was blocked by the user".to_string()));
        }
        if let Body::Photo { file_id, caption } | Body::Document { file_id, caption } = &message.body {
            if caption.encode_utf16().count() > CAPTION_LIMIT {
                return Err(TransportError::Rejected("Bad Request: message caption is too long".to_string()));
            }
            if self.failing_files.lock().unwrap().contains(file_id) {
                return Err(TransportError::Rejected("Bad Request: wrong file identifier".to_string()));
            }
        }
        let sent = MessageRef::new(chat_id, self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.calls.lock().unwrap().push(Call::Send {
            chat_id,
            message,
            sent,
        });
        Ok(sent)
    }

    async fn edit(&self, message: MessageRef, edit: MessageEdit) -> TransportResult<()> {
        self.calls.lock().unwrap().push(Call::Edit { message, edit });
        Ok(())
    }

    async fn answer_button(&self, callback_id: &str, text: Option<&str>) -> TransportResult<()> {
        self.calls.lock().unwrap().push(Call::Answer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }
}
