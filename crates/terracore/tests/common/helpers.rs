//! Event builders and small parsing helpers

#![allow(dead_code)]

use terracore::domain::MessageRef;
use terracore::workflow::transport::{InboundEvent, InboundKind, Sender};

/// Tests use the messenger user ID as the private chat ID.
pub fn sender(user_id: i64) -> Sender {
    Sender {
        user_id,
        chat_id: user_id,
    }
}

pub fn press_event(user_id: i64, pressed: MessageRef, payload: &str, link: Option<String>) -> InboundEvent {
    InboundEvent {
        sender: sender(user_id),
        message: Some(pressed),
        kind: InboundKind::Button {
            callback_id: format!("cb-{}-{}", user_id, pressed.message_id),
            payload: payload.to_string(),
            hidden_link: link,
        },
    }
}

/// The `href` of the hidden link at the start of an HTML body.
pub fn hidden_link(html: &str) -> Option<String> {
    let rest = html.strip_prefix("<a href=\"")?;
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}
