//! Conversion of Telegram updates into workflow events.

use teloxide::types::{CallbackQuery, Message, MessageEntity, MessageEntityKind, User};

use terracore::domain::MessageRef;
use terracore::workflow::transport::{InboundEvent, InboundKind, Sender};

/// First hidden link among the entities, if any.
pub fn hidden_link(entities: Option<&[MessageEntity]>) -> Option<String> {
    entities?.iter().find_map(|entity| match &entity.kind {
        MessageEntityKind::TextLink { url } => Some(url.to_string()),
        _ => None,
    })
}

/// Hidden link of a message, looking at text entities then caption entities.
pub fn message_link(msg: &Message) -> Option<String> {
    hidden_link(msg.entities()).or_else(|| hidden_link(msg.caption_entities()))
}

pub fn sender_of(user: &User, chat_id: i64) -> Sender {
    Sender {
        user_id: user.id.0 as i64,
        chat_id,
    }
}

fn message_ref(msg: &Message) -> MessageRef {
    MessageRef::new(msg.chat.id.0, msg.id.0)
}

/// `/start` with its deep-link payload.
pub fn start_event(msg: &Message, payload: Option<String>) -> Option<InboundEvent> {
    let user = msg.from.as_ref()?;
    Some(InboundEvent {
        sender: sender_of(user, msg.chat.id.0),
        message: Some(message_ref(msg)),
        kind: InboundKind::Start { payload },
    })
}

/// Text, photo and document messages. Anything else (stickers, service
/// messages, anonymous senders) yields `None`.
pub fn message_event(msg: &Message) -> Option<InboundEvent> {
    let user = msg.from.as_ref()?;

    let kind = if let Some(text) = msg.text() {
        InboundKind::Text {
            text: text.to_string(),
            reply_link: msg.reply_to_message().and_then(message_link),
        }
    } else if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        InboundKind::Photo {
            file_id: photo.file.id.0.clone(),
            caption: msg.caption().map(str::to_string),
        }
    } else if let Some(document) = msg.document() {
        InboundKind::Document {
            file_id: document.file.id.0.clone(),
            caption: msg.caption().map(str::to_string),
        }
    } else {
        return None;
    };

    Some(InboundEvent {
        sender: sender_of(user, msg.chat.id.0),
        message: Some(message_ref(msg)),
        kind,
    })
}

/// Inline button press. A press without data yields `None`; the caller
/// still has to answer it.
pub fn callback_event(q: &CallbackQuery) -> Option<InboundEvent> {
    let payload = q.data.clone()?;
    let pressed = q.regular_message();
    let chat_id = pressed.map(|m| m.chat.id.0).unwrap_or(q.from.id.0 as i64);

    Some(InboundEvent {
        sender: sender_of(&q.from, chat_id),
        message: pressed.map(message_ref),
        kind: InboundKind::Button {
            callback_id: q.id.0.clone(),
            payload,
            hidden_link: pressed.and_then(message_link),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::{CallbackQueryId, UserId};

    fn user(id: u64) -> User {
        User {
            id: UserId(id),
            is_bot: false,
            first_name: "Olena".to_string(),
            last_name: Some("Koval".to_string()),
            username: Some("olena".to_string()),
            language_code: None,
            is_premium: false,
            added_to_attachment_menu: false,
        }
    }

    fn press(data: Option<&str>) -> CallbackQuery {
        CallbackQuery {
            id: CallbackQueryId("cb-1".to_string()),
            from: user(77),
            message: None,
            inline_message_id: None,
            chat_instance: "chat-instance".to_string(),
            data: data.map(str::to_string),
            game_short_name: None,
        }
    }

    fn link_entity(url: &str) -> MessageEntity {
        MessageEntity::text_link(url::Url::parse(url).unwrap(), 0, 1)
    }

    #[test]
    fn finds_the_first_text_link() {
        let entities = vec![
            MessageEntity::bold(1, 4),
            link_entity("tg://btn/1/j/p1/r1"),
            link_entity("https://example.org/"),
        ];

        assert_eq!(hidden_link(Some(&entities)), Some("tg://btn/1/j/p1/r1".to_string()));
    }

    #[test]
    fn no_entities_no_link() {
        assert_eq!(hidden_link(None), None);
        assert_eq!(hidden_link(Some(&[MessageEntity::bold(0, 3)])), None);
    }

    #[test]
    fn sender_takes_ids_from_user_and_chat() {
        let sender = sender_of(&user(77), -100);
        assert_eq!(sender, Sender { user_id: 77, chat_id: -100 });
    }

    #[test]
    fn press_without_data_has_no_event() {
        assert_eq!(callback_event(&press(None)), None);
    }

    #[test]
    fn press_without_message_answers_in_private_chat() {
        let event = callback_event(&press(Some("1:menu"))).unwrap();
        assert_eq!(event.sender.chat_id, 77);
        assert_eq!(event.message, None);
        assert_eq!(
            event.kind,
            InboundKind::Button {
                callback_id: "cb-1".to_string(),
                payload: "1:menu".to_string(),
                hidden_link: None,
            }
        );
    }
}
