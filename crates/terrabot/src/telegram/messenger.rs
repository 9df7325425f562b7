//! [`Messenger`] backed by the Telegram Bot API.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, FileId, ForceReply, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton,
    KeyboardMarkup, KeyboardRemove, MessageId, ParseMode, ReplyMarkup,
};
use teloxide::RequestError;

use terracore::domain::MessageRef;
use terracore::workflow::transport::{
    Body, Button, EditTarget, Keyboard, MessageEdit, Messenger, OutgoingMessage, TransportError, TransportResult,
};

pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Network-level failures may succeed later; everything else is the
/// platform refusing the request.
pub fn transport_error(e: RequestError) -> TransportError {
    match e {
        RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_) => {
            TransportError::Request(e.to_string())
        }
        _ => TransportError::Rejected(e.to_string()),
    }
}

pub fn inline_markup(rows: Vec<Vec<Button>>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.into_iter().map(|row| {
        row.into_iter()
            .map(|button| InlineKeyboardButton::callback(button.label, button.payload))
            .collect::<Vec<_>>()
    }))
}

pub fn reply_markup(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Inline(rows) => ReplyMarkup::InlineKeyboard(inline_markup(rows)),
        Keyboard::Menu(rows) => ReplyMarkup::Keyboard(
            KeyboardMarkup::new(
                rows.into_iter()
                    .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()),
            )
            .resize_keyboard(),
        ),
        Keyboard::ForceReply => ReplyMarkup::ForceReply(ForceReply::new()),
        Keyboard::Remove => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, chat_id: i64, message: OutgoingMessage) -> TransportResult<MessageRef> {
        let chat = ChatId(chat_id);
        let markup = message.keyboard.map(reply_markup);

        let sent = match message.body {
            Body::Text(text) => {
                let mut request = self.bot.send_message(chat, text).parse_mode(ParseMode::Html);
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                request.await
            }
            Body::Photo { file_id, caption } => {
                let mut request = self
                    .bot
                    .send_photo(chat, InputFile::file_id(FileId(file_id)))
                    .caption(caption)
                    .parse_mode(ParseMode::Html);
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                request.await
            }
            Body::Document { file_id, caption } => {
                let mut request = self
                    .bot
                    .send_document(chat, InputFile::file_id(FileId(file_id)))
                    .caption(caption)
                    .parse_mode(ParseMode::Html);
                if let Some(markup) = markup {
                    request = request.reply_markup(markup);
                }
                request.await
            }
        }
        .map_err(transport_error)?;

        Ok(MessageRef::new(sent.chat.id.0, sent.id.0))
    }

    /// Leaving out `reply_markup` drops the inline keyboard of the edited message.
    async fn edit(&self, message: MessageRef, edit: MessageEdit) -> TransportResult<()> {
        let chat = ChatId(message.chat_id);
        let message_id = MessageId(message.message_id);

        let result = match edit.target {
            EditTarget::Text => self
                .bot
                .edit_message_text(chat, message_id, edit.text)
                .parse_mode(ParseMode::Html)
                .await
                .map(|_| ()),
            EditTarget::Caption => self
                .bot
                .edit_message_caption(chat, message_id)
                .caption(edit.text)
                .parse_mode(ParseMode::Html)
                .await
                .map(|_| ()),
        };
        result.map_err(transport_error)
    }

    async fn answer_button(&self, callback_id: &str, text: Option<&str>) -> TransportResult<()> {
        let mut request = self.bot.answer_callback_query(CallbackQueryId(callback_id.to_string()));
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await.map(|_| ()).map_err(transport_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    #[test]
    fn inline_rows_keep_order_and_payloads() {
        let markup = inline_markup(vec![
            vec![Button::new("✅ Approve", "1:ja"), Button::new("❌ Reject", "1:jr")],
            vec![Button::new("Lviv", "1:g:abc")],
        ]);

        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0][1].text, "❌ Reject");
        assert_eq!(
            markup.inline_keyboard[1][0].kind,
            InlineKeyboardButtonKind::CallbackData("1:g:abc".to_string())
        );
    }

    #[test]
    fn menu_keyboard_is_resized_reply_keyboard() {
        let markup = reply_markup(Keyboard::Menu(vec![vec!["🗺 Territories".to_string()]]));

        match markup {
            ReplyMarkup::Keyboard(keyboard) => {
                assert_eq!(keyboard.keyboard[0][0].text, "🗺 Territories");
                assert!(keyboard.resize_keyboard);
            }
            other => panic!("unexpected markup {:?}", other),
        }
    }

    #[test]
    fn network_failures_map_to_request_errors() {
        let rejected = transport_error(RequestError::MigrateToChatId(ChatId(-100)));
        assert!(matches!(rejected, TransportError::Rejected(_)));

        let io = transport_error(RequestError::Io(std::io::Error::other("reset").into()));
        assert!(matches!(io, TransportError::Request(_)));
    }
}
