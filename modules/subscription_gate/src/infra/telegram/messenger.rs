use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::{ApiError, RequestError};
use tracing::debug;

use super::keyboard::inline_keyboard;
use crate::contract::{ConversationId, MessageRef, Screen, TransportError};
use crate::domain::menu::{MenuRenderer, TextFormat};
use crate::domain::ports::Messenger;

impl From<RequestError> for TransportError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Api(e) => TransportError::api(e.to_string()),
            RequestError::RetryAfter(after) => {
                TransportError::rate_limited(format!("retry after {}s", after.seconds()))
            }
            RequestError::Network(e) => TransportError::network(e.to_string()),
            other => TransportError::other(other.to_string()),
        }
    }
}

fn parse_mode(format: TextFormat) -> Option<ParseMode> {
    match format {
        TextFormat::Plain => None,
        TextFormat::Html => Some(ParseMode::Html),
    }
}

pub struct TelegramMessenger {
    bot: Bot,
    renderer: MenuRenderer,
}

impl TelegramMessenger {
    pub fn new(bot: Bot, renderer: MenuRenderer) -> Self {
        Self { bot, renderer }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_screen(
        &self,
        chat: ConversationId,
        screen: &Screen,
    ) -> Result<(), TransportError> {
        let rendered = self.renderer.render(screen);
        let mut request = self.bot.send_message(ChatId(chat.0), rendered.text);
        if let Some(mode) = parse_mode(rendered.format) {
            request = request.parse_mode(mode);
        }
        if !rendered.rows.is_empty() {
            request = request.reply_markup(inline_keyboard(&rendered.rows));
        }
        request.await?;
        Ok(())
    }

    async fn edit_screen(&self, message: MessageRef, screen: &Screen) -> Result<(), TransportError> {
        let rendered = self.renderer.render(screen);
        let keyboard = if rendered.rows.is_empty() {
            InlineKeyboardMarkup::default()
        } else {
            inline_keyboard(&rendered.rows)
        };
        let mut request = self
            .bot
            .edit_message_text(
                ChatId(message.chat.0),
                MessageId(message.message_id),
                rendered.text,
            )
            .reply_markup(keyboard);
        if let Some(mode) = parse_mode(rendered.format) {
            request = request.parse_mode(mode);
        }
        match request.await {
            Ok(_) => Ok(()),
            // Same button pressed twice: the message already shows this screen.
            Err(RequestError::Api(ApiError::MessageNotModified)) => {
                debug!(screen = screen.kind(), "message already up to date");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn answer_callback(
        &self,
        query_id: &str,
        alert: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut request = self.bot.answer_callback_query(query_id);
        if let Some(text) = alert {
            request = request.text(text).show_alert(true);
        }
        request.await?;
        Ok(())
    }
}
