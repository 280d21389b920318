use std::sync::Arc;

use teloxide::prelude::*;
use tracing::debug;

use super::schema::Command;
use crate::contract::{CallbackAction, CallbackEvent, ConversationId, MessageRef, StartEvent, User};
use crate::domain::service::Service;

pub(crate) fn to_user(user: &teloxide::types::User) -> User {
    User {
        id: crate::contract::UserId(user.id.0),
        display_name: Some(user.first_name.clone()),
        username: user.username.clone(),
    }
}

fn to_message_ref(message: &Message) -> MessageRef {
    MessageRef {
        chat: ConversationId(message.chat.id.0),
        message_id: message.id.0,
    }
}

pub async fn on_command(msg: Message, cmd: Command, service: Arc<Service>) -> anyhow::Result<()> {
    let chat = ConversationId(msg.chat.id.0);
    match cmd {
        Command::Start => {
            let Some(from) = msg.from.as_ref() else {
                debug!(chat = chat.0, "/start without sender, ignoring");
                return Ok(());
            };
            service
                .handle_start(StartEvent {
                    user: to_user(from),
                    chat,
                })
                .await;
        }
        Command::Help => service.handle_help(chat).await,
    }
    Ok(())
}

pub async fn on_callback(q: CallbackQuery, service: Arc<Service>) -> anyhow::Result<()> {
    let data = q.data.as_deref().unwrap_or_default();
    match data.parse::<CallbackAction>() {
        Ok(action) => {
            service
                .handle_callback(CallbackEvent {
                    query_id: q.id.clone(),
                    user: to_user(&q.from),
                    // Inaccessible messages (too old, deleted) cannot be edited.
                    message: q.regular_message().map(to_message_ref),
                    action,
                })
                .await;
        }
        Err(err) => service.handle_unknown_callback(&q.id, &err).await,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_conversion_keeps_name_and_handle() {
        let tg: teloxide::types::User = serde_json::from_value(serde_json::json!({
            "id": 4242,
            "is_bot": false,
            "first_name": "Анна",
            "username": "anna_om"
        }))
        .unwrap();

        let user = to_user(&tg);
        assert_eq!(user.id, crate::contract::UserId(4242));
        assert_eq!(user.greeting_name(), "Анна");
        assert_eq!(user.username.as_deref(), Some("anna_om"));
    }
}
