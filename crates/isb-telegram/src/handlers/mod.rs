//! Telegram update handlers.
//!
//! Each handler converts the teloxide update into an [`IncomingUpdate`] and
//! hands it to the core conversation. Senders are identified by the private
//! chat they write from.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Chat, Message, User},
};

use isb_core::{
    domain::{ChatId, Identity},
    messaging::types::{self, IncomingUpdate, OtherMessage, ReplyTarget, TextMessage},
};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    state.conversation.handle(message_update(&msg)).await;
    Ok(())
}

pub async fn handle_callback(q: CallbackQuery, state: Arc<AppState>) -> ResponseResult<()> {
    state.conversation.handle(callback_update(&q)).await;
    Ok(())
}

pub fn identity_of(chat: &Chat) -> Identity {
    Identity {
        id: chat.id.0,
        first_name: chat.first_name().map(str::to_string),
        last_name: chat.last_name().map(str::to_string),
        user_name: chat.username().map(str::to_string),
    }
}

fn identity_of_user(user: &User) -> Identity {
    Identity {
        id: user.id.0 as i64,
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
        user_name: user.username.clone(),
    }
}

pub fn message_update(msg: &Message) -> IncomingUpdate {
    let chat_id = ChatId(msg.chat.id.0);
    let sender = identity_of(&msg.chat);

    let Some(text) = msg.text() else {
        return IncomingUpdate::Other(OtherMessage { chat_id, sender });
    };

    let reply_to = msg.reply_to_message().and_then(|r| {
        Some(ReplyTarget {
            text: r.text()?.to_string(),
            from_bot: r.from().map(|u| u.is_bot).unwrap_or(false),
        })
    });

    let message = TextMessage {
        chat_id,
        sender,
        text: text.to_string(),
        reply_to,
    };
    if text.starts_with('/') {
        IncomingUpdate::Command(message)
    } else {
        IncomingUpdate::Text(message)
    }
}

pub fn callback_update(q: &CallbackQuery) -> IncomingUpdate {
    // Button presses come from the chat the keyboard was sent to; fall back to
    // the pressing user when Telegram omits the message.
    let sender = match &q.message {
        Some(m) => identity_of(&m.chat),
        None => identity_of_user(&q.from),
    };

    IncomingUpdate::Callback(types::CallbackQuery {
        chat_id: ChatId(sender.id),
        sender,
        callback_id: q.id.clone(),
        data: q.data.clone().unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(json: serde_json::Value) -> Message {
        serde_json::from_value(json).unwrap()
    }

    fn private_chat() -> serde_json::Value {
        serde_json::json!({"id": 42, "type": "private", "first_name": "Ann", "username": "ann"})
    }

    fn user(id: u64, is_bot: bool) -> serde_json::Value {
        serde_json::json!({"id": id, "is_bot": is_bot, "first_name": "Someone"})
    }

    #[test]
    fn commands_and_texts_are_split_on_slash() {
        let cmd = message(serde_json::json!({
            "message_id": 1, "date": 0, "chat": private_chat(),
            "from": user(42, false), "text": "/start"
        }));
        let IncomingUpdate::Command(m) = message_update(&cmd) else {
            panic!("expected a command");
        };
        assert_eq!(m.sender.id, 42);
        assert_eq!(m.sender.first_name.as_deref(), Some("Ann"));
        assert_eq!(m.sender.user_name.as_deref(), Some("ann"));

        let txt = message(serde_json::json!({
            "message_id": 2, "date": 0, "chat": private_chat(),
            "from": user(42, false), "text": "привет"
        }));
        assert!(matches!(message_update(&txt), IncomingUpdate::Text(_)));
    }

    #[test]
    fn replies_carry_the_prompt_text() {
        let reply = message(serde_json::json!({
            "message_id": 3, "date": 0, "chat": private_chat(),
            "from": user(42, false), "text": "99",
            "reply_to_message": {
                "message_id": 2, "date": 0, "chat": private_chat(),
                "from": user(7, true), "text": "prompt"
            }
        }));
        let IncomingUpdate::Text(m) = message_update(&reply) else {
            panic!("expected text");
        };
        assert_eq!(
            m.reply_to,
            Some(ReplyTarget {
                text: "prompt".to_string(),
                from_bot: true
            })
        );
    }

    #[test]
    fn non_text_messages_are_other() {
        let location = message(serde_json::json!({
            "message_id": 4, "date": 0, "chat": private_chat(),
            "from": user(42, false),
            "location": {"longitude": 1.0, "latitude": 2.0}
        }));
        assert!(matches!(message_update(&location), IncomingUpdate::Other(_)));
    }

    #[test]
    fn callbacks_come_from_the_keyboard_chat() {
        let q: CallbackQuery = serde_json::from_value(serde_json::json!({
            "id": "cb-1", "from": user(42, false), "chat_instance": "ci",
            "data": "start_1",
            "message": {
                "message_id": 5, "date": 0, "chat": private_chat(),
                "from": user(7, true), "text": "menu"
            }
        }))
        .unwrap();
        let IncomingUpdate::Callback(cb) = callback_update(&q) else {
            panic!("expected a callback");
        };
        assert_eq!(cb.chat_id, ChatId(42));
        assert_eq!(cb.data, "start_1");

        let bare: CallbackQuery = serde_json::from_value(serde_json::json!({
            "id": "cb-2", "from": user(77, false), "chat_instance": "ci"
        }))
        .unwrap();
        let IncomingUpdate::Callback(cb) = callback_update(&bare) else {
            panic!("expected a callback");
        };
        assert_eq!(cb.sender.id, 77);
        assert_eq!(cb.data, "");
    }
}
